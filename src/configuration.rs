use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;
use typed_builder::TypedBuilder;

use crate::{services::DefaultFiltersConfiguration, Result};

pub const DEFAULT_EAST_WEST_DOMAIN: &str = "skipper.cluster.local";
pub const DEFAULT_HTTPS_REDIRECT_CODE: u16 = 308;

fn default_east_west_domain() -> String {
    DEFAULT_EAST_WEST_DOMAIN.to_owned()
}

fn default_https_redirect_code() -> u16 {
    DEFAULT_HTTPS_REDIRECT_CODE
}

#[derive(Clone, Debug, TypedBuilder, Deserialize)]
pub struct Configuration {
    #[serde(default)]
    #[builder(default)]
    pub enable_east_west: bool,
    #[serde(default = "default_east_west_domain")]
    #[builder(default = default_east_west_domain(), setter(into))]
    pub east_west_domain: String,
    #[serde(default)]
    #[builder(default)]
    pub provide_https_redirect: bool,
    #[serde(default = "default_https_redirect_code")]
    #[builder(default = DEFAULT_HTTPS_REDIRECT_CODE)]
    pub https_redirect_code: u16,
    #[serde(default)]
    #[builder(default)]
    pub default_filters: Vec<DefaultFiltersConfiguration>,
    #[serde(default)]
    #[builder(default, setter(strip_option))]
    pub log_file: Option<PathBuf>,
}

impl Default for Configuration {
    fn default() -> Self {
        Configuration::builder().build()
    }
}

#[derive(Error, Debug)]
enum ConfigurationError {
    #[error("east-west domain must be not empty when east-west routes are enabled")]
    EastWestDomain,
    #[error("https redirect code must be a 3xx status code, got {0}")]
    HttpsRedirectCode(u16),
}

impl Configuration {
    pub fn validate(&self) -> Result<()> {
        if self.enable_east_west && self.east_west_domain.trim_matches('.').is_empty() {
            return Err(ConfigurationError::EastWestDomain.into());
        }
        if !(300..=399).contains(&self.https_redirect_code) {
            return Err(ConfigurationError::HttpsRedirectCode(self.https_redirect_code).into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_from_empty_document() {
        let configuration: Configuration = serde_yaml::from_str("{}").unwrap();
        assert!(!configuration.enable_east_west);
        assert_eq!(configuration.east_west_domain, DEFAULT_EAST_WEST_DOMAIN);
        assert!(!configuration.provide_https_redirect);
        assert_eq!(configuration.https_redirect_code, 308);
        assert!(configuration.default_filters.is_empty());
        assert!(configuration.validate().is_ok());
    }

    #[test]
    fn full_document() {
        let configuration = r#"
enable_east_west: true
east_west_domain: .ingress.cluster.local
provide_https_redirect: true
https_redirect_code: 301
log_file: /var/log/routegroups.log
default_filters:
- namespace: shop
  service: cart
  filters: 'setRequestHeader("X-Shop", "1")'
"#;
        let configuration: Configuration = serde_yaml::from_str(configuration).unwrap();
        assert!(configuration.enable_east_west);
        assert_eq!(configuration.east_west_domain, ".ingress.cluster.local");
        assert_eq!(configuration.https_redirect_code, 301);
        assert_eq!(configuration.default_filters[0].service, "cart");
        assert_eq!(configuration.log_file, Some(PathBuf::from("/var/log/routegroups.log")));
        assert!(configuration.validate().is_ok());
    }

    #[test]
    fn validation_errors() {
        let configuration = Configuration::builder().enable_east_west(true).east_west_domain("..").build();
        assert!(configuration.validate().is_err());

        let configuration = Configuration::builder().https_redirect_code(200).build();
        assert_eq!(configuration.validate().unwrap_err().to_string(), "https redirect code must be a 3xx status code, got 200");
    }
}
