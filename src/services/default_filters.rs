use std::collections::HashMap;

use serde::Deserialize;
use thiserror::Error;

use crate::common::{namespace_or_default, ExpressionParser, Filter, ParseError};

/// Filters configured for every route pointing at a given service.
pub trait DefaultFilters {
    /// Returns a fresh copy of the filters of the service, so callers can prepend them to a route.
    fn get_named(&self, namespace: &str, service_name: &str) -> crate::Result<Vec<Filter>>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NoDefaultFilters;

impl DefaultFilters for NoDefaultFilters {
    fn get_named(&self, _namespace: &str, _service_name: &str) -> crate::Result<Vec<Filter>> {
        Ok(vec![])
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct DefaultFiltersConfiguration {
    #[serde(default)]
    pub namespace: Option<String>,
    pub service: String,
    pub filters: String,
}

#[derive(Error, Debug)]
pub enum DefaultFiltersError {
    #[error("invalid default filters for service {namespace}/{service}: {source}")]
    InvalidFilters { namespace: String, service: String, source: ParseError },
}

/// Default filters held in memory, keyed by namespace and service name.
#[derive(Clone, Debug, Default)]
pub struct StaticDefaultFilters {
    filters: HashMap<(String, String), Vec<Filter>>,
}

impl StaticDefaultFilters {
    pub fn new(filters: HashMap<(String, String), Vec<Filter>>) -> Self {
        Self { filters }
    }

    pub fn from_configuration(
        configuration: &[DefaultFiltersConfiguration],
        parser: &dyn ExpressionParser,
    ) -> Result<Self, DefaultFiltersError> {
        let mut filters = HashMap::new();
        for entry in configuration {
            let namespace = namespace_or_default(entry.namespace.as_deref()).to_owned();
            let parsed = parser.parse_filters(&entry.filters).map_err(|source| DefaultFiltersError::InvalidFilters {
                namespace: namespace.clone(),
                service: entry.service.clone(),
                source,
            })?;
            filters.insert((namespace, entry.service.clone()), parsed);
        }
        Ok(Self { filters })
    }
}

impl DefaultFilters for StaticDefaultFilters {
    fn get_named(&self, namespace: &str, service_name: &str) -> crate::Result<Vec<Filter>> {
        Ok(self.filters.get(&(namespace.to_owned(), service_name.to_owned())).cloned().unwrap_or_default())
    }
}
