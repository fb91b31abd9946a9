use std::fmt::Display;

use k8s_openapi::api::core::v1::{Endpoints, Service};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

use super::RouteGroupItem;

pub const DEFAULT_NAMESPACE_NAME: &str = "default";

/// Namespaced identity of a resource in the cluster snapshot.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct ResourceKey {
    pub namespace: String,
    pub name: String,
}

impl ResourceKey {
    pub fn namespaced(name: &str, namespace: &str) -> Self {
        Self {
            name: name.to_owned(),
            namespace: namespace_or_default(Some(namespace)).to_owned(),
        }
    }
}

impl Default for ResourceKey {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE_NAME.to_owned(),
            name: String::default(),
        }
    }
}

impl Display for ResourceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

pub fn namespace_or_default(namespace: Option<&str>) -> &str {
    match namespace {
        Some(namespace) if !namespace.is_empty() => namespace,
        _ => DEFAULT_NAMESPACE_NAME,
    }
}

impl From<&ObjectMeta> for ResourceKey {
    fn from(value: &ObjectMeta) -> Self {
        let name = match (value.name.as_ref(), value.generate_name.as_ref()) {
            (None, None) => "",
            (Some(name), _) | (None, Some(name)) => name,
        };
        Self {
            namespace: namespace_or_default(value.namespace.as_deref()).to_owned(),
            name: name.to_owned(),
        }
    }
}

impl From<&Service> for ResourceKey {
    fn from(service: &Service) -> Self {
        ResourceKey::from(&service.metadata)
    }
}

impl From<&Endpoints> for ResourceKey {
    fn from(endpoints: &Endpoints) -> Self {
        ResourceKey::from(&endpoints.metadata)
    }
}

impl From<&RouteGroupItem> for ResourceKey {
    fn from(route_group: &RouteGroupItem) -> Self {
        ResourceKey::from(&route_group.metadata)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_namespace_falls_back_to_default() {
        let meta = ObjectMeta { name: Some("shop".to_owned()), namespace: Some(String::new()), ..Default::default() };
        let key = ResourceKey::from(&meta);
        assert_eq!(key, ResourceKey::namespaced("shop", "default"));
        assert_eq!(key.to_string(), "default/shop");
    }

    #[test]
    fn generate_name_is_used_without_name() {
        let meta = ObjectMeta { generate_name: Some("shop-".to_owned()), namespace: Some("team".to_owned()), ..Default::default() };
        assert_eq!(ResourceKey::from(&meta), ResourceKey::namespaced("shop-", "team"));
    }
}
