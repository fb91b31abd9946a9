use std::fmt::Display;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// RouteGroup describes a set of HTTP routes that share hosts and backends.
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(group = "zalando.org", version = "v1", kind = "RouteGroup", plural = "routegroups", shortname = "rg", namespaced)]
#[serde(rename_all = "camelCase")]
pub struct RouteGroupSpec {
    /// Hosts the routes of the group are matched against.
    #[serde(default)]
    pub hosts: Vec<String>,
    /// Named backends, referenced by `defaultBackends` and by the routes.
    #[serde(default)]
    pub backends: Vec<BackendDefinition>,
    /// Backends used by routes that don't declare their own. Required when `routes` is empty.
    /// `null` entries are kept, so the indexes of the other entries don't move, and skipped later.
    #[serde(default)]
    pub default_backends: Vec<Option<BackendReference>>,
    #[serde(default)]
    pub routes: Vec<RouteSpec>,
}

#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct BackendDefinition {
    pub name: String,
    #[serde(flatten)]
    pub kind: BackendKind,
}

#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(tag = "type")]
pub enum BackendKind {
    #[serde(rename = "service", rename_all = "camelCase")]
    Service {
        #[serde(default)]
        service_name: String,
        #[serde(default)]
        service_port: i32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        algorithm: Option<Algorithm>,
    },
    #[serde(rename = "network")]
    Network { address: String },
    #[serde(rename = "lb")]
    LoadBalancer {
        #[serde(default)]
        endpoints: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        algorithm: Option<Algorithm>,
    },
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum Algorithm {
    #[default]
    RoundRobin,
    Random,
    ConsistentHash,
    PowerOfRandomNChoices,
}

impl Display for Algorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Algorithm::RoundRobin => "roundRobin",
            Algorithm::Random => "random",
            Algorithm::ConsistentHash => "consistentHash",
            Algorithm::PowerOfRandomNChoices => "powerOfRandomNChoices",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BackendReference {
    #[serde(default)]
    pub backend_name: String,
    /// Relative weight of the backend. Negative values are not supported.
    #[serde(default)]
    pub weight: i32,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RouteSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_subtree: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_regexp: Option<String>,
    /// HTTP methods to match; empty matches any method.
    #[serde(default)]
    pub methods: Vec<String>,
    /// Raw predicate expressions appended to the generated ones.
    #[serde(default)]
    pub predicates: Vec<String>,
    #[serde(default)]
    pub filters: Vec<String>,
    /// Overrides the default backends of the group when not empty.
    #[serde(default)]
    pub backends: Vec<BackendReference>,
}

impl RouteSpec {
    pub fn path(&self) -> Option<&str> {
        non_empty(self.path.as_deref())
    }

    pub fn path_subtree(&self) -> Option<&str> {
        non_empty(self.path_subtree.as_deref())
    }

    pub fn path_regexp(&self) -> Option<&str> {
        non_empty(self.path_regexp.as_deref())
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// A route group as listed from the cluster. Unlike [`RouteGroup`] it tolerates a missing spec,
/// the converter skips such items.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct RouteGroupItem {
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: Option<RouteGroupSpec>,
}

impl RouteGroupItem {
    pub fn name(&self) -> Option<&str> {
        non_empty(self.metadata.name.as_deref())
    }
}

impl From<RouteGroup> for RouteGroupItem {
    fn from(route_group: RouteGroup) -> Self {
        Self { metadata: route_group.metadata, spec: Some(route_group.spec) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_kinds_decode_from_type_tag() {
        let backends = r"
- name: app
  type: service
  serviceName: app-svc
  servicePort: 8080
- name: static
  type: network
  address: http://static.example.org
- name: pool
  type: lb
  algorithm: consistentHash
  endpoints:
  - http://10.0.0.1:80
  - http://10.0.0.2:80
";
        let backends: Vec<BackendDefinition> = serde_yaml::from_str(backends).unwrap();
        assert_eq!(
            backends[0].kind,
            BackendKind::Service { service_name: "app-svc".to_owned(), service_port: 8080, algorithm: None }
        );
        assert_eq!(backends[1].kind, BackendKind::Network { address: "http://static.example.org".to_owned() });
        assert_eq!(
            backends[2].kind,
            BackendKind::LoadBalancer {
                endpoints: vec!["http://10.0.0.1:80".to_owned(), "http://10.0.0.2:80".to_owned()],
                algorithm: Some(Algorithm::ConsistentHash),
            }
        );
    }

    #[test]
    fn item_without_spec_decodes() {
        let item = r"
metadata:
  name: orphan
  namespace: team
";
        let item: RouteGroupItem = serde_yaml::from_str(item).unwrap();
        assert_eq!(item.name(), Some("orphan"));
        assert!(item.spec.is_none());
    }

    #[test]
    fn empty_path_fields_are_unset() {
        let route = RouteSpec { path: Some(String::new()), path_subtree: Some("/api".to_owned()), ..Default::default() };
        assert_eq!(route.path(), None);
        assert_eq!(route.path_subtree(), Some("/api"));
        assert_eq!(route.path_regexp(), None);
    }
}
