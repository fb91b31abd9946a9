use std::collections::BTreeMap;

use itertools::Itertools;
use k8s_openapi::{
    api::core::v1::{Endpoints, Service, ServicePort},
    apimachinery::pkg::util::intstr::IntOrString,
};
use serde::Deserialize;

use crate::common::{ResourceKey, RouteGroupItem};

const CLUSTER_IP_SERVICE_TYPE: &str = "ClusterIP";

/// Port on the pods that a service port forwards to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TargetPort {
    Number(i32),
    Name(String),
}

impl TargetPort {
    /// Resolves the target of a service port. Without an explicit target the service port itself is used.
    pub fn from_service_port(port: &ServicePort) -> Option<Self> {
        match port.target_port.as_ref() {
            None => Some(TargetPort::Number(port.port)),
            Some(IntOrString::Int(number)) if *number > 0 => Some(TargetPort::Number(*number)),
            Some(IntOrString::String(name)) if !name.is_empty() => match name.parse::<i32>() {
                Ok(number) if number > 0 => Some(TargetPort::Number(number)),
                Ok(_) => None,
                Err(_) => Some(TargetPort::Name(name.clone())),
            },
            Some(_) => None,
        }
    }
}

/// Read-only view of the cluster a conversion runs against.
#[derive(Clone, Debug, Default)]
pub struct ClusterState {
    route_groups: Vec<RouteGroupItem>,
    services: BTreeMap<ResourceKey, Service>,
    endpoints: BTreeMap<ResourceKey, Endpoints>,
}

impl ClusterState {
    pub fn new(route_groups: Vec<RouteGroupItem>, services: Vec<Service>, endpoints: Vec<Endpoints>) -> Self {
        Self {
            route_groups,
            services: services.into_iter().map(|s| (ResourceKey::from(&s), s)).collect(),
            endpoints: endpoints.into_iter().map(|e| (ResourceKey::from(&e), e)).collect(),
        }
    }

    pub fn route_groups(&self) -> &[RouteGroupItem] {
        &self.route_groups
    }

    pub fn get_service(&self, key: &ResourceKey) -> Option<&Service> {
        self.services.get(key)
    }

    /// Endpoint urls of the service behind `target_port`, sorted and without duplicates.
    pub fn get_endpoints_by_target(&self, key: &ResourceKey, target_port: &TargetPort) -> Vec<String> {
        let Some(subsets) = self.endpoints.get(key).and_then(|e| e.subsets.as_ref()) else {
            return vec![];
        };

        subsets
            .iter()
            .flat_map(|subset| {
                let ports = subset.ports.iter().flatten().filter(move |p| match target_port {
                    TargetPort::Number(number) => p.port == *number,
                    TargetPort::Name(name) => p.name.as_ref() == Some(name),
                });
                ports
                    .cartesian_product(subset.addresses.iter().flatten())
                    .map(|(port, address)| format!("http://{}:{}", address.ip, port.port))
            })
            .sorted()
            .dedup()
            .collect()
    }
}

pub fn service_type(service: &Service) -> &str {
    service.spec.as_ref().and_then(|s| s.type_.as_deref()).unwrap_or(CLUSTER_IP_SERVICE_TYPE)
}

pub fn is_cluster_ip(service: &Service) -> bool {
    service_type(service).eq_ignore_ascii_case(CLUSTER_IP_SERVICE_TYPE)
}

pub fn cluster_ip(service: &Service) -> &str {
    service.spec.as_ref().and_then(|s| s.cluster_ip.as_deref()).unwrap_or_default()
}

pub fn find_service_port(service: &Service, port: i32) -> Option<&ServicePort> {
    service.spec.as_ref().and_then(|s| s.ports.as_ref()).and_then(|ports| ports.iter().find(|p| p.port == port))
}

/// Snapshot document as written to disk: `routeGroups`, `services` and `endpoints` lists.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterStateSnapshot {
    #[serde(default)]
    pub route_groups: Vec<RouteGroupItem>,
    #[serde(default)]
    pub services: Vec<Service>,
    #[serde(default)]
    pub endpoints: Vec<Endpoints>,
}

impl From<ClusterStateSnapshot> for ClusterState {
    fn from(snapshot: ClusterStateSnapshot) -> Self {
        ClusterState::new(snapshot.route_groups, snapshot.services, snapshot.endpoints)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SNAPSHOT: &str = r"
services:
- apiVersion: v1
  kind: Service
  metadata:
    name: app
    namespace: shop
  spec:
    clusterIP: 10.0.0.5
    ports:
    - name: http
      port: 80
      targetPort: web
    - name: admin
      port: 9000
      targetPort: 9090
    - name: plain
      port: 7000
endpoints:
- apiVersion: v1
  kind: Endpoints
  metadata:
    name: app
    namespace: shop
  subsets:
  - addresses:
    - ip: 10.2.0.2
    - ip: 10.2.0.1
    ports:
    - name: web
      port: 8080
    - name: admin
      port: 9090
  - addresses:
    - ip: 10.2.0.1
    ports:
    - name: web
      port: 8080
";

    fn state() -> ClusterState {
        let snapshot: ClusterStateSnapshot = serde_yaml::from_str(SNAPSHOT).unwrap();
        ClusterState::from(snapshot)
    }

    #[test]
    fn resolves_target_ports() {
        let state = state();
        let service = state.get_service(&ResourceKey::namespaced("app", "shop")).unwrap();

        let http = find_service_port(service, 80).unwrap();
        assert_eq!(TargetPort::from_service_port(http), Some(TargetPort::Name("web".to_owned())));
        let admin = find_service_port(service, 9000).unwrap();
        assert_eq!(TargetPort::from_service_port(admin), Some(TargetPort::Number(9090)));
        let plain = find_service_port(service, 7000).unwrap();
        assert_eq!(TargetPort::from_service_port(plain), Some(TargetPort::Number(7000)));
        assert!(find_service_port(service, 81).is_none());

        let zero = ServicePort { port: 80, target_port: Some(IntOrString::Int(0)), ..Default::default() };
        assert_eq!(TargetPort::from_service_port(&zero), None);
    }

    #[test]
    fn endpoints_by_named_and_numbered_target() {
        let state = state();
        let key = ResourceKey::namespaced("app", "shop");

        assert_eq!(
            state.get_endpoints_by_target(&key, &TargetPort::Name("web".to_owned())),
            vec!["http://10.2.0.1:8080", "http://10.2.0.2:8080"]
        );
        assert_eq!(
            state.get_endpoints_by_target(&key, &TargetPort::Number(9090)),
            vec!["http://10.2.0.1:9090", "http://10.2.0.2:9090"]
        );
        assert!(state.get_endpoints_by_target(&key, &TargetPort::Number(7000)).is_empty());
        assert!(state.get_endpoints_by_target(&ResourceKey::namespaced("app", "other"), &TargetPort::Number(80)).is_empty());
    }

    #[test]
    fn service_type_defaults_to_cluster_ip() {
        let state = state();
        let service = state.get_service(&ResourceKey::namespaced("app", "shop")).unwrap();
        assert!(is_cluster_ip(service));
        assert_eq!(cluster_ip(service), "10.0.0.5");
    }
}
