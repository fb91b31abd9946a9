use tracing::{debug, warn};

use super::{ConversionError, GroupContext};
use crate::{
    common::{Algorithm, BackendDefinition, BackendKind, ResourceKey, Route, RouteBackend},
    state::{self, TargetPort},
};

/// Resolves the backends of a route group against the cluster state.
pub struct BackendResolver<'a> {
    ctx: &'a GroupContext<'a>,
}

impl<'a> BackendResolver<'a> {
    pub fn new(ctx: &'a GroupContext<'a>) -> Self {
        Self { ctx }
    }

    pub fn resolve(&self, backend: &BackendDefinition) -> Result<RouteBackend, ConversionError> {
        match &backend.kind {
            BackendKind::Network { address } => Ok(RouteBackend::Network { address: address.clone() }),
            BackendKind::LoadBalancer { endpoints, algorithm } => Ok(RouteBackend::LoadBalanced {
                endpoints: endpoints.clone(),
                algorithm: algorithm.unwrap_or_default(),
            }),
            BackendKind::Service { service_name, service_port, algorithm } => {
                self.resolve_service(service_name, *service_port, *algorithm)
            },
        }
    }

    /// Sets the resolved backend on the route. Routes to services also get the default filters of the service.
    pub fn apply_backend(&self, backend: &BackendDefinition, route: &mut Route) -> Result<(), ConversionError> {
        route.backend = self.resolve(backend)?;
        if let BackendKind::Service { service_name, .. } = &backend.kind {
            self.apply_default_filters(service_name, route);
        }
        Ok(())
    }

    /// Prepends the default filters of the service to the filters of the route.
    pub fn apply_default_filters(&self, service_name: &str, route: &mut Route) {
        let namespace = &self.ctx.key.namespace;
        match self.ctx.default_filters.get_named(namespace, service_name) {
            Ok(mut filters) => {
                filters.append(&mut route.filters);
                route.filters = filters;
            },
            Err(e) => warn!("Failed to retrieve default filters for service {namespace}/{service_name}: {e}"),
        }
    }

    fn resolve_service(&self, service_name: &str, service_port: i32, algorithm: Option<Algorithm>) -> Result<RouteBackend, ConversionError> {
        let ctx = self.ctx;
        if service_name.is_empty() || service_port <= 0 {
            return Err(ConversionError::InvalidServiceBackend {
                route_group: ctx.key.clone(),
                service_name: service_name.to_owned(),
                service_port,
            });
        }

        let service_key = ResourceKey::namespaced(service_name, &ctx.key.namespace);
        let service = ctx.state.get_service(&service_key).ok_or_else(|| ConversionError::BackendNotFound(service_key.clone()))?;
        if !state::is_cluster_ip(service) {
            return Err(ConversionError::UnsupportedServiceType {
                service: service_key,
                service_type: state::service_type(service).to_owned(),
            });
        }

        let port = state::find_service_port(service, service_port).ok_or_else(|| ConversionError::ServicePortNotFound {
            route_group: ctx.key.clone(),
            service_port,
        })?;

        let cluster_ip_backend = || RouteBackend::Network {
            address: format!("http://{}:{service_port}", state::cluster_ip(service)),
        };

        let Some(target_port) = TargetPort::from_service_port(port) else {
            debug!("Target port of service {service_key}:{service_port} not resolved, falling back to cluster IP");
            return Ok(cluster_ip_backend());
        };

        let endpoints = ctx.state.get_endpoints_by_target(&service_key, &target_port);
        if endpoints.is_empty() {
            debug!("No endpoints for service {service_key}:{service_port}, falling back to cluster IP");
            return Ok(cluster_ip_backend());
        }

        Ok(RouteBackend::LoadBalanced { endpoints, algorithm: algorithm.unwrap_or_default() })
    }
}
