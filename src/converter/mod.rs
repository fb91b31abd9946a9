mod auxiliary_routes;
mod backends_resolver;
mod catch_all;
mod route_synthesizer;
mod traffic;

use std::{collections::HashMap, sync::Arc};

use thiserror::Error;
use tracing::{debug, error};
use typed_builder::TypedBuilder;

pub use auxiliary_routes::{EAST_WEST_ROUTE_SUFFIX, HTTPS_REDIRECT_ROUTE_SUFFIX};
pub use backends_resolver::BackendResolver;
pub use catch_all::HostRoutes;
pub use traffic::TrafficSplit;

use crate::{
    common::{create_host_rx, BackendDefinition, ExpressionParser, ParseError, ResourceKey, Route, RouteExpressionParser, RouteGroupSpec},
    configuration::Configuration,
    services::{DefaultFilters, NoDefaultFilters},
    state::ClusterState,
};

/// Errors failing the conversion of a single route group.
#[derive(Error, Debug, PartialEq)]
pub enum ConversionError {
    #[error("missing backends for route group {0}")]
    MissingBackends(ResourceKey),
    #[error("missing default backends for route group {0}")]
    MissingDefaultBackends(ResourceKey),
    #[error("invalid backend reference in routegroup/{route_group}: {backend_name}")]
    InvalidBackendReference { route_group: ResourceKey, backend_name: String },
    #[error("invalid service backend in routegroup/{route_group}: {service_name}:{service_port}")]
    InvalidServiceBackend { route_group: ResourceKey, service_name: String, service_port: i32 },
    #[error("service not found: service/{0}")]
    BackendNotFound(ResourceKey),
    #[error("not supported service type in service/{service}: {service_type}")]
    UnsupportedServiceType { service: ResourceKey, service_type: String },
    #[error("service port not found for routegroup/{route_group}: {service_port}")]
    ServicePortNotFound { route_group: ResourceKey, service_port: i32 },
    #[error("invalid expression in routegroup/{route_group}: {source}")]
    InvalidExpression { route_group: ResourceKey, source: ParseError },
}

#[derive(Clone, Debug, Default, TypedBuilder)]
pub struct ConverterOptions {
    /// Domain of the east-west routes, they are generated only when set.
    #[builder(default, setter(strip_option, into))]
    pub east_west_domain: Option<String>,
    /// Status code of the HTTPS redirect routes, they are generated only when set.
    #[builder(default, setter(strip_option))]
    pub https_redirect_code: Option<u16>,
}

impl ConverterOptions {
    pub fn east_west_domain(&self) -> Option<&str> {
        self.east_west_domain.as_deref().map(|d| d.trim_matches('.')).filter(|d| !d.is_empty())
    }

    fn has_east_west_host(&self, hosts: &[String]) -> bool {
        self.east_west_domain().is_some_and(|domain| {
            let suffix = format!(".{domain}");
            hosts.iter().any(|h| h.ends_with(&suffix))
        })
    }
}

impl From<&Configuration> for ConverterOptions {
    fn from(configuration: &Configuration) -> Self {
        Self {
            east_west_domain: configuration.enable_east_west.then(|| configuration.east_west_domain.clone()),
            https_redirect_code: configuration.provide_https_redirect.then_some(configuration.https_redirect_code),
        }
    }
}

/// Everything the conversion of one route group needs, built once per group.
pub struct GroupContext<'a> {
    pub state: &'a ClusterState,
    pub key: ResourceKey,
    pub spec: &'a RouteGroupSpec,
    pub host_rx: Option<String>,
    pub backends_by_name: HashMap<&'a str, &'a BackendDefinition>,
    pub default_backend_traffic: TrafficSplit,
    pub has_east_west_host: bool,
    pub options: &'a ConverterOptions,
    pub parser: &'a dyn ExpressionParser,
    pub default_filters: &'a dyn DefaultFilters,
}

impl GroupContext<'_> {
    pub fn backend(&self, name: &str) -> Result<&BackendDefinition, ConversionError> {
        self.backends_by_name.get(name).copied().ok_or_else(|| ConversionError::InvalidBackendReference {
            route_group: self.key.clone(),
            backend_name: name.to_owned(),
        })
    }

    fn invalid_expression(&self, source: ParseError) -> ConversionError {
        ConversionError::InvalidExpression { route_group: self.key.clone(), source }
    }
}

/// Converts the route groups of a cluster snapshot into proxy routes.
#[derive(Clone, TypedBuilder)]
pub struct Converter {
    #[builder(default)]
    options: ConverterOptions,
    #[builder(default = Arc::new(RouteExpressionParser) as Arc<dyn ExpressionParser + Send + Sync>)]
    parser: Arc<dyn ExpressionParser + Send + Sync>,
    #[builder(default = Arc::new(NoDefaultFilters) as Arc<dyn DefaultFilters + Send + Sync>)]
    default_filters: Arc<dyn DefaultFilters + Send + Sync>,
}

impl Converter {
    /// Builds the complete route list of the snapshot. Route groups failing to convert are logged
    /// and left out, the rest of the groups are still converted.
    pub fn convert(&self, state: &ClusterState) -> Vec<Route> {
        let mut routes = vec![];
        let mut host_routes = HostRoutes::default();
        let mut missing_name = 0;
        let mut missing_spec = 0;

        for item in state.route_groups() {
            if item.name().is_none() {
                missing_name += 1;
                continue;
            }
            let Some(spec) = item.spec.as_ref() else {
                missing_spec += 1;
                continue;
            };

            let ctx = self.group_context(state, ResourceKey::from(item), spec);
            match route_synthesizer::group_routes(&ctx) {
                Ok(base_routes) => {
                    debug!("Route group {} converted into {} routes", ctx.key, base_routes.len());
                    for route in base_routes {
                        host_routes.record(&spec.hosts, &route.id);
                        let auxiliary = auxiliary_routes::auxiliary_routes(&ctx, &route);
                        routes.push(route);
                        routes.extend(auxiliary);
                    }
                },
                Err(e) => error!("Error transforming route group {}: {e}", ctx.key),
            }
        }

        if missing_name > 0 {
            error!(count = missing_name, "One or more route groups without a name were detected");
        }

        if missing_spec > 0 {
            error!(count = missing_spec, "One or more route groups without a spec were detected");
        }

        routes.extend(catch_all::host_catch_all_routes(&host_routes));
        routes
    }

    fn group_context<'a>(&'a self, state: &'a ClusterState, key: ResourceKey, spec: &'a RouteGroupSpec) -> GroupContext<'a> {
        GroupContext {
            state,
            key,
            spec,
            host_rx: create_host_rx(&spec.hosts),
            backends_by_name: spec.backends.iter().map(|b| (b.name.as_str(), b)).collect(),
            default_backend_traffic: TrafficSplit::new(spec.default_backends.iter().flatten()),
            has_east_west_host: self.options.has_east_west_host(&spec.hosts),
            options: &self.options,
            parser: self.parser.as_ref(),
            default_filters: self.default_filters.as_ref(),
        }
    }
}

impl Default for Converter {
    fn default() -> Self {
        Converter::builder().build()
    }
}
