use itertools::Itertools;
use tracing::warn;

use super::{backends_resolver::BackendResolver, traffic::TrafficSplit, ConversionError, GroupContext};
use crate::common::{route_group_route_id, BackendDefinition, BackendKind, BackendReference, Route, RouteSpec};

const IMPLICIT_ROUTE_METHOD: &str = "all";

/// Creates the base routes of a route group, without the auxiliary routes.
pub fn group_routes(ctx: &GroupContext<'_>) -> Result<Vec<Route>, ConversionError> {
    if ctx.spec.backends.is_empty() {
        return Err(ConversionError::MissingBackends(ctx.key.clone()));
    }

    if ctx.spec.routes.is_empty() {
        implicit_group_routes(ctx)
    } else {
        explicit_group_routes(ctx)
    }
}

/// Routes of a group without a `routes` field: one route per default backend, matching only the hosts.
fn implicit_group_routes(ctx: &GroupContext<'_>) -> Result<Vec<Route>, ConversionError> {
    let spec = ctx.spec;
    if spec.default_backends.is_empty() {
        return Err(ConversionError::MissingDefaultBackends(ctx.key.clone()));
    }

    let resolver = BackendResolver::new(ctx);
    let mut routes = vec![];
    for (backend_index, backend_ref) in spec.default_backends.iter().enumerate() {
        let Some(backend_ref) = backend_ref.as_ref().filter(|b| !b.backend_name.is_empty()) else {
            warn!("Invalid default backend reference found in routegroup/{}", ctx.key);
            continue;
        };

        let backend = ctx.backend(&backend_ref.backend_name)?;
        let mut route = Route::new(route_group_route_id(&ctx.key, IMPLICIT_ROUTE_METHOD, 0, backend_index));
        resolver.apply_backend(backend, &mut route)?;

        // merged once more on top of the ones applied with the backend
        if let BackendKind::Service { service_name, .. } = &backend.kind {
            resolver.apply_default_filters(service_name, &mut route);
        }

        if let Some(host_rx) = &ctx.host_rx {
            route.push_predicate("Host", vec![host_rx.as_str().into()]);
        }

        if let Some(traffic) = ctx.default_backend_traffic.fraction(&backend_ref.backend_name) {
            route.push_predicate("Traffic", vec![traffic.into()]);
        }

        routes.push(route);
    }

    Ok(routes)
}

/// Routes of a group with the `routes` field: one route per route spec, method and backend.
fn explicit_group_routes(ctx: &GroupContext<'_>) -> Result<Vec<Route>, ConversionError> {
    let spec = ctx.spec;
    let resolver = BackendResolver::new(ctx);
    let mut routes = vec![];
    for (route_index, route_spec) in spec.routes.iter().enumerate() {
        let methods: Vec<&str> = if route_spec.methods.is_empty() {
            vec![""]
        } else {
            route_spec.methods.iter().map(String::as_str).unique().collect()
        };

        let route_traffic;
        let (backend_refs, traffic): (Vec<Option<&BackendReference>>, _) = if route_spec.backends.is_empty() {
            (spec.default_backends.iter().map(Option::as_ref).collect(), &ctx.default_backend_traffic)
        } else {
            route_traffic = TrafficSplit::new(&route_spec.backends);
            (route_spec.backends.iter().map(Some).collect(), &route_traffic)
        };

        for method in methods {
            for (backend_index, backend_ref) in backend_refs.iter().enumerate() {
                let Some(backend_ref) = backend_ref else {
                    warn!("Invalid default backend reference found in routegroup/{}", ctx.key);
                    continue;
                };
                let backend = ctx.backend(&backend_ref.backend_name)?;
                let id = route_group_route_id(&ctx.key, method, route_index, backend_index);
                let mut route = explicit_route(ctx, &resolver, route_spec, method, backend, id)?;

                if let Some(traffic) = traffic.fraction(&backend_ref.backend_name) {
                    route.push_predicate("Traffic", vec![traffic.into()]);
                }

                routes.push(route);
            }
        }
    }

    Ok(routes)
}

fn explicit_route(
    ctx: &GroupContext<'_>,
    resolver: &BackendResolver<'_>,
    route_spec: &RouteSpec,
    method: &str,
    backend: &BackendDefinition,
    id: String,
) -> Result<Route, ConversionError> {
    let mut route = Route::new(id);

    // Path is more specific than PathSubtree, so it wins when both are set
    if let Some(path) = route_spec.path() {
        route.push_predicate("Path", vec![path.into()]);
    } else if let Some(path_subtree) = route_spec.path_subtree() {
        route.push_predicate("PathSubtree", vec![path_subtree.into()]);
    }

    if let Some(path_regexp) = route_spec.path_regexp() {
        route.push_predicate("PathRegexp", vec![path_regexp.into()]);
    }

    if let Some(host_rx) = &ctx.host_rx {
        route.push_predicate("Host", vec![host_rx.as_str().into()]);
    }

    if !method.is_empty() {
        route.push_predicate("Method", vec![method.to_uppercase().into()]);
    }

    for raw in &route_spec.predicates {
        let mut predicates = ctx.parser.parse_predicates(raw).map_err(|source| ctx.invalid_expression(source))?;
        route.predicates.append(&mut predicates);
    }

    for raw in &route_spec.filters {
        let mut filters = ctx.parser.parse_filters(raw).map_err(|source| ctx.invalid_expression(source))?;
        route.filters.append(&mut filters);
    }

    resolver.apply_backend(backend, &mut route)?;
    Ok(route)
}
