use super::GroupContext;
use crate::common::{create_host_rx, Arg, Filter, Predicate, Route, RouteBackend};

pub const EAST_WEST_ROUTE_SUFFIX: &str = "_east_west";
pub const HTTPS_REDIRECT_ROUTE_SUFFIX: &str = "_https_redirect";
const FORWARDED_PROTO_HEADER: &str = "X-Forwarded-Proto";

/// Routes derived from a base route: the east-west alias and the HTTPS redirect, when enabled.
pub fn auxiliary_routes(ctx: &GroupContext<'_>, route: &Route) -> Vec<Route> {
    let mut routes = vec![];
    if let Some(east_west) = east_west_route(ctx, route) {
        routes.push(east_west);
    }

    // a route handling the forwarded proto itself is not shadowed
    if let Some(code) = ctx.options.https_redirect_code {
        if !has_proto_predicate(route) {
            routes.push(https_redirect_route(code, route));
        }
    }

    routes
}

fn east_west_route(ctx: &GroupContext<'_>, route: &Route) -> Option<Route> {
    let domain = ctx.options.east_west_domain()?;
    if ctx.has_east_west_host {
        return None;
    }

    let host_rx = create_host_rx(&[format!("{}.{}.{domain}", ctx.key.name, ctx.key.namespace)])?;
    let mut east_west = route.clone();
    east_west.id = format!("{}{EAST_WEST_ROUTE_SUFFIX}", route.id);
    match east_west.predicates.iter_mut().find(|p| p.name == "Host") {
        Some(host) => host.args = vec![host_rx.into()],
        None => east_west.predicates.insert(0, Predicate::new("Host", vec![host_rx.into()])),
    }

    Some(east_west)
}

fn has_proto_predicate(route: &Route) -> bool {
    route.predicates.iter().any(|p| {
        (p.name == "Header" || p.name == "HeaderRegexp")
            && p.args.first().and_then(Arg::as_str).is_some_and(|header| header.eq_ignore_ascii_case(FORWARDED_PROTO_HEADER))
    })
}

fn https_redirect_route(code: u16, route: &Route) -> Route {
    let mut predicates = route.predicates.clone();
    predicates.push(Predicate::new("Header", vec![FORWARDED_PROTO_HEADER.into(), "http".into()]));

    Route {
        id: format!("{}{HTTPS_REDIRECT_ROUTE_SUFFIX}", route.id),
        predicates,
        filters: vec![Filter::new("redirectTo", vec![f64::from(code).into(), "https:".into()])],
        backend: RouteBackend::Shunt,
    }
}
