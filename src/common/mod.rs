mod expression;
mod resource_key;
mod route;
mod route_group;

pub use expression::{ExpressionParser, ParseError, RouteExpressionParser};
pub use resource_key::{namespace_or_default, ResourceKey, DEFAULT_NAMESPACE_NAME};
pub use route::{Arg, Filter, Predicate, Route, RouteBackend};
pub use route_group::{
    Algorithm, BackendDefinition, BackendKind, BackendReference, RouteGroup, RouteGroupItem, RouteGroupSpec, RouteSpec,
};

const ROUTE_ID_PREFIX: &str = "kube_rg";

/// Encodes a value as a route id part. ASCII alphanumerics are kept, any other character, `_`
/// included, becomes `_<hex code point>_`. Distinct values never share an encoding, and an encoded
/// part never starts with `_` followed by `_`, so the `__` separators of an id stay unambiguous.
pub fn to_symbol(value: &str) -> String {
    value.chars().map(|c| if c.is_ascii_alphanumeric() { c.to_string() } else { format!("_{:x}_", u32::from(c)) }).collect()
}

pub fn route_id(namespace: &str, name: &str, sub_name: &str, index: usize, sub_index: usize) -> String {
    format!("{ROUTE_ID_PREFIX}__{namespace}__{name}__{sub_name}__{index}_{sub_index}")
}

/// Id of a route generated for a route group, unique per method, route and backend.
pub fn route_group_route_id(key: &ResourceKey, method: &str, route_index: usize, backend_index: usize) -> String {
    route_id(&to_symbol(&key.namespace), &to_symbol(&key.name), &to_symbol(method), route_index, backend_index)
}

/// Builds the `Host` predicate regular expression matching exactly one of the given hosts.
pub fn create_host_rx<S: AsRef<str>>(hosts: &[S]) -> Option<String> {
    if hosts.is_empty() {
        return None;
    }
    let hosts: Vec<_> = hosts.iter().map(|h| h.as_ref().replace('.', "[.]")).collect();
    Some(format!("^({})$", hosts.join("|")))
}
