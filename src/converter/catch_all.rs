use std::collections::BTreeMap;

use crate::common::{create_host_rx, route_id, to_symbol, Route, RouteBackend};

// can't conflict with any HTTP method
const CATCH_ALL_ROUTE_NAME: &str = "catchall";

/// Ids of the base routes registered under each host.
#[derive(Debug, Default)]
pub struct HostRoutes {
    routes: BTreeMap<String, Vec<String>>,
}

impl HostRoutes {
    pub fn record(&mut self, hosts: &[String], route_id: &str) {
        for host in hosts {
            self.routes.entry(host.clone()).or_default().push(route_id.to_owned());
        }
    }

    pub fn hosts(&self) -> impl Iterator<Item = &str> {
        self.routes.keys().map(String::as_str)
    }

    pub fn routes(&self, host: &str) -> &[String] {
        self.routes.get(host).map(Vec::as_slice).unwrap_or_default()
    }
}

/// One route per known host, answering the requests that none of the routes of the host matched.
pub fn host_catch_all_routes(host_routes: &HostRoutes) -> Vec<Route> {
    host_routes
        .hosts()
        .filter_map(|host| {
            let host_rx = create_host_rx(&[host])?;
            let mut route = Route::new(route_id("", &to_symbol(host), CATCH_ALL_ROUTE_NAME, 0, 0));
            route.push_predicate("Host", vec![host_rx.into()]);
            route.backend = RouteBackend::Shunt;
            Some(route)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_catch_all_per_host() {
        let mut host_routes = HostRoutes::default();
        let hosts = vec!["b.example.org".to_owned(), "a.example.org".to_owned()];
        host_routes.record(&hosts, "r1");
        host_routes.record(&hosts, "r2");
        host_routes.record(&hosts[..1], "r3");
        assert_eq!(host_routes.routes("b.example.org"), ["r1", "r2", "r3"]);
        assert!(host_routes.routes("c.example.org").is_empty());

        let routes = host_catch_all_routes(&host_routes);
        let rendered: Vec<_> = routes.iter().map(ToString::to_string).collect();
        assert_eq!(
            rendered,
            vec![
                r#"kube_rg____a_2e_example_2e_org__catchall__0_0: Host("^(a[.]example[.]org)$") -> <shunt>;"#,
                r#"kube_rg____b_2e_example_2e_org__catchall__0_0: Host("^(b[.]example[.]org)$") -> <shunt>;"#,
            ]
        );
    }
}
