use std::fmt::{self, Display};

use itertools::Itertools;
use serde::Serialize;

use super::Algorithm;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Arg {
    String(String),
    Number(f64),
}

impl From<&str> for Arg {
    fn from(value: &str) -> Self {
        Arg::String(value.to_owned())
    }
}

impl From<String> for Arg {
    fn from(value: String) -> Self {
        Arg::String(value)
    }
}

impl From<f64> for Arg {
    fn from(value: f64) -> Self {
        Arg::Number(value)
    }
}

impl Arg {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Arg::String(value) => Some(value),
            Arg::Number(_) => None,
        }
    }
}

impl Display for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arg::String(value) => write_quoted(f, value),
            Arg::Number(value) => write!(f, "{value}"),
        }
    }
}

fn write_quoted(f: &mut fmt::Formatter<'_>, value: &str) -> fmt::Result {
    f.write_str("\"")?;
    for c in value.chars() {
        match c {
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            c => write!(f, "{c}")?,
        }
    }
    f.write_str("\"")
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Predicate {
    pub name: String,
    pub args: Vec<Arg>,
}

impl Predicate {
    pub fn new(name: &str, args: Vec<Arg>) -> Self {
        Self { name: name.to_owned(), args }
    }
}

impl Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.args.iter().join(", "))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Filter {
    pub name: String,
    pub args: Vec<Arg>,
}

impl Filter {
    pub fn new(name: &str, args: Vec<Arg>) -> Self {
        Self { name: name.to_owned(), args }
    }
}

impl Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.args.iter().join(", "))
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RouteBackend {
    Network {
        address: String,
    },
    LoadBalanced {
        endpoints: Vec<String>,
        algorithm: Algorithm,
    },
    /// Terminates the request in the proxy without forwarding it.
    #[default]
    Shunt,
}

impl Display for RouteBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteBackend::Network { address } => write_quoted(f, address),
            RouteBackend::LoadBalanced { endpoints, algorithm } => {
                write!(f, "<{algorithm}")?;
                for endpoint in endpoints {
                    f.write_str(", ")?;
                    write_quoted(f, endpoint)?;
                }
                f.write_str(">")
            },
            RouteBackend::Shunt => f.write_str("<shunt>"),
        }
    }
}

/// A single row of the proxy routing table.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Route {
    pub id: String,
    pub predicates: Vec<Predicate>,
    pub filters: Vec<Filter>,
    pub backend: RouteBackend,
}

impl Route {
    pub fn new(id: String) -> Self {
        Self { id, ..Default::default() }
    }

    pub fn push_predicate(&mut self, name: &str, args: Vec<Arg>) {
        self.predicates.push(Predicate::new(name, args));
    }

    pub fn predicate(&self, name: &str) -> Option<&Predicate> {
        self.predicates.iter().find(|p| p.name == name)
    }
}

impl Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: ", self.id)?;
        if self.predicates.is_empty() {
            f.write_str("*")?;
        } else {
            write!(f, "{}", self.predicates.iter().join(" && "))?;
        }
        for filter in &self.filters {
            write!(f, " -> {filter}")?;
        }
        write!(f, " -> {};", self.backend)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_network_route() {
        let mut route = Route::new("kube_rg__default__shop__all__0_0".to_owned());
        route.push_predicate("Host", vec!["^(shop[.]example[.]org)$".into()]);
        route.push_predicate("Traffic", vec![0.25.into()]);
        route.filters.push(Filter::new("setPath", vec!["/say \"hi\"".into()]));
        route.backend = RouteBackend::Network { address: "http://10.0.0.5:80".to_owned() };

        assert_eq!(
            route.to_string(),
            r#"kube_rg__default__shop__all__0_0: Host("^(shop[.]example[.]org)$") && Traffic(0.25) -> setPath("/say \"hi\"") -> "http://10.0.0.5:80";"#
        );
    }

    #[test]
    fn renders_catch_all_and_lb_backends() {
        let route = Route::new("catchall".to_owned());
        assert_eq!(route.to_string(), "catchall: * -> <shunt>;");

        let route = Route {
            id: "lb".to_owned(),
            backend: RouteBackend::LoadBalanced {
                endpoints: vec!["http://10.0.0.1:8080".to_owned(), "http://10.0.0.2:8080".to_owned()],
                algorithm: Algorithm::Random,
            },
            ..Default::default()
        };
        assert_eq!(route.to_string(), r#"lb: * -> <random, "http://10.0.0.1:8080", "http://10.0.0.2:8080">;"#);
    }

    #[test]
    fn serializes_backend_tagged() {
        let route = Route {
            id: "r".to_owned(),
            predicates: vec![Predicate::new("Traffic", vec![0.5.into()])],
            backend: RouteBackend::Network { address: "http://a".to_owned() },
            ..Default::default()
        };
        let value = serde_json::to_value(&route).unwrap();
        assert_eq!(value["backend"]["type"], "network");
        assert_eq!(value["backend"]["address"], "http://a");
        assert_eq!(value["predicates"][0]["args"][0], 0.5);
    }
}
