use std::collections::HashMap;

use tracing::debug;

use crate::common::BackendReference;

/// Weighted split of the traffic between the backends of a set.
///
/// Backends are tried in order: each one is selected with a conditional probability, given that all
/// the previous ones were skipped. The backend taking whatever traffic is left gets no fraction,
/// so its route carries no `Traffic` predicate.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TrafficSplit {
    fractions: HashMap<String, Option<f64>>,
}

impl TrafficSplit {
    /// The backend using up the weights gets no fraction. Zero-weight backends after it get a zero
    /// fraction, except the last one which gets none. None of them is ever reached.
    #[allow(clippy::cast_precision_loss)]
    pub fn new<'b>(backends: impl IntoIterator<Item = &'b BackendReference>) -> Self {
        let backends: Vec<&BackendReference> = backends.into_iter().collect();
        if backends.iter().any(|b| b.weight < 0) {
            debug!("Negative backend weights are not supported {backends:?}");
        }

        let sum: i64 = backends.iter().map(|b| i64::from(b.weight)).sum();
        let weights: Vec<i64> = if sum == 0 {
            vec![1; backends.len()]
        } else {
            backends.iter().map(|b| i64::from(b.weight)).collect()
        };

        let mut remaining: i64 = weights.iter().sum();
        let last = backends.len().saturating_sub(1);
        let mut fractions = HashMap::new();
        for (index, (backend, weight)) in backends.iter().zip(weights).enumerate() {
            let fraction = if index == last || remaining - weight == 0 {
                None
            } else {
                let fraction = weight as f64 / remaining as f64;
                remaining -= weight;
                Some(fraction)
            };
            fractions.insert(backend.backend_name.clone(), fraction);
        }

        Self { fractions }
    }

    /// Argument of the `Traffic` predicate for the backend, `None` when no predicate is needed.
    pub fn fraction(&self, backend_name: &str) -> Option<f64> {
        self.fractions.get(backend_name).copied().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backends(weights: &[(&str, i32)]) -> Vec<BackendReference> {
        weights.iter().map(|(name, weight)| BackendReference { backend_name: (*name).to_owned(), weight: *weight }).collect()
    }

    #[test]
    fn all_zero_weights_split_uniformly() {
        let split = TrafficSplit::new(&backends(&[("a", 0), ("b", 0)]));
        assert_eq!(split.fraction("a"), Some(0.5));
        assert_eq!(split.fraction("b"), None);

        let split = TrafficSplit::new(&backends(&[("a", 0), ("b", 0), ("c", 0), ("d", 0)]));
        assert_eq!(split.fraction("a"), Some(0.25));
        assert_eq!(split.fraction("b"), Some(1.0 / 3.0));
        assert_eq!(split.fraction("c"), Some(0.5));
        assert_eq!(split.fraction("d"), None);
    }

    #[test]
    fn weights_split_proportionally() {
        let split = TrafficSplit::new(&backends(&[("a", 3), ("b", 1)]));
        assert_eq!(split.fraction("a"), Some(0.75));
        assert_eq!(split.fraction("b"), None);
    }

    #[test]
    fn single_backend_takes_everything() {
        let split = TrafficSplit::new(&backends(&[("a", 10)]));
        assert_eq!(split.fraction("a"), None);
        assert_eq!(TrafficSplit::new(&[]), TrafficSplit::default());
    }

    #[test]
    fn zero_weight_is_never_chosen() {
        let split = TrafficSplit::new(&backends(&[("a", 0), ("b", 3), ("c", 1)]));
        assert_eq!(split.fraction("a"), Some(0.0));
        assert_eq!(split.fraction("b"), Some(0.75));
        assert_eq!(split.fraction("c"), None);
    }

    #[test]
    fn exhausted_weight_needs_no_predicate() {
        let split = TrafficSplit::new(&backends(&[("a", 2), ("b", 2), ("c", 0)]));
        assert_eq!(split.fraction("a"), Some(0.5));
        assert_eq!(split.fraction("b"), None);
        assert_eq!(split.fraction("c"), None);
    }

    #[test]
    fn zero_weights_after_exhaustion() {
        let split = TrafficSplit::new(&backends(&[("a", 2), ("b", 2), ("c", 0), ("d", 0)]));
        assert_eq!(split.fraction("a"), Some(0.5));
        assert_eq!(split.fraction("b"), None);
        assert_eq!(split.fraction("c"), Some(0.0));
        assert_eq!(split.fraction("d"), None);
    }

    #[test]
    #[allow(clippy::cast_precision_loss)]
    fn chained_fractions_reproduce_weights() {
        for weights in [vec![1, 2, 3, 4], vec![5, 0, 7], vec![10, 1, 1, 1, 30], vec![2, 2]] {
            let names: Vec<String> = (0..weights.len()).map(|i| format!("b{i}")).collect();
            let refs: Vec<_> = names.iter().zip(&weights).map(|(n, w)| BackendReference { backend_name: n.clone(), weight: *w }).collect();
            let split = TrafficSplit::new(&refs);
            let sum: i32 = weights.iter().sum();

            let mut reached = 1.0;
            for (name, weight) in names.iter().zip(&weights) {
                let p = split.fraction(name).unwrap_or(1.0);
                let selected = reached * p;
                assert!((selected - f64::from(*weight) / f64::from(sum)).abs() < 1e-9, "{weights:?} {name}");
                reached -= selected;
            }
        }
    }
}
