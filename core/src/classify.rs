//! Threshold classification of readings into named states.

use serde::{de::DeserializeOwned, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt::{Debug, Display};

/// Numeric type usable as a threshold.
///
/// Implemented for `i64` (percentages, degrees) and `f64` (watts).
pub trait Threshold:
    Copy + PartialOrd + Display + Debug + From<i32> + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Convert a JSON number from the `states` object.
    ///
    /// Returns `None` for anything that is not a number.
    fn from_json(value: &serde_json::Value) -> Option<Self>;

    /// Parse a scalar configuration value.
    fn parse_str(s: &str) -> Option<Self>;
}

impl Threshold for i64 {
    fn from_json(value: &serde_json::Value) -> Option<Self> {
        // Fractional thresholds are truncated toward zero.
        value
            .as_i64()
            .or_else(|| value.as_f64().map(|v| v as i64))
    }

    fn parse_str(s: &str) -> Option<Self> {
        s.trim().parse().ok()
    }
}

impl Threshold for f64 {
    fn from_json(value: &serde_json::Value) -> Option<Self> {
        value.as_f64()
    }

    fn parse_str(s: &str) -> Option<Self> {
        s.trim().parse().ok()
    }
}

/// Which way a reading gets worse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    /// Higher readings are worse (load, temperature); matches `value >= t`.
    #[default]
    AscendingIsWorse,
    /// Lower readings are worse (signal quality); matches `value <= t`.
    DescendingIsWorse,
}

/// Resolve the state whose threshold `value` satisfies most extremely.
///
/// With [`Direction::AscendingIsWorse`] this is the state with the highest
/// threshold not above `value`; with [`Direction::DescendingIsWorse`] the
/// state with the lowest threshold not below it. Equal thresholds keep the
/// map's key order. Returns `None` when nothing matches.
///
/// # Examples
///
/// ```rust
/// use std::collections::BTreeMap;
/// use waygauge_core::classify::{classify, Direction};
///
/// let states = BTreeMap::from([("warning".to_owned(), 20_i64), ("critical".to_owned(), 50)]);
/// assert_eq!(classify(55, &states, Direction::AscendingIsWorse), Some("critical"));
/// assert_eq!(classify(10, &states, Direction::AscendingIsWorse), None);
/// ```
#[must_use]
pub fn classify<T: Threshold>(
    value: T,
    thresholds: &BTreeMap<String, T>,
    direction: Direction,
) -> Option<&str> {
    let mut sorted: Vec<(&str, T)> = thresholds
        .iter()
        .map(|(name, threshold)| (name.as_str(), *threshold))
        .collect();

    match direction {
        Direction::AscendingIsWorse => sorted.sort_by(|a, b| compare(&b.1, &a.1)),
        Direction::DescendingIsWorse => sorted.sort_by(|a, b| compare(&a.1, &b.1)),
    }

    sorted
        .into_iter()
        .find(|(_, threshold)| match direction {
            Direction::AscendingIsWorse => value >= *threshold,
            Direction::DescendingIsWorse => value <= *threshold,
        })
        .map(|(name, _)| name)
}

fn compare<T: Threshold>(a: &T, b: &T) -> Ordering {
    a.partial_cmp(b).unwrap_or(Ordering::Equal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn states<T: Copy>(pairs: &[(&str, T)]) -> BTreeMap<String, T> {
        pairs
            .iter()
            .map(|(name, value)| ((*name).to_owned(), *value))
            .collect()
    }

    #[test]
    fn test_ascending_picks_most_extreme() {
        let thresholds = states(&[("warning", 20_i64), ("critical", 50)]);
        assert_eq!(
            classify(55, &thresholds, Direction::AscendingIsWorse),
            Some("critical")
        );
        assert_eq!(
            classify(50, &thresholds, Direction::AscendingIsWorse),
            Some("critical")
        );
        assert_eq!(
            classify(30, &thresholds, Direction::AscendingIsWorse),
            Some("warning")
        );
        assert_eq!(classify(10, &thresholds, Direction::AscendingIsWorse), None);
    }

    #[test]
    fn test_descending_for_signal_quality() {
        let thresholds = states(&[
            ("wireless-1", 20_i64),
            ("wireless-2", 40),
            ("wireless-3", 60),
            ("wireless-4", 80),
            ("wireless-5", 100),
        ]);
        assert_eq!(
            classify(15, &thresholds, Direction::DescendingIsWorse),
            Some("wireless-1")
        );
        assert_eq!(
            classify(41, &thresholds, Direction::DescendingIsWorse),
            Some("wireless-3")
        );
        assert_eq!(
            classify(100, &thresholds, Direction::DescendingIsWorse),
            Some("wireless-5")
        );
        assert_eq!(classify(101, &thresholds, Direction::DescendingIsWorse), None);
    }

    #[test]
    fn test_float_thresholds() {
        let thresholds = states(&[("warning", 15.0), ("critical", 30.0)]);
        assert_eq!(
            classify(15.0, &thresholds, Direction::AscendingIsWorse),
            Some("warning")
        );
        assert_eq!(
            classify(29.99, &thresholds, Direction::AscendingIsWorse),
            Some("warning")
        );
        assert_eq!(classify(f64::NAN, &thresholds, Direction::AscendingIsWorse), None);
    }

    #[test]
    fn test_ties_are_deterministic() {
        let thresholds = states(&[("beta", 10_i64), ("alpha", 10)]);
        assert_eq!(
            classify(10, &thresholds, Direction::AscendingIsWorse),
            Some("alpha")
        );
        assert_eq!(
            classify(10, &thresholds, Direction::DescendingIsWorse),
            Some("alpha")
        );
    }

    #[test]
    fn test_empty_map() {
        let thresholds: BTreeMap<String, i64> = BTreeMap::new();
        assert_eq!(classify(99, &thresholds, Direction::AscendingIsWorse), None);
    }

    #[test]
    fn test_threshold_from_json() {
        assert_eq!(i64::from_json(&serde_json::json!(42)), Some(42));
        assert_eq!(i64::from_json(&serde_json::json!(42.9)), Some(42));
        assert_eq!(i64::from_json(&serde_json::json!("42")), None);
        assert_eq!(f64::from_json(&serde_json::json!(7)), Some(7.0));
        assert_eq!(f64::from_json(&serde_json::json!(null)), None);
    }

    proptest! {
        #[test]
        fn prop_ascending_returns_highest_satisfied(
            raw in proptest::collection::btree_map("[a-z]{1,6}", -100i64..100, 0..8),
            value in -150i64..150,
        ) {
            let got = classify(value, &raw, Direction::AscendingIsWorse);
            let best = raw.values().copied().filter(|t| value >= *t).max();
            match (got, best) {
                (None, None) => {}
                (Some(name), Some(best)) => prop_assert_eq!(raw[name], best),
                other => prop_assert!(false, "mismatch: {:?}", other),
            }
        }

        #[test]
        fn prop_descending_returns_lowest_satisfied(
            raw in proptest::collection::btree_map("[a-z]{1,6}", -100i64..100, 0..8),
            value in -150i64..150,
        ) {
            let got = classify(value, &raw, Direction::DescendingIsWorse);
            let best = raw.values().copied().filter(|t| value <= *t).min();
            match (got, best) {
                (None, None) => {}
                (Some(name), Some(best)) => prop_assert_eq!(raw[name], best),
                other => prop_assert!(false, "mismatch: {:?}", other),
            }
        }
    }
}
