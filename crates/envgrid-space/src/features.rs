//! Named feature sets with a fixed polarity.
//!
//! `features` on a requirement is an allow set: every named feature must be
//! offered. `excluded_features` is a deny set: none of them may be offered.
//! The polarity is part of the type, so passing a deny set where an allow
//! set is expected does not compile.

use std::collections::BTreeSet;
use std::fmt;
use std::marker::PhantomData;

use serde::{Deserialize, Serialize};

use crate::reason::ResultReason;

/// Marker for sets whose items must all be present in the capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Allow;

/// Marker for sets whose items must all be absent from the capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Deny;

/// A sorted set of feature names tagged with its polarity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent, bound = "")]
pub struct FeatureSet<P> {
    items: BTreeSet<String>,
    #[serde(skip)]
    polarity: PhantomData<P>,
}

impl<P> Default for FeatureSet<P> {
    fn default() -> Self {
        Self {
            items: BTreeSet::new(),
            polarity: PhantomData,
        }
    }
}

impl<P> FeatureSet<P> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, feature: impl Into<String>) -> bool {
        self.items.insert(feature.into())
    }

    pub fn contains(&self, feature: &str) -> bool {
        self.items.contains(feature)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<P, S: Into<String>> FromIterator<S> for FeatureSet<P> {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().map(Into::into).collect(),
            polarity: PhantomData,
        }
    }
}

impl<P> fmt::Display for FeatureSet<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let items: Vec<&str> = self.iter().collect();
        write!(f, "[{}]", items.join(","))
    }
}

/// Every requested feature must be offered. One reason per missing feature.
pub fn check_allow(requirement: &FeatureSet<Allow>, capability: &FeatureSet<Allow>) -> ResultReason {
    let mut result = ResultReason::new();
    for feature in requirement.iter() {
        if !capability.contains(feature) {
            result.add_reason(format!("no feature '{feature}' found in capability"), "");
        }
    }
    result
}

/// None of the excluded features may be offered.
pub fn check_deny(excluded: &FeatureSet<Deny>, capability: &FeatureSet<Allow>) -> ResultReason {
    let mut result = ResultReason::new();
    let found: Vec<&str> = excluded
        .iter()
        .filter(|feature| capability.contains(feature))
        .collect();
    if !found.is_empty() {
        result.add_reason(
            format!("excluded feature(s) [{}] found in capability", found.join(",")),
            "",
        );
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allow(items: &[&str]) -> FeatureSet<Allow> {
        items.iter().copied().collect()
    }

    fn deny(items: &[&str]) -> FeatureSet<Deny> {
        items.iter().copied().collect()
    }

    #[test]
    fn allow_subset_passes() {
        let cap = allow(&["gpu", "nvme", "sriov"]);
        assert!(check_allow(&allow(&["nvme", "gpu"]), &cap).success);
        assert!(check_allow(&allow(&[]), &cap).success);
    }

    #[test]
    fn allow_reports_each_missing_feature() {
        let result = check_allow(&allow(&["gpu", "infiniband", "nvme"]), &allow(&["nvme"]));
        assert!(!result.success);
        assert_eq!(result.reasons.len(), 2);
        assert!(result.reasons[0].contains("'gpu'"));
        assert!(result.reasons[1].contains("'infiniband'"));
    }

    #[test]
    fn deny_fails_on_intersection() {
        let result = check_deny(&deny(&["gpu", "hibernation"]), &allow(&["gpu", "nvme"]));
        assert!(!result.success);
        assert!(result.reasons[0].contains("[gpu]"));
    }

    #[test]
    fn deny_passes_on_disjoint_sets() {
        assert!(check_deny(&deny(&["gpu"]), &allow(&["nvme"])).success);
        assert!(check_deny(&deny(&["gpu"]), &allow(&[])).success);
    }

    #[test]
    fn serializes_as_plain_list() {
        let set = allow(&["sriov", "gpu"]);
        assert_eq!(serde_json::to_string(&set).unwrap(), r#"["gpu","sriov"]"#);

        let parsed: FeatureSet<Deny> = serde_json::from_str(r#"["gpu"]"#).unwrap();
        assert!(parsed.contains("gpu"));
    }

    #[test]
    fn display_lists_items_in_order() {
        assert_eq!(allow(&["b", "a"]).to_string(), "[a,b]");
    }
}
