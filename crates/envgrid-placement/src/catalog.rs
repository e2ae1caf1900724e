//! Capability catalogs.
//!
//! A catalog lists, per pool key, the concrete offerings a backend can
//! provision, ordered most preferred first:
//! - **Tiers** group entries by name pattern (preferred hardware classes first)
//! - **Cost** orders entries inside a tier (cheapest first)
//!
//! The planner consumes these lists as-is and never reorders or mutates them.

use std::collections::HashSet;

use regex::Regex;
use serde::{Deserialize, Serialize};

use envgrid_config::{CatalogConfig, PlannerConfig};
use envgrid_space::{NodeSpace, Platform};

use crate::error::{PlacementError, PlacementResult};

/// One concrete, costed offering within a pool key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub pool_key: String,
    /// SKU, machine type or host name.
    pub name: String,
    pub capability: NodeSpace,
    /// Ranking signal, lower is preferred. Not a price.
    pub cost: u64,
}

impl CatalogEntry {
    /// Entry ranked by the capability's own cost.
    pub fn new(pool_key: impl Into<String>, name: impl Into<String>, capability: NodeSpace) -> Self {
        let cost = capability.cost();
        Self {
            pool_key: pool_key.into(),
            name: name.into(),
            capability,
            cost,
        }
    }

    /// Required dimensions are all non-zero.
    pub fn is_complete(&self) -> bool {
        self.capability.missing_dimensions().is_empty()
    }
}

/// Read-only view of one backend's offerings.
///
/// Discovery (SKU scans, rack inventory, caching) happens behind this
/// trait. A source must be fully materialized before the planner runs.
pub trait CapabilitySource: Send + Sync {
    fn platform(&self) -> Platform;

    /// Pool keys in priority order.
    fn pool_keys(&self) -> Vec<String>;

    /// Candidates for one pool key, already tiered and cost-sorted.
    fn list_candidates(&self, pool_key: &str) -> Vec<CatalogEntry>;
}

/// Ordered name patterns deciding which hardware classes are tried first.
#[derive(Debug, Clone)]
pub struct TierPolicy {
    tiers: Vec<Regex>,
}

impl Default for TierPolicy {
    fn default() -> Self {
        Self {
            tiers: vec![Regex::new(".*").expect("match-all pattern compiles")],
        }
    }
}

impl TierPolicy {
    /// Compile tier patterns. Patterns are unanchored; use `^...$` for exact names.
    pub fn new<I, S>(patterns: I) -> PlacementResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let tiers = patterns
            .into_iter()
            .map(|pattern| {
                let pattern = pattern.as_ref();
                Regex::new(pattern).map_err(|source| PlacementError::InvalidTier {
                    pattern: pattern.to_string(),
                    source,
                })
            })
            .collect::<PlacementResult<Vec<_>>>()?;
        Ok(Self { tiers })
    }

    /// Tier, then cost-sort, a pool's entries.
    ///
    /// Each name lands in the first tier it matches. Ties on cost keep
    /// their input order. Entries matching no tier are dropped.
    pub fn rank(&self, entries: Vec<CatalogEntry>) -> Vec<CatalogEntry> {
        let mut seen: HashSet<String> = HashSet::new();
        let mut ranked = Vec::with_capacity(entries.len());

        for tier in &self.tiers {
            let mut level: Vec<CatalogEntry> = entries
                .iter()
                .filter(|entry| tier.is_match(&entry.name) && !seen.contains(&entry.name))
                .cloned()
                .collect();
            for entry in &level {
                seen.insert(entry.name.clone());
            }
            level.sort_by_key(|entry| entry.cost);
            ranked.extend(level);
        }

        ranked
    }
}

/// In-memory catalog for backends without live discovery.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    platform: Platform,
    pools: Vec<(String, Vec<CatalogEntry>)>,
}

impl StaticCatalog {
    pub fn new(platform: Platform) -> Self {
        Self {
            platform,
            pools: Vec::new(),
        }
    }

    /// Append a pool. Entries are used in the order given.
    pub fn with_pool(mut self, pool_key: impl Into<String>, entries: Vec<CatalogEntry>) -> Self {
        self.pools.push((pool_key.into(), entries));
        self
    }

    /// Build from configuration, ranking every pool by the planner's tiers.
    ///
    /// Pools follow `planner.pool_keys` when set, the catalog's order otherwise.
    pub fn from_config(planner: &PlannerConfig, catalog: &CatalogConfig) -> PlacementResult<Self> {
        let policy = TierPolicy::new(&planner.tiers)?;

        let mut pools: Vec<(String, Vec<CatalogEntry>)> = catalog
            .pools
            .iter()
            .map(|pool| {
                let entries = pool
                    .entries
                    .iter()
                    .map(|entry| CatalogEntry::new(&pool.key, &entry.name, entry.to_capability()))
                    .collect();
                (pool.key.clone(), policy.rank(entries))
            })
            .collect();

        if !planner.pool_keys.is_empty() {
            let mut ordered = Vec::with_capacity(planner.pool_keys.len());
            for key in &planner.pool_keys {
                let entries = pools
                    .iter()
                    .position(|(pool_key, _)| pool_key == key)
                    .map(|index| pools.remove(index).1)
                    .unwrap_or_default();
                ordered.push((key.clone(), entries));
            }
            pools = ordered;
        }

        Ok(Self {
            platform: planner.platform,
            pools,
        })
    }
}

impl CapabilitySource for StaticCatalog {
    fn platform(&self) -> Platform {
        self.platform
    }

    fn pool_keys(&self) -> Vec<String> {
        self.pools.iter().map(|(key, _)| key.clone()).collect()
    }

    fn list_candidates(&self, pool_key: &str) -> Vec<CatalogEntry> {
        self.pools
            .iter()
            .find(|(key, _)| key == pool_key)
            .map(|(_, entries)| entries.clone())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use envgrid_config::{EntryConfig, PoolConfig};
    use envgrid_space::CountValue;

    fn entry(name: &str, cores: u64) -> CatalogEntry {
        CatalogEntry::new("westus3", name, NodeSpace::offering(cores, 4096))
    }

    fn names(entries: &[CatalogEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.name.as_str()).collect()
    }

    fn entry_config(name: &str, cores: u64) -> EntryConfig {
        EntryConfig {
            name: name.to_string(),
            node_count: 1,
            core_count: cores,
            memory_mb: 4096,
            disk_count: 1,
            nic_count: 1,
            gpu_count: 0,
            features: Vec::new(),
            units: None,
        }
    }

    #[test]
    fn entry_cost_follows_capability() {
        let mut cap = NodeSpace::offering(4, 8192);
        cap.gpu_count = CountValue::Exact(1);
        assert_eq!(CatalogEntry::new("west", "gpu", cap).cost, 104);
    }

    #[test]
    fn incomplete_entry_is_detected() {
        let mut broken = entry("broken", 2);
        broken.capability.memory_mb = CountValue::Exact(0);
        assert!(!broken.is_complete());
        assert!(entry("fine", 2).is_complete());
    }

    #[test]
    fn default_policy_sorts_by_cost_only() {
        let ranked = TierPolicy::default().rank(vec![entry("big", 16), entry("small", 2), entry("mid", 8)]);
        assert_eq!(names(&ranked), vec!["small", "mid", "big"]);
    }

    #[test]
    fn tiers_take_precedence_over_cost() {
        let policy = TierPolicy::new([r"^Standard_DS[2-9]_v2$", r"^Standard_DS\d{2}_v2$", ".*"]).unwrap();
        let ranked = policy.rank(vec![
            entry("Standard_A1", 1),
            entry("Standard_DS12_v2", 4),
            entry("Standard_DS3_v2", 4),
            entry("Standard_DS2_v2", 2),
            entry("Standard_DS1_v2", 1),
        ]);
        assert_eq!(
            names(&ranked),
            vec![
                "Standard_DS2_v2",
                "Standard_DS3_v2",
                "Standard_DS12_v2",
                "Standard_A1",
                "Standard_DS1_v2",
            ]
        );
    }

    #[test]
    fn unmatched_entries_are_dropped_and_names_kept_once() {
        let policy = TierPolicy::new(["^gpu", "^gpu"]).unwrap();
        let ranked = policy.rank(vec![entry("gpu-a", 4), entry("cpu-a", 2)]);
        assert_eq!(names(&ranked), vec!["gpu-a"]);
    }

    #[test]
    fn equal_cost_keeps_input_order() {
        let ranked = TierPolicy::default().rank(vec![entry("b", 2), entry("a", 2)]);
        assert_eq!(names(&ranked), vec!["b", "a"]);
    }

    #[test]
    fn invalid_pattern_is_reported() {
        let err = TierPolicy::new(["(unclosed"]).unwrap_err();
        assert!(matches!(err, PlacementError::InvalidTier { .. }));
    }

    #[test]
    fn static_catalog_lists_by_key() {
        let catalog = StaticCatalog::new(Platform::Libvirt)
            .with_pool("host-a", vec![entry("small", 2)])
            .with_pool("host-b", Vec::new());

        assert_eq!(catalog.platform(), Platform::Libvirt);
        assert_eq!(catalog.pool_keys(), vec!["host-a", "host-b"]);
        assert_eq!(catalog.list_candidates("host-a").len(), 1);
        assert!(catalog.list_candidates("host-b").is_empty());
        assert!(catalog.list_candidates("missing").is_empty());
    }

    #[test]
    fn from_config_ranks_and_orders_pools() {
        let planner = PlannerConfig {
            pool_keys: vec!["eastus".to_string(), "westus3".to_string(), "northeurope".to_string()],
            ..PlannerConfig::default()
        };
        let catalog = CatalogConfig {
            pools: vec![
                PoolConfig {
                    key: "westus3".to_string(),
                    entries: vec![entry_config("large", 16), entry_config("small", 2)],
                },
                PoolConfig {
                    key: "eastus".to_string(),
                    entries: vec![entry_config("medium", 8)],
                },
            ],
        };

        let source = StaticCatalog::from_config(&planner, &catalog).unwrap();
        assert_eq!(source.pool_keys(), vec!["eastus", "westus3", "northeurope"]);
        assert_eq!(names(&source.list_candidates("westus3")), vec!["small", "large"]);
        assert!(source.list_candidates("northeurope").is_empty());
        assert_eq!(source.list_candidates("eastus")[0].pool_key, "eastus");
    }
}
