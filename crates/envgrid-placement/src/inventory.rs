//! Finite-inventory wrapper around a capability source.
//!
//! The planner treats entries as offering classes with unlimited supply.
//! Backends with countable hardware (a lab rack of identical machines)
//! wrap their source here: exhausted entries disappear from the candidate
//! lists, and a successful plan is reserved against the remaining units.
//!
//! Reservation happens after planning, so a plan binding one entry more
//! times than it has units is rejected by [`InventorySource::reserve`]
//! rather than avoided by the planner.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, info};

use envgrid_config::CatalogConfig;
use envgrid_space::Platform;

use crate::catalog::{CapabilitySource, CatalogEntry};
use crate::error::{PlacementError, PlacementResult};
use crate::placer::PlacementPlan;

type UnitKey = (String, String);

/// Configured and unreserved units of one entry.
#[derive(Debug, Clone, Copy)]
struct Units {
    capacity: u64,
    left: u64,
}

impl Units {
    fn new(capacity: u64) -> Self {
        Self {
            capacity,
            left: capacity,
        }
    }

    fn reserved(&self) -> u64 {
        self.capacity - self.left
    }
}

/// A [`CapabilitySource`] whose entries may run out.
///
/// Entries without a configured unit count stay unlimited.
pub struct InventorySource<S> {
    inner: S,
    units: Mutex<HashMap<UnitKey, Units>>,
}

impl<S: CapabilitySource> InventorySource<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            units: Mutex::new(HashMap::new()),
        }
    }

    /// Limit one entry to `units` instances.
    pub fn with_units(self, pool_key: impl Into<String>, entry: impl Into<String>, units: u64) -> Self {
        self.lock()
            .insert((pool_key.into(), entry.into()), Units::new(units));
        self
    }

    /// Take unit counts from every catalog entry that declares one.
    pub fn from_config(inner: S, catalog: &CatalogConfig) -> Self {
        let units = catalog
            .pools
            .iter()
            .flat_map(|pool| {
                pool.entries.iter().filter_map(|entry| {
                    entry
                        .units
                        .map(|units| ((pool.key.clone(), entry.name.clone()), Units::new(units)))
                })
            })
            .collect();
        Self {
            inner,
            units: Mutex::new(units),
        }
    }

    /// Units left for an entry. `None` means unlimited.
    pub fn remaining(&self, pool_key: &str, entry: &str) -> Option<u64> {
        self.lock()
            .get(&(pool_key.to_string(), entry.to_string()))
            .map(|units| units.left)
    }

    /// Take the units a plan uses. Nothing is taken unless all of them fit.
    pub fn reserve(&self, plan: &PlacementPlan) -> PlacementResult<()> {
        let mut units = self.lock();
        let demand = demand(plan);

        for (key, needed) in &demand {
            if let Some(entry) = units.get(key) {
                if entry.left < *needed {
                    return Err(PlacementError::Inventory(format!(
                        "entry '{}' in pool '{}' has {} unit(s) left, plan needs {needed}",
                        key.1, key.0, entry.left
                    )));
                }
            }
        }

        for (key, needed) in demand {
            if let Some(entry) = units.get_mut(&key) {
                entry.left -= needed;
                debug!(pool_key = %key.0, entry = %key.1, remaining = entry.left, "units reserved");
            }
        }
        info!(pool_key = %plan.pool_key, nodes = plan.nodes.len(), "plan reserved");
        Ok(())
    }

    /// Give back the units a reserved plan used.
    ///
    /// Releasing more units than are reserved is an error and changes
    /// nothing, so the remaining count never exceeds the configured one.
    pub fn release(&self, plan: &PlacementPlan) -> PlacementResult<()> {
        let mut units = self.lock();
        let demand = demand(plan);

        for (key, count) in &demand {
            if let Some(entry) = units.get(key) {
                if entry.reserved() < *count {
                    return Err(PlacementError::Inventory(format!(
                        "entry '{}' in pool '{}' has {} unit(s) reserved, cannot release {count}",
                        key.1,
                        key.0,
                        entry.reserved()
                    )));
                }
            }
        }

        for (key, count) in demand {
            if let Some(entry) = units.get_mut(&key) {
                entry.left += count;
            }
        }
        info!(pool_key = %plan.pool_key, "plan released");
        Ok(())
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<UnitKey, Units>> {
        self.units.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn demand(plan: &PlacementPlan) -> HashMap<UnitKey, u64> {
    let mut demand = HashMap::new();
    for entry in &plan.entries {
        *demand
            .entry((plan.pool_key.clone(), entry.clone()))
            .or_insert(0) += 1;
    }
    demand
}

impl<S: CapabilitySource> CapabilitySource for InventorySource<S> {
    fn platform(&self) -> Platform {
        self.inner.platform()
    }

    fn pool_keys(&self) -> Vec<String> {
        self.inner.pool_keys()
    }

    fn list_candidates(&self, pool_key: &str) -> Vec<CatalogEntry> {
        let units = self.lock();
        self.inner
            .list_candidates(pool_key)
            .into_iter()
            .filter(|entry| {
                units
                    .get(&(pool_key.to_string(), entry.name.clone()))
                    .is_none_or(|units| units.left > 0)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::StaticCatalog;
    use crate::placer::plan_placement;
    use envgrid_config::{EntryConfig, PoolConfig};
    use envgrid_space::{CountValue, NodeSpace};

    fn rack() -> StaticCatalog {
        StaticCatalog::new(Platform::BareMetal).with_pool(
            "rack-1",
            vec![
                CatalogEntry::new("rack-1", "small", NodeSpace::offering(4, 8192)),
                CatalogEntry::new("rack-1", "large", NodeSpace::offering(32, 131072)),
            ],
        )
    }

    fn node() -> NodeSpace {
        NodeSpace {
            node_count: CountValue::Exact(1),
            ..NodeSpace::default()
        }
    }

    #[test]
    fn test_exhausted_entry_is_hidden() {
        let source = InventorySource::new(rack()).with_units("rack-1", "small", 1);

        let first = plan_placement(&[node()], &source).unwrap();
        assert_eq!(first.entries, vec!["small"]);
        source.reserve(&first).unwrap();
        assert_eq!(source.remaining("rack-1", "small"), Some(0));

        let second = plan_placement(&[node()], &source).unwrap();
        assert_eq!(second.entries, vec!["large"]);
        assert_eq!(source.remaining("rack-1", "large"), None);
    }

    #[test]
    fn test_reserve_is_all_or_nothing() {
        let source = InventorySource::new(rack()).with_units("rack-1", "small", 1);

        let plan = plan_placement(&[node(), node()], &source).unwrap();
        assert_eq!(plan.entries, vec!["small", "small"]);

        let err = source.reserve(&plan).unwrap_err();
        assert!(matches!(err, PlacementError::Inventory(_)));
        assert_eq!(source.remaining("rack-1", "small"), Some(1));
    }

    #[test]
    fn test_release_restores_units() {
        let source = InventorySource::new(rack()).with_units("rack-1", "small", 2);

        let plan = plan_placement(&[node(), node()], &source).unwrap();
        source.reserve(&plan).unwrap();
        assert!(source.list_candidates("rack-1").iter().all(|e| e.name != "small"));

        source.release(&plan).unwrap();
        assert_eq!(source.remaining("rack-1", "small"), Some(2));
        assert_eq!(source.list_candidates("rack-1").len(), 2);
    }

    #[test]
    fn test_release_never_exceeds_capacity() {
        let source = InventorySource::new(rack()).with_units("rack-1", "small", 1);
        let plan = plan_placement(&[node()], &source).unwrap();

        let err = source.release(&plan).unwrap_err();
        assert!(matches!(err, PlacementError::Inventory(_)));
        assert_eq!(source.remaining("rack-1", "small"), Some(1));

        source.reserve(&plan).unwrap();
        source.release(&plan).unwrap();
        assert!(source.release(&plan).is_err());
        assert_eq!(source.remaining("rack-1", "small"), Some(1));
    }

    #[test]
    fn test_rejected_plan_cannot_be_released() {
        let source = InventorySource::new(rack()).with_units("rack-1", "small", 1);
        let plan = plan_placement(&[node(), node()], &source).unwrap();

        assert!(source.reserve(&plan).is_err());
        assert!(source.release(&plan).is_err());
        assert_eq!(source.remaining("rack-1", "small"), Some(1));
    }

    #[test]
    fn test_from_config_reads_units() {
        let catalog = CatalogConfig {
            pools: vec![PoolConfig {
                key: "rack-1".to_string(),
                entries: vec![
                    EntryConfig {
                        name: "small".to_string(),
                        node_count: 1,
                        core_count: 4,
                        memory_mb: 8192,
                        disk_count: 1,
                        nic_count: 1,
                        gpu_count: 0,
                        features: Vec::new(),
                        units: Some(3),
                    },
                    EntryConfig {
                        name: "large".to_string(),
                        node_count: 1,
                        core_count: 32,
                        memory_mb: 131072,
                        disk_count: 1,
                        nic_count: 1,
                        gpu_count: 0,
                        features: Vec::new(),
                        units: None,
                    },
                ],
            }],
        };

        let source = InventorySource::from_config(rack(), &catalog);
        assert_eq!(source.remaining("rack-1", "small"), Some(3));
        assert_eq!(source.remaining("rack-1", "large"), None);
        assert_eq!(source.inner().platform(), Platform::BareMetal);
    }
}
