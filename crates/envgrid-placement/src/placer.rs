//! Placement planner: binds every node of one environment to a single pool key.
//!
//! Given expanded node requirements and a capability source, the planner:
//! 1. Rejects requirements pinned to different pool keys (no catalog scan)
//! 2. Resolves user-pinned entries by exact name, picking a tentative key
//! 3. Fills the remaining nodes greedily from that key's ranked candidates
//!
//! All nodes of an environment land on one pool key. Candidates are offering
//! classes, never consumed, so one entry may back several nodes. The scan
//! never backtracks: O(nodes × candidates) per key.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use envgrid_space::{Binding, NodeSpace, Platform, ResultReason};

use crate::catalog::{CapabilitySource, CatalogEntry};
use crate::error::{PlacementError, PlacementResult};

/// A fully concrete binding for one environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementPlan {
    pub pool_key: String,
    /// Realized nodes, in requirement order. Hints carry the binding.
    pub nodes: Vec<NodeSpace>,
    /// Catalog entry name per node.
    pub entries: Vec<String>,
    pub cost: u64,
}

impl PlacementPlan {
    /// `(pool_key, entry)` for each node.
    pub fn bindings(&self) -> Vec<(&str, &str)> {
        self.entries
            .iter()
            .map(|entry| (self.pool_key.as_str(), entry.as_str()))
            .collect()
    }

    /// Serialized form handed to the deployment layer.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[derive(Debug, Clone)]
struct BoundNode {
    node: NodeSpace,
    entry: String,
    cost: u64,
}

/// Compute a placement for `requirements` against `source`.
///
/// Requirements should already be expanded to one node each. The source is
/// only read. Identical inputs always produce the identical plan.
pub fn plan_placement(
    requirements: &[NodeSpace],
    source: &dyn CapabilitySource,
) -> PlacementResult<PlacementPlan> {
    let platform = source.platform();

    let keys = match pinned_pool_key(requirements, platform)? {
        Some(key) => vec![key.to_string()],
        None => source.pool_keys(),
    };

    let pinned_entries: Vec<(usize, &str)> = requirements
        .iter()
        .enumerate()
        .filter_map(|(index, requirement)| {
            requirement
                .pinning_for(platform)
                .entry
                .map(|entry| (index, entry))
        })
        .collect();

    // Most recent real mismatch; empty pools never overwrite one.
    let mut last_reason: Option<ResultReason> = None;

    // With pinned entries only the first key resolving all of them is tried.
    let tentative: Vec<(String, Vec<Option<BoundNode>>)> = if pinned_entries.is_empty() {
        keys.into_iter()
            .map(|key| (key, vec![None; requirements.len()]))
            .collect()
    } else {
        let mut resolved = None;
        for key in &keys {
            if let Some(bound) = resolve_pinned(
                key,
                &pinned_entries,
                requirements,
                source,
                platform,
                &mut last_reason,
            )? {
                resolved = Some((key.clone(), bound));
                break;
            }
        }
        match resolved {
            Some((key, bound)) => {
                let predefined_cost: u64 = bound.iter().flatten().map(|b| b.cost).sum();
                debug!(pool_key = %key, predefined_cost, "pinned entries resolved");
                vec![(key, bound)]
            }
            None => {
                let reason = last_reason.unwrap_or_else(|| ResultReason::failed("no pool key available"));
                warn!(%reason, "pinned entries could not be resolved");
                return Err(PlacementError::UnresolvedPin {
                    entries: pinned_entries.iter().map(|(_, name)| name.to_string()).collect(),
                    reason,
                });
            }
        }
    };

    for (key, prefilled) in tentative {
        if let Some(bound) = resolve_remaining(
            &key,
            prefilled,
            requirements,
            source,
            platform,
            &mut last_reason,
        )? {
            let plan = PlacementPlan {
                cost: bound.iter().map(|b| b.cost).sum(),
                entries: bound.iter().map(|b| b.entry.clone()).collect(),
                nodes: bound.into_iter().map(|b| b.node).collect(),
                pool_key: key,
            };
            info!(
                pool_key = %plan.pool_key,
                nodes = plan.nodes.len(),
                cost = plan.cost,
                "placement resolved"
            );
            return Ok(plan);
        }
    }

    let reason = last_reason.unwrap_or_else(|| ResultReason::failed("no pool key available"));
    warn!(%reason, "no pool key satisfies every node");
    Err(PlacementError::NoCapacity { reason })
}

/// The single pool key the requirements are pinned to, if any.
fn pinned_pool_key(requirements: &[NodeSpace], platform: Platform) -> PlacementResult<Option<&str>> {
    let mut pinned: Option<&str> = None;
    for requirement in requirements {
        let Some(key) = requirement.pinning_for(platform).pool_key else {
            continue;
        };
        match pinned {
            Some(first) if first != key => {
                warn!(first, second = key, "conflicting pool keys pinned");
                return Err(PlacementError::Conflict {
                    first: first.to_string(),
                    second: key.to_string(),
                });
            }
            _ => pinned = Some(key),
        }
    }
    Ok(pinned)
}

fn resolve_pinned(
    key: &str,
    pinned_entries: &[(usize, &str)],
    requirements: &[NodeSpace],
    source: &dyn CapabilitySource,
    platform: Platform,
    last_reason: &mut Option<ResultReason>,
) -> PlacementResult<Option<Vec<Option<BoundNode>>>> {
    let candidates = source.list_candidates(key);
    let mut bound = vec![None; requirements.len()];

    for &(index, name) in pinned_entries {
        let Some(candidate) = candidates.iter().find(|c| c.name == name) else {
            last_reason.get_or_insert_with(|| {
                prefixed(ResultReason::failed(format!("pinned entry '{name}' not found")), key)
            });
            return Ok(None);
        };
        ensure_complete(key, candidate)?;

        let check = requirements[index].check(&candidate.capability);
        if !check.success {
            *last_reason = Some(prefixed(check, &format!("{key}/{index}/{name}")));
            return Ok(None);
        }
        bound[index] = Some(bind(&requirements[index], key, candidate, platform)?);
    }

    Ok(Some(bound))
}

fn resolve_remaining(
    key: &str,
    mut slots: Vec<Option<BoundNode>>,
    requirements: &[NodeSpace],
    source: &dyn CapabilitySource,
    platform: Platform,
    last_reason: &mut Option<ResultReason>,
) -> PlacementResult<Option<Vec<BoundNode>>> {
    let candidates = source.list_candidates(key);
    if candidates.is_empty() && slots.iter().any(Option::is_none) {
        debug!(pool_key = key, "pool offers no candidates");
        last_reason.get_or_insert_with(|| prefixed(ResultReason::failed("no candidate available"), key));
        return Ok(None);
    }

    for (index, requirement) in requirements.iter().enumerate() {
        if slots[index].is_some() {
            continue;
        }

        let mut found = None;
        for candidate in &candidates {
            ensure_complete(key, candidate)?;

            let check = requirement.check(&candidate.capability);
            if check.success {
                found = Some(bind(requirement, key, candidate, platform)?);
                break;
            }
            debug!(
                pool_key = key,
                node = index,
                entry = %candidate.name,
                reason = %check,
                "candidate rejected"
            );
            *last_reason = Some(prefixed(check, &format!("{key}/{index}/{}", candidate.name)));
        }

        match found {
            Some(bound) => slots[index] = Some(bound),
            None => {
                debug!(pool_key = key, node = index, "node unresolved, abandoning pool key");
                return Ok(None);
            }
        }
    }

    Ok(slots.into_iter().collect())
}

fn ensure_complete(key: &str, candidate: &CatalogEntry) -> PlacementResult<()> {
    let missing = candidate.capability.missing_dimensions();
    if missing.is_empty() {
        return Ok(());
    }
    Err(PlacementError::MalformedCapability {
        pool_key: key.to_string(),
        entry: candidate.name.clone(),
        missing: missing.join(", "),
    })
}

fn bind(
    requirement: &NodeSpace,
    key: &str,
    candidate: &CatalogEntry,
    platform: Platform,
) -> PlacementResult<BoundNode> {
    let realized = requirement.generate_min_capability(&candidate.capability)?;
    let binding = Binding {
        platform,
        pool_key: key.to_string(),
        entry: candidate.name.clone(),
        nic_count: realized.nic_count.min_value(),
    };
    Ok(BoundNode {
        node: realized.with_binding(&binding),
        entry: candidate.name.clone(),
        cost: candidate.cost,
    })
}

fn prefixed(sub: ResultReason, prefix: &str) -> ResultReason {
    let mut result = ResultReason::new().with_prefix(prefix);
    result.merge(sub, "");
    result
}
