//! A single test environment and its lifecycle.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use envgrid_placement::PlacementPlan;
use envgrid_space::EnvironmentSpace;

/// Ids are unique across every pool in the process.
static NEXT_ID: AtomicU64 = AtomicU64::new(0);

fn next_id() -> u64 {
    NEXT_ID.fetch_add(1, Ordering::Relaxed)
}

/// Lifecycle of an environment.
///
/// ```text
/// New ──► Prepared ──► Deployed ──► Connected ──► Deleted
///  │          │            │             │
///  └──────────┴────────────┴─────────────┴──────► Bad
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvironmentStatus {
    /// Requirement known, nothing bound yet.
    New,
    /// Bound to concrete catalog entries.
    Prepared,
    Deployed,
    Connected,
    Deleted,
    /// Unusable after a failure.
    Bad,
}

impl EnvironmentStatus {
    pub fn is_alive(self) -> bool {
        !matches!(self, EnvironmentStatus::Deleted | EnvironmentStatus::Bad)
    }
}

impl fmt::Display for EnvironmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EnvironmentStatus::New => "new",
            EnvironmentStatus::Prepared => "prepared",
            EnvironmentStatus::Deployed => "deployed",
            EnvironmentStatus::Connected => "connected",
            EnvironmentStatus::Deleted => "deleted",
            EnvironmentStatus::Bad => "bad",
        };
        f.write_str(name)
    }
}

/// One environment: a requirement, and once prepared, its binding.
#[derive(Debug, Clone)]
pub struct Environment {
    pub id: u64,
    pub name: String,
    /// Declared up front rather than generated from a test's requirement.
    pub is_predefined: bool,
    requirement: EnvironmentSpace,
    status: EnvironmentStatus,
    cost: u64,
    pub is_in_use: bool,
    plan: Option<PlacementPlan>,
}

impl Environment {
    /// A new environment. Without a name it is called `generated_{id}`.
    pub fn new(name: Option<String>, requirement: EnvironmentSpace, is_predefined: bool) -> Self {
        let id = next_id();
        Self {
            id,
            name: name.unwrap_or_else(|| format!("generated_{id}")),
            is_predefined,
            requirement,
            status: EnvironmentStatus::New,
            cost: 0,
            is_in_use: false,
            plan: None,
        }
    }

    pub fn requirement(&self) -> &EnvironmentSpace {
        &self.requirement
    }

    pub fn status(&self) -> EnvironmentStatus {
        self.status
    }

    pub fn set_status(&mut self, status: EnvironmentStatus) {
        self.status = status;
    }

    pub fn cost(&self) -> u64 {
        self.cost
    }

    /// The placement applied by the last successful prepare.
    pub fn plan(&self) -> Option<&PlacementPlan> {
        self.plan.as_ref()
    }

    /// What this environment can host.
    ///
    /// Before deployment that is the requirement itself; afterwards no
    /// unbound slots remain to offer.
    pub fn capability(&self) -> EnvironmentSpace {
        match self.status {
            EnvironmentStatus::New | EnvironmentStatus::Prepared => self.requirement.clone(),
            _ => self.requirement.with_realized_nodes(Vec::new()),
        }
    }

    /// Replace the requirement with the plan's concrete nodes.
    pub fn apply_plan(&mut self, plan: PlacementPlan) {
        self.requirement = self.requirement.with_realized_nodes(plan.nodes.clone());
        self.cost = plan.cost;
        self.status = EnvironmentStatus::Prepared;
        self.plan = Some(plan);
    }
}
