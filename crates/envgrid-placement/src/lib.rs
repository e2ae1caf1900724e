//! envgrid-placement: binds environments to backend catalogs.
//!
//! # Architecture
//!
//! ```text
//!   EnvironmentSpace ──► expanded NodeSpaces
//!                              │
//!                              ▼
//!   CapabilitySource ──► plan_placement ──► PlacementPlan
//!   (tiered, cost-sorted      │               (pool key, concrete nodes,
//!    entries per pool key)    │                entry names, cost)
//!                              ▼
//!                   Conflict / UnresolvedPin / NoCapacity
//! ```
//!
//! # Components
//!
//! - **`catalog`**: catalog entries, the `CapabilitySource` seam, tier ranking
//! - **`placer`**: the co-located greedy planner
//! - **`inventory`**: finite unit counts layered over any source
//! - **`error`**: placement failure taxonomy

pub mod catalog;
pub mod error;
pub mod inventory;
pub mod placer;

pub use catalog::{CapabilitySource, CatalogEntry, StaticCatalog, TierPolicy};
pub use error::{PlacementError, PlacementResult};
pub use inventory::InventorySource;
pub use placer::{PlacementPlan, plan_placement};
