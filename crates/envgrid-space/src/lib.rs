//! envgrid-space: the requirement algebra.
//!
//! Describes what an environment needs and what a backend offers, using
//! the same types on both sides, and decides whether one satisfies the
//! other.
//!
//! # Components
//!
//! - **`count`**: exact values and ranges, check and realization rules
//! - **`features`**: allow / deny feature sets
//! - **`reason`**: structured mismatch diagnostics
//! - **`node`**: `NodeSpace`, the per-node matcher
//! - **`environment`**: `EnvironmentSpace`, ordered node requirements
//! - **`hints`**: per-backend side table (location, SKU, host, ...)
//!
//! Nothing here performs I/O; every operation is synchronous and
//! deterministic.

pub mod count;
pub mod environment;
pub mod error;
pub mod features;
pub mod hints;
pub mod node;
pub mod reason;

pub use count::{CountValue, check_count, realize_range, realize_unit_count};
pub use environment::{EnvironmentSpace, Topology};
pub use error::{SpaceError, SpaceResult};
pub use features::{Allow, Deny, FeatureSet, check_allow, check_deny};
pub use hints::{AzureHints, BareMetalHints, Binding, LibvirtHints, Pinning, Platform, PlatformHints};
pub use node::{MAX_NODE_COUNT, NodeSpace};
pub use reason::ResultReason;
