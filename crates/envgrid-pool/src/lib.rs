//! envgrid-pool: environment lifecycle and placement glue.
//!
//! # Architecture
//!
//! ```text
//!   EnvironmentSpace ──► EnvironmentPool::get_or_create ──► Environment (New)
//!                                                              │
//!   Arc<CapabilitySource> ──► PlacementDriver::prepare ◄───────┘
//!                                   │
//!                                   ▼
//!                   Environment (Prepared, concrete nodes, cost)
//! ```
//!
//! Deployment, connection and teardown of the prepared environments are
//! left to the backend that owns the catalog.

pub mod driver;
pub mod environment;
pub mod error;
pub mod pool;

pub use driver::{PlacementDriver, Prepared};
pub use environment::{Environment, EnvironmentStatus};
pub use error::{PoolError, PoolResult};
pub use pool::EnvironmentPool;
