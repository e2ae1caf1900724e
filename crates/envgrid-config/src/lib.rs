pub mod config;

pub use config::{CatalogConfig, EntryConfig, EnvironmentConfig, GridConfig, PlannerConfig, PoolConfig};
