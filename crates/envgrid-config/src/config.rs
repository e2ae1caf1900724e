//! envgrid.toml configuration parser.
//!
//! One file can carry the planner policy, a static catalog for backends
//! without live discovery (local hypervisors, lab racks), and the
//! environment requirements to place.

use std::path::Path;

use serde::{Deserialize, Serialize};

use envgrid_space::{
    CountValue, EnvironmentSpace, FeatureSet, NodeSpace, Platform, SpaceResult, Topology,
};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub planner: PlannerConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catalog: Option<CatalogConfig>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub environments: Vec<EnvironmentConfig>,
}

/// Placement policy shared by every environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    pub platform: Platform,
    /// Pool keys in priority order. Empty means the catalog's own order.
    pub pool_keys: Vec<String>,
    /// Regex tiers, most preferred first. Entries matching none are dropped.
    pub tiers: Vec<String>,
    /// Upper bound on environments prepared at the same time.
    pub concurrency: usize,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            platform: Platform::default(),
            pool_keys: Vec::new(),
            tiers: vec![".*".to_string()],
            concurrency: 4,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub pools: Vec<PoolConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    pub key: String,
    #[serde(default)]
    pub entries: Vec<EntryConfig>,
}

/// One offering. Everything but the name defaults to a minimal node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryConfig {
    pub name: String,
    #[serde(default = "one")]
    pub node_count: u64,
    #[serde(default = "one")]
    pub core_count: u64,
    #[serde(default = "default_memory_mb")]
    pub memory_mb: u64,
    #[serde(default = "one")]
    pub disk_count: u64,
    #[serde(default = "one")]
    pub nic_count: u64,
    #[serde(default)]
    pub gpu_count: u64,
    #[serde(default)]
    pub features: Vec<String>,
    /// Finite inventory, for backends that cannot hand out an entry twice.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub units: Option<u64>,
}

fn one() -> u64 {
    1
}

fn default_memory_mb() -> u64 {
    512
}

impl EntryConfig {
    pub fn to_capability(&self) -> NodeSpace {
        NodeSpace {
            node_count: CountValue::Exact(self.node_count),
            core_count: CountValue::Exact(self.core_count),
            memory_mb: CountValue::Exact(self.memory_mb),
            disk_count: CountValue::Exact(self.disk_count),
            nic_count: CountValue::Exact(self.nic_count),
            gpu_count: CountValue::Exact(self.gpu_count),
            features: self.features.iter().cloned().collect::<FeatureSet<_>>(),
            ..NodeSpace::default()
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub topology: Topology,
    pub nodes: Vec<NodeSpace>,
}

impl EnvironmentConfig {
    /// Validate ranges and expand into an [`EnvironmentSpace`].
    pub fn to_space(&self) -> SpaceResult<EnvironmentSpace> {
        for node in &self.nodes {
            node.validate()?;
        }
        EnvironmentSpace::new(self.topology, self.nodes.clone())
    }
}

impl GridConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let config: GridConfig = toml::from_str(content)?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Expand every configured environment.
    pub fn environment_spaces(&self) -> anyhow::Result<Vec<EnvironmentSpace>> {
        let mut spaces = Vec::with_capacity(self.environments.len());
        for (index, environment) in self.environments.iter().enumerate() {
            let space = environment.to_space().map_err(|e| {
                let name = environment
                    .name
                    .clone()
                    .unwrap_or_else(|| format!("#{index}"));
                anyhow::anyhow!("environment {name}: {e}")
            })?;
            spaces.push(space);
        }
        Ok(spaces)
    }
}
