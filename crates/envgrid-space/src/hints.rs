//! Per-backend placement hints carried alongside a node requirement.
//!
//! The matcher never looks inside these. The planner only sees them through
//! [`PlatformHints::pinning`] (what the user pinned) and
//! [`PlatformHints::bind`] (what placement decided), and each backend maps
//! those onto its own field names.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Backend family a catalog or a hint belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    #[default]
    Azure,
    Libvirt,
    #[serde(rename = "baremetal")]
    BareMetal,
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::Azure => write!(f, "azure"),
            Platform::Libvirt => write!(f, "libvirt"),
            Platform::BareMetal => write!(f, "baremetal"),
        }
    }
}

/// Azure VM hints: location is the pool key, vm_size the catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AzureHints {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vm_size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marketplace: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nic_count: Option<u64>,
}

/// Local hypervisor hints: host is the pool key, machine_type the entry.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LibvirtHints {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub machine_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nic_count: Option<u64>,
}

/// Bare-metal hints: cluster is the pool key, machine the entry.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BareMetalHints {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub machine: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nic_count: Option<u64>,
}

/// Hints for exactly one backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "platform", rename_all = "snake_case")]
pub enum PlatformHints {
    Azure(AzureHints),
    Libvirt(LibvirtHints),
    #[serde(rename = "baremetal")]
    BareMetal(BareMetalHints),
}

/// User choices the planner must honor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Pinning<'a> {
    pub pool_key: Option<&'a str>,
    pub entry: Option<&'a str>,
}

/// Where placement put a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Binding {
    pub platform: Platform,
    pub pool_key: String,
    pub entry: String,
    pub nic_count: u64,
}

impl PlatformHints {
    /// Hints with nothing set, for the given backend.
    pub fn empty(platform: Platform) -> Self {
        match platform {
            Platform::Azure => PlatformHints::Azure(AzureHints::default()),
            Platform::Libvirt => PlatformHints::Libvirt(LibvirtHints::default()),
            Platform::BareMetal => PlatformHints::BareMetal(BareMetalHints::default()),
        }
    }

    pub fn platform(&self) -> Platform {
        match self {
            PlatformHints::Azure(_) => Platform::Azure,
            PlatformHints::Libvirt(_) => Platform::Libvirt,
            PlatformHints::BareMetal(_) => Platform::BareMetal,
        }
    }

    pub fn pinning(&self) -> Pinning<'_> {
        match self {
            PlatformHints::Azure(h) => Pinning {
                pool_key: pick(&h.location),
                entry: pick(&h.vm_size),
            },
            PlatformHints::Libvirt(h) => Pinning {
                pool_key: pick(&h.host),
                entry: pick(&h.machine_type),
            },
            PlatformHints::BareMetal(h) => Pinning {
                pool_key: pick(&h.cluster),
                entry: pick(&h.machine),
            },
        }
    }

    /// Copy of these hints with the placement decision written in.
    pub fn bind(&self, binding: &Binding) -> Self {
        let pool_key = Some(binding.pool_key.clone());
        let entry = Some(binding.entry.clone());
        let nic_count = Some(binding.nic_count);
        match self {
            PlatformHints::Azure(h) => PlatformHints::Azure(AzureHints {
                location: pool_key,
                vm_size: entry,
                nic_count,
                ..h.clone()
            }),
            PlatformHints::Libvirt(_) => PlatformHints::Libvirt(LibvirtHints {
                host: pool_key,
                machine_type: entry,
                nic_count,
            }),
            PlatformHints::BareMetal(_) => PlatformHints::BareMetal(BareMetalHints {
                cluster: pool_key,
                machine: entry,
                nic_count,
            }),
        }
    }
}

// Blank strings come from half-filled runbooks; they pin nothing.
fn pick(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}
