//! Per-node requirement and capability.
//!
//! The same [`NodeSpace`] type describes both sides of a match: a
//! requirement (mostly ranges, "at least 2 cores") and a capability offered
//! by a catalog entry (mostly exact values, "4 cores, 16 GiB").

use serde::{Deserialize, Serialize};

use crate::count::{CountValue, check_count, realize_range, realize_unit_count};
use crate::error::{SpaceError, SpaceResult};
use crate::features::{Allow, Deny, FeatureSet, check_allow, check_deny};
use crate::hints::{Binding, Pinning, Platform, PlatformHints};
use crate::reason::ResultReason;

/// Cost weight of one GPU relative to one core.
const GPU_COST_WEIGHT: u64 = 100;

/// Upper bound on nodes one requirement entry may expand to.
pub const MAX_NODE_COUNT: u64 = 1024;

/// Hardware description of one node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeSpace {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    pub is_default: bool,
    pub node_count: CountValue,
    pub core_count: CountValue,
    pub memory_mb: CountValue,
    pub disk_count: CountValue,
    pub nic_count: CountValue,
    pub gpu_count: CountValue,
    /// Allow set: all of these must be offered.
    pub features: FeatureSet<Allow>,
    /// Deny set: none of these may be offered.
    pub excluded_features: FeatureSet<Deny>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hints: Option<PlatformHints>,
}

impl Default for NodeSpace {
    fn default() -> Self {
        Self {
            name: String::new(),
            is_default: false,
            node_count: CountValue::at_least(1),
            core_count: CountValue::at_least(1),
            memory_mb: CountValue::at_least(512),
            disk_count: CountValue::at_least(1),
            nic_count: CountValue::at_least(1),
            gpu_count: CountValue::at_least(0),
            features: FeatureSet::new(),
            excluded_features: FeatureSet::new(),
            hints: None,
        }
    }
}

impl NodeSpace {
    /// An exact, single-node capability with one disk, one NIC and no GPU.
    pub fn offering(core_count: u64, memory_mb: u64) -> Self {
        Self {
            node_count: CountValue::Exact(1),
            core_count: CountValue::Exact(core_count),
            memory_mb: CountValue::Exact(memory_mb),
            disk_count: CountValue::Exact(1),
            nic_count: CountValue::Exact(1),
            gpu_count: CountValue::Exact(0),
            ..Self::default()
        }
    }

    /// Dimensions a capability must never leave at zero.
    fn required_dimensions(&self) -> [(&'static str, &CountValue); 5] {
        [
            ("node_count", &self.node_count),
            ("core_count", &self.core_count),
            ("memory_mb", &self.memory_mb),
            ("disk_count", &self.disk_count),
            ("nic_count", &self.nic_count),
        ]
    }

    /// Names of required dimensions that are zero. Empty for a usable capability.
    pub fn missing_dimensions(&self) -> Vec<&'static str> {
        self.required_dimensions()
            .into_iter()
            .filter(|(_, value)| value.is_zero())
            .map(|(name, _)| name)
            .collect()
    }

    /// Check every range for `min <= max`.
    pub fn validate(&self) -> SpaceResult<()> {
        for value in [
            &self.node_count,
            &self.core_count,
            &self.memory_mb,
            &self.disk_count,
            &self.nic_count,
            &self.gpu_count,
        ] {
            value.validate()?;
        }
        Ok(())
    }

    /// Evaluate this requirement against `capability`.
    ///
    /// Every dimension is checked and merged so the caller sees all
    /// mismatches at once. An incomplete capability fails straight away
    /// with a single combined reason.
    pub fn check(&self, capability: &NodeSpace) -> ResultReason {
        let mut result = ResultReason::new();

        let missing = capability.missing_dimensions();
        if !missing.is_empty() {
            result.add_reason(
                format!("capability is incomplete, {} shouldn't be zero", missing.join(", ")),
                "",
            );
            return result;
        }

        result.merge(check_count(&self.node_count, &capability.node_count), "node_count");
        result.merge(check_count(&self.core_count, &capability.core_count), "core_count");
        result.merge(check_count(&self.memory_mb, &capability.memory_mb), "memory_mb");
        result.merge(check_count(&self.disk_count, &capability.disk_count), "disk_count");
        result.merge(check_count(&self.nic_count, &capability.nic_count), "nic_count");
        result.merge(check_count(&self.gpu_count, &capability.gpu_count), "gpu_count");
        result.merge(check_allow(&self.features, &capability.features), "features");
        result.merge(
            check_deny(&self.excluded_features, &capability.features),
            "excluded_features",
        );

        result
    }

    /// The smallest concrete node that satisfies this requirement on `capability`.
    ///
    /// Features come from the capability rather than the request, so later
    /// stages see what the hardware really offers.
    pub fn generate_min_capability(&self, capability: &NodeSpace) -> SpaceResult<NodeSpace> {
        let check = self.check(capability);
        if !check.success {
            return Err(SpaceError::NotMeetRequirement(check));
        }

        Ok(NodeSpace {
            name: self.name.clone(),
            is_default: self.is_default,
            node_count: CountValue::Exact(realize_unit_count(
                &self.node_count,
                &capability.node_count,
            )?),
            core_count: CountValue::Exact(realize_range(&self.core_count, &capability.core_count)?),
            memory_mb: CountValue::Exact(realize_range(&self.memory_mb, &capability.memory_mb)?),
            disk_count: CountValue::Exact(realize_range(&self.disk_count, &capability.disk_count)?),
            nic_count: CountValue::Exact(realize_range(&self.nic_count, &capability.nic_count)?),
            gpu_count: CountValue::Exact(realize_range(&self.gpu_count, &capability.gpu_count)?),
            features: capability.features.clone(),
            excluded_features: capability.excluded_features.clone(),
            hints: self.hints.clone(),
        })
    }

    /// Split a multi-node requirement into single-node requirements.
    ///
    /// node_count is realized against itself, so an open range such as
    /// `[1,]` resolves to its lower bound.
    pub fn expand_by_node_count(&self) -> SpaceResult<Vec<NodeSpace>> {
        let count = realize_unit_count(&self.node_count, &self.node_count)?;
        if count == 0 {
            return Err(SpaceError::ZeroNodeCount);
        }
        if count > MAX_NODE_COUNT {
            return Err(SpaceError::TooManyNodes {
                count,
                max: MAX_NODE_COUNT,
            });
        }

        Ok((0..count)
            .map(|_| NodeSpace {
                node_count: CountValue::Exact(1),
                ..self.clone()
            })
            .collect())
    }

    /// Rough ranking signal: cores plus a heavy weight per GPU.
    pub fn cost(&self) -> u64 {
        self.core_count.min_value() + self.gpu_count.min_value() * GPU_COST_WEIGHT
    }

    pub fn has_feature(&self, name: &str) -> bool {
        self.features.contains(name)
    }

    /// True once every dimension has been bound to an exact value.
    pub fn is_concrete(&self) -> bool {
        [
            &self.node_count,
            &self.core_count,
            &self.memory_mb,
            &self.disk_count,
            &self.nic_count,
            &self.gpu_count,
        ]
        .iter()
        .all(|value| value.is_exact())
    }

    pub fn pinning(&self) -> Pinning<'_> {
        self.hints
            .as_ref()
            .map(PlatformHints::pinning)
            .unwrap_or_default()
    }

    /// Pins that apply to `platform`. Hints written for another backend
    /// pin nothing.
    pub fn pinning_for(&self, platform: Platform) -> Pinning<'_> {
        match &self.hints {
            Some(hints) if hints.platform() == platform => hints.pinning(),
            _ => Pinning::default(),
        }
    }

    /// Copy of this node with the placement decision recorded in its hints.
    ///
    /// Hints for another backend are replaced by fresh ones for the
    /// binding's platform.
    pub fn with_binding(&self, binding: &Binding) -> NodeSpace {
        let hints = match &self.hints {
            Some(hints) if hints.platform() == binding.platform => hints.bind(binding),
            _ => PlatformHints::empty(binding.platform).bind(binding),
        };
        NodeSpace {
            hints: Some(hints),
            ..self.clone()
        }
    }
}
