//! Whole-environment requirement: a topology plus one entry per node.

use serde::{Deserialize, Serialize};

use crate::error::{SpaceError, SpaceResult};
use crate::node::NodeSpace;
use crate::reason::ResultReason;

/// How the nodes of one environment are wired together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topology {
    /// All nodes share one private subnet.
    #[default]
    Subnet,
}

/// Ordered node requirements of one environment.
///
/// Always expanded: every entry stands for exactly one physical node.
/// Equality is order-sensitive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnvironmentSpace {
    topology: Topology,
    nodes: Vec<NodeSpace>,
}

impl EnvironmentSpace {
    /// Build a space, expanding multi-node entries into unit entries.
    pub fn new(topology: Topology, nodes: Vec<NodeSpace>) -> SpaceResult<Self> {
        let mut expanded = Vec::with_capacity(nodes.len());
        for node in &nodes {
            expanded.extend(node.expand_by_node_count()?);
        }
        Ok(Self {
            topology,
            nodes: expanded,
        })
    }

    pub fn topology(&self) -> Topology {
        self.topology
    }

    pub fn nodes(&self) -> &[NodeSpace] {
        &self.nodes
    }

    pub fn into_nodes(self) -> Vec<NodeSpace> {
        self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Same topology, nodes already bound one-to-one to this space's slots.
    ///
    /// Not re-expanded: a realized node_count may describe how many units
    /// back the slot rather than how many slots exist.
    pub fn with_realized_nodes(&self, nodes: Vec<NodeSpace>) -> Self {
        Self {
            topology: self.topology,
            nodes,
        }
    }

    /// A single-entry capability stands for a homogeneous pool and is
    /// matched against every requirement position.
    fn capability_at<'a>(capability: &'a EnvironmentSpace, index: usize) -> &'a NodeSpace {
        if capability.nodes.len() == 1 {
            &capability.nodes[0]
        } else {
            &capability.nodes[index]
        }
    }

    /// Admission check. Stops at the first failing position.
    pub fn check(&self, capability: &EnvironmentSpace) -> ResultReason {
        let mut result = ResultReason::new();

        if capability.nodes.is_empty() {
            result.add_reason("no node instance found", "");
            return result;
        }
        if capability.nodes.len() > 1 && self.nodes.len() > capability.nodes.len() {
            result.add_reason(
                format!(
                    "no enough nodes, requirement: {}, capability: {}",
                    self.nodes.len(),
                    capability.nodes.len()
                ),
                "",
            );
            return result;
        }

        for (index, requirement) in self.nodes.iter().enumerate() {
            let node_result = requirement.check(Self::capability_at(capability, index));
            result.merge(node_result, &index.to_string());
            if !result.success {
                break;
            }
        }

        result
    }

    /// Realize every node pairwise, with the same broadcast rule as [`check`].
    ///
    /// [`check`]: EnvironmentSpace::check
    pub fn generate_min_capability(&self, capability: &EnvironmentSpace) -> SpaceResult<Self> {
        let check = self.check(capability);
        if !check.success {
            return Err(SpaceError::NotMeetRequirement(check));
        }

        let nodes = self
            .nodes
            .iter()
            .enumerate()
            .map(|(index, requirement)| {
                requirement.generate_min_capability(Self::capability_at(capability, index))
            })
            .collect::<SpaceResult<Vec<_>>>()?;

        Ok(Self {
            topology: self.topology,
            nodes,
        })
    }

    /// Sum of node costs.
    pub fn cost(&self) -> u64 {
        self.nodes.iter().map(NodeSpace::cost).sum()
    }
}
