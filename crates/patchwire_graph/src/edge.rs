// SPDX-License-Identifier: MIT OR Apache-2.0
//! Directed edges connecting output ports to input ports.

use crate::node::NodeId;
use crate::port::PortAddress;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EdgeId(pub Uuid);

impl EdgeId {
    /// Create a new random edge ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EdgeId {
    fn default() -> Self {
        Self::new()
    }
}

/// A directed connection from one output port to one input port.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    /// Unique edge ID.
    pub id: EdgeId,
    /// Source output port.
    pub from: PortAddress,
    /// Destination input port.
    pub to: PortAddress,
}

impl Edge {
    /// Create a new edge between two port addresses.
    pub fn new(from: PortAddress, to: PortAddress) -> Self {
        Self {
            id: EdgeId::new(),
            from,
            to,
        }
    }

    /// Check whether this edge touches a node.
    pub fn involves_node(&self, node_id: NodeId) -> bool {
        self.from.node == node_id || self.to.node == node_id
    }
}
