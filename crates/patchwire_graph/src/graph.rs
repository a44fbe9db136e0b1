// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph container holding nodes and edges, with validated edit
//! operations, topological ordering and snapshot serialization.

use crate::edge::{Edge, EdgeId};
use crate::loops::ValueLoop;
use crate::node::{Node, NodeId};
use crate::port::PortAddress;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Error when editing the graph.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// Node not found.
    #[error("Node not found: {0:?}")]
    NodeNotFound(NodeId),

    /// Port index out of range for the node.
    #[error("Port not found: {0:?}")]
    PortNotFound(PortAddress),

    /// Edge endpoint kinds neither match nor coerce.
    #[error("Value kinds do not match between {0:?} and {1:?}")]
    KindMismatch(PortAddress, PortAddress),

    /// Destination input already has an upstream edge.
    #[error("Input port already driven: {0:?}")]
    PortAlreadyDriven(PortAddress),

    /// Edge would connect a node to itself.
    #[error("Self-loop not allowed")]
    SelfLoop,

    /// Edge would create a cycle.
    #[error("Edge would create a cycle")]
    WouldCycle,

    /// Literal kind does not match the input port kind.
    #[error("Literal kind does not match port {0:?}")]
    LiteralKindMismatch(PortAddress),
}

/// Error when the edge graph contains a cycle.
#[derive(Debug, thiserror::Error)]
#[error("Graph contains a cycle")]
pub struct CycleError;

/// The node graph: the single owner of all nodes, ports and edges.
///
/// All mutation goes through the validated edit operations here; the
/// runtime scheduler wraps them so that every edit triggers exactly one
/// recalculation pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Graph {
    nodes: IndexMap<NodeId, Node>,
    edges: IndexMap<EdgeId, Edge>,
}

impl Graph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node.
    pub fn add_node(&mut self, node: Node) -> NodeId {
        let id = node.id;
        self.nodes.insert(id, node);
        id
    }

    /// Remove a node and every edge touching it.
    pub fn remove_node(&mut self, node_id: NodeId) -> Option<Node> {
        self.edges.retain(|_, e| !e.involves_node(node_id));
        self.nodes.shift_remove(&node_id)
    }

    /// Get a node by ID.
    pub fn node(&self, node_id: NodeId) -> Option<&Node> {
        self.nodes.get(&node_id)
    }

    /// Get a mutable node by ID.
    pub fn node_mut(&mut self, node_id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&node_id)
    }

    /// All nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// All nodes, mutably, in insertion order.
    pub fn nodes_mut(&mut self) -> impl Iterator<Item = &mut Node> {
        self.nodes.values_mut()
    }

    /// All node IDs in insertion order.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// All edges.
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    /// Number of edges.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Connect an output port to an input port.
    ///
    /// Validates that both endpoints exist, that the value kinds match
    /// (or coerce through the explicit whitelist), that the input is not
    /// already driven, and that the edge creates neither a self-loop nor
    /// a cycle.
    pub fn add_edge(&mut self, from: PortAddress, to: PortAddress) -> Result<EdgeId, GraphError> {
        let source = self
            .nodes
            .get(&from.node)
            .ok_or(GraphError::NodeNotFound(from.node))?;
        let target = self
            .nodes
            .get(&to.node)
            .ok_or(GraphError::NodeNotFound(to.node))?;

        let source_port = source
            .output(from.port)
            .ok_or(GraphError::PortNotFound(from))?;
        let target_port = target.input(to.port).ok_or(GraphError::PortNotFound(to))?;

        if !source_port.kind.coercible_to(target_port.kind) {
            return Err(GraphError::KindMismatch(from, to));
        }

        if self.upstream_edge(to).is_some() {
            return Err(GraphError::PortAlreadyDriven(to));
        }

        if from.node == to.node {
            return Err(GraphError::SelfLoop);
        }

        // Adding from -> to cycles iff `from.node` is already downstream
        // of `to.node`.
        if self.reaches(to.node, from.node) {
            return Err(GraphError::WouldCycle);
        }

        let edge = Edge::new(from, to);
        let id = edge.id;
        self.edges.insert(id, edge);
        Ok(id)
    }

    /// Remove an edge.
    pub fn remove_edge(&mut self, edge_id: EdgeId) -> Option<Edge> {
        self.edges.shift_remove(&edge_id)
    }

    /// The edge driving an input port, if any. An input has at most one.
    pub fn upstream_edge(&self, to: PortAddress) -> Option<&Edge> {
        self.edges.values().find(|e| e.to == to)
    }

    /// All edges leaving any output port of a node.
    pub fn edges_from_node(&self, node_id: NodeId) -> impl Iterator<Item = &Edge> {
        self.edges.values().filter(move |e| e.from.node == node_id)
    }

    /// Set the literal value of an input port.
    ///
    /// The literal becomes the port's observed value on the next
    /// evaluation unless an upstream edge drives the port.
    pub fn set_literal(&mut self, at: PortAddress, value: ValueLoop) -> Result<(), GraphError> {
        let node = self
            .nodes
            .get_mut(&at.node)
            .ok_or(GraphError::NodeNotFound(at.node))?;
        let port = node
            .inputs
            .get_mut(at.port)
            .ok_or(GraphError::PortNotFound(at))?;
        if value.kind() != port.kind {
            return Err(GraphError::LiteralKindMismatch(at));
        }
        port.literal = value;
        Ok(())
    }

    /// Whether `to` is reachable from `from` by following edges
    /// downstream.
    fn reaches(&self, from: NodeId, to: NodeId) -> bool {
        let mut stack = vec![from];
        let mut seen = HashSet::new();
        while let Some(id) = stack.pop() {
            if id == to {
                return true;
            }
            if !seen.insert(id) {
                continue;
            }
            for edge in self.edges_from_node(id) {
                stack.push(edge.to.node);
            }
        }
        false
    }

    /// The transitive closure of nodes downstream of any of `roots`,
    /// including the roots themselves.
    pub fn downstream_closure(&self, roots: &HashSet<NodeId>) -> HashSet<NodeId> {
        let mut closure = HashSet::new();
        let mut stack: Vec<NodeId> = roots.iter().copied().collect();
        while let Some(id) = stack.pop() {
            if !closure.insert(id) {
                continue;
            }
            for edge in self.edges_from_node(id) {
                stack.push(edge.to.node);
            }
        }
        closure
    }

    /// All nodes in dependency order: every node appears after every
    /// node it depends on.
    pub fn topological_order(&self) -> Result<Vec<NodeId>, CycleError> {
        let mut visited = HashSet::new();
        let mut temp_mark = HashSet::new();
        let mut order = Vec::with_capacity(self.nodes.len());

        for node_id in self.nodes.keys() {
            if !visited.contains(node_id) {
                self.visit(*node_id, &mut visited, &mut temp_mark, &mut order)?;
            }
        }

        Ok(order)
    }

    fn visit(
        &self,
        node_id: NodeId,
        visited: &mut HashSet<NodeId>,
        temp_mark: &mut HashSet<NodeId>,
        order: &mut Vec<NodeId>,
    ) -> Result<(), CycleError> {
        if temp_mark.contains(&node_id) {
            return Err(CycleError);
        }
        if visited.contains(&node_id) {
            return Ok(());
        }

        temp_mark.insert(node_id);

        // Visit upstream dependencies first.
        for edge in self.edges.values() {
            if edge.to.node == node_id {
                self.visit(edge.from.node, visited, temp_mark, order)?;
            }
        }

        temp_mark.remove(&node_id);
        visited.insert(node_id);
        order.push(node_id);

        Ok(())
    }

    /// Deserialize a snapshot, validating acyclicity.
    ///
    /// Accepts the same representation [`serde`] produces for the graph
    /// itself, so a serialized graph is its own snapshot format.
    pub fn from_snapshot(ron_text: &str) -> Result<Self, SnapshotError> {
        let graph: Graph = ron::from_str(ron_text)?;
        graph
            .topological_order()
            .map_err(|_| SnapshotError::Cyclic)?;
        Ok(graph)
    }

    /// Serialize the current node/edge/value state to a snapshot.
    pub fn to_snapshot(&self) -> Result<String, SnapshotError> {
        Ok(ron::ser::to_string_pretty(
            self,
            ron::ser::PrettyConfig::default(),
        )?)
    }
}

/// Error when loading or producing a graph snapshot.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    /// Snapshot text is not a valid graph.
    #[error("Snapshot parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// Snapshot could not be serialized.
    #[error("Snapshot encode error: {0}")]
    Encode(#[from] ron::Error),

    /// Snapshot contains a cyclic edge graph.
    #[error("Snapshot contains a cycle")]
    Cyclic,
}
