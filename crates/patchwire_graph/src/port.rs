// SPDX-License-Identifier: MIT OR Apache-2.0
//! Typed connection points on a node, each holding one value loop.

use crate::loops::ValueLoop;
use crate::node::NodeId;
use crate::value::ValueKind;
use serde::{Deserialize, Serialize};

/// Addresses one port on one node by positional index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortAddress {
    /// Owning node.
    pub node: NodeId,
    /// Positional index within the node's input or output list.
    pub port: usize,
}

impl PortAddress {
    /// Create a port address.
    pub fn new(node: NodeId, port: usize) -> Self {
        Self { node, port }
    }
}

/// An input port.
///
/// When an upstream edge exists its value is copied in before the node
/// evaluates; otherwise the user-entered literal is used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputPort {
    /// Display label.
    pub label: String,
    /// Value kind accepted by this port.
    pub kind: ValueKind,
    /// User-entered literal, used when no edge drives this port.
    pub literal: ValueLoop,
    /// The value the node observed on its last evaluation.
    pub value: ValueLoop,
}

impl InputPort {
    /// Create an input port holding the kind's default loop.
    pub fn new(label: impl Into<String>, kind: ValueKind) -> Self {
        Self {
            label: label.into(),
            kind,
            literal: ValueLoop::default_of(kind),
            value: ValueLoop::default_of(kind),
        }
    }
}

/// An output port, holding the loop produced by the node's most recent
/// evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputPort {
    /// Display label.
    pub label: String,
    /// Value kind produced by this port.
    pub kind: ValueKind,
    /// Current output loop.
    pub value: ValueLoop,
}

impl OutputPort {
    /// Create an output port holding the kind's default loop.
    pub fn new(label: impl Into<String>, kind: ValueKind) -> Self {
        Self {
            label: label.into(),
            kind,
            value: ValueLoop::default_of(kind),
        }
    }
}
