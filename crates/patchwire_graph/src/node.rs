// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node identity, the node-kind catalog with its port specifications,
//! and node instances.

use crate::port::{InputPort, OutputPort};
use crate::value::ValueKind;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(pub Uuid);

impl NodeId {
    /// Create a new random node ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

/// The closed catalog of node kinds.
///
/// Each kind selects an evaluation function from the runtime's registry.
/// This is a representative set covering every evaluation protocol; the
/// full product catalog is much larger but follows the same contracts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    /// Elementwise addition (numbers, positions, points, text).
    Add,
    /// Elementwise multiplication.
    Multiply,
    /// Elementwise division; divisor zero yields zero.
    Divide,
    /// Combine x/y/z number loops into one 3D point loop.
    Pack3,
    /// Split a 3D point loop into x/y/z number loops.
    Unpack3,
    /// Map a value between two ranges into normalized progress.
    Progress,
    /// Map normalized progress between two range endpoints.
    Transition,
    /// Elementwise equality within a threshold.
    Equals,
    /// Pick between option inputs by wrapped index.
    OptionPicker,
    /// Select elements of a loop by an index loop.
    LoopSelect,
    /// Boolean output flipped by an incoming pulse.
    Toggle,
    /// Running count driven by increase/decrease/jump pulses.
    Counter,
    /// Eases its output toward the target input over a duration.
    ClassicAnimation,
    /// Fires a pulse every N seconds of graph time.
    RepeatingPulse,
    /// Fires a pulse whenever its input value changes.
    PulseOnChange,
    /// Reads press state of an assigned layer.
    PressInteraction,
    /// Reads drag position of an assigned layer.
    DragInteraction,
    /// Reads scroll offset of an assigned layer.
    ScrollInteraction,
    /// Decodes an imported raster asset on a background thread.
    ImageImport,
}

impl NodeKind {
    /// Input port specification: `(label, kind)` in port order.
    pub fn input_spec(&self) -> Vec<(&'static str, ValueKind)> {
        use ValueKind as K;
        match self {
            Self::Add | Self::Multiply => vec![("a", K::Number), ("b", K::Number)],
            Self::Divide => vec![("numerator", K::Number), ("denominator", K::Number)],
            Self::Pack3 => vec![("x", K::Number), ("y", K::Number), ("z", K::Number)],
            Self::Unpack3 => vec![("point", K::Point3D)],
            Self::Progress => vec![
                ("value", K::Number),
                ("start", K::Number),
                ("end", K::Number),
            ],
            Self::Transition => vec![
                ("progress", K::Number),
                ("start", K::Number),
                ("end", K::Number),
            ],
            Self::Equals => vec![
                ("a", K::Number),
                ("b", K::Number),
                ("threshold", K::Number),
            ],
            Self::OptionPicker => vec![
                ("index", K::Number),
                ("option a", K::Number),
                ("option b", K::Number),
            ],
            Self::LoopSelect => vec![("input", K::Number), ("index loop", K::Number)],
            Self::Toggle => vec![("flip", K::Pulse)],
            Self::Counter => vec![
                ("increase", K::Pulse),
                ("decrease", K::Pulse),
                ("jump", K::Pulse),
                ("jump to", K::Number),
            ],
            Self::ClassicAnimation => vec![("target", K::Number), ("duration", K::Number)],
            Self::RepeatingPulse => vec![("frequency", K::Number)],
            Self::PulseOnChange => vec![("value", K::Number)],
            Self::PressInteraction | Self::DragInteraction => vec![("layer", K::LayerRef)],
            Self::ScrollInteraction => vec![("layer", K::LayerRef), ("mode", K::ScrollMode)],
            Self::ImageImport => vec![("path", K::Text)],
        }
    }

    /// Output port specification: `(label, kind)` in port order.
    pub fn output_spec(&self) -> Vec<(&'static str, ValueKind)> {
        use ValueKind as K;
        match self {
            Self::Add => vec![("sum", K::Number)],
            Self::Multiply => vec![("product", K::Number)],
            Self::Divide => vec![("quotient", K::Number)],
            Self::Pack3 => vec![("point", K::Point3D)],
            Self::Unpack3 => vec![("x", K::Number), ("y", K::Number), ("z", K::Number)],
            Self::Progress => vec![("progress", K::Number)],
            Self::Transition => vec![("value", K::Number)],
            Self::Equals => vec![("equals", K::Bool)],
            Self::OptionPicker => vec![("value", K::Number)],
            Self::LoopSelect => vec![("loop", K::Number), ("index", K::Number)],
            Self::Toggle => vec![("on", K::Bool)],
            Self::Counter => vec![("count", K::Number)],
            Self::ClassicAnimation => vec![("value", K::Number)],
            Self::RepeatingPulse => vec![("pulse", K::Pulse)],
            Self::PulseOnChange => vec![("changed", K::Pulse)],
            Self::PressInteraction => vec![("down", K::Bool), ("tapped", K::Pulse)],
            Self::DragInteraction => vec![("position", K::Position)],
            Self::ScrollInteraction => vec![("offset", K::Position)],
            Self::ImageImport => vec![("image", K::Media)],
        }
    }

    /// Whether this kind's output depends on the graph clock or external
    /// interaction state, and so must re-evaluate every tick regardless
    /// of whether its declared inputs changed.
    pub fn is_time_driven(&self) -> bool {
        matches!(
            self,
            Self::ClassicAnimation
                | Self::RepeatingPulse
                | Self::PressInteraction
                | Self::DragInteraction
                | Self::ScrollInteraction
        )
    }
}

/// A node instance in the graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Unique instance ID.
    pub id: NodeId,
    /// The kind selecting this node's evaluation function.
    pub kind: NodeKind,
    /// Input ports in declaration order.
    pub inputs: Vec<InputPort>,
    /// Output ports in declaration order.
    pub outputs: Vec<OutputPort>,
}

impl Node {
    /// Create a node of a kind with its default ports.
    pub fn new(kind: NodeKind) -> Self {
        Self {
            id: NodeId::new(),
            kind,
            inputs: kind
                .input_spec()
                .into_iter()
                .map(|(label, k)| InputPort::new(label, k))
                .collect(),
            outputs: kind
                .output_spec()
                .into_iter()
                .map(|(label, k)| OutputPort::new(label, k))
                .collect(),
        }
    }

    /// Get an input port by index.
    pub fn input(&self, index: usize) -> Option<&InputPort> {
        self.inputs.get(index)
    }

    /// Get an output port by index.
    pub fn output(&self, index: usize) -> Option<&OutputPort> {
        self.outputs.get(index)
    }
}
