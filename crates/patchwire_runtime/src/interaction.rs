// SPDX-License-Identifier: MIT OR Apache-2.0
//! Per-layer touch/drag/scroll state recorded by the renderer and read
//! by interaction node kinds.

use patchwire_graph::NodeId;
use std::collections::HashMap;

/// Interaction data for one layer node.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LayerInteraction {
    /// Whether a press is currently down on the layer.
    pub pressed: bool,
    /// Graph time of the most recent tap, `0.0` if never tapped.
    pub tap_time: f64,
    /// Current drag position in preview coordinates.
    pub drag_position: [f64; 2],
    /// Current scroll offset.
    pub scroll_offset: [f64; 2],
}

/// Interaction events recorded against layer nodes, keyed by the layer's
/// node ID.
///
/// The renderer writes through the `record_*` methods; stateful node
/// evaluation reads a copy per layer. Layers with no recorded events
/// read as all-default.
#[derive(Debug, Clone, Default)]
pub struct InteractionState {
    layers: HashMap<NodeId, LayerInteraction>,
}

impl InteractionState {
    /// Create an empty interaction state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Interaction data for a layer; default when none recorded.
    pub fn layer(&self, id: NodeId) -> LayerInteraction {
        self.layers.get(&id).copied().unwrap_or_default()
    }

    /// Record a press-down on a layer.
    pub fn record_press(&mut self, id: NodeId) {
        self.layers.entry(id).or_default().pressed = true;
    }

    /// Record a press release; a release counts as a tap.
    ///
    /// `tap_time` is the renderer's clock at release. Press nodes watch
    /// it for changes and stamp the emitted pulse with their own pass
    /// time, so the value only needs to differ between taps.
    pub fn record_release(&mut self, id: NodeId, tap_time: f64) {
        let layer = self.layers.entry(id).or_default();
        layer.pressed = false;
        layer.tap_time = tap_time;
    }

    /// Record the current drag position on a layer.
    pub fn record_drag(&mut self, id: NodeId, position: [f64; 2]) {
        self.layers.entry(id).or_default().drag_position = position;
    }

    /// Record the current scroll offset on a layer.
    pub fn record_scroll(&mut self, id: NodeId, offset: [f64; 2]) {
        self.layers.entry(id).or_default().scroll_offset = offset;
    }

    /// Drop recorded state for a deleted layer.
    pub fn remove_layer(&mut self, id: NodeId) {
        self.layers.remove(&id);
    }

    /// Clear all recorded interaction on prototype restart.
    pub fn reset(&mut self) {
        self.layers.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_layer_reads_default() {
        let state = InteractionState::new();
        assert_eq!(state.layer(NodeId::new()), LayerInteraction::default());
    }

    #[test]
    fn test_press_release_cycle() {
        let mut state = InteractionState::new();
        let id = NodeId::new();
        state.record_press(id);
        assert!(state.layer(id).pressed);
        state.record_release(id, 1.25);
        assert!(!state.layer(id).pressed);
        assert_eq!(state.layer(id).tap_time, 1.25);
    }
}
