// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node evaluation registry and the contracts evaluation functions
//! satisfy.
//!
//! Every node kind maps to a plain function in an [`EvalRegistry`]
//! populated at startup. The scheduler resolves a node's inputs, hands
//! them to the function together with the clock, interaction state and
//! the node's ephemeral state, and writes the returned loops back to the
//! node's output ports.

pub mod interaction_nodes;
pub mod looped;
pub mod media_import;
pub mod pure;
pub mod stateful;

use crate::clock::GraphClock;
use crate::interaction::InteractionState;
use crate::media::MediaCoordinator;
use indexmap::IndexMap;
use patchwire_graph::{MediaRef, NodeId, NodeKind, PortValue, ValueLoop};

/// Everything an evaluation function may observe.
///
/// Pure kinds read only `inputs`; stateful kinds additionally read the
/// clock, interaction state, their own prior outputs and their ephemeral
/// state; media kinds schedule work through the coordinator.
pub struct EvalArgs<'a> {
    /// The node being evaluated.
    pub node_id: NodeId,
    /// Resolved input loops, one per input port (edge value or literal).
    pub inputs: &'a [ValueLoop],
    /// The node's output loops from its previous evaluation.
    pub prior_outputs: &'a [ValueLoop],
    /// Node-local ephemeral state, never visible to other nodes.
    pub state: &'a mut NodeState,
    /// The graph clock for this pass.
    pub clock: GraphClock,
    /// Externally recorded interaction events.
    pub interaction: &'a InteractionState,
    /// Coordinator for expensive background computations.
    pub media: &'a MediaCoordinator,
}

/// The outcome of evaluating a node.
#[derive(Debug, Clone)]
pub struct EvalOutcome {
    /// New output loops in port order.
    pub outputs: Vec<ValueLoop>,
    /// Request one immediate follow-up evaluation in the same tick,
    /// used to consume and then clear one-shot signals.
    pub run_again: bool,
}

impl EvalOutcome {
    /// An outcome with no follow-up request.
    pub fn outputs(outputs: Vec<ValueLoop>) -> Self {
        Self {
            outputs,
            run_again: false,
        }
    }
}

/// An in-flight animation for one loop index.
#[derive(Debug, Clone, Default)]
pub struct AnimationTrack {
    /// Output value when the animation started.
    pub from: f64,
    /// Target value being approached.
    pub target: f64,
    /// Graph time at which the animation started.
    pub started: f64,
    /// Whether the animation is still running.
    pub active: bool,
}

/// Last-known-good media for one loop index.
#[derive(Debug, Clone, Default)]
pub struct MediaSlot {
    /// Value currently shown (stale-while-revalidate).
    pub current: MediaRef,
    /// Source the current/pending computation was keyed on.
    pub source: String,
    /// Generation of the in-flight computation, if any.
    pub pending: Option<u64>,
}

/// Ephemeral per-node state.
///
/// Owned exclusively by the scheduler's state store, dropped when the
/// node is deleted and cleared on prototype restart; a node evaluated
/// with no prior state must produce its documented default output.
#[derive(Debug, Clone, Default)]
pub enum NodeState {
    /// No state recorded yet.
    #[default]
    Empty,
    /// Last consumed pulse timestamps (toggle, counter).
    PulseConsumer {
        /// One timestamp per consumed pulse slot.
        consumed: Vec<f64>,
    },
    /// Per-index animation tracks.
    Animations(Vec<AnimationTrack>),
    /// Last firing times of a pulse emitter, per index.
    PulseEmitter {
        /// One firing time per loop index.
        last_fired: Vec<f64>,
    },
    /// Last observed input values (pulse-on-change).
    ChangeWatcher {
        /// One value per loop index.
        last_seen: Vec<PortValue>,
    },
    /// Per-index media slots.
    Media(Vec<MediaSlot>),
}

impl NodeState {
    /// Consumed-pulse slots, grown to `len` and zero-filled.
    pub fn consumed_mut(&mut self, len: usize) -> &mut Vec<f64> {
        if !matches!(self, Self::PulseConsumer { .. }) {
            *self = Self::PulseConsumer {
                consumed: Vec::new(),
            };
        }
        let Self::PulseConsumer { consumed } = self else {
            unreachable!()
        };
        if consumed.len() < len {
            consumed.resize(len, 0.0);
        }
        consumed
    }

    /// Animation tracks, grown to `len` with inactive tracks.
    pub fn animations_mut(&mut self, len: usize) -> &mut Vec<AnimationTrack> {
        if !matches!(self, Self::Animations(_)) {
            *self = Self::Animations(Vec::new());
        }
        let Self::Animations(tracks) = self else {
            unreachable!()
        };
        if tracks.len() < len {
            tracks.resize_with(len, AnimationTrack::default);
        }
        tracks
    }

    /// Emitter firing times, grown to `len` and zero-filled.
    pub fn emitter_mut(&mut self, len: usize) -> &mut Vec<f64> {
        if !matches!(self, Self::PulseEmitter { .. }) {
            *self = Self::PulseEmitter {
                last_fired: Vec::new(),
            };
        }
        let Self::PulseEmitter { last_fired } = self else {
            unreachable!()
        };
        if last_fired.len() < len {
            last_fired.resize(len, 0.0);
        }
        last_fired
    }

    /// Last-seen values for change watching; not pre-grown, the eval op
    /// appends as it observes new indices.
    pub fn watcher_mut(&mut self) -> &mut Vec<PortValue> {
        if !matches!(self, Self::ChangeWatcher { .. }) {
            *self = Self::ChangeWatcher {
                last_seen: Vec::new(),
            };
        }
        let Self::ChangeWatcher { last_seen } = self else {
            unreachable!()
        };
        last_seen
    }

    /// Media slots, grown to `len` with empty slots.
    pub fn media_mut(&mut self, len: usize) -> &mut Vec<MediaSlot> {
        if !matches!(self, Self::Media(_)) {
            *self = Self::Media(Vec::new());
        }
        let Self::Media(slots) = self else {
            unreachable!()
        };
        if slots.len() < len {
            slots.resize_with(len, MediaSlot::default);
        }
        slots
    }
}

/// An evaluation function: static dispatch by node kind, not virtual
/// dispatch per node instance.
pub type EvalFn = for<'a> fn(EvalArgs<'a>) -> EvalOutcome;

/// Registry mapping [`NodeKind`] to its evaluation function.
pub struct EvalRegistry {
    table: IndexMap<NodeKind, EvalFn>,
}

impl EvalRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            table: IndexMap::new(),
        }
    }

    /// Create a registry with every built-in kind registered.
    pub fn with_builtin_kinds() -> Self {
        let mut registry = Self::new();
        registry.register(NodeKind::Add, pure::add_eval);
        registry.register(NodeKind::Multiply, pure::multiply_eval);
        registry.register(NodeKind::Divide, pure::divide_eval);
        registry.register(NodeKind::Pack3, pure::pack3_eval);
        registry.register(NodeKind::Unpack3, pure::unpack3_eval);
        registry.register(NodeKind::Progress, pure::progress_eval);
        registry.register(NodeKind::Transition, pure::transition_eval);
        registry.register(NodeKind::Equals, pure::equals_eval);
        registry.register(NodeKind::OptionPicker, pure::option_picker_eval);
        registry.register(NodeKind::LoopSelect, pure::loop_select_eval);
        registry.register(NodeKind::Toggle, stateful::toggle_eval);
        registry.register(NodeKind::Counter, stateful::counter_eval);
        registry.register(NodeKind::ClassicAnimation, stateful::classic_animation_eval);
        registry.register(NodeKind::RepeatingPulse, stateful::repeating_pulse_eval);
        registry.register(NodeKind::PulseOnChange, stateful::pulse_on_change_eval);
        registry.register(NodeKind::PressInteraction, interaction_nodes::press_eval);
        registry.register(NodeKind::DragInteraction, interaction_nodes::drag_eval);
        registry.register(NodeKind::ScrollInteraction, interaction_nodes::scroll_eval);
        registry.register(NodeKind::ImageImport, media_import::image_import_eval);
        registry
    }

    /// Register (or replace) the function for a kind.
    pub fn register(&mut self, kind: NodeKind, eval_fn: EvalFn) {
        self.table.insert(kind, eval_fn);
    }

    /// Look up the function for a kind.
    pub fn get(&self, kind: NodeKind) -> Option<EvalFn> {
        self.table.get(&kind).copied()
    }

    /// Number of registered kinds.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Whether no kinds are registered.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl Default for EvalRegistry {
    fn default() -> Self {
        Self::with_builtin_kinds()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_registry_covers_all_kinds() {
        let registry = EvalRegistry::with_builtin_kinds();
        let kinds = [
            NodeKind::Add,
            NodeKind::Multiply,
            NodeKind::Divide,
            NodeKind::Pack3,
            NodeKind::Unpack3,
            NodeKind::Progress,
            NodeKind::Transition,
            NodeKind::Equals,
            NodeKind::OptionPicker,
            NodeKind::LoopSelect,
            NodeKind::Toggle,
            NodeKind::Counter,
            NodeKind::ClassicAnimation,
            NodeKind::RepeatingPulse,
            NodeKind::PulseOnChange,
            NodeKind::PressInteraction,
            NodeKind::DragInteraction,
            NodeKind::ScrollInteraction,
            NodeKind::ImageImport,
        ];
        for kind in kinds {
            assert!(registry.get(kind).is_some(), "missing eval fn for {kind:?}");
        }
    }

    #[test]
    fn test_state_accessors_grow_and_switch_variant() {
        let mut state = NodeState::default();
        assert_eq!(state.consumed_mut(3).len(), 3);
        // Switching families resets the blob.
        assert_eq!(state.animations_mut(2).len(), 2);
        assert!(matches!(state, NodeState::Animations(_)));
    }
}
