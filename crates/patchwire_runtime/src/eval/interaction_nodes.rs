// SPDX-License-Identifier: MIT OR Apache-2.0
//! Interaction reader node kinds.
//!
//! These kinds read externally recorded interaction state for their
//! assigned layer. An unassigned layer input reads as the documented
//! defaults.

use super::looped::{looped_eval, OpResult};
use super::stateful::prior_value;
use super::{EvalArgs, EvalOutcome};
use patchwire_graph::{PortValue, ScrollMode, ValueKind};

/// Press state of the assigned layer: a "down" boolean and a tap pulse.
///
/// The renderer records releases with the clock it observed, which is
/// always behind the evaluating pass. The tap output therefore never
/// forwards the recorded time: the node watches the recorded time for
/// changes and fires `Pulse(graph_time)` on the pass where it changes,
/// so downstream pulse consumers see an active pulse.
pub fn press_eval(args: EvalArgs<'_>) -> EvalOutcome {
    let clock = args.clock;
    let prior = args.prior_outputs;
    let interaction = args.interaction;
    let last_seen = args.state.watcher_mut();

    looped_eval(args.inputs, &[ValueKind::Bool, ValueKind::Pulse], |row, i| {
        let (down, tap_time) = match row[0].as_layer_ref() {
            Some(id) => {
                let layer = interaction.layer(id);
                (layer.pressed, layer.tap_time)
            }
            None => (false, 0.0),
        };

        let observed = PortValue::Pulse(tap_time);
        let previous = prior_value(prior, 1, i, ValueKind::Pulse).as_pulse();
        // First evaluation records without firing, like pulse-on-change.
        let tap = if i >= last_seen.len() {
            last_seen.push(observed);
            PortValue::Pulse(previous)
        } else if last_seen[i] != observed {
            last_seen[i] = observed;
            PortValue::Pulse(clock.graph_time)
        } else {
            PortValue::Pulse(previous)
        };

        OpResult::values(vec![PortValue::Bool(down), tap])
    })
}

/// Drag position of the assigned layer.
pub fn drag_eval(args: EvalArgs<'_>) -> EvalOutcome {
    let interaction = args.interaction;
    looped_eval(args.inputs, &[ValueKind::Position], |row, _| {
        let position = row[0]
            .as_layer_ref()
            .map(|id| interaction.layer(id).drag_position)
            .unwrap_or_default();
        OpResult::single(PortValue::Position(position))
    })
}

/// Scroll offset of the assigned layer, honoring the scroll mode.
///
/// Paging snap happens at the renderer; here it reads like free
/// scrolling, while `Disabled` pins the offset to zero.
pub fn scroll_eval(args: EvalArgs<'_>) -> EvalOutcome {
    let interaction = args.interaction;
    looped_eval(args.inputs, &[ValueKind::Position], |row, _| {
        let offset = match (row[0].as_layer_ref(), row[1].as_scroll_mode()) {
            (_, ScrollMode::Disabled) | (None, _) => [0.0, 0.0],
            (Some(id), _) => interaction.layer(id).scroll_offset,
        };
        OpResult::single(PortValue::Position(offset))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::GraphClock;
    use crate::eval::NodeState;
    use crate::interaction::InteractionState;
    use crate::media::MediaCoordinator;
    use patchwire_graph::{NodeId, ValueLoop};

    fn run(
        eval_fn: crate::eval::EvalFn,
        inputs: Vec<ValueLoop>,
        prior: Vec<ValueLoop>,
        state: &mut NodeState,
        clock: GraphClock,
        interaction: &InteractionState,
    ) -> EvalOutcome {
        let media = MediaCoordinator::new();
        eval_fn(EvalArgs {
            node_id: NodeId::new(),
            inputs: &inputs,
            prior_outputs: &prior,
            state,
            clock,
            interaction,
            media: &media,
        })
    }

    fn layer_input(layer: NodeId) -> ValueLoop {
        ValueLoop::scalar(PortValue::LayerRef(Some(layer)))
    }

    #[test]
    fn test_press_reads_layer_state() {
        let layer = NodeId::new();
        let mut interaction = InteractionState::new();
        interaction.record_press(layer);

        let mut state = NodeState::default();
        let out = run(
            press_eval,
            vec![layer_input(layer)],
            vec![],
            &mut state,
            GraphClock::new(),
            &interaction,
        );
        assert_eq!(out.outputs[0].values(), &[PortValue::Bool(true)]);
        assert_eq!(out.outputs[1].values(), &[PortValue::Pulse(0.0)]);
    }

    #[test]
    fn test_unassigned_layer_reads_defaults() {
        let interaction = InteractionState::new();
        let mut state = NodeState::default();
        let out = run(
            press_eval,
            vec![ValueLoop::scalar(PortValue::LayerRef(None))],
            vec![],
            &mut state,
            GraphClock::new(),
            &interaction,
        );
        assert_eq!(out.outputs[0].values(), &[PortValue::Bool(false)]);
    }

    #[test]
    fn test_tap_fires_at_current_graph_time() {
        let layer = NodeId::new();
        let mut interaction = InteractionState::new();
        let mut state = NodeState::default();
        let mut clock = GraphClock::new();
        let inputs = vec![layer_input(layer)];

        // Baseline evaluation records the unfired tap time.
        clock.advance(1.0);
        let out = run(
            press_eval,
            inputs.clone(),
            vec![],
            &mut state,
            clock,
            &interaction,
        );
        assert_eq!(out.outputs[1].values(), &[PortValue::Pulse(0.0)]);

        // The renderer records a release with the clock it saw; the
        // next pass fires at its own graph time, not the recorded one.
        interaction.record_release(layer, clock.graph_time);
        clock.advance(1.0);
        let out = run(
            press_eval,
            inputs.clone(),
            out.outputs,
            &mut state,
            clock,
            &interaction,
        );
        let tap = out.outputs[1].values()[0].as_pulse();
        assert!(clock.pulse_active(tap));

        // No new tap: the output keeps the old firing time, inert.
        clock.advance(1.0);
        let out = run(press_eval, inputs, out.outputs, &mut state, clock, &interaction);
        let tap = out.outputs[1].values()[0].as_pulse();
        assert!(!clock.pulse_active(tap));
    }

    #[test]
    fn test_scroll_mode_disabled_pins_offset() {
        let layer = NodeId::new();
        let mut interaction = InteractionState::new();
        interaction.record_scroll(layer, [3.0, 4.0]);

        let mut state = NodeState::default();
        let out = run(
            scroll_eval,
            vec![
                layer_input(layer),
                ValueLoop::scalar(PortValue::ScrollMode(ScrollMode::Free)),
            ],
            vec![],
            &mut state,
            GraphClock::new(),
            &interaction,
        );
        assert_eq!(out.outputs[0].values(), &[PortValue::Position([3.0, 4.0])]);

        let out = run(
            scroll_eval,
            vec![
                layer_input(layer),
                ValueLoop::scalar(PortValue::ScrollMode(ScrollMode::Disabled)),
            ],
            vec![],
            &mut state,
            GraphClock::new(),
            &interaction,
        );
        assert_eq!(out.outputs[0].values(), &[PortValue::Position([0.0, 0.0])]);
    }
}
