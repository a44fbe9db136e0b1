// SPDX-License-Identifier: MIT OR Apache-2.0
//! Stateful and time-driven node evaluation functions.
//!
//! These kinds read the graph clock, their own previous output and their
//! ephemeral state in addition to the current inputs. Pulse inputs are
//! edge-triggered: a pulse counts as active exactly when its stored
//! firing time equals the current graph time, and a consumer records the
//! consumed timestamp so a follow-up pass in the same tick cannot
//! double-consume it.

use super::looped::{looped_eval, OpResult};
use super::{EvalArgs, EvalOutcome};
use patchwire_graph::{normalized, PortValue, ValueKind, ValueLoop};

pub(super) fn prior_value(
    prior_outputs: &[ValueLoop],
    port: usize,
    index: usize,
    kind: ValueKind,
) -> PortValue {
    prior_outputs
        .get(port)
        .map(|l| l.element_at(index as i64).clone())
        .unwrap_or_else(|| kind.default_value())
}

/// Flip a boolean output on each incoming pulse.
///
/// Sets `run_again` when it flips, re-arming for the next external
/// event within the same tick.
pub fn toggle_eval(args: EvalArgs<'_>) -> EvalOutcome {
    let clock = args.clock;
    let prior = args.prior_outputs;
    let n = args.inputs.iter().map(ValueLoop::len).max().unwrap_or(1);
    let consumed = args.state.consumed_mut(n);

    looped_eval(args.inputs, &[ValueKind::Bool], |row, i| {
        let was_on = prior_value(prior, 0, i, ValueKind::Bool).as_bool();
        let pulse = row[0].as_pulse();
        if clock.pulse_active(pulse) && consumed[i] != pulse {
            consumed[i] = pulse;
            OpResult {
                values: vec![PortValue::Bool(!was_on)],
                run_again: true,
            }
        } else {
            OpResult::single(PortValue::Bool(was_on))
        }
    })
}

/// Running count driven by increase/decrease/jump pulses.
pub fn counter_eval(args: EvalArgs<'_>) -> EvalOutcome {
    let clock = args.clock;
    let prior = args.prior_outputs;
    let n = args.inputs.iter().map(ValueLoop::len).max().unwrap_or(1);
    // Three pulse inputs per index: increase, decrease, jump.
    let consumed = args.state.consumed_mut(n * 3);

    looped_eval(args.inputs, &[ValueKind::Number], |row, i| {
        let mut count = prior_value(prior, 0, i, ValueKind::Number).as_number();
        let mut consume = |slot: usize, pulse: f64| {
            let key = i * 3 + slot;
            if clock.pulse_active(pulse) && consumed[key] != pulse {
                consumed[key] = pulse;
                true
            } else {
                false
            }
        };

        if consume(0, row[0].as_pulse()) {
            count += 1.0;
        }
        if consume(1, row[1].as_pulse()) {
            count -= 1.0;
        }
        if consume(2, row[2].as_pulse()) {
            count = row[3].as_number();
        }
        OpResult::single(PortValue::Number(normalized(count)))
    })
}

/// Ease the output toward the target input over a duration of graph
/// time.
///
/// A changed target starts a new animation from the current output; a
/// non-positive duration jumps immediately. Requests `run_again` while
/// an animation is in flight, matching the original's willRunAgain
/// behavior.
pub fn classic_animation_eval(args: EvalArgs<'_>) -> EvalOutcome {
    let clock = args.clock;
    let prior = args.prior_outputs;
    let n = args.inputs.iter().map(ValueLoop::len).max().unwrap_or(1);
    let tracks = args.state.animations_mut(n);

    looped_eval(args.inputs, &[ValueKind::Number], |row, i| {
        let target = normalized(row[0].as_number());
        let duration = row[1].as_number();
        let current = prior_value(prior, 0, i, ValueKind::Number).as_number();
        let track = &mut tracks[i];

        if !track.active || track.target != target {
            if current == target {
                track.active = false;
                return OpResult::single(PortValue::Number(target));
            }
            track.from = current;
            track.target = target;
            track.started = clock.graph_time;
            track.active = true;
        }

        if duration <= 0.0 {
            track.active = false;
            return OpResult::single(PortValue::Number(target));
        }

        let progress = ((clock.graph_time - track.started) / duration).clamp(0.0, 1.0);
        if progress >= 1.0 {
            track.active = false;
            return OpResult::single(PortValue::Number(target));
        }

        let value = track.from + (target - track.from) * progress;
        OpResult {
            values: vec![PortValue::Number(normalized(value))],
            run_again: true,
        }
    })
}

/// Fire a pulse every `frequency` seconds of graph time.
///
/// A non-positive frequency never fires. Between firings the output
/// keeps its previous firing time, which downstream consumers read as
/// inert.
pub fn repeating_pulse_eval(args: EvalArgs<'_>) -> EvalOutcome {
    let clock = args.clock;
    let prior = args.prior_outputs;
    let n = args.inputs.iter().map(ValueLoop::len).max().unwrap_or(1);
    let last_fired = args.state.emitter_mut(n);

    looped_eval(args.inputs, &[ValueKind::Pulse], |row, i| {
        let frequency = row[0].as_number();
        let previous = prior_value(prior, 0, i, ValueKind::Pulse).as_pulse();
        if frequency > 0.0 && clock.graph_time - last_fired[i] >= frequency {
            last_fired[i] = clock.graph_time;
            OpResult::single(PortValue::Pulse(clock.graph_time))
        } else {
            OpResult::single(PortValue::Pulse(previous))
        }
    })
}

/// Fire a pulse whenever the input value changes.
///
/// The first-ever evaluation records the current values without firing,
/// so a fresh or just-reset node produces the default (unfired) output.
pub fn pulse_on_change_eval(args: EvalArgs<'_>) -> EvalOutcome {
    let clock = args.clock;
    let prior = args.prior_outputs;
    let last_seen = args.state.watcher_mut();

    looped_eval(args.inputs, &[ValueKind::Pulse], |row, i| {
        let value = &row[0];
        let previous = prior_value(prior, 0, i, ValueKind::Pulse).as_pulse();
        if i >= last_seen.len() {
            last_seen.push(value.clone());
            OpResult::single(PortValue::Pulse(previous))
        } else if last_seen[i] != *value {
            last_seen[i] = value.clone();
            OpResult::single(PortValue::Pulse(clock.graph_time))
        } else {
            OpResult::single(PortValue::Pulse(previous))
        }
    })
}
