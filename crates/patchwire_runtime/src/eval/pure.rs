// SPDX-License-Identifier: MIT OR Apache-2.0
//! Pure node evaluation functions.
//!
//! Every function here depends only on its current inputs, never throws,
//! and normalizes undefined numeric results to the documented default
//! (`0`) instead of propagating `NaN` or infinities.

use super::looped::{looped_eval, OpResult};
use super::{EvalArgs, EvalOutcome};
use patchwire_graph::{normalized, wrap_index, PortValue, ValueKind, ValueLoop};

/// Elementwise sum of two values, componentwise for geometric kinds;
/// text concatenates as in the original's string addition.
fn add_values(a: &PortValue, b: &PortValue) -> PortValue {
    match (a, b) {
        (PortValue::Position(x), PortValue::Position(y)) => {
            PortValue::Position([normalized(x[0] + y[0]), normalized(x[1] + y[1])])
        }
        (PortValue::Size(x), PortValue::Size(y)) => {
            PortValue::Size([normalized(x[0] + y[0]), normalized(x[1] + y[1])])
        }
        (PortValue::Point3D(x), PortValue::Point3D(y)) => PortValue::Point3D([
            normalized(x[0] + y[0]),
            normalized(x[1] + y[1]),
            normalized(x[2] + y[2]),
        ]),
        (PortValue::Text(x), PortValue::Text(y)) => PortValue::Text(format!("{x}{y}")),
        _ => PortValue::Number(normalized(a.as_number() + b.as_number())),
    }
}

fn multiply_values(a: &PortValue, b: &PortValue) -> PortValue {
    match (a, b) {
        (PortValue::Position(x), PortValue::Position(y)) => {
            PortValue::Position([normalized(x[0] * y[0]), normalized(x[1] * y[1])])
        }
        (PortValue::Size(x), PortValue::Size(y)) => {
            PortValue::Size([normalized(x[0] * y[0]), normalized(x[1] * y[1])])
        }
        (PortValue::Point3D(x), PortValue::Point3D(y)) => PortValue::Point3D([
            normalized(x[0] * y[0]),
            normalized(x[1] * y[1]),
            normalized(x[2] * y[2]),
        ]),
        _ => PortValue::Number(normalized(a.as_number() * b.as_number())),
    }
}

/// Division with the divide-by-zero rule: a zero divisor yields zero for
/// that component, never `NaN` or infinity.
fn safe_divide(a: f64, b: f64) -> f64 {
    if b == 0.0 {
        0.0
    } else {
        normalized(a / b)
    }
}

fn divide_values(a: &PortValue, b: &PortValue) -> PortValue {
    match (a, b) {
        (PortValue::Position(x), PortValue::Position(y)) => {
            PortValue::Position([safe_divide(x[0], y[0]), safe_divide(x[1], y[1])])
        }
        (PortValue::Size(x), PortValue::Size(y)) => {
            PortValue::Size([safe_divide(x[0], y[0]), safe_divide(x[1], y[1])])
        }
        (PortValue::Point3D(x), PortValue::Point3D(y)) => PortValue::Point3D([
            safe_divide(x[0], y[0]),
            safe_divide(x[1], y[1]),
            safe_divide(x[2], y[2]),
        ]),
        _ => PortValue::Number(safe_divide(a.as_number(), b.as_number())),
    }
}

/// The output kind an arithmetic node produces for its inputs.
fn arithmetic_kind(inputs: &[ValueLoop]) -> ValueKind {
    inputs.first().map_or(ValueKind::Number, ValueLoop::kind)
}

/// Elementwise addition across all inputs.
pub fn add_eval(args: EvalArgs<'_>) -> EvalOutcome {
    let kind = arithmetic_kind(args.inputs);
    looped_eval(args.inputs, &[kind], |row, _| {
        let mut acc = kind.default_value();
        for value in row {
            acc = add_values(&acc, value);
        }
        OpResult::single(acc)
    })
}

/// Elementwise multiplication across all inputs.
pub fn multiply_eval(args: EvalArgs<'_>) -> EvalOutcome {
    let kind = arithmetic_kind(args.inputs);
    looped_eval(args.inputs, &[kind], |row, _| {
        let mut acc = row.first().cloned().unwrap_or_else(|| kind.default_value());
        for value in &row[1..] {
            acc = multiply_values(&acc, value);
        }
        OpResult::single(acc)
    })
}

/// Elementwise division of the first input by the second.
pub fn divide_eval(args: EvalArgs<'_>) -> EvalOutcome {
    let kind = arithmetic_kind(args.inputs);
    looped_eval(args.inputs, &[kind], |row, _| {
        OpResult::single(divide_values(&row[0], &row[1]))
    })
}

/// Combine x/y/z number loops into one 3D point loop.
pub fn pack3_eval(args: EvalArgs<'_>) -> EvalOutcome {
    looped_eval(args.inputs, &[ValueKind::Point3D], |row, _| {
        OpResult::single(PortValue::Point3D([
            row[0].as_number(),
            row[1].as_number(),
            row[2].as_number(),
        ]))
    })
}

/// Split a 3D point loop into x/y/z number loops; the exact inverse of
/// [`pack3_eval`].
pub fn unpack3_eval(args: EvalArgs<'_>) -> EvalOutcome {
    let kinds = [ValueKind::Number; 3];
    looped_eval(args.inputs, &kinds, |row, _| {
        let [x, y, z] = row[0].as_point3d();
        OpResult::values(vec![
            PortValue::Number(x),
            PortValue::Number(y),
            PortValue::Number(z),
        ])
    })
}

/// Map a value between two ranges into normalized progress.
///
/// A zero-width source range resolves to `0`, never `NaN`.
pub fn progress_eval(args: EvalArgs<'_>) -> EvalOutcome {
    looped_eval(args.inputs, &[ValueKind::Number], |row, _| {
        let value = row[0].as_number();
        let start = row[1].as_number();
        let end = row[2].as_number();
        OpResult::single(PortValue::Number(normalized((value - start) / (end - start))))
    })
}

/// Map normalized progress between two range endpoints.
pub fn transition_eval(args: EvalArgs<'_>) -> EvalOutcome {
    looped_eval(args.inputs, &[ValueKind::Number], |row, _| {
        let progress = row[0].as_number();
        let start = row[1].as_number();
        let end = row[2].as_number();
        OpResult::single(PortValue::Number(normalized(start + progress * (end - start))))
    })
}

/// Elementwise equality within a threshold.
pub fn equals_eval(args: EvalArgs<'_>) -> EvalOutcome {
    looped_eval(args.inputs, &[ValueKind::Bool], |row, _| {
        let a = row[0].as_number();
        let b = row[1].as_number();
        let threshold = row[2].as_number().abs();
        OpResult::single(PortValue::Bool((a - b).abs() <= threshold))
    })
}

/// Pick between the option inputs by wrapped index.
pub fn option_picker_eval(args: EvalArgs<'_>) -> EvalOutcome {
    looped_eval(args.inputs, &[ValueKind::Number], |row, _| {
        let options = &row[1..];
        let picked = wrap_index(row[0].as_number() as i64, options.len());
        OpResult::single(options[picked].clone())
    })
}

/// Select elements of the input loop by an index loop.
///
/// This kind opts in to the "primary loop" override: both outputs take
/// the length of the index loop, not the broadcast maximum. Index values
/// are wrapped first, so positive overflow and negative indices both
/// resolve to a valid element. The second output is the all-zero
/// index-acknowledgement loop.
pub fn loop_select_eval(args: EvalArgs<'_>) -> EvalOutcome {
    let value_loop = &args.inputs[0];
    let index_loop = &args.inputs[1];

    let mut selected = Vec::with_capacity(index_loop.len());
    let mut acknowledgement = Vec::with_capacity(index_loop.len());
    for index_value in index_loop.values() {
        let index = index_value.as_number() as i64;
        selected.push(value_loop.element_at(index).clone());
        acknowledgement.push(PortValue::Number(0.0));
    }

    EvalOutcome::outputs(vec![
        ValueLoop::new(value_loop.kind(), selected),
        ValueLoop::new(ValueKind::Number, acknowledgement),
    ])
}
