// SPDX-License-Identifier: MIT OR Apache-2.0
//! Looped-eval combinator aligning unequal-length input loops over a
//! per-index operation.

use super::EvalOutcome;
use patchwire_graph::{broadcast_length, PortValue, ValueKind, ValueLoop};

/// The result of one per-index operation.
#[derive(Debug, Clone)]
pub struct OpResult {
    /// One value per output port.
    pub values: Vec<PortValue>,
    /// Request a follow-up evaluation this tick.
    pub run_again: bool,
}

impl OpResult {
    /// A multi-output result with no follow-up request.
    pub fn values(values: Vec<PortValue>) -> Self {
        Self {
            values,
            run_again: false,
        }
    }

    /// A single-output result with no follow-up request.
    pub fn single(value: PortValue) -> Self {
        Self::values(vec![value])
    }
}

/// Apply a per-index operation across input loops of possibly unequal
/// length.
///
/// Computes the broadcast length `n` (max of input lengths), gathers the
/// index-wrapped element of every input for each `i in 0..n`, calls
/// `op`, and collects the `n` results column-wise into one output loop
/// per entry of `output_kinds`. A `run_again` request from any index
/// carries through to the outcome.
pub fn looped_eval<F>(inputs: &[ValueLoop], output_kinds: &[ValueKind], mut op: F) -> EvalOutcome
where
    F: FnMut(&[PortValue], usize) -> OpResult,
{
    let loops: Vec<&ValueLoop> = inputs.iter().collect();
    let n = broadcast_length(&loops);

    let mut columns: Vec<Vec<PortValue>> = output_kinds.iter().map(|_| Vec::with_capacity(n)).collect();
    let mut run_again = false;

    let mut row = Vec::with_capacity(inputs.len());
    for i in 0..n {
        row.clear();
        for input in inputs {
            row.push(input.element_at(i as i64).clone());
        }
        let result = op(&row, i);
        run_again |= result.run_again;
        for (j, kind) in output_kinds.iter().enumerate() {
            let value = result
                .values
                .get(j)
                .cloned()
                .unwrap_or_else(|| kind.default_value());
            columns[j].push(value);
        }
    }

    EvalOutcome {
        outputs: output_kinds
            .iter()
            .zip(columns)
            .map(|(kind, values)| ValueLoop::new(*kind, values))
            .collect(),
        run_again,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use patchwire_graph::normalized;

    fn add_op(row: &[PortValue], _i: usize) -> OpResult {
        OpResult::single(PortValue::Number(normalized(
            row.iter().map(PortValue::as_number).sum(),
        )))
    }

    #[test]
    fn test_broadcast_law_two_loops() {
        let a = ValueLoop::numbers([0.0, 1.0]);
        let b = ValueLoop::numbers([0.0, 1.0]);
        let out = looped_eval(&[a, b], &[ValueKind::Number], add_op);
        assert_eq!(
            out.outputs[0].values(),
            &[PortValue::Number(0.0), PortValue::Number(2.0)]
        );
    }

    #[test]
    fn test_broadcast_law_unequal_lengths() {
        // Loops of lengths 2, 2 and 3: shorter loops wrap.
        let a = ValueLoop::numbers([0.0, 1.0]);
        let b = ValueLoop::numbers([0.0, 1.0]);
        let c = ValueLoop::numbers([0.0, 1.0, 2.0]);
        let out = looped_eval(&[a, b, c], &[ValueKind::Number], add_op);
        assert_eq!(
            out.outputs[0].values(),
            &[
                PortValue::Number(0.0),
                PortValue::Number(3.0),
                PortValue::Number(2.0)
            ]
        );
    }

    #[test]
    fn test_missing_output_value_defaults() {
        let a = ValueLoop::numbers([1.0]);
        let out = looped_eval(
            &[a],
            &[ValueKind::Number, ValueKind::Bool],
            |row, _| OpResult::single(row[0].clone()),
        );
        assert_eq!(out.outputs[1].values(), &[PortValue::Bool(false)]);
    }

    #[test]
    fn test_run_again_carries_through() {
        let a = ValueLoop::numbers([1.0, 2.0]);
        let out = looped_eval(&[a], &[ValueKind::Number], |row, i| OpResult {
            values: vec![row[0].clone()],
            run_again: i == 1,
        });
        assert!(out.run_again);
    }
}
