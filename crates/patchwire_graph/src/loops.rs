// SPDX-License-Identifier: MIT OR Apache-2.0
//! The loop container: a non-empty ordered sequence of values held by a
//! port, plus the index-wrap rules used for broadcast alignment.

use crate::value::{PortValue, ValueKind};
use serde::{Deserialize, Serialize};

/// A non-empty ordered sequence of [`PortValue`] of one kind.
///
/// A loop of length 1 represents a scalar. Constructors enforce
/// non-emptiness: an empty input is replaced by one default element of
/// the declared kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueLoop {
    kind: ValueKind,
    values: Vec<PortValue>,
}

impl ValueLoop {
    /// Create a loop of the given kind from a value list.
    ///
    /// An empty list yields a single default element.
    pub fn new(kind: ValueKind, values: Vec<PortValue>) -> Self {
        if values.is_empty() {
            return Self::default_of(kind);
        }
        Self { kind, values }
    }

    /// A length-1 loop holding the kind's default value.
    pub fn default_of(kind: ValueKind) -> Self {
        Self {
            kind,
            values: vec![kind.default_value()],
        }
    }

    /// A length-1 loop holding a single value.
    pub fn scalar(value: PortValue) -> Self {
        Self {
            kind: value.kind(),
            values: vec![value],
        }
    }

    /// A loop of numbers.
    pub fn numbers(values: impl IntoIterator<Item = f64>) -> Self {
        Self::new(
            ValueKind::Number,
            values.into_iter().map(PortValue::Number).collect(),
        )
    }

    /// The value kind of every element.
    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    /// Number of elements; always at least 1.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// A loop is never empty; kept for API completeness.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// The elements in order.
    pub fn values(&self) -> &[PortValue] {
        &self.values
    }

    /// Element at an index, wrapping with the rule in [`wrap_index`]:
    /// out-of-range positive indices wrap modulo the length, `-1` is the
    /// last element and `-(n+1)` resolves the same as `-1`.
    pub fn element_at(&self, index: i64) -> &PortValue {
        &self.values[wrap_index(index, self.values.len())]
    }

    /// Replace the element at an in-range index.
    pub fn set_at(&mut self, index: usize, value: PortValue) {
        if index < self.values.len() {
            self.values[index] = value;
        }
    }
}

/// Broadcast length of a set of loops: the maximum element count.
///
/// Guarded to 1 when called with no loops, so the result is always a
/// valid loop length.
pub fn broadcast_length(loops: &[&ValueLoop]) -> usize {
    loops.iter().map(|l| l.len()).max().unwrap_or(1)
}

/// Wrap an arbitrary integer index into `0..len`.
///
/// Floor-style modulo: positive overflow wraps around, `-1` resolves to
/// the last element, and `-(len + 1)` resolves the same as `-1`. `len`
/// must be non-zero, which every loop guarantees.
pub fn wrap_index(index: i64, len: usize) -> usize {
    let len = len as i64;
    let r = index % len;
    if r < 0 {
        (r + len) as usize
    } else {
        r as usize
    }
}

/// Divide-by-zero-safe remainder: `safe_modulo(x, 0) == 0`.
pub fn safe_modulo(x: f64, m: f64) -> f64 {
    if m == 0.0 {
        0.0
    } else {
        crate::value::normalized(x % m)
    }
}
