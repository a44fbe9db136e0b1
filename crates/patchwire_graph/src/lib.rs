// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph data model for the Patchwire dataflow runtime.
//!
//! This crate defines the structures the evaluation engine operates on:
//! - The closed [`PortValue`] union and the non-empty [`ValueLoop`]
//!   sequence every port holds
//! - Typed input/output ports with user literals
//! - The [`NodeKind`] catalog with per-kind port specifications
//! - The [`Graph`] container with validated edit operations,
//!   topological ordering and snapshot serialization
//!
//! ## Architecture
//!
//! Loops are never empty; defaults are substituted wherever an empty
//! sequence would arise. Edges connect one output port to at most one
//! edge per input port, kinds must match or coerce explicitly, and
//! cycles are rejected at edit time.

pub mod edge;
pub mod graph;
pub mod loops;
pub mod node;
pub mod port;
pub mod value;

pub use edge::{Edge, EdgeId};
pub use graph::{CycleError, Graph, GraphError, SnapshotError};
pub use loops::{broadcast_length, safe_modulo, wrap_index, ValueLoop};
pub use node::{Node, NodeId, NodeKind};
pub use port::{InputPort, OutputPort, PortAddress};
pub use value::{normalized, MediaRef, PortValue, ScrollMode, ValueKind};
