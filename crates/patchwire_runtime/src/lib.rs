// SPDX-License-Identifier: MIT OR Apache-2.0
//! Evaluation engine for the Patchwire dataflow runtime.
//!
//! This crate drives graphs defined by `patchwire_graph`:
//! - The [`Scheduler`] owning a graph and running dependency-ordered
//!   recalculation passes on edits and clock ticks
//! - Per-kind evaluation functions in an [`EvalRegistry`], wrapped in
//!   the loop-broadcasting combinator
//! - The [`GraphClock`] and pulse activity rule
//! - Externally recorded [`InteractionState`]
//! - The [`MediaCoordinator`] for expensive background computations
//!
//! ## Architecture
//!
//! All node evaluation runs synchronously on the caller's context; each
//! pass evaluates every dirty node exactly once in dependency order,
//! plus at most one follow-up pass for `run_again` requests. Only media
//! computations run on background threads, and their results re-enter
//! the evaluation context between passes with stale results discarded.

pub mod clock;
pub mod eval;
pub mod interaction;
pub mod media;
pub mod scheduler;

pub use clock::GraphClock;
pub use eval::{
    AnimationTrack, EvalArgs, EvalFn, EvalOutcome, EvalRegistry, MediaSlot, NodeState,
};
pub use interaction::{InteractionState, LayerInteraction};
pub use media::{MediaCompletion, MediaCoordinator, MediaError};
pub use scheduler::{Scheduler, SchedulerError};
