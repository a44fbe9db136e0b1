// SPDX-License-Identifier: MIT OR Apache-2.0
//! Async media evaluation coordinator.
//!
//! A few node kinds perform work too expensive to run synchronously per
//! tick (decoding an imported asset, rasterizing a drawing). The
//! coordinator runs that work on background threads and delivers results
//! back to the evaluation context through a channel, so scheduler
//! progress never blocks and a stale result can never overwrite a newer
//! one.

use parking_lot::Mutex;
use patchwire_graph::{MediaRef, NodeId};
use std::collections::HashMap;
use tokio::sync::mpsc;
use tracing::warn;

/// Errors from a background media computation.
#[derive(Debug, Clone, thiserror::Error)]
pub enum MediaError {
    /// Asset file missing.
    #[error("Asset not found: {0}")]
    NotFound(String),
    /// Asset could not be decoded.
    #[error("Failed to decode media: {0}")]
    Decode(String),
    /// The computation observed that its key was superseded.
    #[error("Computation superseded")]
    Superseded,
}

/// A completed background computation, keyed back to the loop index that
/// requested it.
#[derive(Debug)]
pub struct MediaCompletion {
    /// Node that scheduled the computation.
    pub node: NodeId,
    /// Loop index within that node.
    pub loop_index: usize,
    /// Generation stamp handed out by [`MediaCoordinator::schedule`].
    pub generation: u64,
    /// Outcome of the computation.
    pub result: Result<MediaRef, MediaError>,
}

/// Schedules and tracks background media computations.
///
/// Each `(node, loop_index)` key carries a generation counter. Starting
/// a new computation bumps the generation; a completion is authoritative
/// only while its generation is still current, so the most recently
/// started computation always wins regardless of completion order.
/// Completions re-enter the evaluation context via
/// [`MediaCoordinator::drain`]; background threads never touch node
/// state directly.
pub struct MediaCoordinator {
    generations: Mutex<HashMap<(NodeId, usize), u64>>,
    next_generation: Mutex<u64>,
    tx: mpsc::UnboundedSender<MediaCompletion>,
    rx: Mutex<mpsc::UnboundedReceiver<MediaCompletion>>,
}

impl Default for MediaCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaCoordinator {
    /// Create a coordinator with an empty completion queue.
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            generations: Mutex::new(HashMap::new()),
            next_generation: Mutex::new(0),
            tx,
            rx: Mutex::new(rx),
        }
    }

    /// Schedule a computation for a `(node, loop_index)` key.
    ///
    /// Returns immediately with the new generation stamp; the caller
    /// keeps showing its last-known-good value until the completion is
    /// drained and applied (stale-while-revalidate). Any previously
    /// scheduled computation for the same key is invalidated, though its
    /// thread may still run to completion as a no-op.
    pub fn schedule<F>(&self, node: NodeId, loop_index: usize, compute: F) -> u64
    where
        F: FnOnce() -> Result<MediaRef, MediaError> + Send + 'static,
    {
        let generation = {
            let mut next = self.next_generation.lock();
            *next += 1;
            *next
        };
        self.generations
            .lock()
            .insert((node, loop_index), generation);

        let tx = self.tx.clone();
        std::thread::spawn(move || {
            let result = compute();
            // The receiver only drops when the document closes.
            let _ = tx.send(MediaCompletion {
                node,
                loop_index,
                generation,
                result,
            });
        });

        generation
    }

    /// Whether a generation stamp is still the most recent for its key.
    pub fn is_current(&self, node: NodeId, loop_index: usize, generation: u64) -> bool {
        self.generations.lock().get(&(node, loop_index)) == Some(&generation)
    }

    /// Drop every key belonging to a node, cancelling its in-flight
    /// computations (their completions become no-ops).
    pub fn invalidate_node(&self, node: NodeId) {
        self.generations.lock().retain(|(id, _), _| *id != node);
    }

    /// Drop all keys, e.g. on prototype restart.
    pub fn invalidate_all(&self) {
        self.generations.lock().clear();
    }

    /// Collect completions that are still authoritative.
    ///
    /// Stale completions (superseded generation or invalidated key) are
    /// discarded here; failures are logged and passed through so the
    /// caller can decide between holding the stale value and writing the
    /// "no media" sentinel.
    pub fn drain(&self) -> Vec<MediaCompletion> {
        let mut rx = self.rx.lock();
        let mut fresh = Vec::new();
        while let Ok(completion) = rx.try_recv() {
            if !self.is_current(completion.node, completion.loop_index, completion.generation) {
                warn!(
                    node = ?completion.node,
                    loop_index = completion.loop_index,
                    "discarding stale media completion"
                );
                continue;
            }
            if let Err(err) = &completion.result {
                warn!(node = ?completion.node, %err, "media computation failed");
            }
            fresh.push(completion);
        }
        fresh
    }

    /// Number of keys with an in-flight or completed-but-undrained
    /// computation.
    pub fn tracked_keys(&self) -> usize {
        self.generations.lock().len()
    }
}
