// SPDX-License-Identifier: MIT OR Apache-2.0
//! Dependency-ordered recalculation scheduler.
//!
//! The scheduler owns the graph and drives every recalculation pass:
//! a discrete edit (value set, edge or node added/removed) dirties the
//! changed nodes and everything downstream of them; a clock tick
//! additionally dirties every time-driven node. Each pass runs
//! `CollectingDirty -> TopoSorting -> Evaluating -> Idle` on the single
//! evaluation context, evaluating every dirty node exactly once in
//! dependency order. Background media completions re-enter here between
//! passes and are applied only while still authoritative.

use crate::clock::GraphClock;
use crate::eval::{EvalArgs, EvalRegistry, NodeState};
use crate::interaction::InteractionState;
use crate::media::{MediaCompletion, MediaCoordinator};
use patchwire_graph::{
    Edge, EdgeId, Graph, GraphError, MediaRef, Node, NodeId, NodeKind, PortAddress, PortValue,
    ValueLoop,
};
use std::collections::{HashMap, HashSet};
use tracing::{debug, error, trace};

/// Error from a recalculation pass or a graph edit.
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    /// The edge graph contains a cycle; the affected component's
    /// evaluation was skipped and its outputs left unchanged.
    #[error("Graph contains a cycle; evaluation skipped")]
    Cycle,

    /// No evaluation function registered for a node kind.
    #[error("No evaluation function registered for {0:?}")]
    UnknownKind(NodeKind),

    /// The underlying graph edit failed.
    #[error(transparent)]
    Graph(#[from] GraphError),
}

/// The evaluation engine for one open document.
///
/// Owns the graph, the node-kind registry, all ephemeral node state,
/// the clock, interaction state and the media coordinator. All
/// evaluation runs synchronously on the caller's context; only media
/// computations leave it, and their results re-enter through
/// [`MediaCoordinator::drain`].
pub struct Scheduler {
    graph: Graph,
    registry: EvalRegistry,
    states: HashMap<NodeId, NodeState>,
    clock: GraphClock,
    interaction: InteractionState,
    media: MediaCoordinator,
}

impl Scheduler {
    /// Create a scheduler over a seeded graph and run the initial full
    /// pass so every output reflects the seeded literals.
    pub fn new(graph: Graph) -> Result<Self, SchedulerError> {
        let mut scheduler = Self {
            graph,
            registry: EvalRegistry::with_builtin_kinds(),
            states: HashMap::new(),
            clock: GraphClock::new(),
            interaction: InteractionState::new(),
            media: MediaCoordinator::new(),
        };
        scheduler.recalculate_all()?;
        Ok(scheduler)
    }

    /// Create a scheduler over an empty graph.
    pub fn empty() -> Self {
        Self {
            graph: Graph::new(),
            registry: EvalRegistry::with_builtin_kinds(),
            states: HashMap::new(),
            clock: GraphClock::new(),
            interaction: InteractionState::new(),
            media: MediaCoordinator::new(),
        }
    }

    /// The graph being evaluated.
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// The current clock.
    pub fn clock(&self) -> GraphClock {
        self.clock
    }

    /// Interaction state, written by the renderer between ticks.
    pub fn interaction_mut(&mut self) -> &mut InteractionState {
        &mut self.interaction
    }

    /// Current value of an output port at a loop index, the read
    /// interface the renderer draws from.
    pub fn output_value(&self, node: NodeId, port: usize, index: usize) -> Option<&PortValue> {
        self.graph.node(node)?.output(port)?.value.values().get(index)
    }

    /// Add a node and recalculate it.
    pub fn add_node(&mut self, node: Node) -> Result<NodeId, SchedulerError> {
        let id = self.graph.add_node(node);
        self.recalculate(HashSet::from([id]))?;
        Ok(id)
    }

    /// Remove a node, its edges, its ephemeral state and its in-flight
    /// media work, then recalculate its former dependents.
    pub fn remove_node(&mut self, id: NodeId) -> Result<(), SchedulerError> {
        let dependents: HashSet<NodeId> = self
            .graph
            .edges_from_node(id)
            .map(|edge| edge.to.node)
            .collect();
        self.graph.remove_node(id);
        self.states.remove(&id);
        self.media.invalidate_node(id);
        self.interaction.remove_layer(id);
        self.recalculate(dependents)
    }

    /// Connect two ports and recalculate downstream of the destination.
    pub fn add_edge(&mut self, from: PortAddress, to: PortAddress) -> Result<EdgeId, SchedulerError> {
        let id = self.graph.add_edge(from, to)?;
        self.recalculate(HashSet::from([to.node]))?;
        Ok(id)
    }

    /// Remove an edge and recalculate its former destination, which
    /// falls back to its literal.
    pub fn remove_edge(&mut self, id: EdgeId) -> Result<Option<Edge>, SchedulerError> {
        let removed = self.graph.remove_edge(id);
        if let Some(edge) = removed {
            self.recalculate(HashSet::from([edge.to.node]))?;
        }
        Ok(removed)
    }

    /// Set a literal on an input port and recalculate its node.
    pub fn set_literal(&mut self, at: PortAddress, value: ValueLoop) -> Result<(), SchedulerError> {
        self.graph.set_literal(at, value)?;
        self.recalculate(HashSet::from([at.node]))
    }

    /// Advance simulation time by one display tick.
    ///
    /// Applies any authoritative media completions, then re-evaluates
    /// every time-driven node plus everything dirtied by completions.
    pub fn tick(&mut self, delta: f64) -> Result<(), SchedulerError> {
        self.clock.advance(delta);
        let mut roots = self.apply_media_completions();
        roots.extend(
            self.graph
                .nodes()
                .filter(|node| node.kind.is_time_driven())
                .map(|node| node.id),
        );
        self.recalculate(roots)
    }

    /// Prototype restart: zero the clock, clear ephemeral and
    /// interaction state, cancel in-flight media, and force every
    /// output loop to its kind's default in one pass.
    ///
    /// The forced reset bypasses the dirty-node optimization on purpose:
    /// several kinds (counters, toggles) read their own previous output
    /// as state, so stale outputs must not survive.
    pub fn restart(&mut self) -> Result<(), SchedulerError> {
        self.clock.reset();
        self.states.clear();
        self.interaction.reset();
        self.media.invalidate_all();
        for node in self.graph.nodes_mut() {
            for output in &mut node.outputs {
                output.value = ValueLoop::default_of(output.kind);
            }
        }
        self.recalculate_all()
    }

    fn recalculate_all(&mut self) -> Result<(), SchedulerError> {
        let roots: HashSet<NodeId> = self.graph.node_ids().collect();
        self.recalculate(roots)
    }

    /// One recalculation pass over the dirty closure of `roots`.
    fn recalculate(&mut self, roots: HashSet<NodeId>) -> Result<(), SchedulerError> {
        if roots.is_empty() {
            return Ok(());
        }

        trace!("pass: collecting dirty nodes");
        let dirty = self.graph.downstream_closure(&roots);

        trace!("pass: topological sort");
        let order = self.sorted_dirty(&dirty)?;
        debug!(dirty = dirty.len(), "recalculation pass");

        let mut run_again = HashSet::new();
        for id in order {
            if self.evaluate_node(id)? {
                run_again.insert(id);
            }
        }

        // One immediate follow-up pass for run-again requests; a second
        // request waits for the next trigger.
        if !run_again.is_empty() {
            debug!(nodes = run_again.len(), "run-again follow-up pass");
            let dirty = self.graph.downstream_closure(&run_again);
            let order = self.sorted_dirty(&dirty)?;
            for id in order {
                self.evaluate_node(id)?;
            }
        }

        Ok(())
    }

    /// Dependency order restricted to the dirty subset.
    fn sorted_dirty(&self, dirty: &HashSet<NodeId>) -> Result<Vec<NodeId>, SchedulerError> {
        match self.graph.topological_order() {
            Ok(order) => Ok(order.into_iter().filter(|id| dirty.contains(id)).collect()),
            Err(_) => {
                error!("cycle detected in edge graph; skipping evaluation pass");
                debug_assert!(false, "cycle in edge graph reached the scheduler");
                Err(SchedulerError::Cycle)
            }
        }
    }

    /// Evaluate one node: resolve inputs, invoke its registered
    /// function, write back input and output loops. Returns the node's
    /// run-again request.
    fn evaluate_node(&mut self, id: NodeId) -> Result<bool, SchedulerError> {
        let Some(node) = self.graph.node(id) else {
            return Ok(false);
        };
        let kind = node.kind;
        let eval_fn = self
            .registry
            .get(kind)
            .ok_or(SchedulerError::UnknownKind(kind))?;

        // Resolve inputs: upstream edge value (coerced when the kinds
        // differ), else the user literal.
        let mut inputs = Vec::with_capacity(node.inputs.len());
        for (index, port) in node.inputs.iter().enumerate() {
            let address = PortAddress::new(id, index);
            let resolved = match self.graph.upstream_edge(address) {
                Some(edge) => {
                    let source = self
                        .graph
                        .node(edge.from.node)
                        .and_then(|n| n.output(edge.from.port));
                    match source {
                        Some(output) if output.kind == port.kind => output.value.clone(),
                        Some(output) => ValueLoop::new(
                            port.kind,
                            output
                                .value
                                .values()
                                .iter()
                                .map(|v| v.coerced_to(port.kind))
                                .collect(),
                        ),
                        // Missing upstream node is a structural error;
                        // hold the default rather than evaluate garbage.
                        None => {
                            error!(node = ?id, input = index, "upstream port missing");
                            ValueLoop::default_of(port.kind)
                        }
                    }
                }
                None => port.literal.clone(),
            };
            inputs.push(resolved);
        }

        let prior: Vec<ValueLoop> = node.outputs.iter().map(|o| o.value.clone()).collect();
        let state = self.states.entry(id).or_default();

        let outcome = eval_fn(EvalArgs {
            node_id: id,
            inputs: &inputs,
            prior_outputs: &prior,
            state,
            clock: self.clock,
            interaction: &self.interaction,
            media: &self.media,
        });

        let Some(node) = self.graph.node_mut(id) else {
            return Ok(false);
        };
        for (port, resolved) in node.inputs.iter_mut().zip(inputs) {
            port.value = resolved;
        }
        for (index, port) in node.outputs.iter_mut().enumerate() {
            if let Some(value) = outcome.outputs.get(index) {
                port.value = value.clone();
            }
        }

        Ok(outcome.run_again)
    }

    /// Apply authoritative media completions to their nodes' output
    /// loops and media slots. Returns the set of nodes whose outputs
    /// changed, to be used as dirty roots.
    fn apply_media_completions(&mut self) -> HashSet<NodeId> {
        let mut roots = HashSet::new();
        for completion in self.media.drain() {
            if self.apply_media_completion(&completion) {
                roots.insert(completion.node);
            }
        }
        roots
    }

    fn apply_media_completion(&mut self, completion: &MediaCompletion) -> bool {
        // The node or loop index may have been deleted since the
        // computation started; completion is then a no-op.
        let Some(node) = self.graph.node_mut(completion.node) else {
            return false;
        };
        let Some(output) = node.outputs.first_mut() else {
            return false;
        };
        if completion.loop_index >= output.value.len() {
            return false;
        }

        let state = self.states.entry(completion.node).or_default();
        let slots = state.media_mut(completion.loop_index + 1);
        let slot = &mut slots[completion.loop_index];
        slot.pending = None;

        match &completion.result {
            Ok(media) => {
                slot.current = media.clone();
            }
            Err(_) => {
                // Hold the last good value; a slot that never loaded
                // degrades to the "no media" sentinel.
                if slot.current == MediaRef::Loading {
                    slot.current = MediaRef::None;
                } else {
                    return false;
                }
            }
        }

        output
            .value
            .set_at(completion.loop_index, PortValue::Media(slot.current.clone()));
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn init_tracing() {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    }

    fn number_output(scheduler: &Scheduler, node: NodeId) -> Vec<f64> {
        scheduler
            .graph()
            .node(node)
            .unwrap()
            .outputs[0]
            .value
            .values()
            .iter()
            .map(PortValue::as_number)
            .collect()
    }

    #[test]
    fn test_edit_triggers_recalculation_through_chain() {
        init_tracing();
        let mut scheduler = Scheduler::empty();
        let add = scheduler.add_node(Node::new(NodeKind::Add)).unwrap();
        let divide = scheduler.add_node(Node::new(NodeKind::Divide)).unwrap();
        scheduler
            .add_edge(PortAddress::new(add, 0), PortAddress::new(divide, 0))
            .unwrap();

        scheduler
            .set_literal(PortAddress::new(add, 0), ValueLoop::numbers([4.0]))
            .unwrap();
        scheduler
            .set_literal(PortAddress::new(add, 1), ValueLoop::numbers([2.0]))
            .unwrap();
        scheduler
            .set_literal(PortAddress::new(divide, 1), ValueLoop::numbers([3.0]))
            .unwrap();

        // Every edit ran exactly one pass; the chain is already current.
        assert_eq!(number_output(&scheduler, add), vec![6.0]);
        assert_eq!(number_output(&scheduler, divide), vec![2.0]);

        // A new upstream literal propagates before the next read.
        scheduler
            .set_literal(PortAddress::new(add, 0), ValueLoop::numbers([7.0]))
            .unwrap();
        assert_eq!(number_output(&scheduler, divide), vec![3.0]);
    }

    #[test]
    fn test_edge_removal_falls_back_to_literal() {
        let mut scheduler = Scheduler::empty();
        let add = scheduler.add_node(Node::new(NodeKind::Add)).unwrap();
        let divide = scheduler.add_node(Node::new(NodeKind::Divide)).unwrap();
        let edge = scheduler
            .add_edge(PortAddress::new(add, 0), PortAddress::new(divide, 0))
            .unwrap();
        scheduler
            .set_literal(PortAddress::new(add, 0), ValueLoop::numbers([8.0]))
            .unwrap();
        scheduler
            .set_literal(PortAddress::new(divide, 0), ValueLoop::numbers([2.0]))
            .unwrap();
        scheduler
            .set_literal(PortAddress::new(divide, 1), ValueLoop::numbers([2.0]))
            .unwrap();
        assert_eq!(number_output(&scheduler, divide), vec![4.0]);

        scheduler.remove_edge(edge).unwrap();
        assert_eq!(number_output(&scheduler, divide), vec![1.0]);
    }

    #[test]
    fn test_tick_drives_time_driven_nodes() {
        let mut scheduler = Scheduler::empty();
        let pulse = scheduler
            .add_node(Node::new(NodeKind::RepeatingPulse))
            .unwrap();
        let toggle = scheduler.add_node(Node::new(NodeKind::Toggle)).unwrap();
        scheduler
            .set_literal(PortAddress::new(pulse, 0), ValueLoop::numbers([1.0]))
            .unwrap();
        scheduler
            .add_edge(PortAddress::new(pulse, 0), PortAddress::new(toggle, 0))
            .unwrap();

        // First second: fires once, toggle flips on.
        scheduler.tick(0.6).unwrap();
        scheduler.tick(0.6).unwrap();
        let on = scheduler.output_value(toggle, 0, 0).unwrap();
        assert_eq!(on, &PortValue::Bool(true));

        // Next firing flips it back off.
        scheduler.tick(1.0).unwrap();
        let on = scheduler.output_value(toggle, 0, 0).unwrap();
        assert_eq!(on, &PortValue::Bool(false));
    }

    #[test]
    fn test_restart_resets_outputs_and_state() {
        let mut scheduler = Scheduler::empty();
        let pulse = scheduler
            .add_node(Node::new(NodeKind::RepeatingPulse))
            .unwrap();
        let counter = scheduler.add_node(Node::new(NodeKind::Counter)).unwrap();
        scheduler
            .set_literal(PortAddress::new(pulse, 0), ValueLoop::numbers([1.0]))
            .unwrap();
        scheduler
            .add_edge(PortAddress::new(pulse, 0), PortAddress::new(counter, 0))
            .unwrap();

        for _ in 0..4 {
            scheduler.tick(1.0).unwrap();
        }
        assert!(number_output(&scheduler, counter)[0] > 0.0);

        scheduler.restart().unwrap();
        // Counter reads its previous output as state; the forced reset
        // must clear it even though its inputs did not change.
        assert_eq!(number_output(&scheduler, counter), vec![0.0]);
        assert_eq!(scheduler.clock().graph_time, 0.0);
        assert_eq!(
            scheduler.output_value(pulse, 0, 0).unwrap(),
            &PortValue::Pulse(0.0)
        );
    }

    #[test]
    fn test_interaction_flows_into_outputs() {
        let mut scheduler = Scheduler::empty();
        let drag = scheduler
            .add_node(Node::new(NodeKind::DragInteraction))
            .unwrap();
        // A stand-in layer node the drag patch is assigned to.
        let layer = scheduler.add_node(Node::new(NodeKind::Add)).unwrap();
        scheduler
            .set_literal(
                PortAddress::new(drag, 0),
                ValueLoop::scalar(PortValue::LayerRef(Some(layer))),
            )
            .unwrap();

        scheduler.interaction_mut().record_drag(layer, [12.0, 34.0]);
        scheduler.tick(1.0 / 60.0).unwrap();
        assert_eq!(
            scheduler.output_value(drag, 0, 0).unwrap(),
            &PortValue::Position([12.0, 34.0])
        );
    }

    #[test]
    fn test_tap_pulse_drives_toggle() {
        let mut scheduler = Scheduler::empty();
        let press = scheduler
            .add_node(Node::new(NodeKind::PressInteraction))
            .unwrap();
        let toggle = scheduler.add_node(Node::new(NodeKind::Toggle)).unwrap();
        // A stand-in layer node the press patch is assigned to.
        let layer = scheduler.add_node(Node::new(NodeKind::Add)).unwrap();
        scheduler
            .set_literal(
                PortAddress::new(press, 0),
                ValueLoop::scalar(PortValue::LayerRef(Some(layer))),
            )
            .unwrap();
        scheduler
            .add_edge(PortAddress::new(press, 1), PortAddress::new(toggle, 0))
            .unwrap();

        scheduler.tick(1.0 / 60.0).unwrap();
        assert_eq!(
            scheduler.output_value(toggle, 0, 0).unwrap(),
            &PortValue::Bool(false)
        );

        // The renderer records a release between ticks with the only
        // clock it can observe, the pre-tick time. The tap must still
        // be consumable downstream on the following tick.
        let seen = scheduler.clock().graph_time;
        scheduler.interaction_mut().record_press(layer);
        scheduler.interaction_mut().record_release(layer, seen);
        scheduler.tick(1.0 / 60.0).unwrap();
        assert_eq!(
            scheduler.output_value(toggle, 0, 0).unwrap(),
            &PortValue::Bool(true)
        );

        // Further ticks without a new tap leave the toggle alone.
        scheduler.tick(1.0 / 60.0).unwrap();
        scheduler.tick(1.0 / 60.0).unwrap();
        assert_eq!(
            scheduler.output_value(toggle, 0, 0).unwrap(),
            &PortValue::Bool(true)
        );
    }

    #[test]
    fn test_broadcast_through_scheduler() {
        let mut scheduler = Scheduler::empty();
        let add = scheduler.add_node(Node::new(NodeKind::Add)).unwrap();
        scheduler
            .set_literal(PortAddress::new(add, 0), ValueLoop::numbers([0.0, 1.0]))
            .unwrap();
        scheduler
            .set_literal(
                PortAddress::new(add, 1),
                ValueLoop::numbers([0.0, 1.0, 2.0]),
            )
            .unwrap();
        assert_eq!(number_output(&scheduler, add), vec![0.0, 2.0, 2.0]);
    }

    #[test]
    fn test_media_completion_applies_between_ticks() {
        init_tracing();
        let mut scheduler = Scheduler::empty();
        let import = scheduler.add_node(Node::new(NodeKind::ImageImport)).unwrap();
        scheduler
            .set_literal(
                PortAddress::new(import, 0),
                ValueLoop::scalar(PortValue::Text("no-such-asset.png".into())),
            )
            .unwrap();
        assert_eq!(
            scheduler.output_value(import, 0, 0).unwrap(),
            &PortValue::Media(MediaRef::Loading)
        );

        // Wait for the background decode to fail, then tick to apply.
        for _ in 0..100 {
            std::thread::sleep(Duration::from_millis(5));
            scheduler.tick(1.0 / 60.0).unwrap();
            if scheduler.output_value(import, 0, 0).unwrap()
                != &PortValue::Media(MediaRef::Loading)
            {
                break;
            }
        }
        // Never-loaded slot degrades to the "no media" sentinel.
        assert_eq!(
            scheduler.output_value(import, 0, 0).unwrap(),
            &PortValue::Media(MediaRef::None)
        );
    }

    #[test]
    fn test_removed_node_cancels_media() {
        let mut scheduler = Scheduler::empty();
        let import = scheduler.add_node(Node::new(NodeKind::ImageImport)).unwrap();
        scheduler
            .set_literal(
                PortAddress::new(import, 0),
                ValueLoop::scalar(PortValue::Text("asset.png".into())),
            )
            .unwrap();
        scheduler.remove_node(import).unwrap();
        // The completion arrives against a deleted node and is a no-op.
        std::thread::sleep(Duration::from_millis(100));
        scheduler.tick(1.0 / 60.0).unwrap();
        assert_eq!(scheduler.graph().node_count(), 0);
    }

    #[test]
    fn test_seeded_graph_evaluates_on_construction() {
        let mut graph = Graph::new();
        let add = graph.add_node(Node::new(NodeKind::Add));
        graph
            .set_literal(PortAddress::new(add, 0), ValueLoop::numbers([2.0]))
            .unwrap();
        graph
            .set_literal(PortAddress::new(add, 1), ValueLoop::numbers([3.0]))
            .unwrap();

        let scheduler = Scheduler::new(graph).unwrap();
        assert_eq!(number_output(&scheduler, add), vec![5.0]);
    }

    #[test]
    fn test_loop_select_chain_with_negative_indices() {
        let mut scheduler = Scheduler::empty();
        let select = scheduler.add_node(Node::new(NodeKind::LoopSelect)).unwrap();
        scheduler
            .set_literal(
                PortAddress::new(select, 0),
                ValueLoop::numbers([10.0, 20.0, 30.0]),
            )
            .unwrap();
        scheduler
            .set_literal(PortAddress::new(select, 1), ValueLoop::numbers([-1.0]))
            .unwrap();
        assert_eq!(number_output(&scheduler, select), vec![30.0]);
    }

    #[test]
    fn test_unconnected_node_uses_defaults() {
        let mut scheduler = Scheduler::empty();
        let divide = scheduler.add_node(Node::new(NodeKind::Divide)).unwrap();
        // 0 / 0 resolves to the documented default, not NaN.
        assert_eq!(number_output(&scheduler, divide), vec![0.0]);
    }
}
