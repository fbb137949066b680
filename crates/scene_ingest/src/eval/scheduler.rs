//! Dirty-propagating scheduler over an [`EvaluationGraph`].
use tracing::{debug, trace};

use crate::eval::builder::EvaluationGraph;
use crate::eval::context::EvalContext;
use crate::eval::registry::EvalNodeRegistry;
use crate::graph::SceneGraph;

/// Outcome of one sweep.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EvalReport {
    /// Names of nodes that ran, in execution order.
    pub executed: Vec<String>,
    /// Number of nodes that were clean and skipped.
    pub skipped: usize,
    /// Whether the context time differed from the previous sweep.
    pub time_changed: bool,
}

impl EvalReport {
    pub fn executed_count(&self) -> usize {
        self.executed.len()
    }

    pub fn ran(&self, name: &str) -> bool {
        self.executed.iter().any(|n| n == name)
    }
}

/// Runs each node at most once per sweep, in dependency order, and only when dirty.
#[derive(Debug)]
pub struct Scheduler {
    graph: EvaluationGraph,
    last_time: Option<f64>,
}

impl Scheduler {
    pub fn new(graph: EvaluationGraph) -> Self {
        Self {
            graph,
            last_time: None,
        }
    }

    /// Builds the graph for `scene` and wraps it.
    pub fn for_scene(scene: &SceneGraph, registry: &EvalNodeRegistry) -> Self {
        Self::new(EvaluationGraph::build(scene, registry))
    }

    pub fn graph(&self) -> &EvaluationGraph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut EvaluationGraph {
        &mut self.graph
    }

    pub fn into_graph(self) -> EvaluationGraph {
        self.graph
    }

    /// Time observed by the last sweep, if any.
    pub fn last_time(&self) -> Option<f64> {
        self.last_time
    }

    /// Re-syncs the graph with structural changes in `scene`. Never runs mid-sweep.
    pub fn rebuild(&mut self, scene: &SceneGraph) {
        self.graph.rebuild(scene);
    }

    /// Runs one sweep.
    ///
    /// The first sweep counts as a time change. Dirty paths marked during the
    /// sweep are published on `ctx` and the pending set is cleared.
    pub fn evaluate(&mut self, scene: &mut SceneGraph, ctx: &mut EvalContext) -> EvalReport {
        let time_changed = self.last_time != Some(ctx.time());
        if time_changed {
            let mut marked = 0usize;
            for node in self.graph.nodes.iter_mut().filter(|n| n.is_time_driven()) {
                node.mark_dirty();
                marked += 1;
            }
            trace!("Time is {}; marked {} time-driven nodes dirty.", ctx.time(), marked);
            self.last_time = Some(ctx.time());
        }

        let mut report = EvalReport {
            time_changed,
            ..Default::default()
        };

        let graph = &mut self.graph;
        for &i in &graph.order {
            let node = &mut graph.nodes[i];
            if node.evaluate_if_needed(&graph.inputs[i], scene, ctx) {
                report.executed.push(node.name().to_owned());
            } else {
                report.skipped += 1;
            }
        }

        ctx.publish();
        debug!(
            "Sweep at t={}: {} executed, {} skipped.",
            ctx.time(),
            report.executed.len(),
            report.skipped
        );
        report
    }
}
