//! Builds the evaluation graph and its dependency order from a scene.
//!
//! Every scene node gets one [`EvalNode`]. Connections between two distinct,
//! existing nodes become "destination depends on source" edges; the cached
//! order is a topological sort over those edges that falls back to encounter
//! order for ties and for breaking cycles.
use std::collections::{BTreeSet, HashMap, HashSet};

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::eval::node::{EvalNode, InputBinding};
use crate::eval::registry::EvalNodeRegistry;
use crate::graph::SceneGraph;

/// Evaluation nodes, their dependency edges and the cached order.
#[derive(Debug)]
pub struct EvaluationGraph {
    registry: EvalNodeRegistry,
    pub(crate) nodes: Vec<EvalNode>,
    by_name: HashMap<String, usize>,
    /// Per node: the connection driving each destination attribute.
    pub(crate) inputs: Vec<Vec<InputBinding>>,
    /// Per node: indices of nodes that depend on it.
    dependents: Vec<Vec<usize>>,
    pub(crate) order: Vec<usize>,
    revision: u64,
}

impl EvaluationGraph {
    /// Creates an EvalNode for every scene node and computes the order.
    pub fn build(scene: &SceneGraph, registry: &EvalNodeRegistry) -> Self {
        let mut graph = Self {
            registry: registry.clone(),
            nodes: Vec::with_capacity(scene.len()),
            by_name: HashMap::with_capacity(scene.len()),
            inputs: Vec::new(),
            dependents: Vec::new(),
            order: Vec::new(),
            revision: scene.revision(),
        };
        for node in scene.nodes() {
            graph.by_name.insert(node.name().to_owned(), graph.nodes.len());
            graph.nodes.push(registry.create(node));
        }
        graph.link(scene);
        graph
    }

    /// Re-syncs with `scene` after structural changes.
    ///
    /// Nodes that kept their type keep their dirty flag and behaviour state;
    /// retyped nodes get a fresh behaviour; removed names are dropped.
    pub fn rebuild(&mut self, scene: &SceneGraph) {
        let mut old: HashMap<String, EvalNode> = self
            .nodes
            .drain(..)
            .map(|n| (n.name().to_owned(), n))
            .collect();
        self.by_name.clear();

        for node in scene.nodes() {
            let eval = match old.remove(node.name()) {
                Some(mut existing) => {
                    if existing.node_type() != node.node_type() {
                        let (behavior, time_driven) = self.registry.behavior_for(node);
                        existing.replace_behavior(node.node_type(), time_driven, behavior);
                    }
                    existing
                }
                None => self.registry.create(node),
            };
            self.by_name.insert(node.name().to_owned(), self.nodes.len());
            self.nodes.push(eval);
        }

        self.revision = scene.revision();
        self.link(scene);
    }

    /// True when `scene` changed structurally since the last build.
    pub fn is_stale(&self, scene: &SceneGraph) -> bool {
        self.revision != scene.revision()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn registry(&self) -> &EvalNodeRegistry {
        &self.registry
    }

    pub fn node(&self, name: &str) -> Option<&EvalNode> {
        self.by_name.get(name).map(|&i| &self.nodes[i])
    }

    /// Nodes in scene encounter order.
    pub fn nodes(&self) -> impl Iterator<Item = &EvalNode> {
        self.nodes.iter()
    }

    /// Bindings that drive `name`'s attributes.
    pub fn inputs(&self, name: &str) -> &[InputBinding] {
        self.by_name
            .get(name)
            .map(|&i| self.inputs[i].as_slice())
            .unwrap_or(&[])
    }

    /// Flags `name` for evaluation on the next sweep.
    pub fn mark_node_dirty(&mut self, name: &str) -> Result<()> {
        let &i = self.by_name.get(name).ok_or_else(|| Error::UnknownNode {
            name: name.to_owned(),
        })?;
        self.nodes[i].mark_dirty();
        Ok(())
    }

    /// The cached evaluation order.
    pub fn evaluation_order(&self) -> impl Iterator<Item = &EvalNode> {
        self.order.iter().map(|&i| &self.nodes[i])
    }

    /// Names in cached evaluation order.
    pub fn order_names(&self) -> Vec<&str> {
        self.evaluation_order().map(EvalNode::name).collect()
    }

    /// Computes the dependency order afresh: every node exactly once, sources before destinations.
    pub fn build_evaluation_order(&self) -> Vec<&EvalNode> {
        topo_order(&self.dependents)
            .into_iter()
            .map(|i| &self.nodes[i])
            .collect()
    }

    fn link(&mut self, scene: &SceneGraph) {
        let n = self.nodes.len();
        let mut inputs: Vec<Vec<InputBinding>> = vec![Vec::new(); n];
        let mut slots: Vec<HashMap<String, usize>> = vec![HashMap::new(); n];
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut seen: HashSet<(usize, usize)> = HashSet::new();

        for c in scene.connections() {
            let Some(&dst) = self.by_name.get(&c.destination.node) else {
                continue;
            };
            let src = self.by_name.get(&c.source.node).copied();

            let binding = InputBinding {
                attr: c.destination.attr.clone(),
                source: c.source.clone(),
                live: src.is_some(),
            };
            // Last recorded connection per destination attribute wins.
            match slots[dst].get(&binding.attr) {
                Some(&slot) => inputs[dst][slot] = binding,
                None => {
                    slots[dst].insert(binding.attr.clone(), inputs[dst].len());
                    inputs[dst].push(binding);
                }
            }

            if let Some(src) = src {
                if src != dst && seen.insert((src, dst)) {
                    dependents[src].push(dst);
                }
            }
        }

        self.inputs = inputs;
        self.dependents = dependents;
        self.order = topo_order(&self.dependents);
        debug!("Evaluation graph: {} nodes, {} edges.", n, seen.len());
    }
}

/// Kahn's algorithm with the smallest ready index first.
///
/// When nothing is ready but nodes remain, the earliest remaining node of a
/// strongly connected component that no other unplaced node feeds is forced.
/// Nodes merely downstream of a cycle therefore still wait for it.
fn topo_order(dependents: &[Vec<usize>]) -> Vec<usize> {
    let n = dependents.len();
    let mut indeg = vec![0usize; n];
    for deps in dependents {
        for &d in deps {
            indeg[d] += 1;
        }
    }

    let mut queued = vec![false; n];
    let mut ready: BTreeSet<usize> = BTreeSet::new();
    for (i, &d) in indeg.iter().enumerate() {
        if d == 0 {
            ready.insert(i);
            queued[i] = true;
        }
    }

    let mut components: Option<(Vec<usize>, Vec<Vec<usize>>)> = None;
    let mut out = Vec::with_capacity(n);
    while out.len() < n {
        while let Some(i) = ready.pop_first() {
            out.push(i);
            for &d in &dependents[i] {
                indeg[d] = indeg[d].saturating_sub(1);
                if indeg[d] == 0 && !queued[d] {
                    queued[d] = true;
                    ready.insert(d);
                }
            }
        }

        if out.len() < n {
            let (component, predecessors) =
                components.get_or_insert_with(|| strongly_connected(dependents));
            // A component is blocked while any member waits on an unplaced node outside it.
            let mut blocked = vec![false; n];
            for i in (0..n).filter(|&i| !queued[i]) {
                if predecessors[i]
                    .iter()
                    .any(|&p| !queued[p] && component[p] != component[i])
                {
                    blocked[component[i]] = true;
                }
            }
            let forced = (0..n)
                .find(|&i| !queued[i] && !blocked[component[i]])
                .or_else(|| (0..n).find(|&i| !queued[i]));
            let Some(forced) = forced else {
                break;
            };
            warn!("Dependency cycle; forcing node {} into the order.", forced);
            queued[forced] = true;
            ready.insert(forced);
        }
    }
    out
}

/// Kosaraju's algorithm. Returns the component id of every node and the
/// predecessor lists it builds along the way.
fn strongly_connected(dependents: &[Vec<usize>]) -> (Vec<usize>, Vec<Vec<usize>>) {
    let n = dependents.len();
    let mut predecessors: Vec<Vec<usize>> = vec![Vec::new(); n];
    for (src, deps) in dependents.iter().enumerate() {
        for &dst in deps {
            predecessors[dst].push(src);
        }
    }

    // Post-order over the forward edges, iteratively.
    let mut visited = vec![false; n];
    let mut finished = Vec::with_capacity(n);
    for root in 0..n {
        if visited[root] {
            continue;
        }
        visited[root] = true;
        let mut stack = vec![(root, 0usize)];
        while let Some((node, next)) = stack.last_mut() {
            let node = *node;
            match dependents[node].get(*next) {
                Some(&child) => {
                    *next += 1;
                    if !visited[child] {
                        visited[child] = true;
                        stack.push((child, 0));
                    }
                }
                None => {
                    finished.push(node);
                    stack.pop();
                }
            }
        }
    }

    // Components over the reversed edges, in reverse finish order.
    let mut component = vec![usize::MAX; n];
    let mut next_id = 0;
    for &root in finished.iter().rev() {
        if component[root] != usize::MAX {
            continue;
        }
        component[root] = next_id;
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            for &p in &predecessors[node] {
                if component[p] == usize::MAX {
                    component[p] = next_id;
                    stack.push(p);
                }
            }
        }
        next_id += 1;
    }

    (component, predecessors)
}
