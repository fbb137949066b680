//! Registry mapping node type tags to evaluation behaviours.
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::eval::behaviors::{Deformer, Generic, PlusMinusAverage};
use crate::eval::node::{EvalBehavior, EvalNode};
use crate::graph::Node;

/// Constructs a behaviour for one scene node.
pub type BehaviorFactory = Arc<dyn Fn(&Node) -> Box<dyn EvalBehavior> + Send + Sync>;

/// Type tags of deformer nodes registered by default.
pub const DEFORMER_TYPES: [&str; 15] = [
    "skinCluster",
    "blendShape",
    "cluster",
    "ffd",
    "nonLinear",
    "wire",
    "wrap",
    "sculpt",
    "softMod",
    "jiggle",
    "deltaMush",
    "tweak",
    "tension",
    "shrinkWrap",
    "proximityWrap",
];

/// Type tags of nodes re-evaluated whenever the time changes, besides `time` itself.
pub const TIME_DRIVEN_TYPES: [&str; 5] = [
    "animCurveTA",
    "animCurveTL",
    "animCurveTT",
    "animCurveTU",
    "expression",
];

#[derive(Clone)]
struct Entry {
    factory: BehaviorFactory,
    time_driven: bool,
}

/// Registry of behaviour factories keyed by node type.
///
/// Types without an entry evaluate as [`Generic`].
#[derive(Clone)]
pub struct EvalNodeRegistry {
    entries: HashMap<String, Entry>,
}

impl EvalNodeRegistry {
    /// Creates an empty registry; every node evaluates as [`Generic`].
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Creates a registry with the built-in behaviours.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register("plusMinusAverage", false, |_| Box::new(PlusMinusAverage));
        for ty in DEFORMER_TYPES {
            registry.register(ty, false, |_| Box::new(Deformer::default()));
        }
        registry.register("time", true, |_| Box::new(Generic::clock()));
        for ty in TIME_DRIVEN_TYPES {
            registry.register(ty, true, |_| Box::new(Generic::new()));
        }
        registry
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, node_type: &str) -> bool {
        self.entries.contains_key(node_type)
    }

    /// Registers a factory for `node_type`, replacing any previous one.
    pub fn register<F>(&mut self, node_type: impl Into<String>, time_driven: bool, factory: F)
    where
        F: Fn(&Node) -> Box<dyn EvalBehavior> + Send + Sync + 'static,
    {
        self.entries.insert(
            node_type.into(),
            Entry {
                factory: Arc::new(factory),
                time_driven,
            },
        );
    }

    pub fn unregister(&mut self, node_type: &str) -> bool {
        self.entries.remove(node_type).is_some()
    }

    pub fn is_time_driven(&self, node_type: &str) -> bool {
        self.entries
            .get(node_type)
            .is_some_and(|e| e.time_driven)
    }

    /// Builds the behaviour and time-driven flag for `node`.
    pub fn behavior_for(&self, node: &Node) -> (Box<dyn EvalBehavior>, bool) {
        match self.entries.get(node.node_type()) {
            Some(entry) => ((entry.factory)(node), entry.time_driven),
            None => (Box::new(Generic::new()), false),
        }
    }

    /// Creates the [`EvalNode`] for `node`.
    pub fn create(&self, node: &Node) -> EvalNode {
        let (behavior, time_driven) = self.behavior_for(node);
        EvalNode::new(node.name(), node.node_type(), time_driven, behavior)
    }
}

impl Default for EvalNodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EvalNodeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut types: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        types.sort_unstable();
        f.debug_struct("EvalNodeRegistry")
            .field("types", &types)
            .finish()
    }
}
