//! Evaluation nodes: one per scene node, wrapping a type-specific behaviour.
use std::fmt;

use tracing::trace;

use crate::eval::context::EvalContext;
use crate::graph::{AttrRef, AttributeValue, SceneGraph};

/// Type-specific evaluation logic.
pub trait EvalBehavior: fmt::Debug + Send {
    /// Short behaviour name for logs and reports.
    fn kind(&self) -> &'static str;

    /// Recomputes `node`'s outputs from its (already pulled) inputs.
    fn evaluate(&mut self, node: &str, scene: &mut SceneGraph, ctx: &mut EvalContext);
}

/// The connection driving one destination attribute of a node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InputBinding {
    /// Destination attribute on the bound node.
    pub attr: String,
    pub source: AttrRef,
    /// False when the source node is not in the scene; such bindings never drive a value.
    pub live: bool,
}

/// Evaluation wrapper around one scene node.
#[derive(Debug)]
pub struct EvalNode {
    name: String,
    node_type: String,
    dirty: bool,
    time_driven: bool,
    behavior: Box<dyn EvalBehavior>,
}

impl EvalNode {
    /// Creates a node that has not run yet, so it starts dirty.
    pub fn new(
        name: impl Into<String>,
        node_type: impl Into<String>,
        time_driven: bool,
        behavior: Box<dyn EvalBehavior>,
    ) -> Self {
        Self {
            name: name.into(),
            node_type: node_type.into(),
            dirty: true,
            time_driven,
            behavior,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn node_type(&self) -> &str {
        &self.node_type
    }

    pub fn behavior_kind(&self) -> &'static str {
        self.behavior.kind()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn is_time_driven(&self) -> bool {
        self.time_driven
    }

    /// Forces evaluation on the next sweep.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Whether this node must run: explicitly dirty, a live input source is dirty, or one of its own attributes is.
    pub fn needs_evaluation(&self, inputs: &[InputBinding], ctx: &EvalContext) -> bool {
        self.dirty
            || ctx.touches_node(&self.name)
            || inputs
                .iter()
                .any(|b| b.live && ctx.is_dirty(&b.source.to_string()))
    }

    /// Pulls inputs and runs the behaviour when needed. Returns whether it ran.
    pub fn evaluate_if_needed(
        &mut self,
        inputs: &[InputBinding],
        scene: &mut SceneGraph,
        ctx: &mut EvalContext,
    ) -> bool {
        if !self.needs_evaluation(inputs, ctx) {
            return false;
        }

        for binding in inputs.iter().filter(|b| b.live) {
            if let Some(value) = resolve_source(scene, &binding.source) {
                // The node exists for as long as its EvalNode does.
                let _ = scene.set_attribute(&self.name, &binding.attr, value);
            }
        }

        trace!("Evaluating '{}' ({}).", self.name, self.behavior.kind());
        self.behavior.evaluate(&self.name, scene, ctx);
        self.dirty = false;
        true
    }

    pub(crate) fn replace_behavior(&mut self, node_type: &str, time_driven: bool, behavior: Box<dyn EvalBehavior>) {
        self.node_type = node_type.to_owned();
        self.time_driven = time_driven;
        self.behavior = behavior;
        self.dirty = true;
    }
}

/// Value of a connection source. Tries the path as written and with a leading
/// `.`, then element `[0]` of it (`pma1.output3D` reads `output3D[0]`).
pub fn resolve_source(scene: &SceneGraph, source: &AttrRef) -> Option<AttributeValue> {
    let node = scene.node(&source.node)?;
    let attr = source.attr.trim_start_matches('.');
    if attr.is_empty() {
        return None;
    }
    [
        attr.to_owned(),
        format!(".{attr}"),
        format!("{attr}[0]"),
        format!(".{attr}[0]"),
    ]
    .iter()
    .find_map(|path| node.attribute(path))
    .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default)]
    struct Counting(usize);

    impl EvalBehavior for Counting {
        fn kind(&self) -> &'static str {
            "counting"
        }

        fn evaluate(&mut self, _node: &str, _scene: &mut SceneGraph, _ctx: &mut EvalContext) {
            self.0 += 1;
        }
    }

    fn binding(attr: &str, source: &str, live: bool) -> InputBinding {
        InputBinding {
            attr: attr.into(),
            source: AttrRef::parse(source),
            live,
        }
    }

    #[test]
    fn runs_only_when_dirty() {
        let mut scene = SceneGraph::new();
        scene.add_or_update_node("n", "transform");
        let mut ctx = EvalContext::new(0.0);
        let mut node = EvalNode::new("n", "transform", false, Box::new(Counting::default()));

        assert!(node.is_dirty());
        assert!(node.evaluate_if_needed(&[], &mut scene, &mut ctx));
        assert!(!node.evaluate_if_needed(&[], &mut scene, &mut ctx));
        node.mark_dirty();
        assert!(node.evaluate_if_needed(&[], &mut scene, &mut ctx));
        assert!(!node.is_dirty());
        assert!(!node.evaluate_if_needed(&[], &mut scene, &mut ctx));
    }

    #[test]
    fn dirty_live_source_pulls_value() {
        let mut scene = SceneGraph::new();
        scene.add_or_update_node("src", "transform");
        scene.add_or_update_node("dst", "transform");
        scene
            .set_attribute("src", ".tx", AttributeValue::Float(4.0))
            .unwrap();

        let mut ctx = EvalContext::new(0.0);
        ctx.mark_dirty("src.tx");
        let mut node = EvalNode::new("dst", "transform", false, Box::new(Counting::default()));
        let inputs = [binding("tx", "src.tx", true)];

        assert!(node.evaluate_if_needed(&inputs, &mut scene, &mut ctx));
        assert_eq!(scene.attribute("dst", "tx"), Some(&AttributeValue::Float(4.0)));
    }

    #[test]
    fn dangling_sources_never_drive() {
        let mut scene = SceneGraph::new();
        scene.add_or_update_node("dst", "transform");
        let mut ctx = EvalContext::new(0.0);
        let mut node = EvalNode::new("dst", "transform", false, Box::new(Counting::default()));
        let inputs = [binding("in", "ghost.out", false)];
        assert!(node.evaluate_if_needed(&inputs, &mut scene, &mut ctx));

        ctx.mark_dirty("ghost.out");
        assert!(!node.evaluate_if_needed(&inputs, &mut scene, &mut ctx));
        node.mark_dirty();
        assert!(node.evaluate_if_needed(&inputs, &mut scene, &mut ctx));
        assert!(scene.attribute("dst", "in").is_none());
    }

    #[test]
    fn source_resolution_falls_back_to_first_element() {
        let mut scene = SceneGraph::new();
        scene.add_or_update_node("pma1", "plusMinusAverage");
        scene
            .set_attribute("pma1", "output3D[0]", AttributeValue::FloatArray(vec![1.0, 2.0, 3.0]))
            .unwrap();
        assert_eq!(
            resolve_source(&scene, &AttrRef::parse("pma1.output3D")),
            Some(AttributeValue::FloatArray(vec![1.0, 2.0, 3.0]))
        );
        assert!(resolve_source(&scene, &AttrRef::parse("pma1.missing")).is_none());
        assert!(resolve_source(&scene, &AttrRef::parse("ghost.tx")).is_none());
    }
}
