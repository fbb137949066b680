//! Built-in evaluation behaviours.
use std::collections::BTreeMap;

use glam::DVec3;
use tracing::warn;

use crate::eval::context::EvalContext;
use crate::eval::node::EvalBehavior;
use crate::graph::{AttributeValue, Node, SceneGraph};

/// Pass-through node: invalidates everything downstream when it runs.
#[derive(Clone, Debug, Default)]
pub struct Generic {
    writes_time: bool,
}

impl Generic {
    pub fn new() -> Self {
        Self::default()
    }

    /// A clock node that also writes the context time into `outTime`.
    pub fn clock() -> Self {
        Self { writes_time: true }
    }
}

impl EvalBehavior for Generic {
    fn kind(&self) -> &'static str {
        "generic"
    }

    fn evaluate(&mut self, node: &str, scene: &mut SceneGraph, ctx: &mut EvalContext) {
        if self.writes_time {
            let _ = scene.set_attribute(node, "outTime", AttributeValue::Float(ctx.time()));
        }
        ctx.mark_dirty(node);
    }
}

/// Deformer stand-in: marks its geometry output dirty and nothing else.
#[derive(Clone, Debug)]
pub struct Deformer {
    output: String,
}

impl Deformer {
    pub const DEFAULT_OUTPUT: &'static str = "outputGeometry";

    pub fn new(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
        }
    }

    pub fn output(&self) -> &str {
        &self.output
    }
}

impl Default for Deformer {
    fn default() -> Self {
        Self::new(Self::DEFAULT_OUTPUT)
    }
}

impl EvalBehavior for Deformer {
    fn kind(&self) -> &'static str {
        "deformer"
    }

    fn evaluate(&mut self, node: &str, _scene: &mut SceneGraph, ctx: &mut EvalContext) {
        ctx.mark_dirty(format!("{node}.{}", self.output));
    }
}

/// Aggregation performed by [`PlusMinusAverage`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    Sum,
    Subtract,
    Average,
}

impl Operation {
    /// Maps the stored selector; `None` for selectors outside 1..=3.
    pub fn from_selector(selector: i64) -> Option<Self> {
        match selector {
            1 => Some(Operation::Sum),
            2 => Some(Operation::Subtract),
            3 => Some(Operation::Average),
            _ => None,
        }
    }

    /// Applies the operation to `sum` over `count` inputs.
    pub fn apply(self, sum: DVec3, count: usize) -> DVec3 {
        match self {
            Operation::Sum => sum,
            Operation::Subtract => -sum,
            Operation::Average if count == 0 => DVec3::ZERO,
            Operation::Average => sum / count as f64,
        }
    }
}

/// Sums, negates or averages the `input3D[n]` vectors into `output3D[0]`.
#[derive(Clone, Debug, Default)]
pub struct PlusMinusAverage;

impl PlusMinusAverage {
    pub const OPERATION_ALIASES: [&'static str; 4] = ["operation", ".operation", "op", ".op"];
    pub const OUTPUT: &'static str = "output3D[0]";

    /// Computes the output vector for `node` without writing it.
    pub fn compute(node: &Node) -> DVec3 {
        let selector = node.read_int(1, &Self::OPERATION_ALIASES);
        let operation = Operation::from_selector(selector).unwrap_or_else(|| {
            warn!(
                "Unknown operation {} on '{}'; using sum.",
                selector,
                node.name()
            );
            Operation::Sum
        });

        let inputs = collect_inputs(node);
        let sum = inputs.values().fold(DVec3::ZERO, |acc, v| acc + *v);
        operation.apply(sum, inputs.len())
    }
}

impl EvalBehavior for PlusMinusAverage {
    fn kind(&self) -> &'static str {
        "plusMinusAverage"
    }

    fn evaluate(&mut self, node: &str, scene: &mut SceneGraph, ctx: &mut EvalContext) {
        let Some(n) = scene.node(node) else {
            return;
        };
        let out = Self::compute(n);
        let value = AttributeValue::FloatArray(out.to_array().to_vec());
        if let Err(e) = scene.set_attribute(node, Self::OUTPUT, value) {
            warn!("Could not write output of '{}': {}", node, e);
            return;
        }
        ctx.mark_dirty(format!("{node}.output3D"));
    }
}

/// Gathers `input3D[n]` vectors by index. Whole-vector values and
/// `input3D[n].input3Dx/y/z` children both contribute; later keys win per component.
fn collect_inputs(node: &Node) -> BTreeMap<usize, DVec3> {
    let mut inputs: BTreeMap<usize, DVec3> = BTreeMap::new();
    for (path, value) in node.attributes() {
        let Some((index, child)) = parse_input_path(path) else {
            continue;
        };
        match child {
            None => {
                if let Some(v) = value.as_vec3() {
                    inputs.insert(index, v);
                }
            }
            Some(axis) => {
                if let Some(f) = value.as_f64() {
                    let v = inputs.entry(index).or_insert(DVec3::ZERO);
                    v[axis] = f;
                }
            }
        }
    }
    inputs
}

/// Parses `[.]input3D[n]` or `[.]input3D[n].input3D{x,y,z}` into the index and optional axis.
fn parse_input_path(path: &str) -> Option<(usize, Option<usize>)> {
    let rest = path.strip_prefix('.').unwrap_or(path);
    let rest = rest.strip_prefix("input3D[")?;
    let (index, rest) = rest.split_once(']')?;
    let index: usize = index.parse().ok()?;
    let axis = match rest {
        "" => None,
        ".input3Dx" => Some(0),
        ".input3Dy" => Some(1),
        ".input3Dz" => Some(2),
        _ => return None,
    };
    Some((index, axis))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pma(operation: Option<i64>, inputs: &[(&str, AttributeValue)]) -> SceneGraph {
        let mut scene = SceneGraph::new();
        scene.add_or_update_node("pma1", "plusMinusAverage");
        if let Some(op) = operation {
            scene
                .set_attribute("pma1", ".operation", AttributeValue::Int(op))
                .unwrap();
        }
        for (path, value) in inputs {
            scene.set_attribute("pma1", path, value.clone()).unwrap();
        }
        scene
    }

    fn two_inputs() -> Vec<(&'static str, AttributeValue)> {
        vec![
            (".input3D[0]", AttributeValue::FloatArray(vec![1.0, 2.0, 3.0])),
            (".input3D[1]", AttributeValue::FloatArray(vec![3.0, 2.0, 1.0])),
        ]
    }

    fn compute(scene: &SceneGraph) -> DVec3 {
        PlusMinusAverage::compute(scene.node("pma1").unwrap())
    }

    #[test]
    fn sum_is_the_default_operation() {
        assert_eq!(compute(&pma(None, &two_inputs())), DVec3::splat(4.0));
        assert_eq!(compute(&pma(Some(1), &two_inputs())), DVec3::splat(4.0));
    }

    #[test]
    fn average_divides_by_present_inputs() {
        assert_eq!(compute(&pma(Some(3), &two_inputs())), DVec3::splat(2.0));
        assert_eq!(compute(&pma(Some(3), &[])), DVec3::ZERO);
    }

    #[test]
    fn subtract_negates_sum() {
        assert_eq!(compute(&pma(Some(2), &two_inputs())), DVec3::splat(-4.0));
        assert_eq!(compute(&pma(Some(2), &[])), DVec3::ZERO);
    }

    #[test]
    fn unknown_selector_falls_back_to_sum() {
        assert_eq!(compute(&pma(Some(7), &two_inputs())), DVec3::splat(4.0));
    }

    #[test]
    fn child_components_form_vectors() {
        let scene = pma(
            Some(1),
            &[
                ("input3D[2].input3Dx", AttributeValue::Float(1.0)),
                ("input3D[2].input3Dz", AttributeValue::Int(5)),
                (".input3D[0]", AttributeValue::FloatArray(vec![1.0, 1.0, 1.0])),
            ],
        );
        assert_eq!(compute(&scene), DVec3::new(2.0, 1.0, 6.0));
    }

    #[test]
    fn operation_aliases_are_probed_in_order() {
        let mut scene = pma(None, &two_inputs());
        scene
            .set_attribute("pma1", "op", AttributeValue::Int(3))
            .unwrap();
        assert_eq!(compute(&scene), DVec3::splat(2.0));
    }

    #[test]
    fn evaluate_writes_output_and_marks_dirty() {
        let mut scene = pma(Some(1), &two_inputs());
        let mut ctx = EvalContext::new(0.0);
        PlusMinusAverage.evaluate("pma1", &mut scene, &mut ctx);
        assert_eq!(
            scene.attribute("pma1", "output3D[0]"),
            Some(&AttributeValue::FloatArray(vec![4.0, 4.0, 4.0]))
        );
        assert!(ctx.is_dirty("pma1.output3D"));
    }

    #[test]
    fn deformer_marks_only_its_output() {
        let mut scene = SceneGraph::new();
        let mut ctx = EvalContext::new(0.0);
        Deformer::default().evaluate("skin1", &mut scene, &mut ctx);
        assert!(ctx.is_dirty("skin1.outputGeometry[0]"));
        assert!(!ctx.is_dirty("skin1.envelope"));
    }

    #[test]
    fn clock_writes_time() {
        let mut scene = SceneGraph::new();
        scene.add_or_update_node("time1", "time");
        let mut ctx = EvalContext::new(12.0);
        Generic::clock().evaluate("time1", &mut scene, &mut ctx);
        assert_eq!(scene.attribute("time1", "outTime"), Some(&AttributeValue::Float(12.0)));
        assert!(ctx.is_dirty("time1.outTime"));
    }
}
