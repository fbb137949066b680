//! Evaluation subsystem: behaviours, registry, graph builder, context and scheduler.
//!
//! [`EvaluationGraph::build`] wraps every scene node in an [`EvalNode`] created
//! through the [`EvalNodeRegistry`] and caches a dependency order.
//! [`Scheduler::evaluate`] then sweeps that order once per tick, running only
//! nodes that are dirty.
pub mod behaviors;
pub mod builder;
pub mod context;
pub mod node;
pub mod registry;
pub mod scheduler;

pub use behaviors::{Deformer, Generic, Operation, PlusMinusAverage};
pub use builder::EvaluationGraph;
pub use context::EvalContext;
pub use node::{EvalBehavior, EvalNode, InputBinding};
pub use registry::{BehaviorFactory, EvalNodeRegistry};
pub use scheduler::{EvalReport, Scheduler};
