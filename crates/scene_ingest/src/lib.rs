#![forbid(unsafe_code)]
//! scene_ingest: schema-less scene graph ingestion and dependency evaluation.
//!
//! Modules:
//! - ascii: tokenize and parse statement-oriented scene text
//! - binary: index nested four-character-code chunk files and read scene data from them
//! - graph: nodes, typed attributes and connections, plus the alias query surface
//! - eval: evaluation-graph builder, node registry, context and dirty-propagating scheduler
//! - session: scoped import sessions that tie the pieces together
//!
//! For examples, see the `scene_ingest_examples` crate.
pub mod ascii;
pub mod binary;
pub mod error;
pub mod eval;
pub mod events;
pub mod graph;
pub mod session;

/// Convenient re-exports for common types. Import with `use scene_ingest::prelude::*;`.
pub mod prelude {
    pub use crate::ascii::parser::{parse_scene_text, StatementParser};
    pub use crate::ascii::tokenizer::{tokenize, Token, TokenKind, Tokenizer};
    pub use crate::binary::chunk::{ChunkIndex, ChunkInfo, ChunkPreview, DecodeKind, FourCC};
    pub use crate::binary::indexer::{index_chunks, IndexAnomaly, IndexAnomalyKind, IndexOptions};
    pub use crate::binary::reader::read_scene_chunks;
    pub use crate::error::{Error, Result};
    pub use crate::eval::behaviors::{Deformer, Generic, Operation, PlusMinusAverage};
    pub use crate::eval::builder::EvaluationGraph;
    pub use crate::eval::context::EvalContext;
    pub use crate::eval::node::{EvalBehavior, EvalNode, InputBinding};
    pub use crate::eval::registry::EvalNodeRegistry;
    pub use crate::eval::scheduler::{EvalReport, Scheduler};
    pub use crate::events::{
        EventSink, FnSink, ImportEvent, ImportEventKind, ImportSummary, TracingSink, VecSink,
    };
    pub use crate::graph::{AttrRef, AttributeValue, Connection, Node, NodeId, SceneGraph};
    pub use crate::session::{ImportOptions, ImportScope, ImportSession, SourceFormat};
}
