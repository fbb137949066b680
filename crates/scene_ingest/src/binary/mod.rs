//! Binary scene files: nested four-character-code chunks.
//!
//! [`indexer::index_chunks`] builds a flat [`ChunkIndex`] over a buffer without
//! knowing any chunk schema; [`reader::read_scene_chunks`] maps that index onto
//! a scene graph.
pub mod chunk;
pub mod classify;
pub mod indexer;
pub mod reader;

pub use chunk::{ChunkIndex, ChunkInfo, ChunkPreview, DecodeKind, FourCC};
pub use indexer::{index_chunks, ChunkLayout, IndexAnomaly, IndexAnomalyKind, IndexOptions};
pub use reader::{decode_attribute, read_scene_chunks};
