//! Chunk metadata produced by the indexer.
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::binary::indexer::IndexAnomaly;

/// Four-character type code.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FourCC(pub [u8; 4]);

impl FourCC {
    pub const fn new(code: &[u8; 4]) -> Self {
        Self(*code)
    }

    /// Reads a code from the first four bytes of `bytes`.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let code: [u8; 4] = bytes.get(..4)?.try_into().ok()?;
        Some(Self(code))
    }

    /// True when every byte is printable ASCII (space included).
    pub fn is_printable(&self) -> bool {
        self.0.iter().all(|b| (0x20..0x7f).contains(b))
    }

    /// Text form with trailing padding spaces removed.
    pub fn trimmed(&self) -> String {
        self.to_string().trim_end().to_owned()
    }
}

impl fmt::Display for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &b in &self.0 {
            if (0x20..0x7f).contains(&b) {
                write!(f, "{}", b as char)?;
            } else {
                write!(f, "\\x{b:02x}")?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FourCC(\"{self}\")")
    }
}

impl PartialEq<&[u8; 4]> for FourCC {
    fn eq(&self, other: &&[u8; 4]) -> bool {
        &self.0 == *other
    }
}

/// Best-effort guess at what a leaf payload holds. Never authoritative.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DecodeKind {
    /// Container chunk; payload holds children.
    Container,
    Empty,
    Strings,
    SmallInts,
    Floats,
    Opaque,
}

/// Bounded content samples for a leaf payload.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChunkPreview {
    /// Up to [`ChunkPreview::MAX_STRINGS`] NUL-separated strings.
    pub strings: Vec<String>,
    /// Up to [`ChunkPreview::MAX_NUMBERS`] big-endian `f32` words.
    pub floats: Vec<f32>,
    /// Up to [`ChunkPreview::MAX_NUMBERS`] big-endian `u32` words.
    pub uints: Vec<u32>,
}

impl ChunkPreview {
    pub const MAX_STRINGS: usize = 8;
    pub const MAX_NUMBERS: usize = 16;
}

/// Metadata for one chunk.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug)]
pub struct ChunkInfo {
    pub tag: FourCC,
    /// Subtype code of a container, read from the first payload word.
    pub subtype: Option<FourCC>,
    pub header_offset: usize,
    pub data_offset: usize,
    /// Payload size after truncation to the enclosing range.
    pub data_size: usize,
    pub depth: usize,
    pub is_container: bool,
    pub decode_kind: DecodeKind,
    pub preview: ChunkPreview,
    /// Declared size overran the enclosing range.
    pub truncated: bool,
    /// Index of the enclosing container in [`ChunkIndex::chunks`].
    pub parent: Option<usize>,
}

impl ChunkInfo {
    /// Byte range of the payload.
    pub fn data_range(&self) -> std::ops::Range<usize> {
        self.data_offset..self.data_offset + self.data_size
    }
}

/// Flat, pre-order index over every chunk in a buffer.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, Default)]
pub struct ChunkIndex {
    pub(crate) chunks: Vec<ChunkInfo>,
    pub(crate) anomalies: Vec<IndexAnomaly>,
    pub(crate) buffer_len: usize,
}

impl ChunkIndex {
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Chunks in pre-order: every container precedes its children.
    pub fn chunks(&self) -> &[ChunkInfo] {
        &self.chunks
    }

    pub fn get(&self, index: usize) -> Option<&ChunkInfo> {
        self.chunks.get(index)
    }

    /// Structural anomalies recovered from during the walk.
    pub fn anomalies(&self) -> &[IndexAnomaly] {
        &self.anomalies
    }

    pub fn buffer_len(&self) -> usize {
        self.buffer_len
    }

    /// Top-level chunks.
    pub fn roots(&self) -> impl Iterator<Item = (usize, &ChunkInfo)> {
        self.chunks
            .iter()
            .enumerate()
            .filter(|(_, c)| c.parent.is_none())
    }

    /// Direct children of the chunk at `index`.
    ///
    /// Only the parent's own subtree is scanned: in pre-order it ends at the
    /// first later chunk that is not deeper than the parent.
    pub fn children(&self, index: usize) -> impl Iterator<Item = (usize, &ChunkInfo)> {
        let depth = self.chunks.get(index).map_or(usize::MAX, |c| c.depth);
        self.chunks
            .iter()
            .enumerate()
            .skip(index + 1)
            .take_while(move |(_, c)| c.depth > depth)
            .filter(move |(_, c)| c.parent == Some(index))
    }

    /// Payload bytes of `chunk` within `buf`; empty when `buf` is not the indexed buffer.
    pub fn data<'b>(&self, buf: &'b [u8], chunk: &ChunkInfo) -> &'b [u8] {
        buf.get(chunk.data_range()).unwrap_or(&[])
    }
}
