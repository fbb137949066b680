//! Walker for nested four-character-code chunk containers.
//!
//! [`index_chunks`] produces a flat [`ChunkIndex`] without knowing the internal
//! schema of every chunk. Container tags recurse; leaves are classified
//! best-effort. Offsets are checked against the enclosing range before every
//! read, so a malformed size is truncated or rejected instead of read out of
//! bounds, and the walk resumes with the next sibling whenever it can.
use std::ops::Range;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::binary::chunk::{ChunkIndex, ChunkInfo, ChunkPreview, DecodeKind, FourCC};
use crate::binary::classify::classify;
use crate::error::{Error, Result};

/// Options for indexing a chunk buffer.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[non_exhaustive]
#[derive(Clone, Debug)]
pub struct IndexOptions {
    /// Deepest nesting level that is descended into.
    pub max_depth: usize,
    /// Hard cap on recorded chunks; the walk stops cleanly when reached.
    pub max_chunks: usize,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            max_depth: 64,
            max_chunks: 1_000_000,
        }
    }
}

impl IndexOptions {
    /// Sets the maximum nesting depth.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Sets the maximum number of recorded chunks.
    pub fn with_max_chunks(mut self, max_chunks: usize) -> Self {
        self.max_chunks = max_chunks;
        self
    }

    /// Validates the options, returning an error if invalid.
    pub fn validate(&self) -> Result<()> {
        if self.max_chunks == 0 {
            return Err(Error::InvalidConfig("max_chunks must be > 0".into()));
        }
        Ok(())
    }
}

/// What went wrong at an anomalous offset.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IndexAnomalyKind {
    /// Declared payload size overran the enclosing range and was cut.
    Truncated { declared: u64, available: u64 },
    /// Fewer bytes than a chunk header remained; the level ends here.
    TrailingBytes { len: usize },
    /// Tag bytes were not printable; the level ends here.
    InvalidTag { tag: FourCC },
    /// Container payload too small to hold a subtype code.
    MissingSubtype,
    /// Container nested deeper than [`IndexOptions::max_depth`]; not descended.
    DepthLimit,
    /// [`IndexOptions::max_chunks`] reached; the walk stopped.
    ChunkLimit,
}

/// A recovered structural problem.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexAnomaly {
    pub offset: usize,
    pub depth: usize,
    pub kind: IndexAnomalyKind,
}

/// Header layout family, chosen from the first tag in the buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChunkLayout {
    /// `FORM`/`LIST`/`CAT `/`PROP`: 32-bit sizes, 2-byte alignment.
    Classic,
    /// `FOR4`/`LIS4`/`CAT4`/`PRO4`: 32-bit sizes, 4-byte alignment.
    Quad,
    /// `FOR8`/`LIS8`/`CAT8`/`PRO8`: 64-bit sizes, 8-byte alignment.
    Wide,
}

impl ChunkLayout {
    const CLASSIC: [&'static [u8; 4]; 4] = [b"FORM", b"LIST", b"CAT ", b"PROP"];
    const QUAD: [&'static [u8; 4]; 4] = [b"FOR4", b"LIS4", b"CAT4", b"PRO4"];
    const WIDE: [&'static [u8; 4]; 4] = [b"FOR8", b"LIS8", b"CAT8", b"PRO8"];

    /// Layout implied by a leading tag; unknown tags default to [`ChunkLayout::Quad`].
    pub fn detect(buf: &[u8]) -> Self {
        match FourCC::from_slice(buf) {
            Some(tag) if Self::WIDE.iter().any(|t| tag == *t) => ChunkLayout::Wide,
            Some(tag) if Self::CLASSIC.iter().any(|t| tag == *t) => ChunkLayout::Classic,
            _ => ChunkLayout::Quad,
        }
    }

    pub fn size_width(self) -> usize {
        match self {
            ChunkLayout::Wide => 8,
            ChunkLayout::Classic | ChunkLayout::Quad => 4,
        }
    }

    pub fn alignment(self) -> usize {
        match self {
            ChunkLayout::Classic => 2,
            ChunkLayout::Quad => 4,
            ChunkLayout::Wide => 8,
        }
    }

    pub fn header_len(self) -> usize {
        4 + self.size_width()
    }

    /// Whether `tag` names a container in any family.
    pub fn is_container(tag: FourCC) -> bool {
        Self::CLASSIC
            .iter()
            .chain(Self::QUAD.iter())
            .chain(Self::WIDE.iter())
            .any(|t| tag == *t)
    }

    fn read_size(self, bytes: &[u8]) -> u64 {
        match self {
            ChunkLayout::Wide => {
                let mut b = [0u8; 8];
                b.copy_from_slice(&bytes[..8]);
                u64::from_be_bytes(b)
            }
            ChunkLayout::Classic | ChunkLayout::Quad => {
                u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as u64
            }
        }
    }
}

/// Indexes every chunk in `buf`.
pub fn index_chunks(buf: &[u8], opts: &IndexOptions) -> ChunkIndex {
    let layout = ChunkLayout::detect(buf);
    let mut walker = Walker {
        buf,
        opts,
        layout,
        index: ChunkIndex {
            chunks: Vec::new(),
            anomalies: Vec::new(),
            buffer_len: buf.len(),
        },
        halted: false,
    };

    walker.walk_level(0..buf.len(), 0, None);

    debug!(
        "Indexed {} chunks ({:?} layout, {} anomalies) over {} bytes.",
        walker.index.chunks.len(),
        layout,
        walker.index.anomalies.len(),
        buf.len()
    );
    walker.index
}

struct Walker<'a> {
    buf: &'a [u8],
    opts: &'a IndexOptions,
    layout: ChunkLayout,
    index: ChunkIndex,
    halted: bool,
}

impl Walker<'_> {
    fn walk_level(&mut self, range: Range<usize>, depth: usize, parent: Option<usize>) {
        let buf = self.buf;
        let end = range.end;
        let mut offset = range.start;
        let header_len = self.layout.header_len();

        while offset < end && !self.halted {
            if self.index.chunks.len() >= self.opts.max_chunks {
                warn!("Chunk limit {} reached at offset {}.", self.opts.max_chunks, offset);
                self.anomaly(offset, depth, IndexAnomalyKind::ChunkLimit);
                self.halted = true;
                return;
            }

            let remaining = end - offset;
            if remaining < header_len {
                self.anomaly(
                    offset,
                    depth,
                    IndexAnomalyKind::TrailingBytes { len: remaining },
                );
                return;
            }

            let header = &buf[offset..offset + header_len];
            let tag = FourCC([header[0], header[1], header[2], header[3]]);
            if !tag.is_printable() {
                warn!("Invalid chunk tag {} at offset {}; abandoning level.", tag, offset);
                self.anomaly(offset, depth, IndexAnomalyKind::InvalidTag { tag });
                return;
            }

            let declared = self.layout.read_size(&header[4..]);
            let data_offset = offset + header_len;
            let available = end - data_offset;
            let (data_size, truncated) = if declared > available as u64 {
                warn!(
                    "Chunk {} at offset {} declares {} bytes but only {} remain; truncating.",
                    tag, offset, declared, available
                );
                self.anomaly(
                    offset,
                    depth,
                    IndexAnomalyKind::Truncated {
                        declared,
                        available: available as u64,
                    },
                );
                (available, true)
            } else {
                (declared as usize, false)
            };

            let is_container = ChunkLayout::is_container(tag);
            let data = &buf[data_offset..data_offset + data_size];
            let (decode_kind, preview) = if is_container {
                (DecodeKind::Container, ChunkPreview::default())
            } else {
                classify(data)
            };

            let subtype = if is_container {
                FourCC::from_slice(data)
            } else {
                None
            };

            let idx = self.index.chunks.len();
            self.index.chunks.push(ChunkInfo {
                tag,
                subtype,
                header_offset: offset,
                data_offset,
                data_size,
                depth,
                is_container,
                decode_kind,
                preview,
                truncated,
                parent,
            });
            trace!(
                "{:indent$}{} size={} at {}",
                "",
                tag,
                data_size,
                offset,
                indent = depth * 2
            );

            if is_container {
                if subtype.is_none() {
                    self.anomaly(offset, depth, IndexAnomalyKind::MissingSubtype);
                } else if depth + 1 > self.opts.max_depth {
                    self.anomaly(offset, depth, IndexAnomalyKind::DepthLimit);
                } else {
                    // The subtype word is padded out to the layout alignment.
                    let data_end = data_offset + data_size;
                    let first_child =
                        (data_offset + align_up(4, self.layout.alignment())).min(data_end);
                    self.walk_level(first_child..data_end, depth + 1, Some(idx));
                }
            }

            let next = align_up(data_offset + data_size, self.layout.alignment());
            offset = next.min(end);
        }
    }

    fn anomaly(&mut self, offset: usize, depth: usize, kind: IndexAnomalyKind) {
        self.index.anomalies.push(IndexAnomaly {
            offset,
            depth,
            kind,
        });
    }
}

#[inline]
fn align_up(value: usize, alignment: usize) -> usize {
    value.div_ceil(alignment) * alignment
}
