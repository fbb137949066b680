//! Bounded heuristics that guess what a leaf payload contains.
//!
//! Only the first [`CLASSIFY_WINDOW`] bytes are inspected. Results feed
//! downstream heuristics and dumps; nothing here is authoritative.
use crate::binary::chunk::{ChunkPreview, DecodeKind};

/// Maximum number of payload bytes inspected per chunk.
pub const CLASSIFY_WINDOW: usize = 4096;

const SMALL_INT_MAX: u32 = 0xFFFF;
const FLOAT_MIN_MAGNITUDE: f32 = 1.0e-6;
const FLOAT_MAX_MAGNITUDE: f32 = 1.0e7;

/// Classifies a leaf payload and collects preview samples.
pub fn classify(data: &[u8]) -> (DecodeKind, ChunkPreview) {
    if data.is_empty() {
        return (DecodeKind::Empty, ChunkPreview::default());
    }

    let window = &data[..data.len().min(CLASSIFY_WINDOW)];

    if looks_like_strings(window) {
        let strings = split_strings(window)
            .take(ChunkPreview::MAX_STRINGS)
            .map(str::to_owned)
            .collect();
        return (
            DecodeKind::Strings,
            ChunkPreview {
                strings,
                ..Default::default()
            },
        );
    }

    if data.len() % 4 != 0 {
        return (DecodeKind::Opaque, ChunkPreview::default());
    }

    let words: Vec<u32> = be_words(window).collect();
    let preview = ChunkPreview {
        strings: Vec::new(),
        floats: words
            .iter()
            .take(ChunkPreview::MAX_NUMBERS)
            .map(|w| f32::from_bits(*w))
            .collect(),
        uints: words
            .iter()
            .take(ChunkPreview::MAX_NUMBERS)
            .copied()
            .collect(),
    };

    let kind = if words.iter().all(|w| *w <= SMALL_INT_MAX) {
        DecodeKind::SmallInts
    } else if words.iter().all(|w| plausible_float(f32::from_bits(*w))) {
        DecodeKind::Floats
    } else {
        DecodeKind::Opaque
    };

    (kind, preview)
}

/// Printable ASCII runs separated by NUL bytes, skipping empty runs.
pub(crate) fn split_strings(data: &[u8]) -> impl Iterator<Item = &str> {
    data.split(|b| *b == 0)
        .filter(|run| !run.is_empty())
        .filter_map(|run| std::str::from_utf8(run).ok())
}

/// Reads a NUL-terminated printable name from the start of `data`.
///
/// Returns the name and the remaining bytes after the terminator.
pub(crate) fn leading_name(data: &[u8]) -> Option<(&str, &[u8])> {
    let end = data.iter().position(|b| *b == 0)?;
    let name = &data[..end];
    if name.is_empty() || !name.iter().all(|b| is_text_byte(*b) && *b >= 0x20) {
        return None;
    }
    let name = std::str::from_utf8(name).ok()?;
    Some((name, &data[end + 1..]))
}

fn looks_like_strings(window: &[u8]) -> bool {
    let mut printable = 0usize;
    for &b in window {
        if b == 0 {
            continue;
        }
        if !is_text_byte(b) {
            return false;
        }
        printable += 1;
    }
    printable >= 2
}

#[inline]
fn is_text_byte(b: u8) -> bool {
    (0x20..0x7f).contains(&b) || b == b'\t' || b == b'\n' || b == b'\r'
}

fn plausible_float(v: f32) -> bool {
    if v == 0.0 {
        return true;
    }
    v.is_finite() && (FLOAT_MIN_MAGNITUDE..=FLOAT_MAX_MAGNITUDE).contains(&v.abs())
}

fn be_words(data: &[u8]) -> impl Iterator<Item = u32> + '_ {
    data.chunks_exact(4)
        .map(|w| u32::from_be_bytes([w[0], w[1], w[2], w[3]]))
}
