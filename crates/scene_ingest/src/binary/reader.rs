//! Maps an indexed chunk tree onto a [`SceneGraph`].
//!
//! The mapping is heuristic. A container holding a `CREA` leaf becomes a node
//! typed by the container's subtype; its named leaves become attributes.
//! `CWFL` leaves anywhere become connections and `FINF` leaves become file
//! metadata. Chunks that do not fit are reported and skipped.
use tracing::{debug, trace};

use crate::binary::chunk::{ChunkIndex, ChunkInfo, FourCC};
use crate::binary::classify::{leading_name, split_strings};
use crate::events::{EventSink, ImportEvent, ImportEventKind, ImportSummary};
use crate::graph::{AttrRef, AttributeValue, SceneGraph};

const CREATE: FourCC = FourCC::new(b"CREA");
const CONNECT: FourCC = FourCC::new(b"CWFL");
const FILE_INFO: FourCC = FourCC::new(b"FINF");

/// Reads nodes, attributes, connections and metadata from an indexed buffer.
///
/// `buf` must be the buffer `index` was built from.
pub fn read_scene_chunks(
    buf: &[u8],
    index: &ChunkIndex,
    scene: &mut SceneGraph,
    sink: &mut dyn EventSink,
) -> ImportSummary {
    let mut summary = ImportSummary {
        chunks: index.len(),
        anomalies: index.anomalies().len(),
        ..Default::default()
    };

    if sink.wants(ImportEventKind::ChunkAnomaly) {
        for anomaly in index.anomalies() {
            sink.send(ImportEvent::ChunkAnomaly {
                anomaly: anomaly.clone(),
            });
        }
    }

    for (i, chunk) in index.chunks().iter().enumerate() {
        if chunk.is_container {
            if index.children(i).any(|(_, c)| c.tag == CREATE) {
                read_node(buf, index, i, scene, sink, &mut summary);
            }
        } else if chunk.tag == CONNECT {
            read_connection(index.data(buf, chunk), chunk, scene, sink, &mut summary);
        } else if chunk.tag == FILE_INFO {
            read_file_info(index.data(buf, chunk), chunk, scene, sink);
        }
    }

    summary.nodes = scene.len();
    debug!(
        "Read {} nodes, {} attributes and {} connections from {} chunks.",
        summary.nodes, summary.attributes, summary.connections, summary.chunks
    );
    summary
}

fn read_node(
    buf: &[u8],
    index: &ChunkIndex,
    container: usize,
    scene: &mut SceneGraph,
    sink: &mut dyn EventSink,
    summary: &mut ImportSummary,
) {
    let Some(info) = index.get(container) else {
        return;
    };
    let node_type = info
        .subtype
        .map(|s| s.trimmed())
        .unwrap_or_default();

    let Some((_, create)) = index.children(container).find(|(_, c)| c.tag == CREATE) else {
        return;
    };
    let mut strings = split_strings(index.data(buf, create));
    let Some(name) = strings.next() else {
        skipped(sink, create, "node creation chunk without a name");
        return;
    };
    let name = name.to_owned();
    let parent = strings.next().map(str::to_owned);

    scene.add_or_update_node(&name, &node_type);
    if let Some(parent) = parent.as_deref() {
        // The node was just created, so this cannot fail.
        let _ = scene.set_parent(&name, Some(parent));
    }
    trace!("Node '{}' ({}) at offset {}.", name, node_type, info.header_offset);

    for (_, leaf) in index.children(container) {
        if leaf.is_container || leaf.tag == CREATE || leaf.tag == CONNECT || leaf.tag == FILE_INFO {
            continue;
        }
        let Some((attr, payload)) = leading_name(index.data(buf, leaf)) else {
            trace!("Leaf {} at offset {} has no attribute name.", leaf.tag, leaf.header_offset);
            continue;
        };
        let value = decode_attribute(leaf.tag, payload);
        if scene.set_attribute(&name, attr, value).is_ok() {
            summary.attributes += 1;
        }
    }
}

fn read_connection(
    data: &[u8],
    chunk: &ChunkInfo,
    scene: &mut SceneGraph,
    sink: &mut dyn EventSink,
    summary: &mut ImportSummary,
) {
    let mut strings = split_strings(data);
    match (strings.next(), strings.next()) {
        (Some(src), Some(dst)) => {
            scene.add_connection(AttrRef::parse(src), AttrRef::parse(dst));
            summary.connections += 1;
        }
        _ => skipped(sink, chunk, "connection chunk without source and destination"),
    }
}

fn read_file_info(data: &[u8], chunk: &ChunkInfo, scene: &mut SceneGraph, sink: &mut dyn EventSink) {
    let mut strings = split_strings(data);
    match (strings.next(), strings.next()) {
        (Some(key), Some(value)) => scene.push_metadata(format!("fileInfo.{key}"), value),
        _ => skipped(sink, chunk, "file info chunk without key and value"),
    }
}

/// Decodes an attribute payload by its chunk tag. Unknown tags and ragged payloads stay opaque.
pub fn decode_attribute(tag: FourCC, payload: &[u8]) -> AttributeValue {
    let decoded = match &tag.0 {
        b"DBLE" | b"DBL2" | b"DBL3" | b"DBL4" | b"MATR" => be_f64s(payload).map(floats),
        b"FLT2" | b"FLT3" | b"FLTE" => be_f32s(payload).map(floats),
        b"LNG2" | b"LNG3" => be_i32s(payload).map(AttributeValue::IntArray),
        b"STR " => {
            let text = payload.split(|b| *b == 0).next().unwrap_or_default();
            std::str::from_utf8(text)
                .ok()
                .map(|s| AttributeValue::String(s.to_owned()))
        }
        _ => None,
    };
    decoded.unwrap_or_else(|| AttributeValue::Opaque(payload.to_vec()))
}

fn floats(values: Vec<f64>) -> AttributeValue {
    match values.as_slice() {
        [v] => AttributeValue::Float(*v),
        _ => AttributeValue::FloatArray(values),
    }
}

fn be_f64s(data: &[u8]) -> Option<Vec<f64>> {
    if data.is_empty() || data.len() % 8 != 0 {
        return None;
    }
    Some(
        data.chunks_exact(8)
            .map(|w| {
                let mut b = [0u8; 8];
                b.copy_from_slice(w);
                f64::from_be_bytes(b)
            })
            .collect(),
    )
}

fn be_f32s(data: &[u8]) -> Option<Vec<f64>> {
    if data.is_empty() || data.len() % 4 != 0 {
        return None;
    }
    Some(
        data.chunks_exact(4)
            .map(|w| f32::from_be_bytes([w[0], w[1], w[2], w[3]]) as f64)
            .collect(),
    )
}

fn be_i32s(data: &[u8]) -> Option<Vec<i64>> {
    if data.is_empty() || data.len() % 4 != 0 {
        return None;
    }
    Some(
        data.chunks_exact(4)
            .map(|w| i32::from_be_bytes([w[0], w[1], w[2], w[3]]) as i64)
            .collect(),
    )
}

fn skipped(sink: &mut dyn EventSink, chunk: &ChunkInfo, message: &str) {
    trace!("Skipping {} at offset {}: {}.", chunk.tag, chunk.header_offset, message);
    if sink.wants(ImportEventKind::Warning) {
        sink.send(ImportEvent::warning(
            format!("{} @ {}", chunk.tag, chunk.header_offset),
            message,
        ));
    }
}
