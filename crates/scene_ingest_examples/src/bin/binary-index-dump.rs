use anyhow::Context;
use scene_ingest::prelude::*;
use scene_ingest_examples::{init_tracing, input_path};

fn main() -> anyhow::Result<()> {
    init_tracing();

    let path = input_path().context("usage: binary-index-dump <file>")?;
    let buf = std::fs::read(&path).with_context(|| format!("reading {}", path.display()))?;

    let options = IndexOptions::default().with_max_depth(32);
    options.validate()?;
    let index = index_chunks(&buf, &options);

    for chunk in index.chunks() {
        let indent = "  ".repeat(chunk.depth);
        let subtype = chunk.subtype.map(|s| format!(" [{s}]")).unwrap_or_default();
        let flag = if chunk.truncated { " TRUNCATED" } else { "" };
        let preview = match chunk.decode_kind {
            DecodeKind::Strings => format!(" {:?}", chunk.preview.strings),
            DecodeKind::Floats => format!(" {:?}", chunk.preview.floats),
            DecodeKind::SmallInts => format!(" {:?}", chunk.preview.uints),
            _ => String::new(),
        };
        println!(
            "{indent}{}{subtype} @{} +{} {:?}{flag}{preview}",
            chunk.tag, chunk.header_offset, chunk.data_size, chunk.decode_kind
        );
    }

    for anomaly in index.anomalies() {
        println!("anomaly @{} depth {}: {:?}", anomaly.offset, anomaly.depth, anomaly.kind);
    }

    let mut scene = SceneGraph::new();
    let summary = read_scene_chunks(&buf, &index, &mut scene, &mut TracingSink);
    println!(
        "{} chunks, {} nodes, {} attributes, {} connections",
        summary.chunks, summary.nodes, summary.attributes, summary.connections
    );
    Ok(())
}
