use scene_ingest::prelude::*;
use scene_ingest_examples::{import_input, init_tracing, print_scene};

fn main() -> anyhow::Result<()> {
    init_tracing();

    let mut sink = FnSink::new(|event| {
        if let ImportEvent::StatementSkipped { command, reason } = event {
            tracing::info!("skipped '{}': {}", command, reason);
        }
    });
    let session = import_input(&mut sink)?;

    print_scene(session.scene());
    for (key, value) in session.scene().metadata_entries() {
        println!("{key} = {value}");
    }

    let summary = session.summary();
    println!(
        "{} nodes, {} attributes, {} connections, {} statements ({} skipped)",
        summary.nodes,
        summary.attributes,
        summary.connections,
        summary.statements,
        summary.skipped_statements
    );
    Ok(())
}
