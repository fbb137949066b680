use glam::DVec3;
use scene_ingest::prelude::*;
use scene_ingest_examples::{import_input, init_tracing};

fn main() -> anyhow::Result<()> {
    init_tracing();

    let mut sink = VecSink::new();
    let mut session = import_input(&mut sink)?;

    let mut scheduler = Scheduler::for_scene(session.scene(), &EvalNodeRegistry::new());
    println!("order: {}", scheduler.graph().order_names().join(" -> "));

    let mut ctx = EvalContext::new(1.0);

    for frame in 1..=3 {
        ctx.set_time(frame as f64);
        let report = scheduler.evaluate(session.scene_mut(), &mut ctx);
        println!(
            "t={}: ran [{}], skipped {}, time changed: {}",
            ctx.time(),
            report.executed.join(", "),
            report.skipped,
            report.time_changed
        );
    }

    for node in session.scene().nodes() {
        if node.node_type() == "plusMinusAverage" {
            let out = node.read_vec3(DVec3::ZERO, &[PlusMinusAverage::OUTPUT]);
            println!("{}.output3D = {out}", node.name());
        }
    }
    Ok(())
}
