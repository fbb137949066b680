use glam::DVec3;
use scene_ingest::prelude::*;

const RIG: &str = r#"//Maya ASCII 2024 scene
//Name: rig.ma
requires maya "2024";
currentUnit -l centimeter -a degree -t film;
fileInfo "application" "maya";
createNode transform -n "driverA";
	setAttr ".t" -type "double3" 1 2 3 ;
createNode transform -n "driverB";
	setAttr ".t" -type "double3" 3 2 1 ;
createNode plusMinusAverage -n "sum1";
	setAttr ".op" 1;
createNode plusMinusAverage -n "avg1";
	setAttr ".operation" 3;
createNode transform -n "follower";
createNode transform -n "bystander";
	setAttr ".scale" -type "string" "2.5";
select -ne :time1;
	setAttr ".o" 1;
connectAttr "driverA.t" "sum1.input3D[0]";
connectAttr "driverB.t" "sum1.input3D[1]";
connectAttr "driverA.t" "avg1.input3D[0]";
connectAttr "driverB.t" "avg1.input3D[1]";
connectAttr "sum1.output3D" "follower.t";
connectAttr "avg1.output3D" "follower.t";
dataStructure -fmt "raw" -as "name=Face:int32=faceIndex";
"#;

fn import_rig() -> (ImportSession, VecSink) {
    let mut session = ImportSession::new(ImportOptions::default()).expect("valid options");
    let mut sink = VecSink::new();
    session
        .import_bytes("rig.ma", RIG.as_bytes(), &mut sink)
        .expect("ascii import");
    (session, sink)
}

#[test]
fn ascii_rig_is_imported_with_metadata() {
    let (session, sink) = import_rig();
    let scene = session.scene();

    assert_eq!(scene.len(), 7);
    assert_eq!(scene.node("sum1").unwrap().node_type(), "plusMinusAverage");
    assert_eq!(
        scene.node("time1").unwrap().node_type(),
        scene_ingest::graph::UNKNOWN_NODE_TYPE
    );
    assert_eq!(scene.metadata("units.angle"), Some("degree"));
    assert_eq!(scene.connections().len(), 6);
    assert_eq!(sink.count(ImportEventKind::StatementSkipped), 1);
    assert_eq!(session.summary().skipped_statements, 1);
}

#[test]
fn alias_and_last_incoming_queries() {
    let (session, _) = import_rig();
    let scene = session.scene();

    let bystander = scene.node("bystander").unwrap();
    assert_eq!(bystander.read_float(1.0, &[".scale", "scale"]), 2.5);
    assert_eq!(bystander.read_float(1.0, &[".missing"]), 1.0);

    assert_eq!(
        scene.find_last_incoming_to("follower", &["t", ".t"]).as_deref(),
        Some("avg1.output3D")
    );
    assert_eq!(scene.incoming_to("follower", &["t"]).count(), 2);
}

#[test]
fn evaluation_aggregates_connected_inputs() {
    let (mut session, _) = import_rig();
    let mut scheduler = Scheduler::for_scene(session.scene(), &EvalNodeRegistry::new());
    let order = scheduler.graph().order_names();
    let pos = |n: &str| order.iter().position(|o| *o == n).unwrap();
    assert!(pos("driverA") < pos("sum1"));
    assert!(pos("avg1") < pos("follower"));

    // Nothing has run yet, so the first sweep computes every node.
    let mut ctx = EvalContext::new(1.0);
    let report = scheduler.evaluate(session.scene_mut(), &mut ctx);
    assert_eq!(report.executed_count(), 7);
    assert!(report.ran("sum1") && report.ran("avg1") && report.ran("follower"));

    let scene = session.scene();
    let out = |n: &str| {
        scene
            .node(n)
            .unwrap()
            .read_vec3(DVec3::NAN, &["output3D[0]"])
    };
    assert_eq!(out("sum1"), DVec3::splat(4.0));
    assert_eq!(out("avg1"), DVec3::splat(2.0));
    assert_eq!(
        scene.attribute("follower", "t"),
        Some(&AttributeValue::FloatArray(vec![2.0, 2.0, 2.0]))
    );
    assert!(ctx.was_dirtied("sum1.output3D"));

    let again = scheduler.evaluate(session.scene_mut(), &mut ctx);
    assert_eq!(again.executed_count(), 0);

    ctx.mark_dirty("driverB.t");
    let edit = scheduler.evaluate(session.scene_mut(), &mut ctx);
    assert!(edit.ran("driverB") && edit.ran("sum1") && edit.ran("follower"));
    assert!(!edit.ran("driverA") && !edit.ran("bystander"));
}

fn leaf(tag: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let mut out = tag.to_vec();
    out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    out.extend_from_slice(payload);
    while out.len() % 4 != 0 {
        out.push(0);
    }
    out
}

fn container(subtype: &[u8; 4], children: &[u8]) -> Vec<u8> {
    let mut out = b"FOR4".to_vec();
    out.extend_from_slice(&((children.len() + 4) as u32).to_be_bytes());
    out.extend_from_slice(subtype);
    out.extend_from_slice(children);
    out
}

#[test]
fn container_with_two_leaves_yields_three_nested_records() {
    let mut children = leaf(b"STR ", b"hello\0");
    children.extend(leaf(b"FLT3", &[0x3f, 0x80, 0, 0, 0x40, 0, 0, 0, 0, 0, 0, 0]));
    let buf = container(b"DATA", &children);

    let index = index_chunks(&buf, &IndexOptions::default());
    assert_eq!(index.len(), 3);
    assert!(index.anomalies().is_empty());

    let parent = &index.chunks()[0];
    let range = parent.data_range();
    for (_, child) in index.children(0) {
        assert_eq!(child.depth, parent.depth + 1);
        assert!(child.header_offset >= range.start);
        assert!(child.data_range().end <= range.end);
    }
    assert_eq!(index.chunks()[1].decode_kind, DecodeKind::Strings);
    assert_eq!(index.chunks()[2].decode_kind, DecodeKind::Floats);
}

#[test]
fn binary_scene_round_trips_through_the_session() {
    let mut node = leaf(b"CREA", b"pma1\0");
    let mut op = b"operation\0".to_vec();
    op.extend_from_slice(&[0, 0, 0, 3, 0, 0, 0, 0]);
    node.extend(leaf(b"LNG2", &op));
    let mut body = container(b"PLMA", &node);
    body.extend(leaf(b"CWFL", b"driver.t\0pma1.input3D[0]\0"));
    let mut truncated = container(b"Maya", &body);
    // Oversized trailing leaf: truncated, flagged, not fatal.
    truncated.extend_from_slice(b"JUNK\0\0\xff\xffab");

    let mut session = ImportSession::new(ImportOptions::default()).unwrap();
    let mut sink = VecSink::new();
    let summary = session
        .import_bytes("rig.mb", &truncated, &mut sink)
        .expect("binary import");

    assert_eq!(summary.connections, 1);
    assert!(summary.anomalies >= 1);
    assert!(sink.count(ImportEventKind::ChunkAnomaly) >= 1);
    let pma = session.scene().node("pma1").unwrap();
    assert_eq!(pma.node_type(), "PLMA");
    assert_eq!(pma.read_int(1, &["operation"]), 3);
}
