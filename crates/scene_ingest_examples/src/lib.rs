#![forbid(unsafe_code)]

use std::path::PathBuf;

use scene_ingest::prelude::*;

/// Small rig used when no input file is given on the command line.
pub const SAMPLE_SCENE: &str = r#"//Maya ASCII 2024 scene
requires maya "2024";
currentUnit -l centimeter -a degree -t film;
createNode transform -n "driverA";
	setAttr ".t" -type "double3" 1 2 3 ;
createNode transform -n "driverB";
	setAttr ".t" -type "double3" 3 2 1 ;
createNode plusMinusAverage -n "avg1";
	setAttr ".operation" 3;
createNode transform -n "follower";
createNode animCurveTL -n "follower_translateY";
select -ne :time1;
connectAttr ":time1.o" "follower_translateY.i";
connectAttr "driverA.t" "avg1.input3D[0]";
connectAttr "driverB.t" "avg1.input3D[1]";
connectAttr "avg1.output3D" "follower.t";
"#;

/// Installs a formatting subscriber honouring `RUST_LOG` (default `info`).
pub fn init_tracing() {
    if std::env::var_os("RUST_LOG").is_none() {
        std::env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();
}

/// First command-line argument as a path, if any.
pub fn input_path() -> Option<PathBuf> {
    std::env::args_os().nth(1).map(PathBuf::from)
}

/// Imports the file named on the command line, or [`SAMPLE_SCENE`] without one.
pub fn import_input(sink: &mut dyn EventSink) -> anyhow::Result<ImportSession> {
    let mut session = ImportSession::new(ImportOptions::default())?;
    match input_path() {
        Some(path) => {
            session.import_path(&path, sink)?;
        }
        None => {
            session.import_bytes("sample.ma", SAMPLE_SCENE.as_bytes(), sink)?;
        }
    }
    Ok(session)
}

/// Prints every node with its type, parent and attributes.
pub fn print_scene(scene: &SceneGraph) {
    for node in scene.nodes() {
        match node.parent() {
            Some(parent) => println!(
                "{} {} ({}) <- {}",
                node.id(),
                node.name(),
                node.node_type(),
                parent
            ),
            None => println!("{} {} ({})", node.id(), node.name(), node.node_type()),
        }
        for (path, value) in node.attributes() {
            println!("    {path} = {value}");
        }
    }
    for c in scene.connections() {
        println!("{} -> {}", c.source, c.destination);
    }
}
