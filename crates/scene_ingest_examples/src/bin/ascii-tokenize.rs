use scene_ingest::prelude::*;
use scene_ingest_examples::{init_tracing, input_path, SAMPLE_SCENE};

fn main() -> anyhow::Result<()> {
    init_tracing();

    let text = match input_path() {
        Some(path) => std::fs::read_to_string(path)?,
        None => SAMPLE_SCENE.to_owned(),
    };

    let mut statement: Vec<&str> = Vec::new();
    let mut statements = 0usize;
    for token in tokenize(&text) {
        match token.kind {
            TokenKind::Word => statement.push(token.text),
            TokenKind::Semicolon => {
                statements += 1;
                println!("{:>5}: {}", statements, statement.join(" "));
                statement.clear();
            }
        }
    }
    if !statement.is_empty() {
        println!("trailing: {}", statement.join(" "));
    }
    Ok(())
}
