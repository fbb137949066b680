//! ASCII scene text: a whitespace/semicolon tokenizer and the statement parser built on it.
pub mod parser;
pub mod tokenizer;

pub use parser::{parse_scene_text, StatementParser};
pub use tokenizer::{tokenize, Token, TokenKind, Tokenizer};
