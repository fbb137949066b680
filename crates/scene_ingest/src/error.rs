//! Error types and result alias for the crate.
//!
//! This module defines [`enum@crate::error::Error`] and the crate-wide [Result] alias.
//! Malformed scene content never surfaces here; it degrades to anomalies and
//! events instead. Only bad options, lookups of nodes that do not exist,
//! undetectable input and IO failures are errors.
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[non_exhaustive]
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("unknown node '{name}'")]
    UnknownNode { name: String },

    #[error("unrecognized scene format: {0}")]
    UnknownFormat(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
