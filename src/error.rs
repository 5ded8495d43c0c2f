//! Error types shared across the crate.

/// Errors surfaced by the core (trie/parser/block-coder) and by the CLI.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("corrupt input: {0}")]
    CorruptInput(String),
    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),
    #[error("internal invariant violated: {0}")]
    InvariantViolation(String),
    #[error("io error")]
    Io(#[from] std::io::Error),
}

pub type DYNERR = Box<dyn std::error::Error>;
pub type STDRESULT = Result<(), DYNERR>;
