//! Error types for graph construction, notation parsing, configuration and
//! input loading.
//!
//! Search-time outcomes such as "this embedding cannot be extended" are not
//! errors; they are reported through `Option`/`bool` results by the search
//! itself.

use std::{io, path::PathBuf};

use thiserror::Error;

/// Rejected graph topology.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    /// An edge whose source and destination are the same node.
    #[error("loop bond (source = destination = {node})")]
    LoopBond { node: usize },

    /// An edge referring to a node that was never added.
    #[error("node index {index} out of range (graph has {count} nodes)")]
    NodeOutOfRange { index: usize, count: usize },
}

/// Errors produced when reading a line notation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotationError {
    #[error("empty description")]
    Empty,

    #[error("unexpected end of description")]
    UnexpectedEnd,

    #[error("unexpected character '{ch}' at position {pos}")]
    UnexpectedChar { pos: usize, ch: char },

    #[error("unknown element '{name}' at position {pos}")]
    UnknownElement { pos: usize, name: String },

    #[error("{what} at position {pos} exceeds {max}")]
    OutOfRange {
        pos: usize,
        what: &'static str,
        max: u32,
    },

    #[error("missing ']' for bracket atom starting at position {pos}")]
    MissingBracket { pos: usize },

    #[error("unexpected ')' at position {pos}")]
    UnexpectedParen { pos: usize },

    #[error("missing ')'")]
    MissingParen,

    #[error("superfluous ')' at position {pos}")]
    SuperfluousParen { pos: usize },

    #[error("invalid reference to label {label} at position {pos}")]
    InvalidLabel { pos: usize, label: usize },

    #[error("ring label {label} is never closed")]
    UnclosedLabel { label: usize },

    #[error(transparent)]
    Graph(#[from] GraphError),
}

/// Invalid mining parameters, detected before any mining work starts.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("support threshold {0} is not in [0, 1]")]
    SupportOutOfRange(f64),

    #[error("absolute minimum support must be at least 1")]
    ZeroSupport,

    #[error("minimum fragment size {min} exceeds maximum size {max}")]
    SizeRange { min: usize, max: usize },

    #[error("invalid ring size range {min}..={max} (sizes must lie in 3..=63)")]
    RingRange { min: usize, max: usize },

    #[error("ring extensions require a ring size range")]
    RingsDisabled,

    #[error("unknown node type '{0}'")]
    UnknownType(String),

    #[error("invalid seed structure: {0}")]
    Seed(#[from] NotationError),
}

/// Failures that make a whole input file unusable. Single malformed lines
/// are skipped instead.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot read {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Csv(#[from] csv::Error),
}

/// Failures that end a mining run.
#[derive(Debug, Error)]
pub enum MineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("cannot write fragment report")]
    Report(#[from] io::Error),
}
