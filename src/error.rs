//! Error types for graph construction, configuration and drag handling.

use thiserror::Error;

/// Failure while building the node/link set. Nothing is added when one of
/// these is returned.
#[derive(Debug, Error)]
pub enum ConstructionError {
    /// Two nodes share an identifier.
    #[error("duplicate node id `{0}`")]
    DuplicateNode(String),

    /// A link names a node that is not in the graph.
    #[error("link {from} -> {to} references unknown node `{missing}`")]
    DanglingLink {
        from: String,
        to: String,
        missing: String,
    },

    /// A document node carries only one of its two coordinates.
    #[error("node `{0}` has only one of `x` and `y`")]
    PartialPosition(String),

    /// A simulation needs at least one node.
    #[error("graph has no nodes")]
    EmptyGraph,

    /// The graph document could not be parsed.
    #[error("malformed graph document: {0}")]
    Document(#[from] serde_json::Error),
}

/// A configuration value was rejected; the previous configuration is kept.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("`{field}` must be finite")]
    NonFinite { field: &'static str },

    #[error("`{field}` = {value} is outside {expected}")]
    OutOfRange {
        field: &'static str,
        value: f32,
        expected: &'static str,
    },
}

/// A pointer event could not be applied.
#[derive(Debug, Error, PartialEq)]
pub enum DragError {
    #[error("unknown node `{0}`")]
    UnknownNode(String),

    #[error("pointer coordinates ({x}, {y}) are not finite")]
    NonFinitePointer { x: f32, y: f32 },
}

/// Any error surfaced by the engine.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Construction(#[from] ConstructionError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Drag(#[from] DragError),
}

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, Error>;
