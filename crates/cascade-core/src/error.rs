use thiserror::Error;

#[derive(Error, Debug)]
pub enum CascadeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Encoding error: {0}")]
    Encode(String),

    #[error("Vertex not found: {0}")]
    VertexNotFound(String),

    #[error("No source selected; call solve() first")]
    NotSolved,

    #[error("A cascade cycle is in progress (phase: {0})")]
    CycleInProgress(String),

    #[error("Unknown edit opcode: {0}")]
    UnknownOpcode(String),

    #[error("Invalid edit: {0}")]
    InvalidEdit(String),

    #[error("Snapshot error: {0}")]
    Snapshot(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, CascadeError>;
