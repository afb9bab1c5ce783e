use crate::NodeId;
use thiserror::Error;

/// Errors raised at the boundaries of the graph core: documents, style values and settings.
///
/// Model operations never fail; they treat unknown ids as no-ops.
#[derive(Error, Debug)]
pub enum GraphError {
    #[error("Invalid result document: {0}")]
    InvalidDocument(#[from] serde_json::Error),
    #[error("Invalid numeric style value for '{key}': {value}")]
    InvalidStyleValue { key: String, value: String },
    #[error("Settings I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure reported by a neighbour fetch collaborator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NeighbourFetchError {
    #[error("Neighbour query for node {node_id} failed: {reason}")]
    QueryFailed { node_id: NodeId, reason: String },
    #[error("Neighbour fetch was dropped before replying")]
    Disconnected,
}
