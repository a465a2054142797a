use std::time::Duration;

use thiserror::Error;

use crate::graph::{EdgeKey, Vertex};

#[derive(Error, Debug)]
pub enum AntRouteError {
    #[error("Unknown vertex: {0}")]
    UnknownVertex(Vertex),

    #[error("Unknown edge: {0}")]
    UnknownEdge(EdgeKey),

    #[error("Timed out after {waited:?} waiting for pheromone entry {edge}")]
    LockTimeout { edge: EdgeKey, waited: Duration },

    #[error("Connection failure: {0}")]
    ConnectionFailure(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Coordinator rejected request: {0}")]
    Rejected(String),

    #[error("No candidate edges leave vertex {0}")]
    NoCandidates(Vertex),

    #[error("Invalid sampling weights: {0}")]
    InvalidWeights(String),

    #[error("Invalid graph: {0}")]
    InvalidGraph(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl AntRouteError {
    /// Whether repeating the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AntRouteError::LockTimeout { .. })
    }
}

pub type Result<T> = std::result::Result<T, AntRouteError>;
