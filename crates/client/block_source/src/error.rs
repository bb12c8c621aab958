use std::time::Duration;

use lp_block::BlockId;
use reqwest::StatusCode;
use thiserror::Error;

/// The endpoint answered, but not with something usable.
#[derive(Debug, Error)]
pub enum EndpointError {
    #[error("HTTP status {0}")]
    Status(StatusCode),

    #[error("JSON-RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("Response body is not JSON: {0}")]
    InvalidBody(#[from] serde_json::Error),

    #[error("Invalid block number in response: {0}")]
    InvalidTip(String),
}

#[derive(Debug, Error)]
pub enum BlockSourceError {
    #[error("Transport error during {method}: {source}")]
    Transport {
        method: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("Endpoint error during {method}: {source}")]
    Endpoint {
        method: &'static str,
        #[source]
        source: EndpointError,
    },

    #[error("Timed out fetching block {block_id} after {after:?}")]
    Timeout { block_id: BlockId, after: Duration },
}

impl BlockSourceError {
    pub fn endpoint(method: &'static str, source: impl Into<EndpointError>) -> Self {
        Self::Endpoint { method, source: source.into() }
    }

    pub fn transport(method: &'static str, source: reqwest::Error) -> Self {
        Self::Transport { method, source }
    }

    /// Get error type as a string for logs
    pub fn error_type(&self) -> &'static str {
        match self {
            BlockSourceError::Transport { .. } => "transport_error",
            BlockSourceError::Endpoint { .. } => "endpoint_error",
            BlockSourceError::Timeout { .. } => "timeout",
        }
    }
}
