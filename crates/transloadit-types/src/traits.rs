//! Transport seam and error taxonomy.

use crate::{Assembly, AssemblySpec};
use async_trait::async_trait;
use std::time::Duration;

/// Remote assemblies API.
///
/// `create` is not idempotent and callers must not retry it; `fetch` is a pure read.
#[async_trait]
pub trait AssemblyTransport: Send + Sync {
    /// Upload the spec's files and pipeline; returns the snapshot carried by the response.
    async fn create(&self, spec: &AssemblySpec) -> Result<Assembly, TransportError>;

    /// Fetch the current snapshot of an assembly.
    async fn fetch(&self, assembly_id: &str) -> Result<Assembly, TransportError>;

    /// Ask the remote service to cancel a running assembly.
    async fn cancel(&self, assembly_id: &str) -> Result<Assembly, TransportError>;
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    /// The request did not produce a response (connect failure, timeout, ...).
    #[error("request failed: {message}")]
    Request { message: String, transient: bool },
    #[error("remote error {status}: {body}")]
    Http { status: u16, body: String },
    #[error("assembly not found: {0}")]
    NotFound(String),
    #[error("undecodable response: {0}")]
    Decode(String),
    #[error("reading input: {0}")]
    Io(String),
}

impl TransportError {
    /// Whether retrying the same read may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Request { transient, .. } => *transient,
            Self::Http { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AssemblyError {
    /// Bad caller input; nothing was sent.
    #[error("invalid assembly request: {0}")]
    Validation(String),
    /// Network or HTTP fault; the request may or may not have reached the service.
    #[error("transport: {0}")]
    Transport(TransportError),
    #[error("assembly not found: {0}")]
    NotFound(String),
    #[error("assembly {assembly_id} did not finish within {waited:?}")]
    Timeout { assembly_id: String, waited: Duration },
    #[error("wait for assembly {assembly_id} was cancelled")]
    Cancelled { assembly_id: String },
}

impl From<TransportError> for AssemblyError {
    fn from(e: TransportError) -> Self {
        match e {
            TransportError::NotFound(id) => Self::NotFound(id),
            other => Self::Transport(other),
        }
    }
}
