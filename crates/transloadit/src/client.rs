//! Client facade: submission, completion wait, status lookup, and cancel.

use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use transloadit_http::{HttpTransport, DEFAULT_REQUEST_TIMEOUT};
use transloadit_poller::StatusPoller;
use transloadit_types::{
    validate_assembly_id, Assembly, AssemblyError, AssemblySpec, AssemblyTransport, ConfigError,
    Credentials, PollConfig,
};

/// Transloadit API client.
///
/// Holds only immutable state, so clones can be handed to concurrent callers freely.
#[derive(Clone)]
pub struct Transloadit {
    transport: Arc<dyn AssemblyTransport>,
    poller: StatusPoller,
    poll: PollConfig,
}

impl Transloadit {
    pub fn new(transport: Arc<dyn AssemblyTransport>) -> Self {
        Self {
            poller: StatusPoller::new(Arc::clone(&transport)),
            transport,
            poll: PollConfig::default(),
        }
    }

    /// Client against `endpoint` with the default request timeout.
    pub fn with_credentials(
        endpoint: impl Into<String>,
        credentials: Credentials,
    ) -> Result<Self, ConfigError> {
        let transport = HttpTransport::new(endpoint, credentials, DEFAULT_REQUEST_TIMEOUT)?;
        Ok(Self::new(Arc::new(transport)))
    }

    /// Transport and poll defaults from `TRANSLOADIT_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let transport = HttpTransport::from_env()?;
        Ok(Self::new(Arc::new(transport)).with_poll_config(PollConfig::from_env()?))
    }

    /// Poll settings used when a spec carries none.
    pub fn with_poll_config(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    pub fn poll_config(&self) -> &PollConfig {
        &self.poll
    }

    /// Create an assembly; wait for it when `spec.wait_for_completion` is set.
    pub async fn submit(&self, spec: &AssemblySpec) -> Result<Assembly, AssemblyError> {
        self.submit_with_cancel(spec, &CancellationToken::new()).await
    }

    /// Like [`submit`](Self::submit), but the wait ends with `Cancelled` once `cancel` fires.
    ///
    /// Validation runs before any request. The create request itself is sent once and
    /// never retried.
    pub async fn submit_with_cancel(
        &self,
        spec: &AssemblySpec,
        cancel: &CancellationToken,
    ) -> Result<Assembly, AssemblyError> {
        spec.validate()?;
        for path in &spec.files {
            ensure_readable(path).await?;
        }

        let created = self.transport.create(spec).await?;
        tracing::info!(
            assembly_id = %created.assembly_id(),
            status = %created.status(),
            wait = spec.wait_for_completion,
            "assembly submitted"
        );
        if !spec.wait_for_completion || created.is_terminal() {
            return Ok(created);
        }

        let poll = spec.poll.as_ref().unwrap_or(&self.poll);
        self.poller
            .wait_for_completion(created.assembly_id(), poll, cancel)
            .await
    }

    /// Wait for an existing assembly using the client's poll settings.
    pub async fn wait_for_completion(
        &self,
        assembly_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Assembly, AssemblyError> {
        validate_assembly_id(assembly_id)?;
        self.poller
            .wait_for_completion(assembly_id, &self.poll, cancel)
            .await
    }

    /// Current snapshot of an assembly. One request, no retries.
    pub async fn get_status(&self, assembly_id: &str) -> Result<Assembly, AssemblyError> {
        validate_assembly_id(assembly_id)?;
        Ok(self.transport.fetch(assembly_id).await?)
    }

    /// Ask the service to cancel a running assembly; returns the resulting snapshot.
    pub async fn cancel(&self, assembly_id: &str) -> Result<Assembly, AssemblyError> {
        validate_assembly_id(assembly_id)?;
        Ok(self.transport.cancel(assembly_id).await?)
    }
}

async fn ensure_readable(path: &Path) -> Result<(), AssemblyError> {
    let unreadable =
        |e: std::io::Error| AssemblyError::Validation(format!("{}: {}", path.display(), e));
    let file = tokio::fs::File::open(path).await.map_err(unreadable)?;
    let meta = file.metadata().await.map_err(unreadable)?;
    if !meta.is_file() {
        return Err(AssemblyError::Validation(format!(
            "{} is not a regular file",
            path.display()
        )));
    }
    Ok(())
}
