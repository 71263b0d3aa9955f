//! Poll the status endpoint until the assembly finishes, the deadline passes, or the
//! caller cancels.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use transloadit_types::{Assembly, AssemblyError, AssemblyTransport, PollConfig};

/// Stand-in deadline for timeouts too large to add to an `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Waits for assemblies to reach a terminal status.
///
/// Holds no per-wait state, so one poller can serve any number of concurrent waits.
#[derive(Clone)]
pub struct StatusPoller {
    transport: Arc<dyn AssemblyTransport>,
}

impl StatusPoller {
    pub fn new(transport: Arc<dyn AssemblyTransport>) -> Self {
        Self { transport }
    }

    /// Fetch the status every `config.interval` until it is terminal.
    ///
    /// Errors:
    /// - `Timeout` when `config.timeout` elapses first; a fetch still in flight at the
    ///   deadline is dropped and no request is sent afterwards.
    /// - `Cancelled` as soon as `cancel` fires.
    /// - `Transport` after more than `config.max_transient_retries` consecutive transient
    ///   failures, or on the first non-transient one.
    /// - `NotFound` when the service does not know the id.
    pub async fn wait_for_completion(
        &self,
        assembly_id: &str,
        config: &PollConfig,
        cancel: &CancellationToken,
    ) -> Result<Assembly, AssemblyError> {
        config.validate()?;
        let started = Instant::now();
        let deadline = started
            .checked_add(config.timeout)
            .unwrap_or_else(|| started + FAR_FUTURE);
        let mut attempt: u32 = 0;
        let mut transient_failures: u32 = 0;

        loop {
            if cancel.is_cancelled() {
                return Err(cancelled(assembly_id));
            }
            if Instant::now() >= deadline {
                return Err(timed_out(assembly_id, started));
            }
            attempt += 1;

            let fetched = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(cancelled(assembly_id)),
                res = tokio::time::timeout_at(deadline, self.transport.fetch(assembly_id)) => res,
            };

            match fetched {
                Err(_elapsed) => return Err(timed_out(assembly_id, started)),
                Ok(Ok(snapshot)) => {
                    transient_failures = 0;
                    if snapshot.is_terminal() {
                        tracing::info!(
                            assembly_id = %assembly_id,
                            status = %snapshot.status(),
                            attempt,
                            "assembly finished"
                        );
                        return Ok(snapshot);
                    }
                    tracing::debug!(
                        assembly_id = %assembly_id,
                        status = %snapshot.status(),
                        attempt,
                        "assembly still running"
                    );
                }
                Ok(Err(e)) => {
                    if !e.is_transient() || transient_failures >= config.max_transient_retries {
                        tracing::warn!(
                            assembly_id = %assembly_id,
                            attempt,
                            error = %e,
                            "status fetch failed"
                        );
                        return Err(e.into());
                    }
                    transient_failures += 1;
                    tracing::warn!(
                        assembly_id = %assembly_id,
                        attempt,
                        transient_failures,
                        error = %e,
                        "status fetch failed, retrying"
                    );
                }
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(timed_out(assembly_id, started));
            }
            let pause = config.interval.min(deadline - now);
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(cancelled(assembly_id)),
                _ = tokio::time::sleep(pause) => {}
            }
        }
    }
}

fn cancelled(assembly_id: &str) -> AssemblyError {
    tracing::info!(assembly_id = %assembly_id, "wait cancelled");
    AssemblyError::Cancelled {
        assembly_id: assembly_id.to_string(),
    }
}

fn timed_out(assembly_id: &str, started: Instant) -> AssemblyError {
    let waited = started.elapsed();
    tracing::warn!(assembly_id = %assembly_id, ?waited, "gave up waiting for assembly");
    AssemblyError::Timeout {
        assembly_id: assembly_id.to_string(),
        waited,
    }
}
