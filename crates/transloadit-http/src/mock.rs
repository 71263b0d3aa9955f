//! Scripted transport for tests: replays queued outcomes, no network.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use transloadit_types::{Assembly, AssemblySpec, AssemblyTransport, TransportError};

type Outcome = Result<Assembly, TransportError>;

/// Transport that answers from scripted queues.
///
/// `fetch` pops one outcome per call; the last queued outcome repeats forever, so a
/// single `EXECUTING` snapshot models an assembly that never finishes.
#[derive(Default)]
pub struct ScriptedTransport {
    creates: Mutex<VecDeque<Outcome>>,
    fetches: Mutex<VecDeque<Outcome>>,
    submitted: Mutex<Vec<AssemblySpec>>,
    fetch_delay: Option<Duration>,
    create_calls: AtomicUsize,
    fetch_calls: AtomicUsize,
    cancel_calls: AtomicUsize,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `fetch` sleeps this long before answering.
    pub fn with_fetch_delay(mut self, delay: Duration) -> Self {
        self.fetch_delay = Some(delay);
        self
    }

    pub async fn push_create(&self, outcome: Outcome) {
        self.creates.lock().await.push_back(outcome);
    }

    pub async fn push_fetch(&self, outcome: Outcome) {
        self.fetches.lock().await.push_back(outcome);
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub fn cancel_calls(&self) -> usize {
        self.cancel_calls.load(Ordering::SeqCst)
    }

    /// Specs passed to `create`, in call order.
    pub async fn submitted(&self) -> Vec<AssemblySpec> {
        self.submitted.lock().await.clone()
    }
}

/// Snapshot with the given wire `ok` code and no results.
pub fn snapshot(assembly_id: &str, ok: &str) -> Assembly {
    Assembly::try_from(serde_json::json!({ "ok": ok, "assembly_id": assembly_id }))
        .expect("scripted snapshot uses a known status")
}

/// Completed snapshot with one result file per named step.
pub fn completed(assembly_id: &str, steps: &[&str]) -> Assembly {
    let results: serde_json::Map<String, serde_json::Value> = steps
        .iter()
        .map(|step| {
            (
                step.to_string(),
                serde_json::json!([{
                    "id": format!("{assembly_id}-{step}"),
                    "name": format!("{step}.jpg"),
                    "size": 2048,
                    "mime": "image/jpeg",
                    "meta": { "width": 100, "height": 100 }
                }]),
            )
        })
        .collect();
    Assembly::try_from(serde_json::json!({
        "ok": "ASSEMBLY_COMPLETED",
        "assembly_id": assembly_id,
        "results": results,
    }))
    .expect("scripted snapshot uses a known status")
}

/// Failed snapshot with the given remote error code.
pub fn failed(assembly_id: &str, error: &str) -> Assembly {
    Assembly::try_from(serde_json::json!({
        "error": error,
        "message": "scripted failure",
        "assembly_id": assembly_id,
    }))
    .expect("scripted snapshot uses a known status")
}

#[async_trait]
impl AssemblyTransport for ScriptedTransport {
    async fn create(&self, spec: &AssemblySpec) -> Result<Assembly, TransportError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        self.submitted.lock().await.push(spec.clone());
        self.creates
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Decode("no scripted create".to_string())))
    }

    async fn fetch(&self, assembly_id: &str) -> Result<Assembly, TransportError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.fetch_delay {
            tokio::time::sleep(delay).await;
        }
        let mut queue = self.fetches.lock().await;
        match queue.len() {
            0 => Err(TransportError::NotFound(assembly_id.to_string())),
            1 => queue[0].clone(),
            _ => queue
                .pop_front()
                .unwrap_or_else(|| Err(TransportError::NotFound(assembly_id.to_string()))),
        }
    }

    async fn cancel(&self, assembly_id: &str) -> Result<Assembly, TransportError> {
        self.cancel_calls.fetch_add(1, Ordering::SeqCst);
        Ok(snapshot(assembly_id, "ASSEMBLY_CANCELED"))
    }
}
