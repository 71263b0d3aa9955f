//! Local stand-in for the assemblies API: verifies signatures and walks each assembly
//! through EXECUTING to COMPLETED over a configurable number of status polls.

#![allow(dead_code)]

use axum::extract::{DefaultBodyLimit, Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use transloadit::{Credentials, PollConfig, Transloadit};
use transloadit_http::verify_signature;

pub const KEY: &str = "test-key";
pub const SECRET: &str = "test-secret";

#[derive(Debug, Clone, Copy, Default)]
pub struct Behavior {
    /// Status polls answered with EXECUTING before an assembly completes.
    pub executing_polls: u32,
    /// Assemblies stay EXECUTING forever.
    pub never_completes: bool,
    /// The first N status requests fail with 503.
    pub failing_polls: u32,
}

struct FakeAssembly {
    result_steps: Vec<String>,
    file_names: Vec<String>,
    polls: u32,
    canceled: bool,
}

#[derive(Default)]
struct Counters {
    next_id: u64,
    create_requests: usize,
    status_requests: usize,
    uploaded_bytes: usize,
    failures_left: u32,
}

pub struct FakeService {
    behavior: Behavior,
    endpoint: String,
    assemblies: Mutex<HashMap<String, FakeAssembly>>,
    counters: Mutex<Counters>,
}

impl FakeService {
    pub fn create_requests(&self) -> usize {
        self.counters.lock().unwrap().create_requests
    }

    pub fn status_requests(&self) -> usize {
        self.counters.lock().unwrap().status_requests
    }

    /// Total size of every file part received so far.
    pub fn uploaded_bytes(&self) -> usize {
        self.counters.lock().unwrap().uploaded_bytes
    }

    fn assembly_json(&self, id: &str, a: &FakeAssembly) -> Value {
        let url = format!("{}/assemblies/{}", self.endpoint, id);
        if a.canceled {
            return json!({ "ok": "ASSEMBLY_CANCELED", "assembly_id": id, "assembly_ssl_url": url });
        }
        if self.behavior.never_completes || a.polls <= self.behavior.executing_polls {
            return json!({
                "ok": "ASSEMBLY_EXECUTING",
                "assembly_id": id,
                "assembly_ssl_url": url,
                "results": []
            });
        }
        let results: serde_json::Map<String, Value> = a
            .result_steps
            .iter()
            .map(|step| {
                let files: Vec<Value> = a
                    .file_names
                    .iter()
                    .enumerate()
                    .map(|(i, name)| {
                        json!({
                            "id": format!("{id}-{step}-{i}"),
                            "name": name,
                            "size": 1234,
                            "mime": "image/jpeg",
                            "ssl_url": format!("https://tmp.example.com/{id}/{step}/{name}"),
                            "meta": { "width": 100, "height": 100 }
                        })
                    })
                    .collect();
                (step.clone(), Value::Array(files))
            })
            .collect();
        json!({
            "ok": "ASSEMBLY_COMPLETED",
            "message": "The Assembly was successfully completed.",
            "assembly_id": id,
            "assembly_ssl_url": url,
            "results": results
        })
    }
}

pub struct FakeServer {
    pub endpoint: String,
    pub service: Arc<FakeService>,
}

impl FakeServer {
    /// Client with the right credentials and a fast poll loop.
    pub fn client(&self) -> Transloadit {
        self.client_with_secret(SECRET)
    }

    pub fn client_with_secret(&self, secret: &str) -> Transloadit {
        Transloadit::with_credentials(&self.endpoint, Credentials::new(KEY, secret))
            .unwrap()
            .with_poll_config(PollConfig::new(
                Duration::from_millis(20),
                Duration::from_secs(5),
            ))
    }
}

pub async fn start(behavior: Behavior) -> FakeServer {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let endpoint = format!("http://{}", listener.local_addr().unwrap());
    let service = Arc::new(FakeService {
        behavior,
        endpoint: endpoint.clone(),
        assemblies: Mutex::new(HashMap::new()),
        counters: Mutex::new(Counters {
            failures_left: behavior.failing_polls,
            ..Counters::default()
        }),
    });
    let app = Router::new()
        .route("/assemblies", post(handle_create))
        .route("/assemblies/:id", get(handle_status).delete(handle_cancel))
        .layer(DefaultBodyLimit::disable())
        .with_state(Arc::clone(&service));
    tokio::spawn(async move {
        axum::serve(listener, app.into_make_service()).await.unwrap();
    });
    FakeServer { endpoint, service }
}

/// A small file to upload; the fake service never decodes it.
pub fn fixture_image() -> tempfile::NamedTempFile {
    sized_image(FIXTURE.len())
}

const FIXTURE: &[u8] = b"\xFF\xD8\xFF\xE0fixture";

/// Fixture of exactly `len` bytes, starting with a JPEG marker.
pub fn sized_image(len: usize) -> tempfile::NamedTempFile {
    let mut f = tempfile::Builder::new()
        .prefix("image-resize-robot")
        .suffix(".jpg")
        .tempfile()
        .unwrap();
    let body: Vec<u8> = FIXTURE.iter().copied().cycle().take(len).collect();
    f.write_all(&body).unwrap();
    f
}

type Reply = (StatusCode, Json<Value>);

fn reject(status: StatusCode, error: &str) -> Reply {
    (status, Json(json!({ "error": error })))
}

fn authorized(params: Option<&str>, signature: Option<&str>) -> bool {
    let (Some(params), Some(signature)) = (params, signature) else {
        return false;
    };
    let key_matches = serde_json::from_str::<Value>(params)
        .map(|p| p["auth"]["key"] == KEY)
        .unwrap_or(false);
    key_matches && verify_signature(SECRET, params, signature)
}

async fn handle_create(State(svc): State<Arc<FakeService>>, mut multipart: Multipart) -> Reply {
    svc.counters.lock().unwrap().create_requests += 1;

    let mut params = None;
    let mut signature = None;
    let mut file_names = Vec::new();
    let mut uploaded = 0;
    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_owned);
        let bytes = field.bytes().await.unwrap_or_default();
        match name.as_str() {
            "params" => params = Some(String::from_utf8_lossy(&bytes).into_owned()),
            "signature" => signature = Some(String::from_utf8_lossy(&bytes).into_owned()),
            _ => {
                uploaded += bytes.len();
                file_names.extend(file_name);
            }
        }
    }
    if !authorized(params.as_deref(), signature.as_deref()) {
        return reject(StatusCode::FORBIDDEN, "INVALID_SIGNATURE");
    }
    if file_names.is_empty() {
        return reject(StatusCode::BAD_REQUEST, "NO_FILES");
    }
    let params: Value = serde_json::from_str(params.as_deref().unwrap_or("{}")).unwrap();
    let result_steps: Vec<String> = params["steps"]
        .as_object()
        .map(|steps| {
            steps
                .iter()
                .filter(|(_, s)| s["result"] == true)
                .map(|(name, _)| name.clone())
                .collect()
        })
        .unwrap_or_default();

    let id = {
        let mut c = svc.counters.lock().unwrap();
        c.next_id += 1;
        c.uploaded_bytes += uploaded;
        format!("{:032x}", c.next_id)
    };
    let assembly = FakeAssembly {
        result_steps,
        file_names,
        polls: 0,
        canceled: false,
    };
    let body = svc.assembly_json(&id, &assembly);
    svc.assemblies.lock().unwrap().insert(id, assembly);
    (StatusCode::OK, Json(body))
}

async fn handle_status(
    State(svc): State<Arc<FakeService>>,
    Path(id): Path<String>,
    Query(q): Query<HashMap<String, String>>,
) -> Reply {
    if !authorized(q.get("params").map(String::as_str), q.get("signature").map(String::as_str)) {
        return reject(StatusCode::FORBIDDEN, "INVALID_SIGNATURE");
    }
    {
        let mut c = svc.counters.lock().unwrap();
        c.status_requests += 1;
        if c.failures_left > 0 {
            c.failures_left -= 1;
            return reject(StatusCode::SERVICE_UNAVAILABLE, "SERVER_OVERLOADED");
        }
    }
    let mut assemblies = svc.assemblies.lock().unwrap();
    match assemblies.get_mut(&id) {
        Some(a) => {
            a.polls += 1;
            (StatusCode::OK, Json(svc.assembly_json(&id, a)))
        }
        None => reject(StatusCode::NOT_FOUND, "ASSEMBLY_NOT_FOUND"),
    }
}

async fn handle_cancel(
    State(svc): State<Arc<FakeService>>,
    Path(id): Path<String>,
    Query(q): Query<HashMap<String, String>>,
) -> Reply {
    if !authorized(q.get("params").map(String::as_str), q.get("signature").map(String::as_str)) {
        return reject(StatusCode::FORBIDDEN, "INVALID_SIGNATURE");
    }
    let mut assemblies = svc.assemblies.lock().unwrap();
    match assemblies.get_mut(&id) {
        Some(a) => {
            a.canceled = true;
            (StatusCode::OK, Json(svc.assembly_json(&id, a)))
        }
        None => reject(StatusCode::NOT_FOUND, "ASSEMBLY_NOT_FOUND"),
    }
}
