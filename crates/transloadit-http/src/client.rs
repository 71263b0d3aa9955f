//! HTTP client for the Transloadit `/assemblies` endpoints.

use crate::signature::{sign_params, SignedParams};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use std::fmt;
use std::time::Duration;
use tokio_util::io::ReaderStream;
use transloadit_types::{
    env_or, Assembly, AssemblyResponse, AssemblySpec, AssemblyTransport, ConfigError, Credentials,
    TransportError,
};

pub const DEFAULT_ENDPOINT: &str = "https://api2.transloadit.com";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// [`AssemblyTransport`] over HTTPS. Every request is signed with the account credentials.
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: String,
    credentials: Credentials,
}

impl HttpTransport {
    /// Build a transport with its own `reqwest::Client` using the given per-request timeout.
    pub fn new(
        endpoint: impl Into<String>,
        credentials: Credentials,
        request_timeout: Duration,
    ) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| ConfigError::Client(e.to_string()))?;
        Ok(Self::with_client(client, endpoint, credentials))
    }

    /// Reuse an existing [`reqwest::Client`] (shares its connection pool).
    pub fn with_client(
        client: reqwest::Client,
        endpoint: impl Into<String>,
        credentials: Credentials,
    ) -> Self {
        let endpoint = endpoint.into().trim_end_matches('/').to_string();
        Self {
            client,
            endpoint,
            credentials,
        }
    }

    /// Configure from `TRANSLOADIT_KEY`, `TRANSLOADIT_SECRET`, `TRANSLOADIT_ENDPOINT`
    /// and `TRANSLOADIT_REQUEST_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let credentials = Credentials::from_env()?;
        let endpoint = std::env::var("TRANSLOADIT_ENDPOINT")
            .unwrap_or_else(|_| DEFAULT_ENDPOINT.to_string());
        let timeout_secs = env_or(
            "TRANSLOADIT_REQUEST_TIMEOUT_SECS",
            DEFAULT_REQUEST_TIMEOUT.as_secs(),
        )?;
        Self::new(endpoint, credentials, Duration::from_secs(timeout_secs))
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn assembly_url(&self, assembly_id: &str) -> String {
        format!("{}/assemblies/{}", self.endpoint, assembly_id)
    }

    fn signed(&self, params: serde_json::Map<String, serde_json::Value>) -> SignedParams {
        sign_params(&self.credentials, params, Utc::now())
    }

    async fn upload_form(&self, spec: &AssemblySpec) -> Result<Form, TransportError> {
        let signed = self.signed(spec.params());
        let mut form = Form::new()
            .text("params", signed.params)
            .text("signature", signed.signature);
        for (i, path) in spec.files.iter().enumerate() {
            let field = format!("file_{}", i + 1);
            let unreadable =
                |e: std::io::Error| TransportError::Io(format!("{}: {}", path.display(), e));
            let file = tokio::fs::File::open(path).await.map_err(unreadable)?;
            let len = file.metadata().await.map_err(unreadable)?.len();
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| field.clone());
            let body = reqwest::Body::wrap_stream(ReaderStream::new(file));
            form = form.part(field, Part::stream_with_length(body, len).file_name(file_name));
        }
        Ok(form)
    }

    /// Read-only or cancel request against one assembly; params carry only the auth block.
    async fn send_for_assembly(
        &self,
        method: reqwest::Method,
        assembly_id: &str,
    ) -> Result<Assembly, TransportError> {
        let signed = self.signed(serde_json::Map::new());
        let response = self
            .client
            .request(method, self.assembly_url(assembly_id))
            .query(&[("params", signed.params), ("signature", signed.signature)])
            .send()
            .await
            .map_err(request_error)?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(TransportError::NotFound(assembly_id.to_string()));
        }
        decode(response).await
    }
}

impl fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpTransport")
            .field("endpoint", &self.endpoint)
            .field("credentials", &self.credentials)
            .finish()
    }
}

#[async_trait]
impl AssemblyTransport for HttpTransport {
    async fn create(&self, spec: &AssemblySpec) -> Result<Assembly, TransportError> {
        let form = self.upload_form(spec).await?;
        tracing::debug!(
            files = spec.files.len(),
            steps = spec.steps.len(),
            "creating assembly"
        );
        let response = self
            .client
            .post(format!("{}/assemblies", self.endpoint))
            .multipart(form)
            .send()
            .await
            .map_err(request_error)?;
        let assembly = decode(response).await?;
        tracing::debug!(
            assembly_id = %assembly.assembly_id(),
            status = %assembly.status(),
            "assembly created"
        );
        Ok(assembly)
    }

    async fn fetch(&self, assembly_id: &str) -> Result<Assembly, TransportError> {
        tracing::debug!(assembly_id = %assembly_id, "fetching assembly status");
        self.send_for_assembly(reqwest::Method::GET, assembly_id).await
    }

    async fn cancel(&self, assembly_id: &str) -> Result<Assembly, TransportError> {
        tracing::info!(assembly_id = %assembly_id, "cancelling assembly");
        self.send_for_assembly(reqwest::Method::DELETE, assembly_id).await
    }
}

fn request_error(e: reqwest::Error) -> TransportError {
    TransportError::Request {
        transient: e.is_timeout() || e.is_connect(),
        message: e.to_string(),
    }
}

async fn decode(response: reqwest::Response) -> Result<Assembly, TransportError> {
    let status = response.status();
    let body = response.text().await.map_err(request_error)?;
    if !status.is_success() {
        return Err(TransportError::Http {
            status: status.as_u16(),
            body,
        });
    }
    let parsed: AssemblyResponse =
        serde_json::from_str(&body).map_err(|e| TransportError::Decode(e.to_string()))?;
    Assembly::try_from(parsed)
}
