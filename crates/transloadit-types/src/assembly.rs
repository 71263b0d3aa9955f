//! Assembly status snapshots and the wire response they are decoded from.

use crate::TransportError;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Status of a remote assembly. Closed set; unknown wire codes are a decode error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssemblyStatus {
    Submitted,
    Executing,
    Completed,
    Failed,
    Aborted,
    Canceled,
}

impl AssemblyStatus {
    /// The remote service never moves an assembly out of a terminal status.
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Submitted | Self::Executing)
    }

    pub fn is_success(self) -> bool {
        self == Self::Completed
    }

    /// Map the `ok` / `error` fields of a response to a status.
    ///
    /// A recognised `ok` code wins; otherwise an `error` code means the assembly failed.
    /// Returns `None` when neither yields a known status.
    pub fn from_wire(ok: Option<&str>, error: Option<&str>) -> Option<Self> {
        let from_ok = ok.and_then(|code| match code {
            "ASSEMBLY_UPLOADING" => Some(Self::Submitted),
            "ASSEMBLY_EXECUTING" | "ASSEMBLY_REPLAYING" => Some(Self::Executing),
            "ASSEMBLY_COMPLETED" => Some(Self::Completed),
            "ASSEMBLY_CANCELED" => Some(Self::Canceled),
            "REQUEST_ABORTED" => Some(Self::Aborted),
            _ => None,
        });
        from_ok.or_else(|| error.map(|_| Self::Failed))
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Submitted => "SUBMITTED",
            Self::Executing => "EXECUTING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
            Self::Aborted => "ABORTED",
            Self::Canceled => "CANCELED",
        }
    }
}

impl fmt::Display for AssemblyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata of one file produced by a result step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultFile {
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub basename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ext: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssl_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<serde_json::Map<String, serde_json::Value>>,
}

/// Raw assembly response body (create, status, and cancel all share it).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AssemblyResponse {
    #[serde(default)]
    pub ok: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub assembly_id: Option<String>,
    #[serde(default)]
    pub assembly_ssl_url: Option<String>,
    #[serde(default, deserialize_with = "lenient_results")]
    pub results: BTreeMap<String, Vec<ResultFile>>,
}

/// The service sends `[]` or `null` instead of `{}` while no results exist yet.
/// Anything else must decode as a results map.
fn lenient_results<'de, D>(deserializer: D) -> Result<BTreeMap<String, Vec<ResultFile>>, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Null => Ok(BTreeMap::new()),
        serde_json::Value::Array(items) if items.is_empty() => Ok(BTreeMap::new()),
        other => serde_json::from_value(other).map_err(serde::de::Error::custom),
    }
}

/// Immutable snapshot of an assembly as last observed.
///
/// Results are only carried for completed assemblies, and error details only for
/// failed or aborted ones. Each status fetch yields a new snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assembly {
    assembly_id: String,
    status: AssemblyStatus,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    results: BTreeMap<String, Vec<ResultFile>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    assembly_ssl_url: Option<String>,
}

impl Assembly {
    pub fn assembly_id(&self) -> &str {
        &self.assembly_id
    }

    pub fn status(&self) -> AssemblyStatus {
        self.status
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Produced files per result step. Empty unless the assembly completed.
    pub fn results(&self) -> &BTreeMap<String, Vec<ResultFile>> {
        &self.results
    }

    pub fn step_results(&self, step: &str) -> &[ResultFile] {
        self.results.get(step).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Remote error code of a failed or aborted assembly.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Human-readable detail accompanying `error`.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn assembly_ssl_url(&self) -> Option<&str> {
        self.assembly_ssl_url.as_deref()
    }
}

impl TryFrom<AssemblyResponse> for Assembly {
    type Error = TransportError;

    fn try_from(res: AssemblyResponse) -> Result<Self, Self::Error> {
        let assembly_id = res
            .assembly_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| TransportError::Decode("response has no assembly_id".to_string()))?;
        let status = AssemblyStatus::from_wire(res.ok.as_deref(), res.error.as_deref())
            .ok_or_else(|| {
                TransportError::Decode(format!(
                    "unknown assembly status ok={:?} error={:?}",
                    res.ok, res.error
                ))
            })?;
        let results = if status == AssemblyStatus::Completed {
            res.results
        } else {
            BTreeMap::new()
        };
        let (error, message) = match status {
            AssemblyStatus::Failed | AssemblyStatus::Aborted => {
                (res.error, res.message.or(res.reason))
            }
            _ => (None, None),
        };
        Ok(Self {
            assembly_id,
            status,
            results,
            error,
            message,
            assembly_ssl_url: res.assembly_ssl_url,
        })
    }
}

impl TryFrom<serde_json::Value> for Assembly {
    type Error = TransportError;

    fn try_from(value: serde_json::Value) -> Result<Self, Self::Error> {
        let res: AssemblyResponse =
            serde_json::from_value(value).map_err(|e| TransportError::Decode(e.to_string()))?;
        Self::try_from(res)
    }
}
