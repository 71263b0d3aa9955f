//! Assembly specification: input files plus the processing pipeline.

use crate::{AssemblyError, PollConfig};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// One pipeline step: the robot to run and its robot-specific options.
///
/// Options are flattened next to `robot` on the wire, e.g.
/// `{ "robot": "/image/resize", "width": 100, "result": true }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepConfig {
    pub robot: String,
    #[serde(flatten)]
    pub options: serde_json::Map<String, serde_json::Value>,
}

impl StepConfig {
    pub fn new(robot: impl Into<String>) -> Self {
        Self {
            robot: robot.into(),
            options: serde_json::Map::new(),
        }
    }

    /// Set a robot option.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Whether the step's output is exported as an assembly result (`result: true`).
    pub fn is_result(&self) -> bool {
        self.options
            .get("result")
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }
}

/// Everything needed to create one assembly.
#[derive(Debug, Clone, Default)]
pub struct AssemblySpec {
    /// Input files, uploaded in order.
    pub files: Vec<PathBuf>,
    /// Pipeline: step name -> step config.
    pub steps: BTreeMap<String, StepConfig>,
    /// Block until the assembly reaches a terminal status.
    pub wait_for_completion: bool,
    /// Overrides the client's default poll settings for this call.
    pub poll: Option<PollConfig>,
    /// Free-form assembly fields, forwarded verbatim.
    pub fields: serde_json::Map<String, serde_json::Value>,
    /// Webhook the remote service calls when the assembly finishes.
    pub notify_url: Option<String>,
}

impl AssemblySpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file(mut self, path: impl Into<PathBuf>) -> Self {
        self.files.push(path.into());
        self
    }

    pub fn step(mut self, name: impl Into<String>, step: StepConfig) -> Self {
        self.steps.insert(name.into(), step);
        self
    }

    pub fn wait_for_completion(mut self, wait: bool) -> Self {
        self.wait_for_completion = wait;
        self
    }

    pub fn poll(mut self, poll: PollConfig) -> Self {
        self.poll = Some(poll);
        self
    }

    pub fn field(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn notify_url(mut self, url: impl Into<String>) -> Self {
        self.notify_url = Some(url.into());
        self
    }

    /// Names of the steps marked `result: true`.
    pub fn result_steps(&self) -> Vec<&str> {
        self.steps
            .iter()
            .filter(|(_, s)| s.is_result())
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Structural checks that need no I/O. File readability is checked by the client.
    pub fn validate(&self) -> Result<(), AssemblyError> {
        if self.steps.is_empty() {
            return Err(AssemblyError::Validation(
                "pipeline must contain at least one step".to_string(),
            ));
        }
        for (name, step) in &self.steps {
            if name.trim().is_empty() {
                return Err(AssemblyError::Validation(
                    "step names must not be empty".to_string(),
                ));
            }
            if !step.robot.starts_with('/') || step.robot.len() < 2 {
                return Err(AssemblyError::Validation(format!(
                    "step {name:?} has invalid robot {:?}",
                    step.robot
                )));
            }
        }
        if self.files.is_empty() {
            return Err(AssemblyError::Validation(
                "at least one input file is required".to_string(),
            ));
        }
        if let Some(ref poll) = self.poll {
            poll.validate()?;
        }
        Ok(())
    }

    /// Request parameters without the `auth` block (the transport adds it).
    pub fn params(&self) -> serde_json::Map<String, serde_json::Value> {
        let mut params = serde_json::Map::new();
        params.insert(
            "steps".to_string(),
            serde_json::to_value(&self.steps).unwrap_or_default(),
        );
        if !self.fields.is_empty() {
            params.insert(
                "fields".to_string(),
                serde_json::Value::Object(self.fields.clone()),
            );
        }
        if let Some(ref url) = self.notify_url {
            params.insert(
                "notify_url".to_string(),
                serde_json::Value::String(url.clone()),
            );
        }
        params
    }
}

/// Assembly ids are opaque hex strings; reject anything that could escape the URL path.
pub fn validate_assembly_id(assembly_id: &str) -> Result<(), AssemblyError> {
    if assembly_id.is_empty() {
        return Err(AssemblyError::Validation(
            "assembly id must not be empty".to_string(),
        ));
    }
    if !assembly_id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(AssemblyError::Validation(format!(
            "malformed assembly id {assembly_id:?}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn resize_spec() -> AssemblySpec {
        AssemblySpec::new().file("fixtures/image.jpg").step(
            "resize",
            StepConfig::new("/image/resize")
                .with("width", 100)
                .with("height", 100)
                .with("result", true),
        )
    }

    #[test]
    fn resize_spec_is_valid() {
        assert!(resize_spec().validate().is_ok());
        assert_eq!(resize_spec().result_steps(), vec!["resize"]);
    }

    #[test]
    fn empty_pipeline_is_rejected() {
        let spec = AssemblySpec::new().file("a.jpg");
        assert!(matches!(spec.validate(), Err(AssemblyError::Validation(_))));
    }

    #[test]
    fn robot_must_be_a_path() {
        let spec = AssemblySpec::new()
            .file("a.jpg")
            .step("resize", StepConfig::new("image/resize"));
        let err = spec.validate().unwrap_err();
        assert!(err.to_string().contains("resize"));
    }

    #[test]
    fn files_are_required() {
        let mut spec = resize_spec();
        spec.files.clear();
        assert!(matches!(spec.validate(), Err(AssemblyError::Validation(_))));
    }

    #[test]
    fn zero_poll_interval_is_rejected() {
        let spec = resize_spec().poll(PollConfig::new(Duration::ZERO, Duration::from_secs(5)));
        assert!(matches!(spec.validate(), Err(AssemblyError::Validation(_))));
    }

    #[test]
    fn params_flatten_step_options() {
        let params = resize_spec()
            .field("customer", "acme")
            .notify_url("https://example.com/hook")
            .params();
        let resize = &params["steps"]["resize"];
        assert_eq!(resize["robot"], "/image/resize");
        assert_eq!(resize["width"], 100);
        assert_eq!(resize["result"], true);
        assert_eq!(params["fields"]["customer"], "acme");
        assert_eq!(params["notify_url"], "https://example.com/hook");
        assert!(params.get("auth").is_none());
    }

    #[test]
    fn step_config_parses_flattened_json() {
        let step: StepConfig = serde_json::from_value(serde_json::json!({
            "robot": "/image/resize",
            "use": ":original",
            "width": 100
        }))
        .unwrap();
        assert_eq!(step.robot, "/image/resize");
        assert_eq!(step.options["use"], ":original");
        assert!(!step.is_result());
    }

    #[test]
    fn assembly_ids_are_checked() {
        assert!(validate_assembly_id("a1b2c3d4e5f6").is_ok());
        assert!(validate_assembly_id("").is_err());
        assert!(validate_assembly_id("../secrets").is_err());
    }
}
