use std::collections::BTreeMap;
use std::time::Duration;
use transloadit::{
    Assembly, AssemblySpec, CancellationToken, PollConfig, StepConfig, Transloadit,
};

use crate::cli::CreateArgs;

type CmdResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

pub async fn handle_create(client: &Transloadit, args: CreateArgs) -> CmdResult {
    let mut spec = AssemblySpec::new().wait_for_completion(args.wait);
    for (name, step) in parse_steps(&args.steps)? {
        spec = spec.step(name, step);
    }
    for file in args.files {
        spec = spec.file(file);
    }
    if let Some(poll) = poll_override(client.poll_config(), args.interval_ms, args.timeout_secs) {
        spec = spec.poll(poll);
    }

    let cancel = cancel_on_ctrl_c();
    let assembly = client.submit_with_cancel(&spec, &cancel).await?;
    print(&assembly)
}

pub async fn handle_status(client: &Transloadit, assembly_id: &str, wait: bool) -> CmdResult {
    let assembly = if wait {
        client
            .wait_for_completion(assembly_id, &cancel_on_ctrl_c())
            .await?
    } else {
        client.get_status(assembly_id).await?
    };
    print(&assembly)
}

pub async fn handle_cancel(client: &Transloadit, assembly_id: &str) -> CmdResult {
    let assembly = client.cancel(assembly_id).await?;
    print(&assembly)
}

/// Per-assembly poll settings from `--interval-ms` / `--timeout-secs`, filling the unset
/// one from the client defaults. `None` when neither flag is given.
fn poll_override(
    defaults: &PollConfig,
    interval_ms: Option<u64>,
    timeout_secs: Option<u64>,
) -> Option<PollConfig> {
    if interval_ms.is_none() && timeout_secs.is_none() {
        return None;
    }
    let interval = interval_ms.map(Duration::from_millis).unwrap_or(defaults.interval);
    let timeout = timeout_secs.map(Duration::from_secs).unwrap_or(defaults.timeout);
    Some(PollConfig::new(interval, timeout).with_retries(defaults.max_transient_retries))
}

/// `--steps` takes either a JSON object or `@file` naming one.
fn parse_steps(
    raw: &str,
) -> Result<BTreeMap<String, StepConfig>, Box<dyn std::error::Error + Send + Sync>> {
    let json = match raw.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path)?,
        None => raw.to_string(),
    };
    Ok(serde_json::from_str(&json)?)
}

fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupted, cancelling wait");
            trigger.cancel();
        }
    });
    cancel
}

fn print(assembly: &Assembly) -> CmdResult {
    println!("{}", serde_json::to_string_pretty(assembly)?);
    Ok(())
}
