//! get_app_logs — Recent container log lines for an app

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;

use crate::backend::NasBackend;

#[derive(Debug, Deserialize)]
struct Args {
    app_name: String,
    #[serde(default = "default_lines")]
    lines: u32,
    #[serde(default)]
    service_name: Option<String>,
}

fn default_lines() -> u32 { 100 }

pub async fn execute(backend: &dyn NasBackend, input: Value) -> Result<String> {
    let args: Args = serde_json::from_value(input).context("get_app_logs: invalid arguments")?;

    let logs = backend
        .get_app_logs(&args.app_name, args.lines, args.service_name.as_deref())
        .await?;

    Ok(if logs.is_empty() {
        format!("No logs found for '{}'", args.app_name)
    } else {
        format!("Logs for '{}':\n{logs}", args.app_name)
    })
}
