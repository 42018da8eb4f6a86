//! list_custom_apps — List Custom Apps, optionally filtered by state

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;

use crate::backend::NasBackend;

#[derive(Debug, Deserialize)]
struct Args {
    #[serde(default = "default_filter")]
    status_filter: String,
}

fn default_filter() -> String { "all".into() }

pub async fn execute(backend: &dyn NasBackend, input: Value) -> Result<String> {
    let args: Args = serde_json::from_value(input).context("list_custom_apps: invalid arguments")?;

    let apps = backend.list_custom_apps(&args.status_filter).await?;
    if apps.is_empty() {
        return Ok("No Custom Apps found".to_string());
    }

    let mut out = String::from("Custom Apps:\n");
    for app in &apps {
        let state = if app.state.is_empty() { "unknown" } else { &app.state };
        out.push_str(&format!("- {}: {}\n", app.name, state));
    }
    Ok(out)
}
