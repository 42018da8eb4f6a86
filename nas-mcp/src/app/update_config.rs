//! update_custom_app_config — Submit a partial app configuration

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::backend::NasBackend;

#[derive(Debug, Deserialize)]
struct Args {
    app_name: String,
    config: Map<String, Value>,
}

pub async fn execute(backend: &dyn NasBackend, input: Value) -> Result<String> {
    let args: Args =
        serde_json::from_value(input).context("update_custom_app_config: invalid arguments")?;

    if backend.update_app_config(&args.app_name, &args.config).await? {
        let changed: Vec<&str> = args.config.keys().map(String::as_str).collect();
        Ok(format!(
            "✅ Updated config for '{}' (changed: {})",
            args.app_name,
            changed.join(", ")
        ))
    } else {
        Ok(format!("❌ Failed to update config for '{}'", args.app_name))
    }
}
