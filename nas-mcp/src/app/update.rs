//! update_custom_app — Replace an app's definition with new Docker Compose

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;

use crate::backend::NasBackend;

#[derive(Debug, Deserialize)]
struct Args {
    app_name: String,
    compose_yaml: String,
    #[serde(default)]
    force_recreate: bool,
}

pub async fn execute(backend: &dyn NasBackend, input: Value) -> Result<String> {
    let args: Args =
        serde_json::from_value(input).context("update_custom_app: invalid arguments")?;

    let updated = backend
        .update_app(&args.app_name, &args.compose_yaml, args.force_recreate)
        .await?;

    Ok(if updated {
        format!("✅ Updated Custom App '{}' successfully", args.app_name)
    } else {
        format!("❌ Failed to update Custom App '{}'", args.app_name)
    })
}
