//! deploy_custom_app — Create a Custom App from Docker Compose

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;

use crate::backend::NasBackend;

#[derive(Debug, Deserialize)]
struct Args {
    app_name: String,
    compose_yaml: String,
    #[serde(default = "default_true")]
    auto_start: bool,
}

fn default_true() -> bool { true }

pub async fn execute(backend: &dyn NasBackend, input: Value) -> Result<String> {
    let args: Args =
        serde_json::from_value(input).context("deploy_custom_app: invalid arguments")?;

    let deployed = backend
        .deploy_app(&args.app_name, &args.compose_yaml, args.auto_start)
        .await?;

    Ok(if deployed {
        format!("✅ Deployed Custom App '{}' successfully", args.app_name)
    } else {
        format!("❌ Failed to deploy Custom App '{}'", args.app_name)
    })
}
