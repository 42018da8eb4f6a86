//! start_custom_app / stop_custom_app

use anyhow::{Context, Result};
use serde_json::Value;

use super::AppArgs;
use crate::backend::NasBackend;

pub async fn start(backend: &dyn NasBackend, input: Value) -> Result<String> {
    let args: AppArgs =
        serde_json::from_value(input).context("start_custom_app: invalid arguments")?;

    Ok(if backend.start_app(&args.app_name).await? {
        format!("✅ Started Custom App '{}'", args.app_name)
    } else {
        format!("❌ Failed to start Custom App '{}'", args.app_name)
    })
}

pub async fn stop(backend: &dyn NasBackend, input: Value) -> Result<String> {
    let args: AppArgs =
        serde_json::from_value(input).context("stop_custom_app: invalid arguments")?;

    Ok(if backend.stop_app(&args.app_name).await? {
        format!("✅ Stopped Custom App '{}'", args.app_name)
    } else {
        format!("❌ Failed to stop Custom App '{}'", args.app_name)
    })
}
