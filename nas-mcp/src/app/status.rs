//! get_custom_app_status — Report an app's lifecycle state

use anyhow::{Context, Result};
use serde_json::Value;

use super::AppArgs;
use crate::backend::NasBackend;

pub async fn execute(backend: &dyn NasBackend, input: Value) -> Result<String> {
    let args: AppArgs =
        serde_json::from_value(input).context("get_custom_app_status: invalid arguments")?;

    let status = backend.get_app_status(&args.app_name).await?;
    Ok(format!("App '{}' status: {}", args.app_name, status))
}
