//! delete_custom_app — Remove an app, optionally with its volumes
//!
//! The executor refuses the call before it gets here unless
//! `confirm_deletion` is true; the check is repeated so the handler is safe
//! to call on its own.

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;

use crate::backend::NasBackend;
use crate::executor::DELETION_NOT_CONFIRMED;

#[derive(Debug, Deserialize)]
struct Args {
    app_name: String,
    #[serde(default)]
    delete_volumes: bool,
    #[serde(default)]
    confirm_deletion: bool,
}

pub async fn execute(backend: &dyn NasBackend, input: Value) -> Result<String> {
    let args: Args =
        serde_json::from_value(input).context("delete_custom_app: invalid arguments")?;

    if !args.confirm_deletion {
        return Ok(DELETION_NOT_CONFIRMED.to_string());
    }

    Ok(if backend.delete_app(&args.app_name, args.delete_volumes).await? {
        format!("✅ Deleted Custom App '{}' successfully", args.app_name)
    } else {
        format!("❌ Failed to delete Custom App '{}'", args.app_name)
    })
}
