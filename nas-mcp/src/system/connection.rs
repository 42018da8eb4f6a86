//! test_connection — Check API reachability and authentication

use anyhow::Result;
use serde_json::Value;

use crate::backend::NasBackend;

pub async fn execute(backend: &dyn NasBackend, _input: Value) -> Result<String> {
    Ok(if backend.test_connection().await {
        "✅ TrueNAS connection successful".to_string()
    } else {
        "❌ TrueNAS connection failed".to_string()
    })
}
