//! get_storage_pools — Pool health, layout, capacity and scrub state

use anyhow::Result;
use serde_json::Value;

use crate::backend::{NasBackend, Pool};
use crate::format::format_bytes;

pub async fn execute(backend: &dyn NasBackend, _input: Value) -> Result<String> {
    let pools = backend.get_storage_pools().await?;
    Ok(render(&pools))
}

pub fn render(pools: &[Pool]) -> String {
    if pools.is_empty() {
        return "No storage pools found".to_string();
    }

    let mut lines = vec!["Storage Pools\n".to_string()];
    for pool in pools {
        let healthy = if pool.healthy { "YES" } else { "NO" };
        let scan = pool.scan.as_ref();
        let scrub_state = scan.and_then(|s| s.state.as_deref()).unwrap_or("UNKNOWN");
        let scrub_errors = scan
            .and_then(|s| s.errors)
            .map_or("?".to_string(), |e| e.to_string());

        lines.push(format!("  [{}]", pool.name));
        lines.push(format!("    Status  : {} (healthy: {healthy})", pool.status));
        lines.push(format!("    Layout  : {}", pool.layout().unwrap_or("?")));
        lines.push(format!(
            "    Size    : {}  (allocated: {}, free: {})",
            format_bytes(pool.size.unwrap_or(0)),
            format_bytes(pool.allocated.unwrap_or(0)),
            format_bytes(pool.free.unwrap_or(0))
        ));
        lines.push(format!("    Scrub   : {scrub_state} (errors: {scrub_errors})"));
        lines.push(String::new());
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render_pool_without_scan_or_topology() {
        let pool: Pool = serde_json::from_value(json!({
            "name": "Boot",
            "status": "DEGRADED",
            "healthy": false,
            "size": 1024
        }))
        .unwrap();
        let text = render(&[pool]);
        assert!(text.contains("  [Boot]\n    Status  : DEGRADED (healthy: NO)"));
        assert!(text.contains("    Layout  : ?"));
        assert!(text.contains("    Size    : 1.0 KiB  (allocated: 0.0 B, free: 0.0 B)"));
        assert!(text.contains("    Scrub   : UNKNOWN (errors: ?)"));
    }

    #[test]
    fn test_render_empty() {
        assert_eq!(render(&[]), "No storage pools found");
    }
}
