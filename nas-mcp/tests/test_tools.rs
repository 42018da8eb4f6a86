//! Integration tests for the tool pipeline
//!
//! Drives the builtin registry and executor against the in-memory mock:
//! - Catalog shape and namespaces
//! - Compose deploy/inspect/update flows
//! - Confirmation guards on destructive tools
//! - Path restriction, logs, snapshots and telemetry rendering

use std::time::Duration;

use serde_json::{json, Value};

use nas_mcp::backend::mock::MockBackend;
use nas_mcp::executor::{Executor, ToolOutput, DELETION_NOT_CONFIRMED};
use nas_mcp::registry::Registry;

struct Harness {
    registry: Registry,
    executor: Executor,
    backend: MockBackend,
}

impl Harness {
    fn new() -> Self {
        Self {
            registry: Registry::builtin(),
            executor: Executor::new(),
            backend: MockBackend::with_latency(Duration::ZERO),
        }
    }

    async fn call(&self, tool: &str, args: Value) -> ToolOutput {
        self.executor
            .execute(&self.registry, &self.backend, tool, args)
            .await
    }
}

const SITE: &str = r#"
services:
  web:
    image: nginx:1.27
    ports:
      - "8081:80"
    volumes:
      - /mnt/Store/site/html:/usr/share/nginx/html:ro
      - cache:/var/cache/nginx
    environment:
      SITE_NAME: demo
    restart: unless-stopped
volumes:
  cache: {}
"#;

// ============================================================================
// Catalog
// ============================================================================

#[test]
fn test_catalog_has_a_handler_for_every_tool() {
    let registry = Registry::builtin();
    let executor = Executor::new();
    assert_eq!(registry.tool_count(), 22);
    assert_eq!(executor.handler_count(), 22);

    for ns in ["app", "compose", "fs", "zfs", "system"] {
        for tool in registry.list_tools(ns) {
            assert_eq!(tool.namespace, ns);
        }
    }
}

#[tokio::test]
async fn test_unknown_tool() {
    let h = Harness::new();
    let out = h.call("format_pool", json!({})).await;
    assert!(out.is_error);
    assert_eq!(out.text, "❌ Unknown tool: format_pool");
}

#[tokio::test]
async fn test_invalid_app_name_rejected_before_backend() {
    let h = Harness::new();
    let out = h
        .call("get_custom_app_status", json!({"app_name": "Bad_Name"}))
        .await;
    assert!(out.is_error);
    assert!(out
        .text
        .starts_with("❌ Invalid arguments for get_custom_app_status:"));
}

#[tokio::test]
async fn test_connection_tool_with_null_arguments() {
    let h = Harness::new();
    let out = h.call("test_connection", Value::Null).await;
    assert!(!out.is_error);
    assert_eq!(out.text, "✅ TrueNAS connection successful");
}

// ============================================================================
// Custom App lifecycle
// ============================================================================

#[tokio::test]
async fn test_list_apps_with_status_filter() {
    let h = Harness::new();
    let all = h.call("list_custom_apps", json!({})).await;
    assert!(all.text.starts_with("Custom Apps:\n"));
    assert!(all.text.contains("- nginx-demo: RUNNING"));
    assert!(all.text.contains("- plex-server: STOPPED"));

    let stopped = h
        .call("list_custom_apps", json!({"status_filter": "stopped"}))
        .await;
    assert!(stopped.text.contains("plex-server"));
    assert!(!stopped.text.contains("nginx-demo"));
}

#[tokio::test]
async fn test_deploy_then_inspect_config() {
    let h = Harness::new();
    let out = h
        .call(
            "deploy_custom_app",
            json!({"app_name": "site", "compose_yaml": SITE}),
        )
        .await;
    assert_eq!(out.text, "✅ Deployed Custom App 'site' successfully");

    let status = h
        .call("get_custom_app_status", json!({"app_name": "site"}))
        .await;
    assert_eq!(status.text, "App 'site' status: RUNNING");

    let config = h
        .call("get_custom_app_config", json!({"app_name": "site"}))
        .await;
    assert!(!config.is_error, "{}", config.text);
    assert!(config.text.starts_with("Configuration for 'site':\n"));
    assert!(config.text.contains("  Type    : Custom App"));
    assert!(config.text.contains("    [web]"));
    assert!(config.text.contains("      Image   : nginx:1.27"));
    assert!(config.text.contains("      Ports   : 8081:80/tcp"));
    assert!(config.text.contains("        SITE_NAME=demo"));
    assert!(config
        .text
        .contains("        /mnt/Store/site/html -> /usr/share/nginx/html (ro)"));
    assert!(config.text.contains("/mnt/.ix-apps/app_mounts/site/"));
    assert!(config.text.contains("      Restart : unless-stopped"));
}

#[tokio::test]
async fn test_deploy_without_auto_start_then_start() {
    let h = Harness::new();
    h.call(
        "deploy_custom_app",
        json!({"app_name": "site", "compose_yaml": SITE, "auto_start": false}),
    )
    .await;
    let status = h
        .call("get_custom_app_status", json!({"app_name": "site"}))
        .await;
    assert_eq!(status.text, "App 'site' status: STOPPED");

    let started = h.call("start_custom_app", json!({"app_name": "site"})).await;
    assert_eq!(started.text, "✅ Started Custom App 'site'");
    let status = h
        .call("get_custom_app_status", json!({"app_name": "site"}))
        .await;
    assert_eq!(status.text, "App 'site' status: RUNNING");
}

#[tokio::test]
async fn test_deploy_existing_name_fails() {
    let h = Harness::new();
    let out = h
        .call(
            "deploy_custom_app",
            json!({"app_name": "nginx-demo", "compose_yaml": SITE}),
        )
        .await;
    assert!(out.is_error);
    assert_eq!(out.text, "❌ Failed to deploy Custom App 'nginx-demo'");
}

#[tokio::test]
async fn test_deploy_unparseable_compose_reports_error() {
    let h = Harness::new();
    let out = h
        .call(
            "deploy_custom_app",
            json!({"app_name": "broken", "compose_yaml": "version: '3'\nnetworks: {}\n"}),
        )
        .await;
    assert!(out.is_error);
    assert!(out
        .text
        .starts_with("❌ Error executing deploy_custom_app:"));
    assert!(out.text.contains("No services found"));
}

#[tokio::test]
async fn test_missing_app_status_is_error() {
    let h = Harness::new();
    let out = h
        .call("get_custom_app_status", json!({"app_name": "ghost"}))
        .await;
    assert!(out.is_error);
    assert!(out.text.contains("App 'ghost' not found"));
}

#[tokio::test]
async fn test_update_app_config_merges_sections() {
    let h = Harness::new();
    let out = h
        .call(
            "update_custom_app_config",
            json!({
                "app_name": "nginx-demo",
                "config": {"notes": "Serves the landing page"}
            }),
        )
        .await;
    assert!(!out.is_error, "{}", out.text);
    assert!(out.text.starts_with("✅ Updated config for 'nginx-demo'"));
    assert!(out.text.contains("notes"));

    let config = h
        .call("get_custom_app_config", json!({"app_name": "nginx-demo"}))
        .await;
    assert!(config.text.contains("  Notes: Serves the landing page"));
    // Services were left in place by the partial update.
    assert!(config.text.contains("    [web]"));
    assert!(config.text.contains("    Web UI: http://truenas.local:8080/"));
}

#[tokio::test]
async fn test_update_app_config_requires_non_empty_object() {
    let h = Harness::new();
    let out = h
        .call(
            "update_custom_app_config",
            json!({"app_name": "nginx-demo", "config": {}}),
        )
        .await;
    assert!(out.is_error);
    assert!(out
        .text
        .starts_with("❌ Invalid arguments for update_custom_app_config:"));
}

// ============================================================================
// Compose tools
// ============================================================================

#[tokio::test]
async fn test_validate_compose_reports() {
    let h = Harness::new();

    let clean = h
        .call("validate_compose", json!({"compose_yaml": SITE}))
        .await;
    assert_eq!(clean.text, "✅ Docker Compose is valid and secure");

    let privileged = "services:\n  box:\n    image: alpine:3.20\n    privileged: true\n";
    let rejected = h
        .call("validate_compose", json!({"compose_yaml": privileged}))
        .await;
    assert!(rejected.is_error);
    assert!(rejected
        .text
        .starts_with("❌ Docker Compose validation failed:\n❌ "));
    assert!(rejected.text.contains("privileged"));

    let unchecked = h
        .call(
            "validate_compose",
            json!({"compose_yaml": privileged, "check_security": false}),
        )
        .await;
    assert!(!unchecked.is_error);
}

#[tokio::test]
async fn test_compose_config_roundtrip_through_update() {
    let h = Harness::new();
    let before = h
        .call("get_compose_config", json!({"app_name": "home-assistant"}))
        .await;
    assert!(before
        .text
        .starts_with("Docker Compose config for 'home-assistant':\n```yaml\n"));
    assert!(before.text.contains("home-assistant:2025.1"));

    let new_compose = "services:\n  hass:\n    image: ghcr.io/home-assistant/home-assistant:2025.2\n    ports: [\"8123:8123\"]\n";
    let updated = h
        .call(
            "update_compose_config",
            json!({"app_name": "home-assistant", "compose_yaml": new_compose}),
        )
        .await;
    assert_eq!(updated.text, "✅ Updated compose config for 'home-assistant'");

    let after = h
        .call("get_compose_config", json!({"app_name": "home-assistant"}))
        .await;
    assert!(after.text.contains("home-assistant:2025.2"));
    assert!(after.text.ends_with("```"));
}

#[tokio::test]
async fn test_update_compose_for_missing_app() {
    let h = Harness::new();
    let out = h
        .call(
            "update_compose_config",
            json!({"app_name": "ghost", "compose_yaml": SITE}),
        )
        .await;
    assert!(out.is_error);
    assert_eq!(out.text, "❌ Failed to update compose config for 'ghost'");
}

// ============================================================================
// Confirmation guards
// ============================================================================

#[tokio::test]
async fn test_delete_app_requires_confirmation() {
    let h = Harness::new();
    let out = h
        .call("delete_custom_app", json!({"app_name": "plex-server"}))
        .await;
    assert!(out.is_error);
    assert_eq!(out.text, DELETION_NOT_CONFIRMED);

    let out = h
        .call(
            "delete_custom_app",
            json!({"app_name": "plex-server", "confirm_deletion": false}),
        )
        .await;
    assert_eq!(out.text, DELETION_NOT_CONFIRMED);

    // App is still there.
    let status = h
        .call("get_custom_app_status", json!({"app_name": "plex-server"}))
        .await;
    assert_eq!(status.text, "App 'plex-server' status: STOPPED");
}

#[tokio::test]
async fn test_delete_app_with_confirmation() {
    let h = Harness::new();
    let out = h
        .call(
            "delete_custom_app",
            json!({"app_name": "plex-server", "confirm_deletion": true}),
        )
        .await;
    assert_eq!(out.text, "✅ Deleted Custom App 'plex-server' successfully");

    let list = h.call("list_custom_apps", json!({})).await;
    assert!(!list.text.contains("plex-server"));
}

#[tokio::test]
async fn test_delete_snapshot_requires_confirmation() {
    let h = Harness::new();
    let out = h
        .call(
            "delete_snapshot",
            json!({"snapshot_name": "Store/Apps@daily-20260217"}),
        )
        .await;
    assert_eq!(out.text, DELETION_NOT_CONFIRMED);

    let list = h.call("list_snapshots", json!({})).await;
    assert!(list.text.contains("Store/Apps@daily-20260217"));
}

// ============================================================================
// Filesystem
// ============================================================================

#[tokio::test]
async fn test_list_directory_default_root() {
    let h = Harness::new();
    let out = h.call("list_directory", json!({})).await;
    assert!(out.text.starts_with("Directory: /mnt\n"));
    assert!(out.text.contains("Store"));
    assert!(!out.text.contains(".zfs"));

    let hidden = h
        .call("list_directory", json!({"include_hidden": true}))
        .await;
    assert!(hidden.text.contains(".zfs"));
}

#[tokio::test]
async fn test_list_directory_outside_mount_root() {
    let h = Harness::new();
    let out = h.call("list_directory", json!({"path": "/etc"})).await;
    assert!(out.is_error);
    assert!(out
        .text
        .starts_with("❌ Error executing list_directory: Path must be under /mnt/"));

    let traversal = h
        .call("list_directory", json!({"path": "/mnt/../etc"}))
        .await;
    assert!(traversal.is_error);
    assert!(traversal.text.contains("Path must be under /mnt/"));
}

#[tokio::test]
async fn test_list_directory_files_show_size() {
    let h = Harness::new();
    let out = h
        .call("list_directory", json!({"path": "/mnt/Store/Media/"}))
        .await;
    assert!(out.text.contains("DIR "));
    assert!(out.text.contains("TV Shows"));
    assert!(out.text.contains("1.0 KiB  readme.txt"));
}

// ============================================================================
// Logs
// ============================================================================

#[tokio::test]
async fn test_logs_for_running_app() {
    let h = Harness::new();
    let out = h
        .call("get_app_logs", json!({"app_name": "nginx-demo", "lines": 5}))
        .await;
    assert!(out.text.starts_with("Logs for 'nginx-demo':\n"));
    assert_eq!(out.text.lines().count(), 6);
}

#[tokio::test]
async fn test_logs_for_stopped_app() {
    let h = Harness::new();
    let out = h
        .call("get_app_logs", json!({"app_name": "plex-server"}))
        .await;
    assert!(out
        .text
        .contains("Cannot retrieve logs for 'plex-server': app is STOPPED."));
}

#[tokio::test]
async fn test_logs_line_bounds() {
    let h = Harness::new();
    let out = h
        .call("get_app_logs", json!({"app_name": "nginx-demo", "lines": 0}))
        .await;
    assert!(out.is_error);
    assert!(out.text.starts_with("❌ Invalid arguments for get_app_logs:"));
}

// ============================================================================
// ZFS
// ============================================================================

#[tokio::test]
async fn test_snapshot_create_list_delete() {
    let h = Harness::new();
    let created = h
        .call(
            "create_snapshot",
            json!({"dataset": "Store/Media", "name": "before-upgrade", "recursive": true}),
        )
        .await;
    assert_eq!(
        created.text,
        "✅ Created snapshot 'Store/Media@before-upgrade' (recursive)"
    );

    let listed = h
        .call("list_snapshots", json!({"dataset": "Store/Media"}))
        .await;
    assert!(listed.text.starts_with("ZFS Snapshots (dataset: Store/Media)"));
    assert!(listed.text.contains("Store/Media@before-upgrade"));
    assert!(!listed.text.contains("Store/Apps@"));

    let duplicate = h
        .call(
            "create_snapshot",
            json!({"dataset": "Store/Media", "name": "before-upgrade"}),
        )
        .await;
    assert!(duplicate.is_error);
    assert!(duplicate.text.contains("already exists"));

    let deleted = h
        .call(
            "delete_snapshot",
            json!({"snapshot_name": "Store/Media@before-upgrade", "confirm_deletion": true}),
        )
        .await;
    assert_eq!(deleted.text, "✅ Deleted snapshot 'Store/Media@before-upgrade'");

    let again = h
        .call(
            "delete_snapshot",
            json!({"snapshot_name": "Store/Media@before-upgrade", "confirm_deletion": true}),
        )
        .await;
    assert!(again.is_error);
}

#[tokio::test]
async fn test_snapshot_name_rejected_by_schema() {
    let h = Harness::new();
    let out = h
        .call(
            "create_snapshot",
            json!({"dataset": "Store/Media", "name": "bad name"}),
        )
        .await;
    assert!(out.is_error);
    assert!(out.text.starts_with("❌ Invalid arguments for create_snapshot:"));
}

#[tokio::test]
async fn test_list_datasets_by_pool() {
    let h = Harness::new();
    let out = h.call("list_datasets", json!({"pool_name": "Store"})).await;
    assert!(out.text.contains("Store/Media"));
    assert!(!out.text.contains("Boot/ROOT"));
}

// ============================================================================
// System telemetry
// ============================================================================

#[tokio::test]
async fn test_system_info() {
    let h = Harness::new();
    let out = h.call("get_system_info", json!({})).await;
    assert!(!out.is_error);
    assert!(out.text.contains("truenas"));
    assert!(out.text.contains("TrueNAS-SCALE-24.10.2"));
    assert!(out.text.contains("10d 0h 0m"));
    assert!(out.text.contains("[0.50, 0.70, 0.60]"));
    assert!(out.text.contains("16.0 GiB"));
}

#[tokio::test]
async fn test_storage_pools() {
    let h = Harness::new();
    let out = h.call("get_storage_pools", json!({})).await;
    assert!(out.text.starts_with("Storage Pools\n"));
    assert!(out.text.contains("  [Store]\n    Status  : ONLINE (healthy: YES)"));
    assert!(out.text.contains("    Layout  : RAIDZ2"));
    assert!(out
        .text
        .contains("    Size    : 16.0 TiB  (allocated: 5.0 TiB, free: 11.0 TiB)"));
    assert!(out.text.contains("    Scrub   : FINISHED (errors: 0)"));
}

#[tokio::test]
async fn test_network_info() {
    let h = Harness::new();
    let out = h.call("get_network_info", json!({})).await;
    assert!(out.text.contains("  [enp2s0] (PHYSICAL)"));
    assert!(out.text.contains("    Speed : 2500 Mbps"));
    assert!(out.text.contains("    IPs   : 192.168.10.249/24"));
    assert!(out.text.contains("  [lo] (LOOPBACK)"));
    assert!(out.text.contains("    Speed : -"));
}
