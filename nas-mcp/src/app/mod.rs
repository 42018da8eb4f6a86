//! Custom App tools — list, status, config, start/stop, deploy, update,
//! delete and logs, plus the `compose` namespace tools.
//!
//! Each submodule exposes `pub async fn execute(backend, input) -> Result<String>`
//! (or one function per tool) which deserialises the arguments, calls the
//! backend, and renders the text result.

pub mod compose;
pub mod config;
pub mod delete;
pub mod deploy;
pub mod lifecycle;
pub mod list;
pub mod logs;
pub mod status;
pub mod update;
pub mod update_config;

use serde::Deserialize;
use serde_json::json;

use crate::registry::{make_tool, Registry, RiskLevel};
use crate::schema;

/// Arguments of every tool that only names an app.
#[derive(Debug, Deserialize)]
pub struct AppArgs {
    pub app_name: String,
}

fn app_only() -> serde_json::Value {
    schema::object(json!({"app_name": schema::app_name()}), &["app_name"])
}

/// Register every app and compose tool with the registry.
pub fn register_tools(reg: &mut Registry) {
    reg.register_tool(make_tool(
        "list_custom_apps",
        "app",
        "List all Custom Apps with status information",
        schema::object(
            json!({
                "status_filter": {
                    "type": "string",
                    "enum": ["running", "stopped", "error", "all"],
                    "default": "all",
                    "description": "Filter apps by status"
                }
            }),
            &[],
        ),
        RiskLevel::Low,
    ));

    reg.register_tool(make_tool(
        "get_custom_app_status",
        "app",
        "Get detailed status of a specific Custom App",
        app_only(),
        RiskLevel::Low,
    ));

    reg.register_tool(make_tool(
        "get_custom_app_config",
        "app",
        "Get the full configuration of a Custom App (services, ports, volumes, environment)",
        app_only(),
        RiskLevel::Low,
    ));

    reg.register_tool(make_tool(
        "start_custom_app",
        "app",
        "Start a stopped Custom App",
        app_only(),
        RiskLevel::Medium,
    ));

    reg.register_tool(make_tool(
        "stop_custom_app",
        "app",
        "Stop a running Custom App",
        app_only(),
        RiskLevel::Medium,
    ));

    reg.register_tool(make_tool(
        "deploy_custom_app",
        "app",
        "Deploy a new Custom App from Docker Compose",
        schema::object(
            json!({
                "app_name": schema::app_name(),
                "compose_yaml": schema::compose_yaml(),
                "auto_start": schema::flag("Start the app after deployment", true),
            }),
            &["app_name", "compose_yaml"],
        ),
        RiskLevel::High,
    ));

    reg.register_tool(make_tool(
        "update_custom_app",
        "app",
        "Update an existing Custom App with a new Docker Compose definition",
        schema::object(
            json!({
                "app_name": schema::app_name(),
                "compose_yaml": schema::compose_yaml(),
                "force_recreate": schema::flag("Redeploy containers after the update", false),
            }),
            &["app_name", "compose_yaml"],
        ),
        RiskLevel::High,
    ));

    reg.register_tool(make_tool(
        "update_custom_app_config",
        "app",
        "Update part of a Custom App's configuration (environment, ports, volumes, ...)",
        schema::object(
            json!({
                "app_name": schema::app_name(),
                "config": {
                    "type": "object",
                    "description": "Partial configuration to merge into the app",
                    "minProperties": 1
                },
            }),
            &["app_name", "config"],
        ),
        RiskLevel::High,
    ));

    reg.register_tool(make_tool(
        "delete_custom_app",
        "app",
        "Delete a Custom App and optionally its volumes",
        schema::object(
            json!({
                "app_name": schema::app_name(),
                "delete_volumes": schema::flag("Also delete the app's ix-volumes", false),
                "confirm_deletion": schema::confirm_deletion(),
            }),
            &["app_name", "confirm_deletion"],
        ),
        RiskLevel::Critical,
    ));

    reg.register_tool(make_tool(
        "validate_compose",
        "compose",
        "Validate Docker Compose YAML for TrueNAS compatibility and security",
        schema::object(
            json!({
                "compose_yaml": schema::compose_yaml(),
                "check_security": schema::flag("Also run security checks", true),
            }),
            &["compose_yaml"],
        ),
        RiskLevel::Low,
    ));

    reg.register_tool(make_tool(
        "get_app_logs",
        "app",
        "Get logs from a Custom App's containers",
        schema::object(
            json!({
                "app_name": schema::app_name(),
                "lines": {
                    "type": "integer",
                    "minimum": 1,
                    "maximum": 1000,
                    "default": 100,
                    "description": "Number of log lines to retrieve"
                },
                "service_name": schema::text("Only show logs for this compose service"),
            }),
            &["app_name"],
        ),
        RiskLevel::Low,
    ));

    reg.register_tool(make_tool(
        "get_compose_config",
        "compose",
        "Get the Docker Compose configuration of a Custom App",
        app_only(),
        RiskLevel::Low,
    ));

    reg.register_tool(make_tool(
        "update_compose_config",
        "compose",
        "Replace the Docker Compose configuration of a Custom App",
        schema::object(
            json!({
                "app_name": schema::app_name(),
                "compose_yaml": schema::compose_yaml(),
            }),
            &["app_name", "compose_yaml"],
        ),
        RiskLevel::High,
    ));
}
