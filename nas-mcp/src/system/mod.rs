//! System tools — connectivity, host info, storage pools, network

pub mod connection;
pub mod info;
pub mod network;
pub mod pools;

use serde_json::json;

use crate::registry::{make_tool, Registry, RiskLevel};
use crate::schema;

fn no_arguments() -> serde_json::Value {
    schema::object(json!({}), &[])
}

/// `test_connection` leads the catalog, ahead of the app tools.
pub fn register_connection_tool(reg: &mut Registry) {
    reg.register_tool(make_tool(
        "test_connection",
        "system",
        "Test TrueNAS API connectivity and authentication",
        no_arguments(),
        RiskLevel::Low,
    ));
}

/// Register the telemetry tools with the registry.
pub fn register_tools(reg: &mut Registry) {
    reg.register_tool(make_tool(
        "get_system_info",
        "system",
        "Get TrueNAS system information (hostname, version, uptime, CPU, RAM)",
        no_arguments(),
        RiskLevel::Low,
    ));

    reg.register_tool(make_tool(
        "get_storage_pools",
        "system",
        "Get storage pool health, capacity, and scrub status",
        no_arguments(),
        RiskLevel::Low,
    ));

    reg.register_tool(make_tool(
        "get_network_info",
        "system",
        "Get network interface information (IPs, link state, speed)",
        no_arguments(),
        RiskLevel::Low,
    ));
}
