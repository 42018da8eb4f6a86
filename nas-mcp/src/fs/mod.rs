//! Filesystem tools — directory browsing confined to the NAS mount root

pub mod list;

use serde_json::json;

use crate::registry::{make_tool, Registry, RiskLevel};
use crate::schema;

/// Register every filesystem tool with the registry.
pub fn register_tools(reg: &mut Registry) {
    reg.register_tool(make_tool(
        "list_directory",
        "fs",
        "Browse filesystem contents on TrueNAS (restricted to /mnt/)",
        schema::object(
            json!({
                "path": {
                    "type": "string",
                    "description": "Directory path under /mnt/",
                    "default": "/mnt"
                },
                "include_hidden": schema::flag("Include entries starting with '.'", false),
            }),
            &[],
        ),
        RiskLevel::Low,
    ));
}
