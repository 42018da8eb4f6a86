//! ZFS tools — datasets and snapshots

pub mod datasets;
pub mod snapshots;

use serde_json::json;

use crate::registry::{make_tool, Registry, RiskLevel};
use crate::schema;

/// Register every ZFS tool with the registry.
pub fn register_tools(reg: &mut Registry) {
    reg.register_tool(make_tool(
        "list_datasets",
        "zfs",
        "List ZFS datasets with usage and mountpoints",
        schema::object(
            json!({"pool_name": schema::text("Only list datasets in this pool")}),
            &[],
        ),
        RiskLevel::Low,
    ));

    reg.register_tool(make_tool(
        "list_snapshots",
        "zfs",
        "List ZFS snapshots, optionally for a single dataset",
        schema::object(
            json!({"dataset": schema::text("Dataset to list snapshots for (e.g. 'Store/Media')")}),
            &[],
        ),
        RiskLevel::Low,
    ));

    reg.register_tool(make_tool(
        "create_snapshot",
        "zfs",
        "Create a ZFS snapshot for backup or rollback",
        schema::object(
            json!({
                "dataset": {
                    "type": "string",
                    "description": "Dataset in pool/dataset form (e.g. 'Store/Media')",
                    "minLength": 3
                },
                "name": {
                    "type": "string",
                    "description": "Snapshot name (the part after '@')",
                    "pattern": "^[A-Za-z0-9][A-Za-z0-9_.:-]*$",
                    "maxLength": 200
                },
                "recursive": schema::flag("Also snapshot child datasets", false),
            }),
            &["dataset", "name"],
        ),
        RiskLevel::Medium,
    ));

    reg.register_tool(make_tool(
        "delete_snapshot",
        "zfs",
        "Delete a ZFS snapshot",
        schema::object(
            json!({
                "snapshot_name": schema::text("Full snapshot name (dataset@snapshot)"),
                "confirm_deletion": schema::confirm_deletion(),
            }),
            &["snapshot_name", "confirm_deletion"],
        ),
        RiskLevel::Critical,
    ));
}
