//! list_snapshots, create_snapshot, delete_snapshot

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;

use crate::backend::{NasBackend, Snapshot};
use crate::executor::DELETION_NOT_CONFIRMED;
use crate::format::format_bytes;

#[derive(Debug, Deserialize)]
struct ListArgs {
    #[serde(default)]
    dataset: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreateArgs {
    dataset: String,
    name: String,
    #[serde(default)]
    recursive: bool,
}

#[derive(Debug, Deserialize)]
struct DeleteArgs {
    snapshot_name: String,
    #[serde(default)]
    confirm_deletion: bool,
}

pub async fn list(backend: &dyn NasBackend, input: Value) -> Result<String> {
    let args: ListArgs =
        serde_json::from_value(input).context("list_snapshots: invalid arguments")?;

    let snapshots = backend.list_snapshots(args.dataset.as_deref()).await?;
    Ok(render(args.dataset.as_deref(), &snapshots))
}

pub fn render(dataset: Option<&str>, snapshots: &[Snapshot]) -> String {
    if snapshots.is_empty() {
        return match dataset {
            Some(ds) => format!("No snapshots found for '{ds}'"),
            None => "No snapshots found".to_string(),
        };
    }

    let header = match dataset {
        Some(ds) => format!("ZFS Snapshots (dataset: {ds})"),
        None => "ZFS Snapshots".to_string(),
    };

    let mut lines = vec![format!("{header}\n")];
    for snap in snapshots {
        lines.push(format!(
            "  - {}  (used: {}, referenced: {})",
            snap.name,
            format_bytes(snap.properties.used.as_u64()),
            format_bytes(snap.properties.referenced.as_u64())
        ));
    }
    lines.join("\n")
}

pub async fn create(backend: &dyn NasBackend, input: Value) -> Result<String> {
    let args: CreateArgs =
        serde_json::from_value(input).context("create_snapshot: invalid arguments")?;

    let snapshot = backend
        .create_snapshot(&args.dataset, &args.name, args.recursive)
        .await?;
    let name = if snapshot.name.is_empty() {
        format!("{}@{}", args.dataset, args.name)
    } else {
        snapshot.name
    };
    let extra = if args.recursive { " (recursive)" } else { "" };
    Ok(format!("✅ Created snapshot '{name}'{extra}"))
}

pub async fn delete(backend: &dyn NasBackend, input: Value) -> Result<String> {
    let args: DeleteArgs =
        serde_json::from_value(input).context("delete_snapshot: invalid arguments")?;

    if !args.confirm_deletion {
        return Ok(DELETION_NOT_CONFIRMED.to_string());
    }

    Ok(if backend.delete_snapshot(&args.snapshot_name).await? {
        format!("✅ Deleted snapshot '{}'", args.snapshot_name)
    } else {
        format!("❌ Failed to delete snapshot '{}'", args.snapshot_name)
    })
}
