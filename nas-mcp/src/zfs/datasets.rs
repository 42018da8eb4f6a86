//! list_datasets — Tabulate datasets with used/available space

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;

use crate::backend::{Dataset, NasBackend};
use crate::format::format_bytes;

#[derive(Debug, Deserialize)]
struct Args {
    #[serde(default)]
    pool_name: Option<String>,
}

pub async fn execute(backend: &dyn NasBackend, input: Value) -> Result<String> {
    let args: Args = serde_json::from_value(input).context("list_datasets: invalid arguments")?;

    let datasets = backend.list_datasets(args.pool_name.as_deref()).await?;
    Ok(render(args.pool_name.as_deref(), &datasets))
}

pub fn render(pool_name: Option<&str>, datasets: &[Dataset]) -> String {
    if datasets.is_empty() {
        return "No datasets found".to_string();
    }

    let header = match pool_name {
        Some(pool) => format!("ZFS Datasets (pool: {pool})"),
        None => "ZFS Datasets".to_string(),
    };

    let mut lines = vec![
        format!("{header}\n"),
        format!("{:<30} {:>10} {:>10}  Mountpoint", "Dataset", "Used", "Available"),
        "-".repeat(75),
    ];
    for ds in datasets {
        let name = if ds.name.is_empty() { &ds.id } else { &ds.name };
        lines.push(format!(
            "{:<30} {:>10} {:>10}  {}",
            name,
            format_bytes(ds.used.as_u64()),
            format_bytes(ds.available.as_u64()),
            ds.mountpoint.as_deref().unwrap_or("-")
        ));
    }
    lines.join("\n")
}
