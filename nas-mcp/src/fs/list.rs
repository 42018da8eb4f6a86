//! list_directory — List directory contents under /mnt

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;

use crate::backend::{DirEntry, NasBackend};
use crate::format::format_bytes;
use crate::paths::MOUNT_ROOT;

#[derive(Debug, Deserialize)]
struct Args {
    #[serde(default = "default_path")]
    path: String,
    #[serde(default)]
    include_hidden: bool,
}

fn default_path() -> String { MOUNT_ROOT.into() }

pub async fn execute(backend: &dyn NasBackend, input: Value) -> Result<String> {
    let args: Args = serde_json::from_value(input).context("list_directory: invalid arguments")?;

    let entries = backend.list_directory(&args.path, args.include_hidden).await?;
    Ok(render(&args.path, entries))
}

/// Directories first, then files, each sorted by name.
pub fn render(path: &str, mut entries: Vec<DirEntry>) -> String {
    if entries.is_empty() {
        return format!("Directory '{path}' is empty");
    }

    entries.sort_by(|a, b| b.is_dir().cmp(&a.is_dir()).then_with(|| a.name.cmp(&b.name)));

    let mut lines = vec![
        format!("Directory: {path}\n"),
        format!("{:<6} {:>10}  Name", "Type", "Size"),
        "-".repeat(40),
    ];
    for entry in &entries {
        let (kind, size) = if entry.is_dir() {
            ("DIR", "-".to_string())
        } else {
            ("FILE", format_bytes(entry.size))
        };
        lines.push(format!("{kind:<6} {size:>10}  {}", entry.name));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, kind: &str, size: u64) -> DirEntry {
        DirEntry {
            name: name.into(),
            path: format!("/mnt/Store/{name}"),
            kind: kind.into(),
            size,
            mode: 0,
        }
    }

    #[test]
    fn test_render_sorts_directories_first() {
        let text = render(
            "/mnt/Store",
            vec![
                entry("zeta.txt", "FILE", 2048),
                entry("Media", "DIRECTORY", 0),
                entry("alpha.txt", "FILE", 10),
                entry("Apps", "DIRECTORY", 0),
            ],
        );
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Directory: /mnt/Store");
        assert_eq!(lines[2], "Type         Size  Name");
        assert_eq!(lines[3], "-".repeat(40));
        assert_eq!(lines[4], "DIR             -  Apps");
        assert_eq!(lines[5], "DIR             -  Media");
        assert_eq!(lines[6], "FILE       10.0 B  alpha.txt");
        assert_eq!(lines[7], "FILE      2.0 KiB  zeta.txt");
    }

    #[test]
    fn test_render_empty() {
        assert_eq!(render("/mnt/empty", vec![]), "Directory '/mnt/empty' is empty");
    }
}
