//! get_system_info — Hostname, version, uptime, CPU and memory

use anyhow::Result;
use serde_json::Value;

use crate::backend::{NasBackend, SystemInfo};
use crate::format::{format_bytes, format_uptime};

pub async fn execute(backend: &dyn NasBackend, _input: Value) -> Result<String> {
    let info = backend.get_system_info().await?;
    Ok(render(&info))
}

pub fn render(info: &SystemInfo) -> String {
    let loadavg: Vec<String> = info.loadavg.iter().map(|l| format!("{l:.2}")).collect();
    [
        "TrueNAS System Info\n".to_string(),
        format!("  Hostname : {}", info.hostname),
        format!("  Version  : {}", info.version),
        format!("  Uptime   : {}", format_uptime(info.uptime_seconds)),
        format!("  CPU      : {} ({} cores)", info.model, info.cores),
        format!("  Memory   : {}", format_bytes(info.physmem)),
        format!("  Load Avg : [{}]", loadavg.join(", ")),
    ]
    .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render() {
        let info = SystemInfo {
            hostname: "truenas".into(),
            version: "TrueNAS-SCALE-24.10.2".into(),
            uptime_seconds: 864_000.0,
            cores: 4,
            physical_cores: 4,
            loadavg: vec![0.5, 0.7, 0.6],
            physmem: 17_179_869_184,
            model: "Intel(R) Core(TM) i7-7700 CPU @ 3.60GHz".into(),
        };
        let text = render(&info);
        assert!(text.starts_with("TrueNAS System Info\n\n  Hostname : truenas"));
        assert!(text.contains("  Uptime   : 10d 0h 0m"));
        assert!(text.contains("  CPU      : Intel(R) Core(TM) i7-7700 CPU @ 3.60GHz (4 cores)"));
        assert!(text.contains("  Memory   : 16.0 GiB"));
        assert!(text.ends_with("  Load Avg : [0.50, 0.70, 0.60]"));
    }
}
