//! get_network_info — Interfaces with link state, MTU, speed and IPv4 aliases

use anyhow::Result;
use serde_json::Value;

use crate::backend::{NasBackend, NetworkInterface};

pub async fn execute(backend: &dyn NasBackend, _input: Value) -> Result<String> {
    let interfaces = backend.get_network_info().await?;
    Ok(render(&interfaces))
}

pub fn render(interfaces: &[NetworkInterface]) -> String {
    if interfaces.is_empty() {
        return "No network interfaces found".to_string();
    }

    let mut lines = vec!["Network Interfaces\n".to_string()];
    for iface in interfaces {
        let mtu = iface.state.mtu.map_or("?".to_string(), |m| m.to_string());
        let speed = match iface.state.speed {
            Some(speed) if speed > 0 => format!("{speed} Mbps"),
            _ => "-".to_string(),
        };
        let ips: Vec<String> = iface
            .aliases
            .iter()
            .filter(|a| a.kind == "INET")
            .map(|a| match a.netmask {
                Some(mask) => format!("{}/{mask}", a.address),
                None => a.address.clone(),
            })
            .collect();

        lines.push(format!("  [{}] ({})", iface.name, iface.kind));
        lines.push(format!("    Link  : {}", iface.state.link_state));
        lines.push(format!("    MTU   : {mtu}"));
        lines.push(format!("    Speed : {speed}"));
        if !ips.is_empty() {
            lines.push(format!("    IPs   : {}", ips.join(", ")));
        }
        lines.push(String::new());
    }
    lines.join("\n")
}
