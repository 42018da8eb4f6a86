//! get_custom_app_config — Render an app's full configuration
//!
//! Apps that carry per-service config (`config.services`) are rendered from
//! it; otherwise the live container details stand in.

use anyhow::{Context, Result};
use serde_json::Value;

use super::AppArgs;
use crate::backend::{App, AppService, ContainerDetail, NasBackend};
use crate::format::{display_value, truncate};

const NOTES_PREVIEW_CHARS: usize = 200;

pub async fn execute(backend: &dyn NasBackend, input: Value) -> Result<String> {
    let args: AppArgs =
        serde_json::from_value(input).context("get_custom_app_config: invalid arguments")?;

    let app = backend.get_app_config(&args.app_name).await?;
    Ok(render(&args.app_name, &app))
}

pub fn render(app_name: &str, app: &App) -> String {
    let mut lines = vec![format!("Configuration for '{app_name}':\n")];

    let state = if app.state.is_empty() { "unknown" } else { &app.state };
    lines.push(format!("  State   : {state}"));
    if let Some(version) = app.version.as_deref().filter(|v| !v.is_empty()) {
        lines.push(format!("  Version : {version}"));
    }
    if let Some(human) = app.human_version.as_deref().filter(|v| !v.is_empty()) {
        lines.push(format!("  App ver : {human}"));
    }
    if let Some(custom) = app.custom_app {
        let kind = if custom { "Custom App" } else { "Catalog App" };
        lines.push(format!("  Type    : {kind}"));
    }
    if app.upgrade_available {
        let latest = app.latest_version.as_deref().unwrap_or("?");
        lines.push(format!("  Upgrade : available (latest: {latest})"));
    }

    let services = app.services();
    let workloads = &app.active_workloads;

    if !services.is_empty() {
        lines.push("\n  Services:".to_string());
        for (name, svc) in &services {
            render_service(&mut lines, name, svc);
        }
    } else if !workloads.container_details.is_empty() {
        lines.push(format!("\n  Containers: {}", workloads.container_details.len()));
        for ctr in &workloads.container_details {
            render_container(&mut lines, ctr);
        }
    } else {
        if !workloads.images.is_empty() {
            lines.push(format!("\n  Images: {}", workloads.images.join(", ")));
        }
        if workloads.containers > 0 {
            lines.push(format!(
                "\n  Active workloads: {} container(s)",
                workloads.containers
            ));
        }
    }

    if !app.portals.is_empty() {
        lines.push("\n  Portals:".to_string());
        for (name, url) in &app.portals {
            lines.push(format!("    {name}: {}", display_value(url)));
        }
    }

    if let Some(notes) = app.notes.as_deref().filter(|n| !n.is_empty()) {
        lines.push(format!("\n  Notes: {}", truncate(notes, NOTES_PREVIEW_CHARS)));
    }

    if !app.metadata.is_empty() {
        lines.push("\n  Metadata:".to_string());
        for (key, value) in &app.metadata {
            lines.push(format!("    {key}: {}", display_value(value)));
        }
    }

    lines.join("\n")
}

fn render_service(lines: &mut Vec<String>, name: &str, svc: &AppService) {
    lines.push(format!("\n    [{name}]"));
    let image = if svc.image.is_empty() { "?" } else { &svc.image };
    lines.push(format!("      Image   : {image}"));

    if !svc.network.ports.is_empty() {
        let ports: Vec<String> = svc
            .network
            .ports
            .iter()
            .map(|p| format!("{}:{}/{}", p.host, p.container, p.protocol))
            .collect();
        lines.push(format!("      Ports   : {}", ports.join(", ")));
    }
    if svc.network.host_network {
        lines.push("      Network : host".to_string());
    }

    if !svc.environment.is_empty() {
        lines.push("      Env vars:".to_string());
        for (key, value) in &svc.environment {
            lines.push(format!("        {key}={}", display_value(value)));
        }
    }

    if !svc.storage.is_empty() {
        lines.push("      Volumes:".to_string());
        for mount in &svc.storage {
            let ro = if mount.read_only { " (ro)" } else { "" };
            lines.push(format!("        {} -> {}{ro}", mount.host_path, mount.mount_path));
        }
    }

    if !svc.restart_policy.is_empty() {
        lines.push(format!("      Restart : {}", svc.restart_policy));
    }
}

fn render_container(lines: &mut Vec<String>, ctr: &ContainerDetail) {
    let or_unknown = |s: &str| if s.is_empty() { "?".to_string() } else { s.to_string() };

    lines.push(format!("\n    [{}]", or_unknown(&ctr.service_name)));
    lines.push(format!("      Image   : {}", or_unknown(&ctr.image)));
    lines.push(format!("      State   : {}", or_unknown(&ctr.state)));

    // One host binding per container port is enough.
    let ports: Vec<String> = ctr
        .port_config
        .iter()
        .filter_map(|pc| {
            let container = pc.container_port.map_or("?".to_string(), |p| p.to_string());
            let protocol = pc.protocol.as_deref().unwrap_or("tcp");
            pc.host_ports.first().map(|hp| {
                let host = hp.host_port.map_or("?".to_string(), |p| p.to_string());
                match hp.host_ip.as_deref() {
                    Some(ip) if !ip.is_empty() && ip != "0.0.0.0" && ip != "::" => {
                        format!("{ip}:{host}:{container}/{protocol}")
                    }
                    _ => format!("{host}:{container}/{protocol}"),
                }
            })
        })
        .collect();
    if !ports.is_empty() {
        lines.push(format!("      Ports   : {}", ports.join(", ")));
    }

    if !ctr.volume_mounts.is_empty() {
        lines.push("      Volumes:".to_string());
        for vm in &ctr.volume_mounts {
            let mode = match vm.mode.as_deref() {
                Some(mode) if !mode.is_empty() => format!(" ({mode})"),
                _ => String::new(),
            };
            lines.push(format!(
                "        {} -> {}{mode}",
                or_unknown(&vm.source),
                or_unknown(&vm.destination)
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render_service_config() {
        let app: App = serde_json::from_value(json!({
            "name": "nginx-demo",
            "state": "RUNNING",
            "version": "1.0.0",
            "custom_app": true,
            "config": {"services": {"web": {
                "image": "nginx:latest",
                "network": {"ports": [{"host": 8080, "container": 80, "protocol": "tcp"}]},
                "storage": [{"host_path": "/mnt/Store/Apps/nginx/html", "mount_path": "/usr/share/nginx/html", "read_only": true}],
                "environment": {"NGINX_HOST": "localhost", "NGINX_PORT": 80},
                "restart_policy": "unless-stopped"
            }}},
            "portals": {"Web UI": "http://truenas.local:8080/"},
            "metadata": {"train": "custom"}
        }))
        .unwrap();

        let text = render("nginx-demo", &app);
        assert!(text.starts_with("Configuration for 'nginx-demo':\n\n  State   : RUNNING"));
        assert!(text.contains("  Version : 1.0.0"));
        assert!(text.contains("  Type    : Custom App"));
        assert!(text.contains("\n    [web]\n      Image   : nginx:latest"));
        assert!(text.contains("      Ports   : 8080:80/tcp"));
        assert!(text.contains("        NGINX_PORT=80"));
        assert!(text.contains("        /mnt/Store/Apps/nginx/html -> /usr/share/nginx/html (ro)"));
        assert!(text.contains("      Restart : unless-stopped"));
        assert!(text.contains("    Web UI: http://truenas.local:8080/"));
        assert!(text.contains("    train: custom"));
        assert!(!text.contains("Upgrade"));
    }

    #[test]
    fn test_render_container_details() {
        let app: App = serde_json::from_value(json!({
            "name": "immich",
            "state": "RUNNING",
            "custom_app": false,
            "upgrade_available": true,
            "latest_version": "1.2.0",
            "active_workloads": {
                "containers": 1,
                "container_details": [{
                    "service_name": "server",
                    "image": "ghcr.io/immich-app/immich-server:v1",
                    "state": "running",
                    "port_config": [
                        {"container_port": 2283, "protocol": "tcp",
                         "host_ports": [{"host_port": 2283, "host_ip": "0.0.0.0"}, {"host_port": 2283, "host_ip": "::"}]},
                        {"container_port": 53, "protocol": "udp",
                         "host_ports": [{"host_port": 5353, "host_ip": "192.168.1.2"}]}
                    ],
                    "volume_mounts": [{"source": "/mnt/Store/Photos", "destination": "/data", "mode": "rw"}]
                }]
            },
            "notes": "x".repeat(250)
        }))
        .unwrap();

        let text = render("immich", &app);
        assert!(text.contains("  Type    : Catalog App"));
        assert!(text.contains("  Upgrade : available (latest: 1.2.0)"));
        assert!(text.contains("\n  Containers: 1"));
        assert!(text.contains("      State   : running"));
        assert!(text.contains("      Ports   : 2283:2283/tcp, 192.168.1.2:5353:53/udp"));
        assert!(text.contains("        /mnt/Store/Photos -> /data (rw)"));
        assert!(text.contains(&format!("  Notes: {}...", "x".repeat(200))));
    }

    #[test]
    fn test_render_workload_summary_only() {
        let app: App = serde_json::from_value(json!({
            "state": "DEPLOYING",
            "active_workloads": {"containers": 2, "images": ["a:1", "b:2"]}
        }))
        .unwrap();
        let text = render("pending", &app);
        assert!(text.contains("\n  Images: a:1, b:2"));
        assert!(text.contains("\n  Active workloads: 2 container(s)"));
    }
}
