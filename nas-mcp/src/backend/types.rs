//! Records returned by the TrueNAS management API
//!
//! Every struct is lenient: missing fields fall back to defaults so partial
//! API responses and mock data deserialize the same way.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct App {
    pub name: String,
    pub state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub human_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_app: Option<bool>,
    pub upgrade_available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_version: Option<String>,
    pub config: Map<String, Value>,
    pub active_workloads: ActiveWorkloads,
    pub portals: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub metadata: Map<String, Value>,
    /// Fields this crate does not model, kept so updates round-trip.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl App {
    /// Per-service configuration from `config.services`, skipping entries
    /// that are not service mappings.
    pub fn services(&self) -> IndexMap<String, AppService> {
        let Some(Value::Object(services)) = self.config.get("services") else {
            return IndexMap::new();
        };
        services
            .iter()
            .filter_map(|(name, svc)| {
                if !svc.is_object() {
                    return None;
                }
                serde_json::from_value(svc.clone())
                    .ok()
                    .map(|svc| (name.clone(), svc))
            })
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppService {
    pub image: String,
    pub network: ServiceNetwork,
    pub storage: Vec<ServiceMount>,
    pub environment: Map<String, Value>,
    pub restart_policy: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceNetwork {
    pub host_network: bool,
    pub ports: Vec<ServicePort>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServicePort {
    pub host: u16,
    pub container: u16,
    #[serde(default = "default_protocol")]
    pub protocol: String,
}

fn default_protocol() -> String {
    "tcp".to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceMount {
    pub host_path: String,
    pub mount_path: String,
    pub read_only: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActiveWorkloads {
    pub containers: u32,
    pub container_details: Vec<ContainerDetail>,
    pub images: Vec<String>,
    pub used_ports: Vec<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerDetail {
    pub id: String,
    pub service_name: String,
    pub image: String,
    pub state: String,
    pub port_config: Vec<PortConfig>,
    pub volume_mounts: Vec<VolumeMount>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortConfig {
    pub container_port: Option<u32>,
    pub protocol: Option<String>,
    pub host_ports: Vec<HostPort>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostPort {
    pub host_port: Option<u32>,
    pub host_ip: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolumeMount {
    pub source: String,
    pub destination: String,
    pub mode: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirEntry {
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub size: u64,
    pub mode: u32,
}

impl DirEntry {
    pub fn is_dir(&self) -> bool {
        self.kind == "DIRECTORY"
    }

    pub fn is_hidden(&self) -> bool {
        self.name.starts_with('.')
    }
}

/// A ZFS property as the API reports it. `rawvalue` is usually a string.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZfsProperty {
    pub rawvalue: Value,
}

impl ZfsProperty {
    pub fn bytes(value: u64) -> Self {
        Self {
            rawvalue: Value::String(value.to_string()),
        }
    }

    pub fn as_u64(&self) -> u64 {
        match &self.rawvalue {
            Value::String(s) => s.parse().unwrap_or(0),
            Value::Number(n) => n.as_u64().unwrap_or(0),
            _ => 0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Dataset {
    pub id: String,
    pub name: String,
    pub pool: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub used: ZfsProperty,
    pub available: ZfsProperty,
    pub mountpoint: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Snapshot {
    pub name: String,
    pub dataset: String,
    pub properties: SnapshotProperties,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotProperties {
    pub used: ZfsProperty,
    pub referenced: ZfsProperty,
    pub creation: ZfsProperty,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemInfo {
    pub hostname: String,
    pub version: String,
    pub uptime_seconds: f64,
    pub cores: u32,
    pub physical_cores: u32,
    pub loadavg: Vec<f64>,
    pub physmem: u64,
    pub model: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Pool {
    pub name: String,
    pub status: String,
    pub healthy: bool,
    pub size: Option<u64>,
    pub allocated: Option<u64>,
    pub free: Option<u64>,
    pub scan: Option<PoolScan>,
    pub topology: Option<PoolTopology>,
}

impl Pool {
    /// Layout of the first data vdev (`RAIDZ2`, `MIRROR`, ...).
    pub fn layout(&self) -> Option<&str> {
        self.topology
            .as_ref()
            .and_then(|t| t.data.first())
            .map(|vdev| vdev.kind.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolScan {
    pub function: Option<String>,
    pub state: Option<String>,
    pub errors: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolTopology {
    pub data: Vec<Vdev>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Vdev {
    #[serde(rename = "type")]
    pub kind: String,
    pub status: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkInterface {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub state: InterfaceState,
    pub aliases: Vec<InterfaceAlias>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterfaceState {
    pub link_state: String,
    pub mtu: Option<u32>,
    pub speed: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterfaceAlias {
    #[serde(rename = "type")]
    pub kind: String,
    pub address: String,
    pub netmask: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_app_tolerates_partial_records() {
        let app: App = serde_json::from_value(json!({
            "name": "nginx-demo",
            "state": "RUNNING",
            "id": "nginx-demo",
            "active_workloads": {"containers": 1}
        }))
        .unwrap();
        assert_eq!(app.name, "nginx-demo");
        assert_eq!(app.active_workloads.containers, 1);
        assert!(app.config.is_empty());
        assert_eq!(app.extra.get("id"), Some(&json!("nginx-demo")));
    }

    #[test]
    fn test_app_services_skips_non_mappings() {
        let app: App = serde_json::from_value(json!({
            "name": "a",
            "config": {
                "services": {
                    "web": {"image": "nginx:latest", "network": {"ports": [{"host": 8080, "container": 80}]}},
                    "broken": "not-a-service"
                }
            }
        }))
        .unwrap();
        let services = app.services();
        assert_eq!(services.len(), 1);
        let web = &services["web"];
        assert_eq!(web.image, "nginx:latest");
        assert_eq!(web.network.ports[0].protocol, "tcp");
    }

    #[test]
    fn test_zfs_property_parsing() {
        let p: ZfsProperty = serde_json::from_value(json!({"rawvalue": "1024", "value": "1K"})).unwrap();
        assert_eq!(p.as_u64(), 1024);
        let p: ZfsProperty = serde_json::from_value(json!({"rawvalue": 2048})).unwrap();
        assert_eq!(p.as_u64(), 2048);
        assert_eq!(ZfsProperty::default().as_u64(), 0);
        assert_eq!(ZfsProperty::bytes(7).as_u64(), 7);
    }

    #[test]
    fn test_pool_with_null_fields() {
        let pool: Pool = serde_json::from_value(json!({
            "name": "Store",
            "status": "ONLINE",
            "healthy": true,
            "size": null,
            "scan": null,
            "topology": {"data": [{"type": "RAIDZ2", "status": "ONLINE"}]}
        }))
        .unwrap();
        assert_eq!(pool.size, None);
        assert_eq!(pool.layout(), Some("RAIDZ2"));
    }
}
