//! In-memory TrueNAS stand-in for development and tests
//!
//! State is owned by one [`MockBackend`] instance and only changes through its
//! [`NasBackend`] methods. Every operation sleeps for the configured latency
//! first; tests use [`MockBackend::with_latency`] with `Duration::ZERO`.

use std::time::Duration;

use async_trait::async_trait;
use indexmap::IndexMap;
use serde_json::{json, Map, Value};
use tokio::sync::Mutex;
use tracing::{info, warn};

use super::{
    check_snapshot_dataset, logs_available, logs_unavailable_message, matches_status,
    ActiveWorkloads, App, AppService, BackendError, BackendResult, Dataset, DirEntry,
    InterfaceAlias, InterfaceState, NasBackend, NetworkInterface, Pool, PoolScan, PoolTopology,
    ServiceMount, ServiceNetwork, ServicePort, Snapshot, SnapshotProperties, SystemInfo, Vdev,
    ZfsProperty,
};
use crate::compose::{self, ComposeError, ConvertedApp, StorageEntry};
use crate::paths;

const MAX_MOCK_LOG_LINES: u32 = 20;
const IX_APPS_MOUNTS: &str = "/mnt/.ix-apps/app_mounts";

const LOG_LEVELS: &[&str] = &["INFO", "WARN", "ERROR", "DEBUG"];
const LOG_MESSAGES: &[&str] = &[
    "Service started successfully",
    "Processing request",
    "Database connection established",
    "Configuration loaded",
    "Health check passed",
    "Request completed",
    "Cache updated",
    "Background task finished",
];

/// (name, state, compose) for the apps present on a fresh mock.
const SEED_APPS: &[(&str, &str, &str)] = &[
    (
        "nginx-demo",
        "RUNNING",
        r#"
services:
  web:
    image: nginx:latest
    ports: ["8080:80"]
    volumes: ["/mnt/Store/Apps/nginx/html:/usr/share/nginx/html:ro"]
    environment:
      NGINX_HOST: localhost
      NGINX_PORT: "80"
"#,
    ),
    (
        "plex-server",
        "STOPPED",
        r#"
services:
  plex:
    image: plexinc/pms-docker:1.41.0
    ports: ["32400:32400"]
    volumes:
      - /mnt/Store/Apps/plex/config:/config
      - /mnt/Store/Media:/media:ro
    environment:
      PLEX_CLAIM: claim-xxxx
      TZ: Europe/London
"#,
    ),
    (
        "home-assistant",
        "RUNNING",
        r#"
services:
  hass:
    image: ghcr.io/home-assistant/home-assistant:2025.1
    ports: ["8123:8123"]
    volumes: ["/mnt/Store/Apps/hass/config:/config"]
    environment:
      TZ: Europe/London
"#,
    ),
];

struct MockState {
    connected: bool,
    apps: IndexMap<String, MockApp>,
    filesystem: IndexMap<String, Vec<DirEntry>>,
    datasets: Vec<Dataset>,
    snapshots: Vec<Snapshot>,
    system: SystemInfo,
    pools: Vec<Pool>,
    interfaces: Vec<NetworkInterface>,
}

struct MockApp {
    record: App,
    compose: Value,
}

impl MockApp {
    fn from_compose(name: &str, state: &str, compose_yaml: &str) -> Result<Self, ComposeError> {
        let converted = compose::convert(compose_yaml, name)?;
        let mut app = Self {
            record: App {
                name: name.to_string(),
                state: state.to_string(),
                version: Some("1.0.0".to_string()),
                custom_app: Some(true),
                metadata: object(json!({"app_version": "1.0.0", "train": "custom"})),
                ..App::default()
            },
            compose: Value::Null,
        };
        app.apply_compose(&converted, compose_yaml)?;
        Ok(app)
    }

    /// Replace the service configuration with a freshly converted compose.
    fn apply_compose(&mut self, converted: &ConvertedApp, compose_yaml: &str) -> Result<(), ComposeError> {
        self.compose = serde_yaml::from_str(compose_yaml)?;

        let services: Map<String, Value> = converted
            .services
            .iter()
            .map(|svc| {
                let service = service_record(&self.record.name, svc, &converted.restart_policy);
                let value = serde_json::to_value(service).unwrap_or(Value::Null);
                (svc.name.clone(), value)
            })
            .collect();
        self.record
            .config
            .insert("services".to_string(), Value::Object(services));
        self.refresh_workloads();
        Ok(())
    }

    fn refresh_workloads(&mut self) {
        let services = self.record.services();
        let running = self.record.state.eq_ignore_ascii_case("RUNNING");
        self.record.active_workloads = ActiveWorkloads {
            containers: if running { services.len() as u32 } else { 0 },
            images: services.values().map(|s| s.image.clone()).collect(),
            used_ports: if running {
                services
                    .values()
                    .flat_map(|s| s.network.ports.iter())
                    .map(|p| json!({"host": p.host, "container": p.container}))
                    .collect()
            } else {
                Vec::new()
            },
            ..ActiveWorkloads::default()
        };
    }

    fn set_state(&mut self, state: &str) {
        self.record.state = state.to_string();
        self.refresh_workloads();
    }
}

fn service_record(app: &str, svc: &compose::ConvertedService, restart_policy: &str) -> AppService {
    AppService {
        image: format!("{}:{}", svc.image.repository, svc.image.tag),
        network: ServiceNetwork {
            host_network: false,
            ports: svc
                .network
                .port_forwards
                .iter()
                .map(|p| ServicePort {
                    host: p.host_port,
                    container: p.container_port,
                    protocol: p.protocol.to_string(),
                })
                .collect(),
        },
        storage: svc
            .storage
            .values()
            .map(|entry| match entry {
                StorageEntry::HostPath {
                    host_path,
                    mount_path,
                    read_only,
                } => ServiceMount {
                    host_path: host_path.clone(),
                    mount_path: mount_path.clone(),
                    read_only: *read_only,
                },
                StorageEntry::IxVolume {
                    ix_volume_config,
                    mount_path,
                } => ServiceMount {
                    host_path: format!("{IX_APPS_MOUNTS}/{app}/{}", ix_volume_config.dataset_name),
                    mount_path: mount_path.clone(),
                    read_only: false,
                },
            })
            .collect(),
        environment: svc.environment.clone(),
        restart_policy: restart_policy.to_string(),
    }
}

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn dir(parent: &str, name: &str) -> DirEntry {
    DirEntry {
        name: name.to_string(),
        path: format!("{parent}/{name}"),
        kind: "DIRECTORY".to_string(),
        size: 0,
        mode: 0o755,
    }
}

fn file(parent: &str, name: &str, size: u64) -> DirEntry {
    DirEntry {
        name: name.to_string(),
        path: format!("{parent}/{name}"),
        kind: "FILE".to_string(),
        size,
        mode: 0o644,
    }
}

fn dataset(name: &str, used: u64, available: u64) -> Dataset {
    Dataset {
        id: name.to_string(),
        name: name.to_string(),
        pool: name.split('/').next().unwrap_or(name).to_string(),
        kind: "FILESYSTEM".to_string(),
        used: ZfsProperty::bytes(used),
        available: ZfsProperty::bytes(available),
        mountpoint: Some(format!("{}/{name}", paths::MOUNT_ROOT)),
    }
}

fn snapshot(name: &str, referenced: u64, used: u64, creation: i64) -> Snapshot {
    Snapshot {
        name: name.to_string(),
        dataset: name.split('@').next().unwrap_or(name).to_string(),
        properties: SnapshotProperties {
            used: ZfsProperty::bytes(used),
            referenced: ZfsProperty::bytes(referenced),
            creation: ZfsProperty {
                rawvalue: Value::String(creation.to_string()),
            },
        },
    }
}

fn pool(name: &str, layout: &str, size: u64, allocated: u64) -> Pool {
    Pool {
        name: name.to_string(),
        status: "ONLINE".to_string(),
        healthy: true,
        size: Some(size),
        allocated: Some(allocated),
        free: Some(size.saturating_sub(allocated)),
        scan: Some(PoolScan {
            function: Some("SCRUB".to_string()),
            state: Some("FINISHED".to_string()),
            errors: Some(0),
        }),
        topology: Some(PoolTopology {
            data: vec![Vdev {
                kind: layout.to_string(),
                status: "ONLINE".to_string(),
            }],
        }),
    }
}

fn interface(name: &str, kind: &str, mtu: u32, speed: Option<u64>, address: &str, netmask: u32) -> NetworkInterface {
    NetworkInterface {
        name: name.to_string(),
        kind: kind.to_string(),
        state: InterfaceState {
            link_state: "LINK_STATE_UP".to_string(),
            mtu: Some(mtu),
            speed,
        },
        aliases: vec![InterfaceAlias {
            kind: "INET".to_string(),
            address: address.to_string(),
            netmask: Some(netmask),
        }],
    }
}

impl MockState {
    fn seeded() -> Self {
        let mut apps = IndexMap::new();
        for (name, state, compose_yaml) in SEED_APPS {
            match MockApp::from_compose(name, state, compose_yaml) {
                Ok(app) => {
                    apps.insert(name.to_string(), app);
                }
                Err(e) => warn!("Skipping mock app {name}: {e}"),
            }
        }
        if let Some(nginx) = apps.get_mut("nginx-demo") {
            nginx
                .record
                .portals
                .insert("Web UI".to_string(), json!("http://truenas.local:8080/"));
        }

        let mut filesystem = IndexMap::new();
        filesystem.insert(
            "/mnt".to_string(),
            vec![dir("/mnt", "Store"), dir("/mnt", "Boot"), dir("/mnt", ".zfs")],
        );
        filesystem.insert(
            "/mnt/Store".to_string(),
            vec![
                dir("/mnt/Store", "Media"),
                dir("/mnt/Store", "Apps"),
                dir("/mnt/Store", "Backups"),
                dir("/mnt/Store", ".config"),
            ],
        );
        filesystem.insert(
            "/mnt/Store/Media".to_string(),
            vec![
                dir("/mnt/Store/Media", "Movies"),
                dir("/mnt/Store/Media", "TV Shows"),
                file("/mnt/Store/Media", "readme.txt", 1024),
            ],
        );

        Self {
            connected: false,
            apps,
            filesystem,
            datasets: vec![
                dataset("Store", 5_497_558_138_880, 10_995_116_277_760),
                dataset("Store/Media", 4_398_046_511_104, 10_995_116_277_760),
                dataset("Store/Apps", 536_870_912_000, 10_995_116_277_760),
                dataset("Boot/ROOT", 21_474_836_480, 107_374_182_400),
            ],
            snapshots: vec![
                snapshot("Store/Media@pre-tdarr-20260215", 4_398_046_511_104, 1_073_741_824, 1_739_577_600),
                snapshot("Store/Apps@daily-20260217", 536_870_912_000, 52_428_800, 1_739_750_400),
            ],
            system: SystemInfo {
                hostname: "truenas".to_string(),
                version: "TrueNAS-SCALE-24.10.2".to_string(),
                uptime_seconds: 864_000.0,
                cores: 4,
                physical_cores: 4,
                loadavg: vec![0.5, 0.7, 0.6],
                physmem: 17_179_869_184,
                model: "Intel(R) Core(TM) i7-7700 CPU @ 3.60GHz".to_string(),
            },
            pools: vec![
                pool("Store", "RAIDZ2", 17_592_186_044_416, 5_497_558_138_880),
                pool("Boot", "MIRROR", 128_849_018_880, 21_474_836_480),
            ],
            interfaces: vec![
                interface("enp2s0", "PHYSICAL", 1500, Some(2500), "192.168.10.249", 24),
                interface("lo", "LOOPBACK", 65536, None, "127.0.0.1", 8),
            ],
        }
    }
}

pub struct MockBackend {
    state: Mutex<MockState>,
    latency: Duration,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::with_latency(Duration::from_millis(100))
    }

    pub fn with_latency(latency: Duration) -> Self {
        Self {
            state: Mutex::new(MockState::seeded()),
            latency,
        }
    }

    async fn pause(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Apply a partial app update. `config` sections merge one level deep,
/// every other key replaces the field outright.
fn merge_app_config(record: &App, update: &Map<String, Value>) -> BackendResult<App> {
    let mut doc = object(
        serde_json::to_value(record)
            .map_err(|e| BackendError::InvalidInput(format!("Invalid app record: {e}")))?,
    );

    for (key, value) in update {
        match (key.as_str(), value, doc.get_mut("config")) {
            ("config", Value::Object(sections), Some(Value::Object(existing))) => {
                for (section, section_value) in sections {
                    match (existing.get_mut(section), section_value) {
                        (Some(Value::Object(current)), Value::Object(incoming)) => {
                            for (k, v) in incoming {
                                current.insert(k.clone(), v.clone());
                            }
                        }
                        _ => {
                            existing.insert(section.clone(), section_value.clone());
                        }
                    }
                }
            }
            _ => {
                doc.insert(key.clone(), value.clone());
            }
        }
    }

    serde_json::from_value(Value::Object(doc))
        .map_err(|e| BackendError::InvalidInput(format!("Invalid app config: {e}")))
}

fn mock_log_lines(lines: u32) -> Vec<String> {
    (0..lines.min(MAX_MOCK_LOG_LINES) as usize)
        .map(|i| {
            format!(
                "[2025-07-30T12:{:02}:{:02}Z] {}: {}",
                30 + i,
                10 + (i * 7) % 50,
                LOG_LEVELS[i % LOG_LEVELS.len()],
                LOG_MESSAGES[i % LOG_MESSAGES.len()]
            )
        })
        .collect()
}

#[async_trait]
impl NasBackend for MockBackend {
    async fn connect(&self) -> BackendResult<()> {
        info!("Mock: Connecting to TrueNAS");
        self.pause().await;
        self.state.lock().await.connected = true;
        info!("Mock: Connected and authenticated successfully");
        Ok(())
    }

    async fn disconnect(&self) {
        info!("Mock: Disconnecting from TrueNAS");
        self.state.lock().await.connected = false;
    }

    async fn test_connection(&self) -> bool {
        info!("Mock: Testing connection");
        self.pause().await;
        true
    }

    async fn list_custom_apps(&self, status_filter: &str) -> BackendResult<Vec<App>> {
        info!(filter = %status_filter, "Mock: Listing Custom Apps");
        self.pause().await;
        let state = self.state.lock().await;
        Ok(state
            .apps
            .values()
            .map(|app| app.record.clone())
            .filter(|app| matches_status(app, status_filter))
            .collect())
    }

    async fn get_app_status(&self, app_name: &str) -> BackendResult<String> {
        info!(app = %app_name, "Mock: Getting app status");
        self.pause().await;
        let state = self.state.lock().await;
        state
            .apps
            .get(app_name)
            .map(|app| app.record.state.clone())
            .ok_or_else(|| BackendError::AppNotFound(app_name.to_string()))
    }

    async fn get_app_config(&self, app_name: &str) -> BackendResult<App> {
        info!(app = %app_name, "Mock: Getting app config");
        self.pause().await;
        let state = self.state.lock().await;
        state
            .apps
            .get(app_name)
            .map(|app| app.record.clone())
            .ok_or_else(|| BackendError::AppNotFound(app_name.to_string()))
    }

    async fn update_app_config(
        &self,
        app_name: &str,
        config: &Map<String, Value>,
    ) -> BackendResult<bool> {
        let keys: Vec<&str> = config.keys().map(String::as_str).collect();
        info!(app = %app_name, ?keys, "Mock: Updating app config");
        self.pause().await;

        let mut state = self.state.lock().await;
        let Some(app) = state.apps.get_mut(app_name) else {
            return Ok(false);
        };
        app.record = merge_app_config(&app.record, config)?;
        Ok(true)
    }

    async fn start_app(&self, app_name: &str) -> BackendResult<bool> {
        info!(app = %app_name, "Mock: Starting app");
        self.pause().await;
        let mut state = self.state.lock().await;
        Ok(match state.apps.get_mut(app_name) {
            Some(app) => {
                app.set_state("RUNNING");
                true
            }
            None => false,
        })
    }

    async fn stop_app(&self, app_name: &str) -> BackendResult<bool> {
        info!(app = %app_name, "Mock: Stopping app");
        self.pause().await;
        let mut state = self.state.lock().await;
        Ok(match state.apps.get_mut(app_name) {
            Some(app) => {
                app.set_state("STOPPED");
                true
            }
            None => false,
        })
    }

    async fn deploy_app(
        &self,
        app_name: &str,
        compose_yaml: &str,
        auto_start: bool,
    ) -> BackendResult<bool> {
        info!(app = %app_name, auto_start, "Mock: Deploying app");
        let initial = if auto_start { "RUNNING" } else { "STOPPED" };
        let app = MockApp::from_compose(app_name, initial, compose_yaml)?;
        self.pause().await;

        let mut state = self.state.lock().await;
        if state.apps.contains_key(app_name) {
            warn!(app = %app_name, "Mock: App already exists");
            return Ok(false);
        }
        state.apps.insert(app_name.to_string(), app);
        Ok(true)
    }

    async fn update_app(
        &self,
        app_name: &str,
        compose_yaml: &str,
        force_recreate: bool,
    ) -> BackendResult<bool> {
        info!(app = %app_name, force_recreate, "Mock: Updating app");
        let converted = compose::convert(compose_yaml, app_name)?;
        self.pause().await;

        let mut state = self.state.lock().await;
        let Some(app) = state.apps.get_mut(app_name) else {
            return Ok(false);
        };
        app.apply_compose(&converted, compose_yaml)?;
        Ok(true)
    }

    async fn delete_app(&self, app_name: &str, delete_volumes: bool) -> BackendResult<bool> {
        info!(app = %app_name, delete_volumes, "Mock: Deleting app");
        self.pause().await;
        Ok(self
            .state
            .lock()
            .await
            .apps
            .shift_remove(app_name)
            .is_some())
    }

    async fn get_app_logs(
        &self,
        app_name: &str,
        lines: u32,
        service_name: Option<&str>,
    ) -> BackendResult<String> {
        info!(app = %app_name, lines, service = ?service_name, "Mock: Getting app logs");
        self.pause().await;

        let state = self.state.lock().await;
        let app = state
            .apps
            .get(app_name)
            .ok_or_else(|| BackendError::AppNotFound(app_name.to_string()))?;
        if !logs_available(&app.record.state) {
            return Ok(logs_unavailable_message(app_name, &app.record.state));
        }
        Ok(mock_log_lines(lines).join("\n"))
    }

    async fn get_compose_config(&self, app_name: &str) -> BackendResult<Value> {
        info!(app = %app_name, "Mock: Getting compose config");
        self.pause().await;
        let state = self.state.lock().await;
        state
            .apps
            .get(app_name)
            .map(|app| app.compose.clone())
            .ok_or_else(|| BackendError::AppNotFound(app_name.to_string()))
    }

    async fn update_compose_config(
        &self,
        app_name: &str,
        compose_yaml: &str,
    ) -> BackendResult<bool> {
        info!(app = %app_name, "Mock: Updating compose config");
        let converted = compose::convert(compose_yaml, app_name)?;
        self.pause().await;

        let mut state = self.state.lock().await;
        let Some(app) = state.apps.get_mut(app_name) else {
            return Ok(false);
        };
        app.apply_compose(&converted, compose_yaml)?;
        Ok(true)
    }

    async fn list_directory(
        &self,
        path: &str,
        include_hidden: bool,
    ) -> BackendResult<Vec<DirEntry>> {
        info!(path = %path, "Mock: Listing directory");
        let normalized = paths::restrict_to_mount_root(path)?;
        self.pause().await;

        let state = self.state.lock().await;
        Ok(state
            .filesystem
            .get(&normalized)
            .map(|entries| {
                entries
                    .iter()
                    .filter(|e| include_hidden || !e.is_hidden())
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn list_datasets(&self, pool_name: Option<&str>) -> BackendResult<Vec<Dataset>> {
        info!(pool = ?pool_name, "Mock: Listing datasets");
        self.pause().await;
        let state = self.state.lock().await;
        Ok(state
            .datasets
            .iter()
            .filter(|d| pool_name.map_or(true, |p| d.pool == p))
            .cloned()
            .collect())
    }

    async fn list_snapshots(&self, dataset: Option<&str>) -> BackendResult<Vec<Snapshot>> {
        info!(dataset = ?dataset, "Mock: Listing snapshots");
        self.pause().await;
        let state = self.state.lock().await;
        Ok(state
            .snapshots
            .iter()
            .filter(|s| dataset.map_or(true, |d| s.dataset == d))
            .cloned()
            .collect())
    }

    async fn create_snapshot(
        &self,
        dataset: &str,
        name: &str,
        recursive: bool,
    ) -> BackendResult<Snapshot> {
        info!(dataset = %dataset, name = %name, recursive, "Mock: Creating snapshot");
        check_snapshot_dataset(dataset)?;
        self.pause().await;

        let full_name = format!("{dataset}@{name}");
        let mut state = self.state.lock().await;
        if state.snapshots.iter().any(|s| s.name == full_name) {
            return Err(BackendError::InvalidInput(format!(
                "Snapshot '{full_name}' already exists"
            )));
        }
        let created = snapshot(&full_name, 0, 0, chrono::Utc::now().timestamp());
        state.snapshots.push(created.clone());
        Ok(created)
    }

    async fn delete_snapshot(&self, snapshot_name: &str) -> BackendResult<bool> {
        info!(snapshot = %snapshot_name, "Mock: Deleting snapshot");
        self.pause().await;
        let mut state = self.state.lock().await;
        let before = state.snapshots.len();
        state.snapshots.retain(|s| s.name != snapshot_name);
        Ok(state.snapshots.len() < before)
    }

    async fn get_system_info(&self) -> BackendResult<SystemInfo> {
        info!("Mock: Getting system info");
        self.pause().await;
        Ok(self.state.lock().await.system.clone())
    }

    async fn get_storage_pools(&self) -> BackendResult<Vec<Pool>> {
        info!("Mock: Getting storage pools");
        self.pause().await;
        Ok(self.state.lock().await.pools.clone())
    }

    async fn get_network_info(&self) -> BackendResult<Vec<NetworkInterface>> {
        info!("Mock: Getting network info");
        self.pause().await;
        Ok(self.state.lock().await.interfaces.clone())
    }
}
