//! Live TrueNAS management API client
//!
//! One authenticated channel is held behind a mutex, so calls on a single
//! client are serialized. A call that fails because the channel dropped is
//! retried exactly once on a freshly authenticated channel. Authentication
//! and API errors are never retried.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use super::transport::{Connector, Notification, RpcChannel, TransportError, WsConnector};
use super::{
    check_snapshot_dataset, logs_available, logs_unavailable_message, matches_status, App,
    BackendError, BackendResult, Dataset, DirEntry, NasBackend, NetworkInterface, Pool, Snapshot,
    SystemInfo,
};
use crate::compose;
use crate::config::TrueNasConfig;
use crate::paths;

const LOG_FOLLOW_EVENT: &str = "app.container_log_follow";

/// Login material. Empty strings count as absent.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    password: Option<String>,
    api_key: Option<String>,
}

impl Credentials {
    pub fn new(
        username: impl Into<String>,
        password: Option<String>,
        api_key: Option<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.filter(|p| !p.is_empty()),
            api_key: api_key.filter(|k| !k.is_empty()),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

pub struct TrueNasClient {
    connector: Arc<dyn Connector>,
    credentials: Credentials,
    channel: Mutex<Option<Box<dyn RpcChannel>>>,
    log_timeout: Duration,
}

impl TrueNasClient {
    pub fn new(connector: Arc<dyn Connector>, credentials: Credentials) -> BackendResult<Self> {
        if credentials.password.is_none() && credentials.api_key.is_none() {
            return Err(BackendError::InvalidInput(
                "TRUENAS_PASSWORD or TRUENAS_API_KEY environment variable required".to_string(),
            ));
        }
        Ok(Self {
            connector,
            credentials,
            channel: Mutex::new(None),
            log_timeout: Duration::from_secs(10),
        })
    }

    pub fn from_config(config: &TrueNasConfig) -> BackendResult<Self> {
        let connector = WsConnector::new(config.url(), config.ssl_verify, config.request_timeout());
        let credentials = Credentials::new(
            config.username.clone(),
            config.password.clone(),
            config.api_key.clone(),
        );
        Ok(Self::new(Arc::new(connector), credentials)?.with_log_timeout(config.log_timeout()))
    }

    /// How long log collection waits for lines before giving up.
    pub fn with_log_timeout(mut self, timeout: Duration) -> Self {
        self.log_timeout = timeout;
        self
    }

    /// Open a channel and log in. Password login wins over the API key.
    async fn open_session(&self) -> BackendResult<Box<dyn RpcChannel>> {
        let mut channel = self
            .connector
            .connect()
            .await
            .map_err(|e| BackendError::Connection(e.to_string()))?;

        if let Err(e) = self.authenticate(channel.as_mut()).await {
            channel.close().await;
            return Err(e);
        }
        Ok(channel)
    }

    async fn authenticate(&self, channel: &mut dyn RpcChannel) -> BackendResult<()> {
        let username = &self.credentials.username;

        if let Some(password) = &self.credentials.password {
            debug!(username = %username, "Authenticating with password");
            let result = channel
                .call("auth.login", json!([username, password, null]))
                .await
                .map_err(login_error)?;
            if result.as_bool() != Some(true) {
                return Err(BackendError::Authentication(
                    "Invalid username or password".to_string(),
                ));
            }
            return Ok(());
        }

        if let Some(api_key) = &self.credentials.api_key {
            debug!(username = %username, "Authenticating with API key");
            let response = channel
                .call(
                    "auth.login_ex",
                    json!([{
                        "mechanism": "API_KEY_PLAIN",
                        "username": username,
                        "api_key": api_key,
                    }]),
                )
                .await
                .map_err(login_error)?;
            let response_type = response
                .get("response_type")
                .and_then(Value::as_str)
                .unwrap_or_default();
            return match response_type {
                "SUCCESS" => Ok(()),
                "AUTH_ERR" => Err(BackendError::Authentication(
                    "Invalid API key or username".to_string(),
                )),
                "EXPIRED" => Err(BackendError::Authentication(
                    "API key has been revoked or expired".to_string(),
                )),
                other => Err(BackendError::Authentication(format!(
                    "Unexpected auth response: {other}"
                ))),
            };
        }

        Err(BackendError::Authentication(
            "no credentials configured".to_string(),
        ))
    }

    /// Issue one API call, reconnecting and retrying once on a dropped channel.
    ///
    /// A client left without a channel by an earlier failed reconnect opens
    /// a new session first; that session counts as the one reconnect.
    async fn call(&self, method: &str, params: Value) -> BackendResult<Value> {
        let mut guard = self.channel.lock().await;
        let reopened = guard.is_none();
        if reopened {
            info!(method, "No open session, connecting to TrueNAS");
            *guard = Some(self.open_session().await?);
        }
        let Some(channel) = guard.as_mut() else {
            return Err(BackendError::Connection(
                "Not connected to TrueNAS".to_string(),
            ));
        };

        match channel.call(method, params.clone()).await {
            Ok(value) => {
                debug!(method, "API call completed");
                Ok(value)
            }
            Err(e) if e.is_disconnect() && !reopened => {
                warn!(method, error = %e, "Connection lost, reconnecting once");
                if let Some(mut stale) = guard.take() {
                    stale.close().await;
                }
                let mut fresh = self.open_session().await?;
                let outcome = fresh.call(method, params).await;
                *guard = Some(fresh);
                outcome.map_err(|e| call_error(method, e))
            }
            Err(e) if e.is_disconnect() => {
                warn!(method, error = %e, "Fresh session dropped, giving up");
                if let Some(mut stale) = guard.take() {
                    stale.close().await;
                }
                Err(call_error(method, e))
            }
            Err(e) => Err(call_error(method, e)),
        }
    }

    async fn call_as<T: DeserializeOwned>(&self, method: &str, params: Value) -> BackendResult<T> {
        let value = self.call(method, params).await?;
        serde_json::from_value(value)
            .map_err(|e| BackendError::Api(format!("Unexpected response from {method}: {e}")))
    }

    /// `Ok(false)` for API-level refusals, errors for everything else.
    async fn call_ok(&self, method: &str, params: Value) -> BackendResult<bool> {
        match self.call(method, params).await {
            Ok(_) => Ok(true),
            Err(BackendError::Api(msg)) => {
                warn!(method, error = %msg, "API call rejected");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    async fn instance(&self, app_name: &str) -> BackendResult<App> {
        self.call_as(
            "app.get_instance",
            json!([app_name, {"extra": {"retrieve_config": true}}]),
        )
        .await
        .map_err(|e| not_found(app_name, e))
    }

    async fn app_exists(&self, app_name: &str) -> BackendResult<bool> {
        let apps: Vec<App> = self
            .call_as("app.query", json!([[["name", "=", app_name]]]))
            .await?;
        Ok(!apps.is_empty())
    }

    async fn pick_container(
        &self,
        app_name: &str,
        service_name: Option<&str>,
    ) -> BackendResult<Option<String>> {
        let ids = self
            .call("app.container_ids", json!([app_name]))
            .await
            .map_err(|e| BackendError::Api(format!("Failed to get container IDs: {e}")))?;
        Ok(select_container(&ids, service_name))
    }

    /// Subscribe to the log stream, collect up to `lines`, then unsubscribe.
    async fn collect_logs(
        &self,
        app_name: &str,
        container_id: &str,
        lines: u32,
    ) -> BackendResult<Vec<String>> {
        let event = format!(
            "{LOG_FOLLOW_EVENT}:{}",
            json!({"app_name": app_name, "container_id": container_id, "tail_lines": lines})
        );

        let mut guard = self.channel.lock().await;
        let channel = guard.as_mut().ok_or_else(|| {
            BackendError::Connection("Not connected to TrueNAS".to_string())
        })?;

        let subscription = channel
            .call("core.subscribe", json!([event]))
            .await
            .map_err(|e| call_error("core.subscribe", e))?;

        let deadline = Instant::now() + self.log_timeout;
        let mut collected = Vec::new();
        while collected.len() < lines as usize {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                debug!(app = %app_name, collected = collected.len(), "Log collection timed out");
                break;
            }
            match channel.next_notification(remaining).await {
                Ok(Some(notification)) => {
                    if let Some(line) = log_line(&notification, &event) {
                        collected.push(line);
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    warn!(app = %app_name, error = %e, "Log stream interrupted");
                    break;
                }
            }
        }

        if let Err(e) = channel
            .call("core.unsubscribe", json!([subscription]))
            .await
        {
            warn!(app = %app_name, error = %e, "Failed to unsubscribe from log stream");
        }
        Ok(collected)
    }
}

fn login_error(e: TransportError) -> BackendError {
    if e.is_disconnect() || matches!(e, TransportError::Timeout(_)) {
        BackendError::Connection(e.to_string())
    } else {
        BackendError::Authentication(e.to_string())
    }
}

fn call_error(method: &str, e: TransportError) -> BackendError {
    if e.is_not_authenticated() {
        BackendError::Authentication(format!("Not authenticated: {e}"))
    } else if let TransportError::Remote { .. } = e {
        error!(method, error = %e, "API call failed");
        BackendError::Api(format!("API call {method} failed: {e}"))
    } else {
        BackendError::Connection(format!("{method}: {e}"))
    }
}

fn not_found(app_name: &str, e: BackendError) -> BackendError {
    match e {
        BackendError::Api(msg) => {
            let lower = msg.to_ascii_lowercase();
            if lower.contains("does not exist") || lower.contains("not found") {
                BackendError::AppNotFound(app_name.to_string())
            } else {
                BackendError::Api(msg)
            }
        }
        other => other,
    }
}

/// `app.container_ids` returns `{id: {id, service_name}}`; older builds
/// return a bare list of ids.
fn select_container(ids: &Value, service_name: Option<&str>) -> Option<String> {
    let containers: Vec<(String, Option<String>)> = match ids {
        Value::Object(map) => map
            .iter()
            .map(|(key, info)| {
                let id = info
                    .get("id")
                    .and_then(Value::as_str)
                    .unwrap_or(key)
                    .to_string();
                let service = info
                    .get("service_name")
                    .and_then(Value::as_str)
                    .map(str::to_string);
                (id, service)
            })
            .collect(),
        Value::Array(list) => list
            .iter()
            .filter_map(Value::as_str)
            .map(|id| (id.to_string(), None))
            .collect(),
        _ => Vec::new(),
    };

    service_name
        .and_then(|wanted| {
            containers
                .iter()
                .find(|(_, service)| service.as_deref() == Some(wanted))
        })
        .or_else(|| containers.first())
        .map(|(id, _)| id.clone())
}

fn log_line(notification: &Notification, event: &str) -> Option<String> {
    if notification.method != "collection_update" {
        return None;
    }
    let params = &notification.params;
    if params.get("collection").and_then(Value::as_str) != Some(event) {
        return None;
    }
    let fields = params.get("fields")?;
    let data = fields.get("data").and_then(Value::as_str)?.trim_end();
    Some(match fields.get("timestamp").and_then(Value::as_str) {
        Some(ts) => format!("{ts} {data}"),
        None => data.to_string(),
    })
}

#[async_trait]
impl NasBackend for TrueNasClient {
    async fn connect(&self) -> BackendResult<()> {
        info!(username = %self.credentials.username, "Connecting to TrueNAS");
        let channel = self.open_session().await.map_err(|e| {
            error!(error = %e, "Failed to connect to TrueNAS");
            e
        })?;
        let mut guard = self.channel.lock().await;
        if let Some(mut old) = guard.replace(channel) {
            old.close().await;
        }
        info!("Connected and authenticated to TrueNAS");
        Ok(())
    }

    async fn disconnect(&self) {
        if let Some(mut channel) = self.channel.lock().await.take() {
            channel.close().await;
            info!("Disconnected from TrueNAS");
        }
    }

    async fn test_connection(&self) -> bool {
        let connected = self.channel.lock().await.is_some();
        if !connected {
            if let Err(e) = self.connect().await {
                error!(error = %e, "Connection test failed");
                return false;
            }
        }
        match self.call("core.ping", json!([])).await {
            Ok(pong) => pong == "pong",
            Err(e) => {
                error!(error = %e, "Connection test failed");
                false
            }
        }
    }

    async fn list_custom_apps(&self, status_filter: &str) -> BackendResult<Vec<App>> {
        let apps: Vec<App> = self.call_as("app.query", json!([])).await?;
        Ok(apps
            .into_iter()
            .filter(|app| matches_status(app, status_filter))
            .collect())
    }

    async fn get_app_status(&self, app_name: &str) -> BackendResult<String> {
        let app = self.instance(app_name).await?;
        Ok(if app.state.is_empty() {
            "unknown".to_string()
        } else {
            app.state
        })
    }

    async fn get_app_config(&self, app_name: &str) -> BackendResult<App> {
        self.instance(app_name).await
    }

    async fn update_app_config(
        &self,
        app_name: &str,
        config: &Map<String, Value>,
    ) -> BackendResult<bool> {
        if !self.app_exists(app_name).await? {
            warn!(app = %app_name, "Cannot update config of missing app");
            return Ok(false);
        }
        self.call_ok("app.update", json!([app_name, config])).await
    }

    async fn start_app(&self, app_name: &str) -> BackendResult<bool> {
        self.call_ok("app.start", json!([app_name])).await
    }

    async fn stop_app(&self, app_name: &str) -> BackendResult<bool> {
        self.call_ok("app.stop", json!([app_name])).await
    }

    async fn deploy_app(
        &self,
        app_name: &str,
        compose_yaml: &str,
        auto_start: bool,
    ) -> BackendResult<bool> {
        let app_config = compose::convert(compose_yaml, app_name)?;
        if !self.call_ok("app.create", json!([app_config])).await? {
            error!(app = %app_name, "App deployment failed");
            return Ok(false);
        }
        if auto_start && !self.start_app(app_name).await? {
            warn!(app = %app_name, "App deployed but did not start");
        }
        Ok(true)
    }

    async fn update_app(
        &self,
        app_name: &str,
        compose_yaml: &str,
        force_recreate: bool,
    ) -> BackendResult<bool> {
        let app_config = compose::convert(compose_yaml, app_name)?;
        if !self
            .call_ok("app.update", json!([app_name, app_config]))
            .await?
        {
            return Ok(false);
        }
        if force_recreate {
            return self.call_ok("app.redeploy", json!([app_name])).await;
        }
        Ok(true)
    }

    async fn delete_app(&self, app_name: &str, delete_volumes: bool) -> BackendResult<bool> {
        self.call_ok(
            "app.delete",
            json!([app_name, {"remove_ix_volumes": delete_volumes, "remove_images": false}]),
        )
        .await
    }

    async fn get_app_logs(
        &self,
        app_name: &str,
        lines: u32,
        service_name: Option<&str>,
    ) -> BackendResult<String> {
        let app = self.instance(app_name).await?;
        if !logs_available(&app.state) {
            return Ok(logs_unavailable_message(app_name, &app.state));
        }

        let Some(container_id) = self.pick_container(app_name, service_name).await? else {
            return Ok(format!("No containers found for '{app_name}'"));
        };

        let collected = self.collect_logs(app_name, &container_id, lines).await?;
        info!(app = %app_name, container = %container_id, lines = collected.len(), "Collected app logs");
        Ok(collected.join("\n"))
    }

    async fn get_compose_config(&self, app_name: &str) -> BackendResult<Value> {
        self.call("app.config", json!([app_name]))
            .await
            .map_err(|e| not_found(app_name, e))
    }

    async fn update_compose_config(
        &self,
        app_name: &str,
        compose_yaml: &str,
    ) -> BackendResult<bool> {
        compose::load_services(compose_yaml)?;
        if !self.app_exists(app_name).await? {
            warn!(app = %app_name, "Cannot update compose config of missing app");
            return Ok(false);
        }
        self.call_ok(
            "app.update",
            json!([app_name, {"custom_compose_config_string": compose_yaml}]),
        )
        .await
    }

    async fn list_directory(
        &self,
        path: &str,
        include_hidden: bool,
    ) -> BackendResult<Vec<DirEntry>> {
        let path = paths::restrict_to_mount_root(path)?;
        let entries: Vec<DirEntry> = self.call_as("filesystem.listdir", json!([path])).await?;
        Ok(entries
            .into_iter()
            .filter(|e| include_hidden || !e.is_hidden())
            .collect())
    }

    async fn list_datasets(&self, pool_name: Option<&str>) -> BackendResult<Vec<Dataset>> {
        let filters = match pool_name {
            Some(pool) => json!([["pool", "=", pool]]),
            None => json!([]),
        };
        self.call_as("pool.dataset.query", json!([filters])).await
    }

    async fn list_snapshots(&self, dataset: Option<&str>) -> BackendResult<Vec<Snapshot>> {
        let filters = match dataset {
            Some(dataset) => json!([["dataset", "=", dataset]]),
            None => json!([]),
        };
        self.call_as(
            "zfs.snapshot.query",
            json!([filters, {"extra": {"properties": ["used", "referenced", "creation"]}}]),
        )
        .await
    }

    async fn create_snapshot(
        &self,
        dataset: &str,
        name: &str,
        recursive: bool,
    ) -> BackendResult<Snapshot> {
        check_snapshot_dataset(dataset)?;
        let mut snapshot: Snapshot = self
            .call_as(
                "zfs.snapshot.create",
                json!([{"dataset": dataset, "name": name, "recursive": recursive}]),
            )
            .await?;
        if snapshot.name.is_empty() {
            snapshot.name = format!("{dataset}@{name}");
        }
        Ok(snapshot)
    }

    async fn delete_snapshot(&self, snapshot_name: &str) -> BackendResult<bool> {
        self.call_ok("zfs.snapshot.delete", json!([snapshot_name])).await
    }

    async fn get_system_info(&self) -> BackendResult<SystemInfo> {
        self.call_as("system.info", json!([])).await
    }

    async fn get_storage_pools(&self) -> BackendResult<Vec<Pool>> {
        self.call_as("pool.query", json!([])).await
    }

    async fn get_network_info(&self) -> BackendResult<Vec<NetworkInterface>> {
        self.call_as("interface.query", json!([])).await
    }
}
