//! NAS backend capability
//!
//! Tool handlers only ever see [`NasBackend`]. Two implementations exist:
//! [`mock::MockBackend`] keeps everything in memory, [`client::TrueNasClient`]
//! talks to the TrueNAS management API over JSON-RPC.

pub mod client;
pub mod mock;
pub mod transport;
pub mod types;

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::compose::{self, ComposeError, ValidationReport};
use crate::paths::OutsideRoot;

pub use types::*;

/// States in which container logs can be followed.
pub const ACTIVE_LOG_STATES: &[&str] = &["RUNNING", "CRASHED", "DEPLOYING"];

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("API call failed: {0}")]
    Api(String),

    #[error("{0}")]
    InvalidInput(String),

    #[error("App '{0}' not found")]
    AppNotFound(String),

    #[error(transparent)]
    Compose(#[from] ComposeError),
}

impl From<OutsideRoot> for BackendError {
    fn from(e: OutsideRoot) -> Self {
        BackendError::InvalidInput(e.to_string())
    }
}

pub type BackendResult<T> = Result<T, BackendError>;

/// Snapshots are only created on `pool/dataset` identifiers.
pub fn check_snapshot_dataset(dataset: &str) -> BackendResult<()> {
    if dataset.contains('/') {
        Ok(())
    } else {
        Err(BackendError::InvalidInput(
            "Dataset must be in pool/dataset format (e.g. 'Store/Media')".to_string(),
        ))
    }
}

pub fn logs_available(state: &str) -> bool {
    ACTIVE_LOG_STATES
        .iter()
        .any(|s| s.eq_ignore_ascii_case(state))
}

pub fn logs_unavailable_message(app_name: &str, state: &str) -> String {
    format!(
        "Cannot retrieve logs for '{app_name}': app is {state}. \
         Logs are only available while the app is RUNNING, CRASHED or DEPLOYING."
    )
}

/// Case-insensitive state filter. `all` keeps everything.
pub fn matches_status(app: &App, status_filter: &str) -> bool {
    status_filter.eq_ignore_ascii_case("all") || app.state.eq_ignore_ascii_case(status_filter)
}

/// High-level NAS operations shared by the mock and the live client.
///
/// Operations that report success as `bool` return `Ok(false)` for
/// application-level refusals (missing app, API rejection). Errors are
/// reserved for invalid input, connection and authentication failures.
#[async_trait]
pub trait NasBackend: Send + Sync {
    async fn connect(&self) -> BackendResult<()>;
    async fn disconnect(&self);
    async fn test_connection(&self) -> bool;

    async fn list_custom_apps(&self, status_filter: &str) -> BackendResult<Vec<App>>;
    async fn get_app_status(&self, app_name: &str) -> BackendResult<String>;
    async fn get_app_config(&self, app_name: &str) -> BackendResult<App>;
    async fn update_app_config(&self, app_name: &str, config: &Map<String, Value>)
        -> BackendResult<bool>;
    async fn start_app(&self, app_name: &str) -> BackendResult<bool>;
    async fn stop_app(&self, app_name: &str) -> BackendResult<bool>;
    async fn deploy_app(
        &self,
        app_name: &str,
        compose_yaml: &str,
        auto_start: bool,
    ) -> BackendResult<bool>;
    async fn update_app(
        &self,
        app_name: &str,
        compose_yaml: &str,
        force_recreate: bool,
    ) -> BackendResult<bool>;
    async fn delete_app(&self, app_name: &str, delete_volumes: bool) -> BackendResult<bool>;

    async fn validate_compose(&self, compose_yaml: &str, check_security: bool) -> ValidationReport {
        compose::validate(compose_yaml, check_security)
    }

    async fn get_app_logs(
        &self,
        app_name: &str,
        lines: u32,
        service_name: Option<&str>,
    ) -> BackendResult<String>;
    async fn get_compose_config(&self, app_name: &str) -> BackendResult<Value>;
    async fn update_compose_config(&self, app_name: &str, compose_yaml: &str)
        -> BackendResult<bool>;

    async fn list_directory(&self, path: &str, include_hidden: bool)
        -> BackendResult<Vec<DirEntry>>;

    async fn list_datasets(&self, pool_name: Option<&str>) -> BackendResult<Vec<Dataset>>;
    async fn list_snapshots(&self, dataset: Option<&str>) -> BackendResult<Vec<Snapshot>>;
    async fn create_snapshot(
        &self,
        dataset: &str,
        name: &str,
        recursive: bool,
    ) -> BackendResult<Snapshot>;
    async fn delete_snapshot(&self, snapshot_name: &str) -> BackendResult<bool>;

    async fn get_system_info(&self) -> BackendResult<SystemInfo>;
    async fn get_storage_pools(&self) -> BackendResult<Vec<Pool>>;
    async fn get_network_info(&self) -> BackendResult<Vec<NetworkInterface>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_dataset_format() {
        assert!(check_snapshot_dataset("Store/Media").is_ok());
        let err = check_snapshot_dataset("Store").unwrap_err();
        assert!(err.to_string().contains("pool/dataset format"));
    }

    #[test]
    fn test_logs_available_states() {
        assert!(logs_available("RUNNING"));
        assert!(logs_available("crashed"));
        assert!(logs_available("Deploying"));
        assert!(!logs_available("STOPPED"));
        assert!(!logs_available(""));
    }

    #[test]
    fn test_logs_unavailable_message() {
        assert_eq!(
            logs_unavailable_message("plex-server", "STOPPED"),
            "Cannot retrieve logs for 'plex-server': app is STOPPED. \
             Logs are only available while the app is RUNNING, CRASHED or DEPLOYING."
        );
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            BackendError::AppNotFound("x".into()).to_string(),
            "App 'x' not found"
        );
        let outside: BackendError = crate::paths::restrict_to_mount_root("/etc")
            .unwrap_err()
            .into();
        assert!(matches!(outside, BackendError::InvalidInput(_)));
    }
}
