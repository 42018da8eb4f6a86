//! Compose → Custom App conversion
//!
//! Document-level problems are fatal; anything wrong with a single port,
//! volume or environment entry is dropped and reported as a [`Diagnostic`].

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Map;
use serde_yaml::Value;
use tracing::{debug, warn};

use super::{key_to_string, load_services, ComposeError};
use crate::paths;

const DEFAULT_TAG: &str = "latest";
const RESTART_POLICY: &str = "unless-stopped";
const HOST_PATH_PREFIX: &str = "/mnt/";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvertedApp {
    pub name: String,
    pub services: Vec<ConvertedService>,
    pub restart_policy: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvertedService {
    pub name: String,
    pub image: ImageRef,
    pub network: NetworkConfig,
    pub storage: IndexMap<String, StorageEntry>,
    pub environment: Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    pub repository: String,
    pub tag: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub port_forwards: Vec<PortForward>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortForward {
    pub host_port: u16,
    pub container_port: u16,
    pub protocol: Protocol,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Tcp,
    Udp,
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Protocol::Tcp => write!(f, "tcp"),
            Protocol::Udp => write!(f, "udp"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StorageEntry {
    HostPath {
        host_path: String,
        mount_path: String,
        read_only: bool,
    },
    IxVolume {
        ix_volume_config: IxVolumeConfig,
        mount_path: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IxVolumeConfig {
    pub dataset_name: String,
    pub acl_enable: bool,
}

/// A single entry the converter skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub service: String,
    pub field: &'static str,
    pub index: usize,
    pub reason: String,
}

/// Convert compose YAML into the Custom App structure.
///
/// Skipped entries are logged and otherwise ignored.
pub fn convert(compose_yaml: &str, app_name: &str) -> Result<ConvertedApp, ComposeError> {
    let (app, diagnostics) = convert_with_diagnostics(compose_yaml, app_name)?;
    for d in &diagnostics {
        warn!(
            app = %app_name,
            service = %d.service,
            field = d.field,
            index = d.index,
            reason = %d.reason,
            "Skipping compose entry"
        );
    }
    Ok(app)
}

/// Like [`convert`] but hands the skipped entries back to the caller.
pub fn convert_with_diagnostics(
    compose_yaml: &str,
    app_name: &str,
) -> Result<(ConvertedApp, Vec<Diagnostic>), ComposeError> {
    let services = load_services(compose_yaml)?;
    let mut diagnostics = Vec::new();

    let converted = services
        .iter()
        .map(|(key, definition)| {
            let name = key_to_string(key).unwrap_or_default();
            convert_service(name, definition, &mut diagnostics)
        })
        .collect::<Vec<_>>();

    debug!(
        app = %app_name,
        services = converted.len(),
        skipped = diagnostics.len(),
        "Converted compose document"
    );

    Ok((
        ConvertedApp {
            name: app_name.to_string(),
            services: converted,
            restart_policy: RESTART_POLICY.to_string(),
        },
        diagnostics,
    ))
}

fn convert_service(
    name: String,
    definition: &Value,
    diagnostics: &mut Vec<Diagnostic>,
) -> ConvertedService {
    let mut skip = |field: &'static str, index: usize, reason: String| {
        diagnostics.push(Diagnostic {
            service: name.clone(),
            field,
            index,
            reason,
        });
    };

    let image = match definition.get("image") {
        Some(Value::String(image)) => split_image(image),
        None | Some(Value::Null) => split_image(""),
        Some(_) => {
            skip("image", 0, "image is not a string".to_string());
            split_image("")
        }
    };

    let mut port_forwards = Vec::new();
    for (index, entry) in sequence(definition, "ports").iter().enumerate() {
        match parse_port(entry) {
            Ok(port) => port_forwards.push(port),
            Err(reason) => skip("ports", index, reason),
        }
    }

    let mut storage = IndexMap::new();
    for (index, entry) in sequence(definition, "volumes").iter().enumerate() {
        match parse_volume(entry) {
            Ok(volume) => {
                storage.insert(format!("volume_{index}"), volume);
            }
            Err(reason) => skip("volumes", index, reason),
        }
    }

    let mut environment = Map::new();
    match definition.get("environment") {
        Some(Value::Sequence(entries)) => {
            for (index, entry) in entries.iter().enumerate() {
                match parse_env_entry(entry) {
                    Ok((key, value)) => {
                        environment.insert(key, serde_json::Value::String(value));
                    }
                    Err(reason) => skip("environment", index, reason),
                }
            }
        }
        Some(Value::Mapping(vars)) => {
            for (index, (key, value)) in vars.iter().enumerate() {
                let Some(key) = key_to_string(key) else {
                    skip("environment", index, "key is not a scalar".to_string());
                    continue;
                };
                match serde_json::to_value(value) {
                    Ok(value) => {
                        environment.insert(key, value);
                    }
                    Err(e) => skip("environment", index, format!("unrepresentable value: {e}")),
                }
            }
        }
        None | Some(Value::Null) => {}
        Some(_) => skip(
            "environment",
            0,
            "environment must be a list or a mapping".to_string(),
        ),
    }

    ConvertedService {
        name,
        image,
        network: NetworkConfig {
            kind: "bridge".to_string(),
            port_forwards,
        },
        storage,
        environment,
    }
}

fn sequence<'a>(definition: &'a Value, field: &str) -> &'a [Value] {
    definition
        .get(field)
        .and_then(Value::as_sequence)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// Repository is everything before the first `:`, tag everything after the last.
pub fn split_image(image: &str) -> ImageRef {
    match (image.split_once(':'), image.rsplit_once(':')) {
        (Some((repository, _)), Some((_, tag))) => ImageRef {
            repository: repository.to_string(),
            tag: tag.to_string(),
        },
        _ => ImageRef {
            repository: image.to_string(),
            tag: DEFAULT_TAG.to_string(),
        },
    }
}

/// Parse one `ports` entry: an integer, or `"HOST:CONTAINER[/proto]"`.
pub fn parse_port(entry: &Value) -> Result<PortForward, String> {
    match entry {
        Value::Number(n) => {
            let port = n
                .as_u64()
                .and_then(|p| u16::try_from(p).ok())
                .ok_or_else(|| format!("port {n} is out of range"))?;
            Ok(PortForward {
                host_port: port,
                container_port: port,
                protocol: Protocol::Tcp,
            })
        }
        Value::String(text) => {
            let (spec, protocol) = match text.rsplit_once('/') {
                Some((rest, "tcp")) if !rest.is_empty() => (rest, Protocol::Tcp),
                Some((rest, "udp")) if !rest.is_empty() => (rest, Protocol::Udp),
                _ => (text.as_str(), Protocol::Tcp),
            };

            let mut parts = spec.split(':');
            let (Some(host), Some(container)) = (parts.next(), parts.next()) else {
                return Err(format!("port '{text}' has no HOST:CONTAINER separator"));
            };

            let parse = |part: &str| {
                part.trim()
                    .parse::<u16>()
                    .map_err(|_| format!("port '{text}' has invalid number '{part}'"))
            };

            Ok(PortForward {
                host_port: parse(host)?,
                container_port: parse(container)?,
                protocol,
            })
        }
        _ => Err("port entry is neither a number nor a string".to_string()),
    }
}

/// Parse one `volumes` entry in short `HOST:CONTAINER[:ro]` form.
pub fn parse_volume(entry: &Value) -> Result<StorageEntry, String> {
    let text = entry
        .as_str()
        .ok_or_else(|| "volume entry is not a string".to_string())?;

    let mut parts = text.split(':');
    let (Some(host), Some(container)) = (parts.next(), parts.next()) else {
        return Err(format!("volume '{text}' has no HOST:CONTAINER separator"));
    };

    let normalized = paths::normalize(host);
    if normalized.starts_with(HOST_PATH_PREFIX) {
        Ok(StorageEntry::HostPath {
            host_path: normalized,
            mount_path: container.to_string(),
            read_only: text.contains(":ro"),
        })
    } else {
        Ok(StorageEntry::IxVolume {
            ix_volume_config: IxVolumeConfig {
                dataset_name: dataset_name(host),
                acl_enable: false,
            },
            mount_path: container.to_string(),
        })
    }
}

/// Dataset name for a named volume: no leading `/` or `_`, no `/` at all.
pub fn dataset_name(host: &str) -> String {
    host.trim_start_matches(|c| c == '/' || c == '_')
        .trim_end_matches('/')
        .replace('/', "_")
}

fn parse_env_entry(entry: &Value) -> Result<(String, String), String> {
    let text = entry
        .as_str()
        .ok_or_else(|| "environment entry is not a string".to_string())?;
    text.split_once('=')
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .ok_or_else(|| format!("environment entry '{text}' has no '='"))
}
