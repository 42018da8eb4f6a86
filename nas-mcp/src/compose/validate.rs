//! Compose linting and security checks
//!
//! Issues starting with [`WARNING_PREFIX`] are advisory. Any other issue is an
//! error and makes the document invalid.

use serde::Serialize;
use serde_yaml::Value;

use super::{convert::parse_port, key_to_string, load_services, MAX_COMPOSE_SIZE};
use crate::paths;

pub const WARNING_PREFIX: &str = "Warning: ";

/// Host paths that must never be bind-mounted into a container.
const SYSTEM_PATHS: &[&str] = &[
    "/",
    "/etc",
    "/proc",
    "/sys",
    "/boot",
    "/root",
    "/dev",
    "/usr",
    "/bin",
    "/sbin",
    "/lib",
    "/var/run/docker.sock",
    "/run/docker.sock",
];

const FORBIDDEN_CAPS: &[&str] = &["ALL", "SYS_ADMIN"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub issues: Vec<String>,
}

impl ValidationReport {
    fn from_issues(issues: Vec<String>) -> Self {
        let mut report = Self {
            valid: false,
            issues,
        };
        let valid = report.errors().next().is_none();
        report.valid = valid;
        report
    }

    pub fn errors(&self) -> impl Iterator<Item = &str> {
        self.issues
            .iter()
            .map(String::as_str)
            .filter(|i| !i.starts_with(WARNING_PREFIX))
    }

    pub fn warnings(&self) -> impl Iterator<Item = &str> {
        self.issues
            .iter()
            .map(String::as_str)
            .filter(|i| i.starts_with(WARNING_PREFIX))
    }
}

/// Lint a compose document. Security rules only run with `check_security`.
pub fn validate(compose_yaml: &str, check_security: bool) -> ValidationReport {
    let services = match load_services(compose_yaml) {
        Ok(services) => services,
        Err(e) => return ValidationReport::from_issues(vec![e.to_string()]),
    };

    let mut issues = Vec::new();
    for (key, definition) in &services {
        let name = key_to_string(key).unwrap_or_else(|| "<unnamed>".to_string());
        if !definition.is_mapping() {
            issues.push(format!("Service '{name}' definition must be a mapping"));
            continue;
        }
        check_image(&name, definition, &mut issues);
        check_ports(&name, definition, &mut issues);
        check_volumes(&name, definition, check_security, &mut issues);
        if check_security {
            check_privileges(&name, definition, &mut issues);
        }
    }

    tracing::debug!(
        size = compose_yaml.len(),
        limit = MAX_COMPOSE_SIZE,
        issues = issues.len(),
        "Validated compose document"
    );
    ValidationReport::from_issues(issues)
}

fn check_image(name: &str, definition: &Value, issues: &mut Vec<String>) {
    match definition.get("image") {
        Some(Value::String(image)) => match image.rsplit_once(':') {
            None => issues.push(format!(
                "{WARNING_PREFIX}Service '{name}' image '{image}' has no tag, 'latest' will be used"
            )),
            Some((_, "latest")) => issues.push(format!(
                "{WARNING_PREFIX}Service '{name}' image '{image}' uses the 'latest' tag"
            )),
            Some(_) => {}
        },
        Some(_) => issues.push(format!("Service '{name}' image must be a string")),
        None if definition.get("build").is_some() => issues.push(format!(
            "{WARNING_PREFIX}Service '{name}' only has a build section, Custom Apps need a prebuilt image"
        )),
        None => issues.push(format!("Service '{name}' must specify an image")),
    }
}

fn check_ports(name: &str, definition: &Value, issues: &mut Vec<String>) {
    let Some(ports) = definition.get("ports").and_then(Value::as_sequence) else {
        return;
    };
    for (index, entry) in ports.iter().enumerate() {
        if let Err(reason) = parse_port(entry) {
            issues.push(format!(
                "{WARNING_PREFIX}Service '{name}' port entry {index} will be skipped: {reason}"
            ));
        }
    }
}

fn check_volumes(name: &str, definition: &Value, check_security: bool, issues: &mut Vec<String>) {
    let Some(volumes) = definition.get("volumes").and_then(Value::as_sequence) else {
        return;
    };
    for (index, entry) in volumes.iter().enumerate() {
        let host = match entry {
            Value::String(text) => text.split(':').next().unwrap_or_default(),
            other => {
                issues.push(format!(
                    "{WARNING_PREFIX}Service '{name}' volume entry {index} is not in HOST:CONTAINER form and will be skipped"
                ));
                // Long syntax still gets its bind source checked.
                match other.get("source").and_then(Value::as_str) {
                    Some(source) => source,
                    None => continue,
                }
            }
        };
        if check_security {
            check_bind_source(name, host, issues);
        }
    }
}

fn check_bind_source(name: &str, host: &str, issues: &mut Vec<String>) {
    if !host.starts_with('/') {
        return;
    }
    // Docker resolves `//etc` to `/etc`, so fold the POSIX double slash.
    let normalized = paths::normalize(&format!("/{}", host.trim_start_matches('/')));
    if SYSTEM_PATHS
        .iter()
        .any(|system| paths::is_within(&normalized, system))
    {
        issues.push(format!(
            "Service '{name}' bind mounts system path '{normalized}', which is not allowed"
        ));
    } else if !paths::is_within(&normalized, paths::MOUNT_ROOT) {
        issues.push(format!(
            "{WARNING_PREFIX}Service '{name}' bind mounts '{normalized}' outside {}/",
            paths::MOUNT_ROOT
        ));
    }
}

fn check_privileges(name: &str, definition: &Value, issues: &mut Vec<String>) {
    if definition.get("privileged").and_then(Value::as_bool) == Some(true) {
        issues.push(format!(
            "Service '{name}' runs privileged, privileged containers are not allowed"
        ));
    }

    if definition.get("pid").and_then(Value::as_str) == Some("host") {
        issues.push(format!(
            "Service '{name}' shares the host PID namespace (pid: host), which is not allowed"
        ));
    }

    if let Some(caps) = definition.get("cap_add").and_then(Value::as_sequence) {
        for cap in caps.iter().filter_map(Value::as_str) {
            let upper = cap.to_ascii_uppercase();
            let bare = upper.strip_prefix("CAP_").unwrap_or(&upper);
            if FORBIDDEN_CAPS.contains(&bare) {
                issues.push(format!(
                    "Service '{name}' adds capability {cap}, which is not allowed"
                ));
            }
        }
    }

    if definition.get("network_mode").and_then(Value::as_str) == Some("host") {
        issues.push(format!(
            "{WARNING_PREFIX}Service '{name}' uses host networking, port mappings are bypassed"
        ));
    }
}
