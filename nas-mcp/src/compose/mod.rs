//! Docker Compose handling: conversion to the Custom App format and linting.
//!
//! Both halves share the same document-level rules: the text is capped at
//! [`MAX_COMPOSE_SIZE`] bytes, must parse as YAML and must declare at least
//! one entry under `services`. Anything wrong *inside* a service is handled
//! leniently by the converter and reported by the validator.

pub mod convert;
pub mod validate;

use serde_yaml::{Mapping, Value};
use thiserror::Error;

pub use convert::{
    convert, convert_with_diagnostics, ConvertedApp, ConvertedService, Diagnostic, ImageRef,
    IxVolumeConfig, NetworkConfig, PortForward, Protocol, StorageEntry,
};
pub use validate::{validate, ValidationReport};

/// Max compose input size (100 KiB)
pub const MAX_COMPOSE_SIZE: usize = 100 * 1024;

/// Document-level compose failures. These abort the whole operation.
#[derive(Debug, Error)]
pub enum ComposeError {
    #[error("YAML input exceeds maximum size of {limit} bytes (got {size})")]
    TooLarge { size: usize, limit: usize },

    #[error("Invalid YAML: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("No services found in Docker Compose")]
    NoServices,
}

/// Parse a compose document and return its `services` mapping.
///
/// The size check runs before the parser ever sees the text. Merge keys
/// (`<<: *anchor`) are resolved before `services` is read.
pub fn load_services(compose_yaml: &str) -> Result<Mapping, ComposeError> {
    let size = compose_yaml.len();
    if size > MAX_COMPOSE_SIZE {
        return Err(ComposeError::TooLarge {
            size,
            limit: MAX_COMPOSE_SIZE,
        });
    }

    let mut document: Value = serde_yaml::from_str(compose_yaml)?;
    document.apply_merge()?;

    match document.get("services") {
        Some(Value::Mapping(services)) if !services.is_empty() => Ok(services.clone()),
        _ => Err(ComposeError::NoServices),
    }
}

/// Render a YAML scalar key as a plain string.
pub(crate) fn key_to_string(key: &Value) -> Option<String> {
    match key {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
