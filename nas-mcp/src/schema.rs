//! JSON Schema validation for tool arguments, plus the property fragments
//! shared across tool definitions

use anyhow::{anyhow, bail, Result};
use serde_json::{json, Value};

pub const APP_NAME_PATTERN: &str = "^[a-z0-9][a-z0-9-]*[a-z0-9]$";

/// Validate tool arguments against a tool's input schema
pub fn validate_input(input: &Value, schema: &Value) -> Result<()> {
    let validator =
        jsonschema::validator_for(schema).map_err(|e| anyhow!("Invalid JSON schema: {e}"))?;

    if let Err(error) = validator.validate(input) {
        bail!("{error}");
    }

    Ok(())
}

/// Closed object schema: unknown properties are rejected.
pub fn object(properties: Value, required: &[&str]) -> Value {
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
        "additionalProperties": false,
    })
}

pub fn app_name() -> Value {
    json!({
        "type": "string",
        "description": "Name of the Custom App",
        "pattern": APP_NAME_PATTERN,
        "minLength": 2,
        "maxLength": 50,
    })
}

pub fn compose_yaml() -> Value {
    json!({
        "type": "string",
        "description": "Docker Compose YAML content",
        "minLength": 10,
        "maxLength": 100000,
    })
}

pub fn confirm_deletion() -> Value {
    json!({
        "type": "boolean",
        "description": "Must be true to proceed with deletion",
    })
}

pub fn flag(description: &str, default: bool) -> Value {
    json!({
        "type": "boolean",
        "description": description,
        "default": default,
    })
}

pub fn text(description: &str) -> Value {
    json!({
        "type": "string",
        "description": description,
    })
}
