//! validate_compose, get_compose_config, update_compose_config

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;

use super::AppArgs;
use crate::backend::NasBackend;
use crate::compose::ValidationReport;

#[derive(Debug, Deserialize)]
struct ValidateArgs {
    compose_yaml: String,
    #[serde(default = "default_true")]
    check_security: bool,
}

#[derive(Debug, Deserialize)]
struct UpdateArgs {
    app_name: String,
    compose_yaml: String,
}

fn default_true() -> bool { true }

pub async fn validate(backend: &dyn NasBackend, input: Value) -> Result<String> {
    let args: ValidateArgs =
        serde_json::from_value(input).context("validate_compose: invalid arguments")?;

    let report = backend
        .validate_compose(&args.compose_yaml, args.check_security)
        .await;
    Ok(render_report(&report))
}

pub fn render_report(report: &ValidationReport) -> String {
    if report.valid && report.issues.is_empty() {
        return "✅ Docker Compose is valid and secure".to_string();
    }
    if report.valid {
        let warnings: Vec<String> = report.warnings().map(|i| format!("⚠️ {i}")).collect();
        return format!(
            "✅ Docker Compose is valid but has warnings:\n{}",
            warnings.join("\n")
        );
    }
    let issues: Vec<String> = report.issues.iter().map(|i| format!("❌ {i}")).collect();
    format!("❌ Docker Compose validation failed:\n{}", issues.join("\n"))
}

pub async fn get_config(backend: &dyn NasBackend, input: Value) -> Result<String> {
    let args: AppArgs =
        serde_json::from_value(input).context("get_compose_config: invalid arguments")?;

    let compose = backend.get_compose_config(&args.app_name).await?;
    let yaml = serde_yaml::to_string(&compose)
        .with_context(|| format!("cannot render compose config for '{}'", args.app_name))?;

    Ok(format!(
        "Docker Compose config for '{}':\n```yaml\n{}```",
        args.app_name, yaml
    ))
}

pub async fn update_config(backend: &dyn NasBackend, input: Value) -> Result<String> {
    let args: UpdateArgs =
        serde_json::from_value(input).context("update_compose_config: invalid arguments")?;

    Ok(
        if backend
            .update_compose_config(&args.app_name, &args.compose_yaml)
            .await?
        {
            format!("✅ Updated compose config for '{}'", args.app_name)
        } else {
            format!("❌ Failed to update compose config for '{}'", args.app_name)
        },
    )
}
