//! Tool execution pipeline
//!
//! Pipeline: look up tool → validate arguments → confirmation guard → execute → log

use anyhow::Result;
use futures::future::BoxFuture;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

use crate::backend::NasBackend;
use crate::registry::Registry;
use crate::schema;

pub const DELETION_NOT_CONFIRMED: &str =
    "❌ Deletion not confirmed. Set confirm_deletion=true to proceed.";

/// Text result of one tool call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    pub text: String,
    pub is_error: bool,
}

impl ToolOutput {
    /// Handlers report refusals as `❌ ...` text; those count as errors too.
    pub fn from_text(text: String) -> Self {
        let is_error = text.starts_with('❌');
        Self { text, is_error }
    }

    pub fn failure(text: String) -> Self {
        Self {
            text,
            is_error: true,
        }
    }
}

/// A tool handler function
type ToolHandler =
    Box<dyn for<'a> Fn(&'a dyn NasBackend, Value) -> BoxFuture<'a, Result<String>> + Send + Sync>;

/// Executes tools through the pipeline
pub struct Executor {
    /// Map of tool name → handler function
    handlers: HashMap<String, ToolHandler>,
}

impl Executor {
    pub fn new() -> Self {
        let mut executor = Self {
            handlers: HashMap::new(),
        };
        executor.register_handlers();
        executor
    }

    fn insert<F>(&mut self, name: &str, handler: F)
    where
        F: for<'a> Fn(&'a dyn NasBackend, Value) -> BoxFuture<'a, Result<String>>
            + Send
            + Sync
            + 'static,
    {
        self.handlers.insert(name.to_string(), Box::new(handler));
    }

    /// Register all built-in tool handlers
    fn register_handlers(&mut self) {
        // System tools
        self.insert("test_connection", |b, input| {
            Box::pin(crate::system::connection::execute(b, input))
        });
        self.insert("get_system_info", |b, input| {
            Box::pin(crate::system::info::execute(b, input))
        });
        self.insert("get_storage_pools", |b, input| {
            Box::pin(crate::system::pools::execute(b, input))
        });
        self.insert("get_network_info", |b, input| {
            Box::pin(crate::system::network::execute(b, input))
        });

        // App tools
        self.insert("list_custom_apps", |b, input| {
            Box::pin(crate::app::list::execute(b, input))
        });
        self.insert("get_custom_app_status", |b, input| {
            Box::pin(crate::app::status::execute(b, input))
        });
        self.insert("get_custom_app_config", |b, input| {
            Box::pin(crate::app::config::execute(b, input))
        });
        self.insert("update_custom_app_config", |b, input| {
            Box::pin(crate::app::update_config::execute(b, input))
        });
        self.insert("start_custom_app", |b, input| {
            Box::pin(crate::app::lifecycle::start(b, input))
        });
        self.insert("stop_custom_app", |b, input| {
            Box::pin(crate::app::lifecycle::stop(b, input))
        });
        self.insert("deploy_custom_app", |b, input| {
            Box::pin(crate::app::deploy::execute(b, input))
        });
        self.insert("update_custom_app", |b, input| {
            Box::pin(crate::app::update::execute(b, input))
        });
        self.insert("delete_custom_app", |b, input| {
            Box::pin(crate::app::delete::execute(b, input))
        });
        self.insert("get_app_logs", |b, input| {
            Box::pin(crate::app::logs::execute(b, input))
        });

        // Compose tools
        self.insert("validate_compose", |b, input| {
            Box::pin(crate::app::compose::validate(b, input))
        });
        self.insert("get_compose_config", |b, input| {
            Box::pin(crate::app::compose::get_config(b, input))
        });
        self.insert("update_compose_config", |b, input| {
            Box::pin(crate::app::compose::update_config(b, input))
        });

        // Filesystem tools
        self.insert("list_directory", |b, input| {
            Box::pin(crate::fs::list::execute(b, input))
        });

        // ZFS tools
        self.insert("list_datasets", |b, input| {
            Box::pin(crate::zfs::datasets::execute(b, input))
        });
        self.insert("list_snapshots", |b, input| {
            Box::pin(crate::zfs::snapshots::list(b, input))
        });
        self.insert("create_snapshot", |b, input| {
            Box::pin(crate::zfs::snapshots::create(b, input))
        });
        self.insert("delete_snapshot", |b, input| {
            Box::pin(crate::zfs::snapshots::delete(b, input))
        });
    }

    /// Checks that need no backend: tool exists, arguments match the schema,
    /// destructive tools carry `confirm_deletion: true`.
    ///
    /// Returns the normalized arguments, or the failure to report.
    pub fn preflight(
        &self,
        registry: &Registry,
        tool_name: &str,
        arguments: Value,
    ) -> Result<Value, ToolOutput> {
        let Some(tool_def) = registry.get_tool(tool_name) else {
            warn!("Unknown tool requested: {tool_name}");
            return Err(ToolOutput::failure(format!("❌ Unknown tool: {tool_name}")));
        };
        if !self.handlers.contains_key(tool_name) {
            warn!("No handler registered for tool: {tool_name}");
            return Err(ToolOutput::failure(format!("❌ Unknown tool: {tool_name}")));
        }

        let arguments = match arguments {
            Value::Null => Value::Object(Map::new()),
            other => other,
        };

        if let Err(e) = schema::validate_input(&arguments, &tool_def.input_schema) {
            warn!(tool = %tool_name, "Rejected arguments: {e}");
            return Err(ToolOutput::failure(format!(
                "❌ Invalid arguments for {tool_name}: {e}"
            )));
        }

        if tool_def.requires_confirmation
            && arguments.get("confirm_deletion") != Some(&Value::Bool(true))
        {
            warn!(tool = %tool_name, "Destructive call without confirmation");
            return Err(ToolOutput::failure(DELETION_NOT_CONFIRMED.to_string()));
        }

        Ok(arguments)
    }

    /// Run a tool whose arguments already passed [`Executor::preflight`].
    pub async fn dispatch(
        &self,
        backend: &dyn NasBackend,
        tool_name: &str,
        arguments: Value,
    ) -> ToolOutput {
        let execution_id = Uuid::new_v4().to_string();
        let start = Instant::now();

        let Some(handler) = self.handlers.get(tool_name) else {
            return ToolOutput::failure(format!("❌ Unknown tool: {tool_name}"));
        };

        info!(execution_id = %execution_id, tool = %tool_name, "Executing tool");

        let output = match handler(backend, arguments).await {
            Ok(text) => ToolOutput::from_text(text),
            Err(e) => {
                warn!(execution_id = %execution_id, tool = %tool_name, "Tool execution failed: {e:#}");
                ToolOutput::failure(format!("❌ Error executing {tool_name}: {e:#}"))
            }
        };

        info!(
            execution_id = %execution_id,
            tool = %tool_name,
            success = !output.is_error,
            duration_ms = start.elapsed().as_millis() as u64,
            "Tool finished"
        );
        output
    }

    /// Preflight then dispatch.
    pub async fn execute(
        &self,
        registry: &Registry,
        backend: &dyn NasBackend,
        tool_name: &str,
        arguments: Value,
    ) -> ToolOutput {
        match self.preflight(registry, tool_name, arguments) {
            Ok(arguments) => self.dispatch(backend, tool_name, arguments).await,
            Err(output) => output,
        }
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}

impl Default for Executor {
    fn default() -> Self {
        Self::new()
    }
}
