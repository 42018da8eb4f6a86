//! MCP stdio server implementing JSON-RPC 2.0 over stdin/stdout.
//!
//! Protocol: newline-delimited JSON-RPC 2.0 on stdin/stdout.
//! Logging goes to stderr (stdout is reserved for protocol messages).
//!
//! The backend is created on the first `tools/call`, not at startup, so
//! `initialize` and `tools/list` work without a reachable NAS. A failed
//! initialization is reported on that call and retried on the next one.

use anyhow::{Context, Result};
use futures::future::BoxFuture;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::OnceCell;
use tracing::{debug, error, info, warn};

use crate::backend::client::TrueNasClient;
use crate::backend::mock::MockBackend;
use crate::backend::NasBackend;
use crate::config::{ServerConfig, TrueNasConfig};
use crate::executor::{Executor, ToolOutput};
use crate::registry::Registry;

pub const PROTOCOL_VERSION: &str = "2024-11-05";
pub const SERVER_NAME: &str = "nas-mcp";

const PARSE_ERROR: i64 = -32700;
const METHOD_NOT_FOUND: i64 = -32601;
const INVALID_PARAMS: i64 = -32602;

type BackendFactory =
    Box<dyn Fn() -> BoxFuture<'static, Result<Arc<dyn NasBackend>>> + Send + Sync>;

async fn connect_mock(latency: Duration) -> Result<Arc<dyn NasBackend>> {
    info!("Using mock TrueNAS backend");
    let backend = MockBackend::with_latency(latency);
    backend.connect().await?;
    Ok(Arc::new(backend))
}

async fn connect_live(truenas: TrueNasConfig) -> Result<Arc<dyn NasBackend>> {
    info!("Connecting to TrueNAS at {}", truenas.url());
    let client = TrueNasClient::from_config(&truenas)?;
    client
        .connect()
        .await
        .context("Failed to connect to TrueNAS")?;
    Ok(Arc::new(client))
}

/// MCP stdio server exposing the NAS tool catalog.
pub struct StdioServer {
    registry: Registry,
    executor: Executor,
    backend: OnceCell<Arc<dyn NasBackend>>,
    factory: BackendFactory,
}

impl StdioServer {
    /// `factory` builds and connects the backend on first use.
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn() -> BoxFuture<'static, Result<Arc<dyn NasBackend>>> + Send + Sync + 'static,
    {
        Self {
            registry: Registry::builtin(),
            executor: Executor::new(),
            backend: OnceCell::new(),
            factory: Box::new(factory),
        }
    }

    /// Server whose backend is the one selected by `config.mock_truenas`.
    pub fn from_config(config: &ServerConfig) -> Self {
        if config.mock_truenas {
            let latency = Duration::from_millis(config.mock.latency_ms);
            Self::new(move || Box::pin(connect_mock(latency)))
        } else {
            let truenas = config.truenas.clone();
            Self::new(move || Box::pin(connect_live(truenas.clone())))
        }
    }

    /// Serve stdin/stdout until stdin closes.
    pub async fn run(&self) -> Result<()> {
        self.serve(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
            .await
    }

    /// Serve one newline-delimited JSON-RPC stream.
    pub async fn serve<R, W>(&self, reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = reader.lines();
        info!("stdio server started");

        while let Some(line) = lines.next_line().await.context("Failed to read request")? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            if let Some(response) = self.handle_message(line).await {
                let mut bytes = response.to_string().into_bytes();
                bytes.push(b'\n');
                writer.write_all(&bytes).await?;
                writer.flush().await?;
            }
        }

        if let Some(backend) = self.backend.get() {
            backend.disconnect().await;
        }
        info!("stdio server stopped");
        Ok(())
    }

    /// Handle one raw message. Notifications return `None`.
    pub async fn handle_message(&self, line: &str) -> Option<Value> {
        let request: Value = match serde_json::from_str(line) {
            Ok(v) => v,
            Err(e) => {
                warn!("Unparseable request: {e}");
                return Some(error_response(
                    Value::Null,
                    PARSE_ERROR,
                    &format!("Parse error: {e}"),
                ));
            }
        };

        let method = request.get("method").and_then(Value::as_str).unwrap_or("");
        let Some(id) = request.get("id").cloned() else {
            debug!(method = %method, "Notification received");
            return None;
        };
        let params = request.get("params").cloned().unwrap_or_else(|| json!({}));

        Some(match method {
            "initialize" => success_response(id, self.initialize_result()),
            "ping" => success_response(id, json!({})),
            "tools/list" => success_response(id, self.tools_list_result()),
            "tools/call" => self.handle_tools_call(id, &params).await,
            _ => error_response(id, METHOD_NOT_FOUND, &format!("Method not found: {method}")),
        })
    }

    fn initialize_result(&self) -> Value {
        json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {
                "tools": {}
            },
            "serverInfo": {
                "name": SERVER_NAME,
                "version": env!("CARGO_PKG_VERSION")
            }
        })
    }

    fn tools_list_result(&self) -> Value {
        let tools: Vec<Value> = self
            .registry
            .list_tools("")
            .into_iter()
            .map(|t| {
                json!({
                    "name": t.name,
                    "description": t.description,
                    "inputSchema": t.input_schema,
                })
            })
            .collect();
        json!({ "tools": tools })
    }

    async fn handle_tools_call(&self, id: Value, params: &Value) -> Value {
        let Some(tool_name) = params.get("name").and_then(Value::as_str) else {
            return error_response(id, INVALID_PARAMS, "Invalid params: missing tool name");
        };
        let arguments = params.get("arguments").cloned().unwrap_or(Value::Null);

        let output = match self.executor.preflight(&self.registry, tool_name, arguments) {
            Err(output) => output,
            Ok(arguments) => match self.backend().await {
                Ok(backend) => {
                    self.executor
                        .dispatch(backend.as_ref(), tool_name, arguments)
                        .await
                }
                Err(e) => {
                    error!("Backend initialization failed: {e:#}");
                    ToolOutput::failure(format!("❌ Error executing {tool_name}: {e:#}"))
                }
            },
        };

        success_response(
            id,
            json!({
                "content": [{ "type": "text", "text": output.text }],
                "isError": output.is_error
            }),
        )
    }

    /// Get or create the backend
    async fn backend(&self) -> Result<&Arc<dyn NasBackend>> {
        self.backend.get_or_try_init(|| (self.factory)()).await
    }
}

fn success_response(id: Value, result: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": result
    })
}

fn error_response(id: Value, code: i64, message: &str) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": {
            "code": code,
            "message": message
        }
    })
}
