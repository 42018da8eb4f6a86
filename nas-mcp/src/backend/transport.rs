//! JSON-RPC 2.0 over WebSocket
//!
//! [`Connector`] opens a fresh [`RpcChannel`]; the client owns at most one
//! channel at a time and serializes calls through it. Server-pushed
//! notifications that arrive while a call is waiting for its reply are
//! buffered and handed out by [`RpcChannel::next_notification`].

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connection closed")]
    Closed,

    #[error("I/O error: {0}")]
    Io(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("request timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("{message}")]
    Remote {
        code: i64,
        message: String,
        errname: Option<String>,
    },
}

impl TransportError {
    /// Errors after which the channel is unusable and a reconnect may help.
    pub fn is_disconnect(&self) -> bool {
        matches!(
            self,
            TransportError::Closed | TransportError::Io(_) | TransportError::Protocol(_)
        )
    }

    /// Remote rejected the call because the session is not authenticated.
    pub fn is_not_authenticated(&self) -> bool {
        match self {
            TransportError::Remote {
                message, errname, ..
            } => {
                errname.as_deref() == Some("ENOTAUTHENTICATED")
                    || message.contains("ENOTAUTHENTICATED")
            }
            _ => false,
        }
    }

    /// Build from a JSON-RPC `error` object. TrueNAS puts the useful part in
    /// `data.reason` / `data.errname`.
    pub fn from_rpc_error(error: &Value) -> Self {
        let code = error.get("code").and_then(Value::as_i64).unwrap_or(0);
        let data = error.get("data");
        let message = data
            .and_then(|d| d.get("reason"))
            .and_then(Value::as_str)
            .or_else(|| error.get("message").and_then(Value::as_str))
            .unwrap_or("unknown error")
            .to_string();
        let errname = data
            .and_then(|d| d.get("errname"))
            .and_then(Value::as_str)
            .map(str::to_string);
        TransportError::Remote {
            code,
            message,
            errname,
        }
    }
}

impl From<tungstenite::Error> for TransportError {
    fn from(e: tungstenite::Error) -> Self {
        match e {
            tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed => {
                TransportError::Closed
            }
            tungstenite::Error::Io(e) => TransportError::Io(e.to_string()),
            other => TransportError::Protocol(other.to_string()),
        }
    }
}

/// A server-pushed JSON-RPC message without an id.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub method: String,
    pub params: Value,
}

#[async_trait]
pub trait RpcChannel: Send {
    /// Send one request and wait for its reply.
    async fn call(&mut self, method: &str, params: Value) -> Result<Value, TransportError>;

    /// Next buffered or incoming notification. `Ok(None)` when `wait` elapses.
    async fn next_notification(
        &mut self,
        wait: Duration,
    ) -> Result<Option<Notification>, TransportError>;

    async fn close(&mut self);
}

#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn RpcChannel>, TransportError>;
}

/// Opens WebSocket channels to the management API.
pub struct WsConnector {
    url: String,
    ssl_verify: bool,
    request_timeout: Duration,
}

impl WsConnector {
    pub fn new(url: impl Into<String>, ssl_verify: bool, request_timeout: Duration) -> Self {
        Self {
            url: url.into(),
            ssl_verify,
            request_timeout,
        }
    }
}

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self) -> Result<Box<dyn RpcChannel>, TransportError> {
        let tls = native_tls::TlsConnector::builder()
            .danger_accept_invalid_certs(!self.ssl_verify)
            .danger_accept_invalid_hostnames(!self.ssl_verify)
            .build()
            .map_err(|e| TransportError::Protocol(format!("TLS setup failed: {e}")))?;

        if !self.ssl_verify {
            warn!("TLS certificate verification is disabled");
        }

        let connect = tokio_tungstenite::connect_async_tls_with_config(
            self.url.as_str(),
            None,
            true,
            Some(tokio_tungstenite::Connector::NativeTls(tls)),
        );
        let (stream, _response) = tokio::time::timeout(self.request_timeout, connect)
            .await
            .map_err(|_| TransportError::Timeout(self.request_timeout))??;

        info!("WebSocket connected to {}", self.url);
        Ok(Box::new(WsChannel {
            stream,
            next_id: 1,
            pending: VecDeque::new(),
            request_timeout: self.request_timeout,
        }))
    }
}

pub struct WsChannel {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    next_id: u64,
    pending: VecDeque<Notification>,
    request_timeout: Duration,
}

enum Incoming {
    Reply { id: u64, outcome: Result<Value, TransportError> },
    Notification(Notification),
    Ignored,
}

impl WsChannel {
    /// Read the next frame before `deadline`. `Ok(None)` on timeout.
    async fn read_frame(&mut self, deadline: Instant) -> Result<Option<Incoming>, TransportError> {
        let frame = match tokio::time::timeout_at(deadline, self.stream.next()).await {
            Err(_) => return Ok(None),
            Ok(None) => return Err(TransportError::Closed),
            Ok(Some(frame)) => frame?,
        };

        let text = match frame {
            Message::Text(text) => text,
            Message::Close(_) => return Err(TransportError::Closed),
            _ => return Ok(Some(Incoming::Ignored)),
        };

        let value: Value = serde_json::from_str(&text)
            .map_err(|e| TransportError::Protocol(format!("invalid JSON from server: {e}")))?;
        Ok(Some(classify(value)))
    }
}

fn classify(value: Value) -> Incoming {
    if let Some(id) = value.get("id").and_then(Value::as_u64) {
        let outcome = match value.get("error") {
            Some(error) if !error.is_null() => Err(TransportError::from_rpc_error(error)),
            _ => Ok(value.get("result").cloned().unwrap_or(Value::Null)),
        };
        return Incoming::Reply { id, outcome };
    }
    match value.get("method").and_then(Value::as_str) {
        Some(method) => Incoming::Notification(Notification {
            method: method.to_string(),
            params: value.get("params").cloned().unwrap_or(Value::Null),
        }),
        None => Incoming::Ignored,
    }
}

#[async_trait]
impl RpcChannel for WsChannel {
    async fn call(&mut self, method: &str, params: Value) -> Result<Value, TransportError> {
        let id = self.next_id;
        self.next_id += 1;

        let request = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        self.stream.send(Message::text(request.to_string())).await?;

        let deadline = Instant::now() + self.request_timeout;
        loop {
            match self.read_frame(deadline).await? {
                None => return Err(TransportError::Timeout(self.request_timeout)),
                Some(Incoming::Reply { id: reply_id, outcome }) if reply_id == id => {
                    return outcome
                }
                Some(Incoming::Reply { id: stale, .. }) => {
                    debug!("Dropping reply for stale request {stale}");
                }
                Some(Incoming::Notification(n)) => self.pending.push_back(n),
                Some(Incoming::Ignored) => {}
            }
        }
    }

    async fn next_notification(
        &mut self,
        wait: Duration,
    ) -> Result<Option<Notification>, TransportError> {
        if let Some(n) = self.pending.pop_front() {
            return Ok(Some(n));
        }
        let deadline = Instant::now() + wait;
        loop {
            match self.read_frame(deadline).await? {
                None => return Ok(None),
                Some(Incoming::Notification(n)) => return Ok(Some(n)),
                Some(_) => {}
            }
        }
    }

    async fn close(&mut self) {
        if let Err(e) = self.stream.close(None).await {
            debug!("WebSocket close failed: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disconnect_classification() {
        assert!(TransportError::Closed.is_disconnect());
        assert!(TransportError::Io("broken pipe".into()).is_disconnect());
        assert!(TransportError::Protocol("bad frame".into()).is_disconnect());
        assert!(!TransportError::Timeout(Duration::from_secs(30)).is_disconnect());
        assert!(!TransportError::from_rpc_error(&json!({"code": -32001})).is_disconnect());
    }

    #[test]
    fn test_remote_error_uses_truenas_reason() {
        let err = TransportError::from_rpc_error(&json!({
            "code": -32001,
            "message": "Method call error",
            "data": {"error": 2, "errname": "ENOENT", "reason": "App 'x' does not exist"}
        }));
        assert_eq!(err.to_string(), "App 'x' does not exist");
        assert!(!err.is_not_authenticated());

        let err = TransportError::from_rpc_error(&json!({
            "code": -32001,
            "message": "Method call error",
            "data": {"errname": "ENOTAUTHENTICATED", "reason": "Not authenticated"}
        }));
        assert!(err.is_not_authenticated());

        let err = TransportError::from_rpc_error(&json!({"code": -32601, "message": "Method not found"}));
        assert_eq!(err.to_string(), "Method not found");
    }

    #[test]
    fn test_classify_frames() {
        match classify(json!({"jsonrpc": "2.0", "id": 3, "result": "pong"})) {
            Incoming::Reply { id, outcome } => {
                assert_eq!(id, 3);
                assert_eq!(outcome.unwrap(), json!("pong"));
            }
            _ => panic!("expected reply"),
        }

        match classify(json!({"jsonrpc": "2.0", "id": 4, "error": {"code": 1, "message": "boom"}})) {
            Incoming::Reply { outcome, .. } => assert!(outcome.is_err()),
            _ => panic!("expected reply"),
        }

        match classify(json!({"jsonrpc": "2.0", "method": "collection_update", "params": {"msg": "added"}})) {
            Incoming::Notification(n) => assert_eq!(n.method, "collection_update"),
            _ => panic!("expected notification"),
        }

        assert!(matches!(classify(json!({"jsonrpc": "2.0"})), Incoming::Ignored));
    }

    #[tokio::test]
    async fn test_connect_refused_is_disconnect() {
        // Port 1 on localhost is never listening in CI containers.
        let connector = WsConnector::new("ws://127.0.0.1:1/api/current", true, Duration::from_secs(5));
        let err = connector.connect().await.err().unwrap();
        assert!(err.is_disconnect() || matches!(err, TransportError::Timeout(_)));
    }
}
