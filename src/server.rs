//! # Model Context Protocol Server
//!
//! Line delimited JSON-RPC 2.0 over a reader/writer pair (stdin/stdout in production).
//! Supported methods:
//! - `initialize`, `ping`
//! - `tools/list`, `tools/call`
//! - any `notifications/*` message, acknowledged silently
//!
//! Tool calls are queued to a fixed pool of scoped worker threads, at most `workers`
//! calls are in flight and the reader blocks once the queue is full. Responses are
//! written whole, one per line, in completion order.

use std::io::{BufRead, Write};
use std::sync::{mpsc, Mutex};
use std::thread;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};

use crate::common::GatewayResult;
use crate::registry::ToolRegistry;
use crate::tool_error::{ToolError, INVALID_PARAMS, INVALID_REQUEST, PARSE_ERROR};

pub const PROTOCOL_VERSION: &str = "2024-11-05";
pub const SERVER_NAME: &str = "mcpki";
pub const JSONRPC_VERSION: &str = "2.0";
pub const DEFAULT_WORKERS: usize = 8;

#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcRequest {
    #[serde(default)]
    pub jsonrpc: Option<String>,
    /// `None` only when the key is absent, an explicit `null` is a request id.
    #[serde(default, deserialize_with = "present_id")]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

fn present_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: &'static str,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ToolError>,
}

impl JsonRpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: Value, error: ToolError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            result: None,
            error: Some(error),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CallParams {
    name: Option<String>,
    #[serde(default)]
    arguments: Value,
}

#[derive(Debug)]
pub struct McpServer {
    registry: ToolRegistry,
    workers: usize,
}

impl McpServer {
    pub fn new(registry: ToolRegistry) -> Self {
        Self::with_workers(registry, DEFAULT_WORKERS)
    }

    /// Server running at most `workers` tool calls at once (at least one).
    pub fn with_workers(registry: ToolRegistry, workers: usize) -> Self {
        Self {
            registry,
            workers: workers.max(1),
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Parses one input line, `Err` carries the ready-made parse error response.
    pub fn parse_line(line: &str) -> Result<JsonRpcRequest, JsonRpcResponse> {
        let value: Value = serde_json::from_str(line).map_err(|e| {
            JsonRpcResponse::failure(Value::Null, ToolError::new(PARSE_ERROR, "Parse error", Value::String(e.to_string())))
        })?;
        let id = value.get("id").cloned().unwrap_or(Value::Null);
        serde_json::from_value(value).map_err(|e| {
            JsonRpcResponse::failure(id, ToolError::new(INVALID_REQUEST, "Invalid request", Value::String(e.to_string())))
        })
    }

    /// Handles one request, notifications produce no response.
    pub fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        let Some(id) = request.id else {
            log::debug!("Notification {}", request.method);
            return None;
        };
        if request.jsonrpc.as_deref() != Some(JSONRPC_VERSION) {
            return Some(JsonRpcResponse::failure(
                id,
                ToolError::new(INVALID_REQUEST, "Invalid request", Value::String("jsonrpc must be \"2.0\"".into())),
            ));
        }
        let response = match request.method.as_str() {
            "initialize" => JsonRpcResponse::success(id, self.initialize_result()),
            "ping" => JsonRpcResponse::success(id, json!({})),
            "tools/list" => JsonRpcResponse::success(id, json!({ "tools": self.registry.descriptors() })),
            "tools/call" => match self.call_tool(request.params) {
                Ok(result) => JsonRpcResponse::success(id, result),
                Err(error) => JsonRpcResponse::failure(id, error),
            },
            method => JsonRpcResponse::failure(id, ToolError::method_not_found(method)),
        };
        Some(response)
    }

    pub fn handle_line(&self, line: &str) -> Option<JsonRpcResponse> {
        match Self::parse_line(line) {
            Ok(request) => self.handle_request(request),
            Err(response) => Some(response),
        }
    }

    fn initialize_result(&self) -> Value {
        json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": { "tools": { "listChanged": false } },
            "serverInfo": { "name": SERVER_NAME, "version": env!("CARGO_PKG_VERSION") },
        })
    }

    fn call_tool(&self, params: Value) -> Result<Value, ToolError> {
        let params: CallParams = serde_json::from_value(params)
            .map_err(|e| ToolError::new(INVALID_PARAMS, "Invalid tool call", Value::String(e.to_string())))?;
        let name = params
            .name
            .ok_or_else(|| ToolError::new(INVALID_PARAMS, "Missing tool name", Value::Null))?;
        let text = self.registry.call(&name, &params.arguments)?;
        Ok(json!({
            "content": [{ "type": "text", "text": text }],
            "isError": false,
        }))
    }

    /// Serves requests until the reader is exhausted
    ///
    /// Returns once every in-flight tool call has written its response.
    pub fn serve<R: BufRead, W: Write + Send>(&self, reader: R, writer: &mut W) -> GatewayResult<()> {
        let output = Mutex::new(writer);
        let (queue, pending) = mpsc::sync_channel::<JsonRpcRequest>(self.workers);
        let pending = Mutex::new(pending);
        thread::scope(|scope| {
            for _ in 0..self.workers {
                let (output, pending) = (&output, &pending);
                scope.spawn(move || loop {
                    let next = pending.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).recv();
                    let Ok(request) = next else {
                        break;
                    };
                    if let Some(response) = self.handle_request(request) {
                        write_response(output, &response);
                    }
                });
            }
            let result = self.read_requests(reader, &output, &queue);
            drop(queue);
            log::info!("Input closed, waiting for pending tool calls.");
            result
        })
    }

    fn read_requests<R: BufRead, W: Write>(
        &self,
        reader: R,
        output: &Mutex<&mut W>,
        queue: &mpsc::SyncSender<JsonRpcRequest>,
    ) -> GatewayResult<()> {
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let request = match Self::parse_line(&line) {
                Ok(request) => request,
                Err(response) => {
                    write_response(output, &response);
                    continue;
                }
            };
            if request.method != "tools/call" {
                if let Some(response) = self.handle_request(request) {
                    write_response(output, &response);
                }
            } else if let Err(mpsc::SendError(request)) = queue.send(request) {
                log::error!("Tool workers are gone, dropping request {:?}", request.id);
            }
        }
        Ok(())
    }
}

fn write_response<W: Write>(output: &Mutex<&mut W>, response: &JsonRpcResponse) {
    let line = match serde_json::to_string(response) {
        Ok(line) => line,
        Err(e) => {
            log::error!("Could not serialize response: {:?}", e);
            return;
        }
    };
    let mut writer = output.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    if let Err(e) = writeln!(writer, "{}", line).and_then(|_| writer.flush()) {
        log::error!("Could not write response: {:?}", e);
    }
}
