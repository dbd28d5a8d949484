//! brandmark MCP (Model Context Protocol) server
//!
//! Standalone server binary that exposes logo validation and background
//! analysis over line-delimited JSON-RPC on stdio, so a UI or an assistant
//! can screen uploads and pick card backgrounds without linking the library.

use brandmark::{adaptive_outline_for_str, analyze_files, validate_file, PipelineConfig, QualityThresholds};
use serde_json::{json, Value};
use std::io::{self, BufRead, Write};
use std::path::Path;

/// MCP Request structure
#[derive(Debug, serde::Deserialize)]
struct McpRequest {
    #[serde(default)]
    #[allow(dead_code)]
    jsonrpc: String,
    #[serde(flatten)]
    kind: RequestKind,
}

#[derive(Debug, serde::Deserialize)]
#[serde(tag = "method")]
enum RequestKind {
    #[serde(rename = "initialize")]
    Initialize {
        id: Value,
        #[serde(default)]
        params: Value,
    },
    #[serde(rename = "tools/list")]
    ToolsList { id: Value },
    #[serde(rename = "tools/call")]
    ToolsCall { id: Value, params: ToolCallParams },
}

#[derive(Debug, serde::Deserialize)]
struct ToolCallParams {
    name: String,
    #[serde(default)]
    arguments: Value,
}

/// MCP Response structure
#[derive(Debug, serde::Serialize)]
struct McpResponse {
    jsonrpc: String,
    id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<McpError>,
}

#[derive(Debug, serde::Serialize)]
struct McpError {
    code: i32,
    message: String,
}

impl McpResponse {
    fn ok(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    fn err(id: Value, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(McpError {
                code,
                message: message.into(),
            }),
        }
    }

    /// Tool output as a single JSON text block.
    fn text(id: Value, payload: &impl serde::Serialize) -> Self {
        match serde_json::to_string_pretty(payload) {
            Ok(text) => Self::ok(id, json!({ "content": [{ "type": "text", "text": text }] })),
            Err(e) => Self::err(id, -32603, format!("Failed to encode result: {}", e)),
        }
    }
}

struct BrandmarkMcpServer {
    config: PipelineConfig,
}

impl BrandmarkMcpServer {
    fn handle_initialize(&self, _params: Value, id: Value) -> McpResponse {
        McpResponse::ok(
            id,
            json!({
                "protocolVersion": "2024-11-05",
                "serverInfo": {
                    "name": "brandmark",
                    "version": env!("CARGO_PKG_VERSION")
                },
                "capabilities": {
                    "tools": {
                        "listChanged": false
                    }
                }
            }),
        )
    }

    fn handle_tools_list(&self, id: Value) -> McpResponse {
        McpResponse::ok(
            id,
            json!({
                "tools": [
                    {
                        "name": "validate_logo",
                        "description": "Score an image file as a brand logo. Checks format, file size, dimensions, distinct-color count and edge density, and returns validity, a 0-100 score, a confidence band, errors, warnings and the raw measurements.",
                        "inputSchema": {
                            "type": "object",
                            "properties": {
                                "input_path": {
                                    "type": "string",
                                    "description": "Path to a PNG or JPEG file"
                                }
                            },
                            "required": ["input_path"]
                        }
                    },
                    {
                        "name": "analyze_background",
                        "description": "Extract the palette of an original logo upload and choose a legible card background for its background-removed version. Returns the palette, logo brightness, detected original background, offered colors, the default background and its outline.",
                        "inputSchema": {
                            "type": "object",
                            "properties": {
                                "original_path": {
                                    "type": "string",
                                    "description": "Path to the original upload"
                                },
                                "processed_path": {
                                    "type": "string",
                                    "description": "Path to the background-removed image (defaults to the original)"
                                }
                            },
                            "required": ["original_path"]
                        }
                    },
                    {
                        "name": "outline_for",
                        "description": "Outline color and opacity that stays visible on a card background.",
                        "inputSchema": {
                            "type": "object",
                            "properties": {
                                "color": {
                                    "type": "string",
                                    "description": "Background color as #RRGGBB or rgb(r, g, b)"
                                }
                            },
                            "required": ["color"]
                        }
                    }
                ]
            }),
        )
    }

    fn handle_tools_call(&self, params: ToolCallParams, id: Value) -> McpResponse {
        let args = match params.arguments {
            Value::Object(map) => map,
            _ => return McpResponse::err(id, -32602, "Invalid arguments: expected object"),
        };
        let arg = |name: &str| args.get(name).and_then(|v| v.as_str());

        match params.name.as_str() {
            "validate_logo" => {
                let Some(input) = arg("input_path") else {
                    return McpResponse::err(id, -32602, "Missing required parameter: input_path");
                };
                let thresholds = QualityThresholds {
                    analysis_max_side: self.config.analysis_max_side,
                    ..QualityThresholds::default()
                };
                match validate_file(Path::new(input), &thresholds) {
                    Ok(result) => McpResponse::text(id, &result),
                    Err(e) => McpResponse::err(id, -32000, format!("Validation failed: {}", e)),
                }
            }
            "analyze_background" => {
                let Some(original) = arg("original_path") else {
                    return McpResponse::err(id, -32602, "Missing required parameter: original_path");
                };
                let processed = arg("processed_path").map(Path::new);
                match analyze_files(Path::new(original), processed, &self.config) {
                    Ok(analysis) => McpResponse::text(id, &analysis),
                    Err(e) => McpResponse::err(id, -32000, format!("Analysis failed: {}", e)),
                }
            }
            "outline_for" => match arg("color") {
                Some(color) => McpResponse::text(id, &adaptive_outline_for_str(color)),
                None => McpResponse::err(id, -32602, "Missing required parameter: color"),
            },
            _ => McpResponse::err(id, -32601, format!("Unknown tool: {}", params.name)),
        }
    }

    fn handle_line(&self, line: &str) -> Option<McpResponse> {
        match serde_json::from_str::<McpRequest>(line) {
            Ok(req) => Some(match req.kind {
                RequestKind::Initialize { id, params } => self.handle_initialize(params, id),
                RequestKind::ToolsList { id } => self.handle_tools_list(id),
                RequestKind::ToolsCall { id, params } => self.handle_tools_call(params, id),
            }),
            Err(e) => {
                log::debug!("ignoring unsupported message: {}", e);
                None
            }
        }
    }

    fn run(&self) {
        let stdin = io::stdin();
        let stdout = io::stdout();
        let mut stdout_lock = stdout.lock();

        for line in stdin.lock().lines() {
            let Ok(json_str) = line else { break };
            if let Some(response) = self.handle_line(&json_str) {
                if let Ok(response_json) = serde_json::to_string(&response) {
                    writeln!(stdout_lock, "{}", response_json).ok();
                    stdout_lock.flush().ok();
                }
            }
        }
    }
}

fn main() {
    // Logs go to stderr; stdout carries the protocol.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let server = BrandmarkMcpServer {
        config: PipelineConfig::default(),
    };
    server.run();
}
