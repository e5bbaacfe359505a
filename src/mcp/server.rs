//! JSON-RPC server loop exposing the tool registry.
//!
//! Speaks line-delimited JSON-RPC 2.0 over any async reader/writer pair;
//! the binary wires it to stdin/stdout. Tool failures come back as
//! `is_error` results carrying the error kind, so the orchestrator can
//! branch on them; JSON-RPC protocol errors are reserved for malformed
//! requests and unknown methods.

use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::mcp::protocol::{
    CallToolParams, CallToolResult, InitializeResult, JsonRpcError, JsonRpcRequest,
    JsonRpcResponse, ListToolsResult, RequestId, ToolContent, ToolInfo,
};
use crate::tools::{ToolError, ToolRegistry};

/// MCP server over a shared, read-only tool registry.
pub struct McpServer {
    registry: Arc<ToolRegistry>,
}

impl McpServer {
    /// Create a server for the given registry.
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }

    /// Serve requests on stdin/stdout until EOF.
    pub async fn serve_stdio(self) -> std::io::Result<()> {
        let stdin = BufReader::new(tokio::io::stdin());
        let stdout = tokio::io::stdout();
        self.serve(stdin, stdout).await
    }

    /// Serve requests on an arbitrary transport until EOF.
    pub async fn serve<R, W>(self, reader: R, mut writer: W) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = reader.lines();

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }

            if let Some(response) = self.handle_line(&line).await {
                let encoded =
                    serde_json::to_string(&response).map_err(std::io::Error::other)?;
                writer.write_all(encoded.as_bytes()).await?;
                writer.write_all(b"\n").await?;
                writer.flush().await?;
            }
        }

        tracing::debug!("transport closed, shutting down");
        Ok(())
    }

    /// Handle one raw input line. Returns `None` for notifications.
    pub async fn handle_line(&self, line: &str) -> Option<JsonRpcResponse> {
        let request: JsonRpcRequest = match serde_json::from_str(line) {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!(error = %e, "unparseable request");
                return Some(JsonRpcResponse::failure(
                    RequestId::Null,
                    JsonRpcError::parse_error(e.to_string()),
                ));
            }
        };

        let Some(id) = request.id.clone() else {
            tracing::debug!(method = %request.method, "notification");
            return None;
        };

        Some(self.handle_request(id, request).await)
    }

    async fn handle_request(&self, id: RequestId, request: JsonRpcRequest) -> JsonRpcResponse {
        tracing::debug!(method = %request.method, "handling request");

        match request.method.as_str() {
            "initialize" => match serde_json::to_value(InitializeResult::default()) {
                Ok(result) => JsonRpcResponse::success(id, result),
                Err(e) => JsonRpcResponse::failure(id, JsonRpcError::parse_error(e.to_string())),
            },
            "ping" => JsonRpcResponse::success(id, serde_json::json!({})),
            "tools/list" => self.list_tools(id),
            "tools/call" => self.call_tool(id, request.params).await,
            other => JsonRpcResponse::failure(id, JsonRpcError::method_not_found(other)),
        }
    }

    fn list_tools(&self, id: RequestId) -> JsonRpcResponse {
        let tools: Vec<ToolInfo> = self
            .registry
            .schemas()
            .into_iter()
            .map(|schema| ToolInfo {
                name: schema.name,
                description: schema.description,
                input_schema: schema.parameters,
            })
            .collect();

        match serde_json::to_value(ListToolsResult { tools }) {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(e) => JsonRpcResponse::failure(id, JsonRpcError::parse_error(e.to_string())),
        }
    }

    async fn call_tool(&self, id: RequestId, params: Option<serde_json::Value>) -> JsonRpcResponse {
        let params: CallToolParams = match params.map(serde_json::from_value) {
            Some(Ok(params)) => params,
            Some(Err(e)) => {
                return JsonRpcResponse::failure(id, JsonRpcError::invalid_params(e.to_string()));
            }
            None => {
                return JsonRpcResponse::failure(
                    id,
                    JsonRpcError::invalid_params("missing params"),
                );
            }
        };

        let arguments = params
            .arguments
            .unwrap_or_else(|| serde_json::Value::Object(Default::default()));

        let call = match self.registry.invoke(&params.name, arguments).await {
            Ok(output) => CallToolResult {
                content: vec![ToolContent::Text {
                    text: serde_json::to_string_pretty(&output.result)
                        .unwrap_or_else(|_| output.result.to_string()),
                }],
                is_error: false,
            },
            Err(err) => failure_result(&err),
        };

        match serde_json::to_value(call) {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(e) => JsonRpcResponse::failure(id, JsonRpcError::parse_error(e.to_string())),
        }
    }
}

/// Encode a tool failure as a structured `is_error` result.
fn failure_result(err: &ToolError) -> CallToolResult {
    let body = serde_json::json!({
        "error": {
            "kind": err.kind(),
            "message": err.to_string(),
        }
    });

    CallToolResult {
        content: vec![ToolContent::Text {
            text: body.to_string(),
        }],
        is_error: true,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use super::*;
    use crate::retry::RetryPolicy;
    use crate::tools::test_support::EchoTool;

    fn test_server() -> McpServer {
        let mut registry = ToolRegistry::new(RetryPolicy::no_retry());
        registry.register(Arc::new(EchoTool)).unwrap();
        McpServer::new(Arc::new(registry))
    }

    async fn roundtrip(server: &McpServer, line: &str) -> Value {
        let response = server.handle_line(line).await.expect("expected a response");
        serde_json::to_value(&response).unwrap()
    }

    #[tokio::test]
    async fn test_initialize() {
        let server = test_server();
        let resp = roundtrip(
            &server,
            r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#,
        )
        .await;

        assert_eq!(resp["result"]["serverInfo"]["name"], "swarms-tools");
        assert!(resp["result"]["capabilities"]["tools"].is_object());
    }

    #[tokio::test]
    async fn test_notification_gets_no_response() {
        let server = test_server();
        let resp = server
            .handle_line(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
            .await;
        assert!(resp.is_none());
    }

    #[tokio::test]
    async fn test_tools_list_reflects_registry() {
        let server = test_server();
        let resp = roundtrip(&server, r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#).await;

        let tools = resp["result"]["tools"].as_array().unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0]["name"], "echo");
        assert!(tools[0]["inputSchema"]["properties"]["message"].is_object());
    }

    #[tokio::test]
    async fn test_tools_call_success() {
        let server = test_server();
        let resp = roundtrip(
            &server,
            r#"{"jsonrpc":"2.0","id":3,"method":"tools/call","params":{"name":"echo","arguments":{"message":"hi"}}}"#,
        )
        .await;

        assert_eq!(resp["result"]["isError"], false);
        let text = resp["result"]["content"][0]["text"].as_str().unwrap();
        assert!(text.contains("hi"));
    }

    #[tokio::test]
    async fn test_tools_call_unknown_tool_is_error_result() {
        let server = test_server();
        let resp = roundtrip(
            &server,
            r#"{"jsonrpc":"2.0","id":4,"method":"tools/call","params":{"name":"bogus","arguments":{}}}"#,
        )
        .await;

        assert_eq!(resp["result"]["isError"], true);
        let text = resp["result"]["content"][0]["text"].as_str().unwrap();
        let body: Value = serde_json::from_str(text).unwrap();
        assert_eq!(body["error"]["kind"], "unknown_tool");
    }

    #[tokio::test]
    async fn test_tools_call_schema_violation_names_field() {
        let server = test_server();
        let resp = roundtrip(
            &server,
            r#"{"jsonrpc":"2.0","id":5,"method":"tools/call","params":{"name":"echo","arguments":{}}}"#,
        )
        .await;

        assert_eq!(resp["result"]["isError"], true);
        let text = resp["result"]["content"][0]["text"].as_str().unwrap();
        let body: Value = serde_json::from_str(text).unwrap();
        assert_eq!(body["error"]["kind"], "schema_validation");
        assert!(
            body["error"]["message"]
                .as_str()
                .unwrap()
                .contains("message")
        );
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let server = test_server();
        let resp = roundtrip(&server, r#"{"jsonrpc":"2.0","id":6,"method":"bogus/method"}"#).await;
        assert_eq!(resp["error"]["code"], -32601);
    }

    #[tokio::test]
    async fn test_parse_error() {
        let server = test_server();
        let resp = roundtrip(&server, "this is not json").await;
        assert_eq!(resp["error"]["code"], -32700);
        assert_eq!(resp["id"], Value::Null);
    }

    #[tokio::test]
    async fn test_serve_over_in_memory_transport() {
        let server = test_server();

        let input = concat!(
            r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#,
            "\n",
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
            "\n",
            r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#,
            "\n",
        );

        let mut output: Vec<u8> = Vec::new();
        server
            .serve(input.as_bytes(), &mut output)
            .await
            .unwrap();

        let lines: Vec<&str> = std::str::from_utf8(&output)
            .unwrap()
            .lines()
            .collect();
        // Two requests, one notification: exactly two responses.
        assert_eq!(lines.len(), 2);

        let init: Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(init["id"], 1);
        let list: Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(list["result"]["tools"][0]["name"], "echo");
    }
}
