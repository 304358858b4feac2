//! MCP stdio server
//!
//! stdin 에서 한 줄씩 요청을 읽고, 하나의 writer task 가 stdout 으로 응답을
//! 직렬화합니다. `tools/call` 은 호출마다 별도 task 에서 실행되므로 느린
//! 쿼리가 다른 요청을 막지 않습니다.

use super::transport::{decode_request, JsonRpcError, JsonRpcRequest, JsonRpcResponse};
use super::types::{
    InitializeResult, McpToolCall, McpToolList, McpToolResult, ServerInfo, MCP_PROTOCOL_VERSION,
};
use crate::tool::ToolRegistry;
use o11y_foundation::{Error, Result, ServerSettings};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tokio_util::task::AbortOnDropHandle;
use tracing::{debug, error, info, warn};

/// Outbound response queue depth
const OUTBOUND_CAPACITY: usize = 64;

/// MCP 서버
pub struct McpServer {
    registry: Arc<ToolRegistry>,
    info: ServerInfo,
}

impl McpServer {
    pub fn new(registry: Arc<ToolRegistry>, settings: &ServerSettings) -> Self {
        Self {
            registry,
            info: ServerInfo {
                name: settings.name.clone(),
                version: settings.version.clone(),
            },
        }
    }

    /// Serve on the process's stdin / stdout
    pub async fn serve_stdio(&self, shutdown: CancellationToken) -> Result<()> {
        self.serve(tokio::io::stdin(), tokio::io::stdout(), shutdown).await
    }

    /// Serve until EOF on `reader` or until `shutdown` is cancelled
    ///
    /// On EOF in-flight tool calls are allowed to finish; on shutdown they are aborted.
    pub async fn serve<R, W>(&self, reader: R, writer: W, shutdown: CancellationToken) -> Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::channel::<JsonRpcResponse>(OUTBOUND_CAPACITY);
        let writer_task = tokio::spawn(write_loop(writer, rx));
        let mut lines = BufReader::new(reader).lines();
        let mut in_flight: JoinSet<()> = JoinSet::new();

        info!(
            "MCP server '{}' ready ({} tools)",
            self.info.name,
            self.registry.len()
        );

        loop {
            let next = tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Shutdown requested, aborting {} in-flight calls", in_flight.len());
                    in_flight.abort_all();
                    break;
                }
                next = lines.next_line() => next,
            };

            match next {
                Ok(Some(line)) => {
                    let line = line.trim();
                    if !line.is_empty() {
                        self.dispatch(line, &tx, &mut in_flight).await;
                    }
                }
                Ok(None) => {
                    info!("stdin closed");
                    break;
                }
                Err(e) => {
                    error!("Failed to read request: {}", e);
                    break;
                }
            }

            while let Some(result) = in_flight.try_join_next() {
                log_task_result(result);
            }
        }

        while let Some(result) = in_flight.join_next().await {
            log_task_result(result);
        }

        drop(tx);
        writer_task
            .await
            .map_err(|e| Error::Internal(format!("writer task failed: {}", e)))?
    }

    async fn dispatch(
        &self,
        line: &str,
        tx: &mpsc::Sender<JsonRpcResponse>,
        in_flight: &mut JoinSet<()>,
    ) {
        let request = match decode_request(line) {
            Ok(request) => request,
            Err(response) => {
                warn!("Rejected malformed request");
                send(tx, response).await;
                return;
            }
        };

        if request.is_notification() {
            self.handle_notification(&request);
            return;
        }

        let id = request.id.clone().unwrap_or(Value::Null);
        debug!("<- {} (id {})", request.method, id);

        if request.method == "tools/call" {
            let registry = Arc::clone(&self.registry);
            let tx = tx.clone();
            in_flight.spawn(async move {
                let response = run_tool_call(registry, id, request.params).await;
                send(&tx, response).await;
            });
            return;
        }

        let response = self.handle_request(id, &request);
        send(tx, response).await;
    }

    fn handle_notification(&self, request: &JsonRpcRequest) {
        match request.method.as_str() {
            "notifications/initialized" => info!("Client initialized"),
            other => debug!("Ignoring notification {}", other),
        }
    }

    fn handle_request(&self, id: Value, request: &JsonRpcRequest) -> JsonRpcResponse {
        match request.method.as_str() {
            "initialize" => {
                let result = InitializeResult {
                    protocol_version: MCP_PROTOCOL_VERSION.to_string(),
                    capabilities: json!({ "tools": {} }),
                    server_info: self.info.clone(),
                };
                to_response(id, &result)
            }
            "ping" => JsonRpcResponse::success(id, json!({})),
            "tools/list" => {
                let list = McpToolList {
                    tools: self.registry.definitions(),
                };
                to_response(id, &list)
            }
            other => JsonRpcResponse::failure(id, JsonRpcError::method_not_found(other)),
        }
    }
}

/// Run a `tools/call` in its own task so a panicking tool still gets an answer.
/// Aborting the caller aborts the inner task too.
async fn run_tool_call(
    registry: Arc<ToolRegistry>,
    id: Value,
    params: Option<Value>,
) -> JsonRpcResponse {
    let call_id = id.clone();
    let task = AbortOnDropHandle::new(tokio::spawn(async move {
        call_tool(&registry, call_id, params).await
    }));

    match task.await {
        Ok(response) => response,
        Err(e) => {
            error!("tools/call {} panicked: {}", id, e);
            JsonRpcResponse::failure(id, JsonRpcError::internal_error("tool execution failed"))
        }
    }
}

/// Run one `tools/call`. Tool failures come back as `isError` results;
/// only malformed params and unknown tools are protocol errors.
async fn call_tool(registry: &ToolRegistry, id: Value, params: Option<Value>) -> JsonRpcResponse {
    let call: McpToolCall = match params.map(serde_json::from_value) {
        Some(Ok(call)) => call,
        _ => {
            return JsonRpcResponse::failure(
                id,
                JsonRpcError::invalid_params("tools/call requires a tool name"),
            )
        }
    };

    let Some(tool) = registry.get(&call.name) else {
        return JsonRpcResponse::failure(
            id,
            JsonRpcError::invalid_params(format!("Unknown tool: {}", call.name)),
        );
    };

    let output = tool.execute(call.arguments).await;
    debug!("tools/call {} done (error: {})", call.name, output.is_error);
    to_response(id, &McpToolResult::from(output))
}

fn to_response<T: Serialize>(id: Value, result: &T) -> JsonRpcResponse {
    match serde_json::to_value(result) {
        Ok(value) => JsonRpcResponse::success(id, value),
        Err(e) => JsonRpcResponse::failure(id, JsonRpcError::internal_error(e.to_string())),
    }
}

async fn send(tx: &mpsc::Sender<JsonRpcResponse>, response: JsonRpcResponse) {
    if tx.send(response).await.is_err() {
        warn!("Response dropped: writer closed");
    }
}

fn log_task_result(result: std::result::Result<(), tokio::task::JoinError>) {
    if let Err(e) = result {
        if !e.is_cancelled() {
            error!("Tool task failed: {}", e);
        }
    }
}

async fn write_loop<W>(mut writer: W, mut rx: mpsc::Receiver<JsonRpcResponse>) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(response) = rx.recv().await {
        let mut line = serde_json::to_string(&response)?;
        line.push('\n');
        writer.write_all(line.as_bytes()).await?;
        writer.flush().await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::{Tool, ToolOutput};
    use async_trait::async_trait;
    use tokio::io::{split, DuplexStream, Lines, ReadHalf, WriteHalf};
    use tokio::task::JoinHandle;

    struct UpperTool;

    #[async_trait]
    impl Tool for UpperTool {
        fn name(&self) -> &str {
            "upper"
        }

        fn description(&self) -> String {
            "Upper-case the text argument".to_string()
        }

        fn schema(&self) -> Value {
            json!({"type": "object", "properties": {"text": {"type": "string"}}})
        }

        async fn execute(&self, input: Value) -> ToolOutput {
            match input.get("text").and_then(Value::as_str) {
                Some(text) => ToolOutput::success(text.to_uppercase()),
                None => ToolOutput::error("text is required"),
            }
        }
    }

    struct PanicTool;

    #[async_trait]
    impl Tool for PanicTool {
        fn name(&self) -> &str {
            "panic"
        }

        fn description(&self) -> String {
            "Always panics".to_string()
        }

        fn schema(&self) -> Value {
            json!({"type": "object"})
        }

        async fn execute(&self, _input: Value) -> ToolOutput {
            panic!("tool blew up")
        }
    }

    struct Harness {
        writer: WriteHalf<DuplexStream>,
        lines: Lines<BufReader<ReadHalf<DuplexStream>>>,
        server: JoinHandle<Result<()>>,
    }

    impl Harness {
        fn start(shutdown: CancellationToken) -> Self {
            let mut registry = ToolRegistry::new();
            registry.register(Arc::new(UpperTool));
            registry.register(Arc::new(PanicTool));
            let server = McpServer::new(Arc::new(registry), &ServerSettings::default());

            let (client, server_io) = tokio::io::duplex(64 * 1024);
            let (server_read, server_write) = split(server_io);
            let server = tokio::spawn(async move {
                server.serve(server_read, server_write, shutdown).await
            });

            let (client_read, writer) = split(client);
            Self {
                writer,
                lines: BufReader::new(client_read).lines(),
                server,
            }
        }

        async fn send(&mut self, line: &str) {
            self.writer.write_all(line.as_bytes()).await.unwrap();
            self.writer.write_all(b"\n").await.unwrap();
        }

        async fn recv(&mut self) -> Value {
            let line = self.lines.next_line().await.unwrap().unwrap();
            serde_json::from_str(&line).unwrap()
        }
    }

    #[tokio::test]
    async fn test_initialize_and_list() {
        let mut h = Harness::start(CancellationToken::new());

        h.send(r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#).await;
        let init = h.recv().await;
        assert_eq!(init["id"], 1);
        assert_eq!(init["result"]["protocolVersion"], MCP_PROTOCOL_VERSION);
        assert_eq!(init["result"]["serverInfo"]["name"], "gcp-o11y-mcp");

        // notification gets no response; the next line answers the ping
        h.send(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#).await;
        h.send(r#"{"jsonrpc":"2.0","id":2,"method":"ping"}"#).await;
        assert_eq!(h.recv().await["id"], 2);

        h.send(r#"{"jsonrpc":"2.0","id":3,"method":"tools/list"}"#).await;
        let list = h.recv().await;
        assert_eq!(list["result"]["tools"][0]["name"], "panic");
        assert_eq!(list["result"]["tools"][1]["name"], "upper");
        assert!(list["result"]["tools"][1]["inputSchema"].is_object());

        h.writer.shutdown().await.unwrap();
        h.server.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_tools_call() {
        let mut h = Harness::start(CancellationToken::new());

        h.send(r#"{"jsonrpc":"2.0","id":"c1","method":"tools/call","params":{"name":"upper","arguments":{"text":"hi"}}}"#).await;
        let ok = h.recv().await;
        assert_eq!(ok["id"], "c1");
        assert_eq!(ok["result"]["content"][0]["text"], "HI");
        assert_eq!(ok["result"]["isError"], false);

        h.send(r#"{"jsonrpc":"2.0","id":"c2","method":"tools/call","params":{"name":"upper","arguments":{}}}"#).await;
        let failed = h.recv().await;
        assert_eq!(failed["result"]["isError"], true);

        h.send(r#"{"jsonrpc":"2.0","id":"c3","method":"tools/call","params":{"name":"nope"}}"#).await;
        let unknown = h.recv().await;
        assert_eq!(unknown["error"]["code"], JsonRpcError::INVALID_PARAMS);

        h.writer.shutdown().await.unwrap();
        h.server.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_panicking_tool_still_answers() {
        let mut h = Harness::start(CancellationToken::new());

        h.send(r#"{"jsonrpc":"2.0","id":7,"method":"tools/call","params":{"name":"panic","arguments":{}}}"#).await;
        let failed = h.recv().await;
        assert_eq!(failed["id"], 7);
        assert_eq!(failed["error"]["code"], JsonRpcError::INTERNAL_ERROR);

        // server keeps serving after the panic
        h.send(r#"{"jsonrpc":"2.0","id":8,"method":"ping"}"#).await;
        assert_eq!(h.recv().await["id"], 8);

        h.writer.shutdown().await.unwrap();
        h.server.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_protocol_errors() {
        let mut h = Harness::start(CancellationToken::new());

        h.send("{oops").await;
        let parse = h.recv().await;
        assert_eq!(parse["error"]["code"], JsonRpcError::PARSE_ERROR);
        assert_eq!(parse["id"], Value::Null);

        h.send(r#"{"jsonrpc":"2.0","id":9,"method":"resources/list"}"#).await;
        let missing = h.recv().await;
        assert_eq!(missing["error"]["code"], JsonRpcError::METHOD_NOT_FOUND);

        h.writer.shutdown().await.unwrap();
        h.server.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_token_stops_server() {
        let shutdown = CancellationToken::new();
        let h = Harness::start(shutdown.clone());

        shutdown.cancel();
        h.server.await.unwrap().unwrap();
    }
}
