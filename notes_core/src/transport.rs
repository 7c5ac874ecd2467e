use serde_json::Value;
use std::io;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, error, info};

use crate::mcp_server::JsonRpcHandler;
use crate::ConnectorError;

/// Newline-delimited JSON-RPC over stdio. Requests are handled one at a time
/// in arrival order.
pub struct StdioTransport {
    handler: JsonRpcHandler,
}

impl StdioTransport {
    pub fn new(handler: JsonRpcHandler) -> Self {
        Self { handler }
    }

    /// Run the stdio transport until stdin closes.
    pub async fn run(&self) -> io::Result<()> {
        info!("Starting stdio transport");
        let stdin = BufReader::new(tokio::io::stdin());
        let stdout = tokio::io::stdout();
        self.run_with(stdin, stdout).await
    }

    /// Serve requests from `reader`, writing responses to `writer`.
    pub async fn run_with<R, W>(&self, mut reader: R, mut writer: W) -> io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => {
                    debug!("EOF reached on input");
                    break;
                }
                Ok(_) => {
                    let response = match std::str::from_utf8(&buf) {
                        Ok(line) if line.trim().is_empty() => continue,
                        Ok(line) => self.process_line(line).await,
                        Err(e) => {
                            error!("Input line is not valid UTF-8: {}", e);
                            Some(parse_error(e.to_string()))
                        }
                    };
                    if let Some(response) = response {
                        write_response(&mut writer, &response).await?;
                    }
                }
                Err(e) => {
                    error!("Error reading input: {}", e);
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    async fn process_line(&self, line: &str) -> Option<Value> {
        debug!("Processing line: {}", line.trim_end());

        match serde_json::from_str::<Value>(line) {
            Ok(request) => self.handler.handle_request(request).await,
            Err(e) => {
                error!("Failed to parse JSON-RPC request: {}", e);
                Some(parse_error(e.to_string()))
            }
        }
    }
}

/// `-32700` reply for a line that could not be read as a request.
fn parse_error(detail: String) -> Value {
    let mut error = ConnectorError::ParseError.to_jsonrpc_error();
    error["data"] = Value::String(detail);
    serde_json::json!({
        "jsonrpc": "2.0",
        "error": error,
        "id": null
    })
}

async fn write_response<W: AsyncWrite + Unpin>(writer: &mut W, response: &Value) -> io::Result<()> {
    let response_str = serde_json::to_string(response)?;
    writer.write_all(response_str.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;
    debug!("Sent response: {}", response_str);
    Ok(())
}
