// MCP over stdio: one JSON-RPC message per line in, one response per line out.
// Stdout carries frames only; logging goes to stderr (see main.rs).

use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use super::server::{dispatch, json_rpc_error};
use crate::state::AppState;

/// Serve the process's stdin/stdout until stdin closes.
pub async fn run(state: AppState) -> std::io::Result<()> {
    tracing::info!("MCP server listening on stdio");
    serve(&state, BufReader::new(tokio::io::stdin()), tokio::io::stdout()).await
}

pub async fn serve<R, W>(state: &AppState, reader: R, mut writer: W) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<Value>(line) {
            Ok(request) => dispatch(state, &request).await,
            Err(e) => {
                tracing::warn!("stdio: unparseable frame: {}", e);
                Some(json_rpc_error(Value::Null, -32700, &format!("Parse error: {}", e)))
            }
        };

        if let Some(response) = response {
            let mut frame = response.to_string();
            frame.push('\n');
            writer.write_all(frame.as_bytes()).await?;
            writer.flush().await?;
        }
    }
    tracing::info!("stdio: input closed, stopping");
    Ok(())
}
