//! JSON-lines command transport.
//!
//! One `Request` per input line, one `Response` per output line. A line
//! that does not parse is answered with a `TransportError` line and does
//! not stop the loop.

use anyhow::{Context, Result};
use commissioning_gate::{CommissioningApi, GateHandle, Request};
use serde::Serialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

/// Reply to a line that could not be decoded.
#[derive(Debug, Serialize)]
pub struct TransportError {
    pub error: String,
    pub line: usize,
}

/// Serve requests from `reader` until EOF.
///
/// Returns the number of requests answered.
pub async fn serve<R, W>(handle: &GateHandle, reader: R, mut writer: W) -> Result<usize>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();
    let mut line_no = 0;
    let mut answered = 0;

    while let Some(line) = lines.next_line().await.context("Failed to read request line")? {
        line_no += 1;
        if line.trim().is_empty() {
            continue;
        }

        let encoded = match serde_json::from_str::<Request>(&line) {
            Ok(request) => {
                let response = handle
                    .request(request)
                    .await
                    .context("Gate service stopped")?;
                answered += 1;
                serde_json::to_string(&response)?
            }
            Err(e) => {
                warn!(line = line_no, error = %e, "Malformed request");
                serde_json::to_string(&TransportError {
                    error: e.to_string(),
                    line: line_no,
                })?
            }
        };
        debug!(line = line_no, "Replying");

        writer.write_all(encoded.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
    }

    info!(answered, "Input closed");
    Ok(answered)
}
