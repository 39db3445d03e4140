//! Newline-delimited JSON request loop

use actors::RegistryHandle;
use anyhow::{Context, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};

use crate::protocol::{dispatch, Request, Response, ERR_INVALID_REQUEST};

/// Answer every request line from `reader` on `writer` until end of input.
/// Returns the number of responses written.
pub async fn serve<R, W>(handle: &RegistryHandle, reader: R, mut writer: W) -> Result<usize>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();
    let mut served = 0;

    while let Some(line) = lines.next_line().await.context("Failed to read request line")? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<Request>(line) {
            Ok(request) => {
                debug!(event = request.event(), "request received");
                dispatch(handle, request).await
            }
            Err(err) => {
                warn!(error = %err, "malformed request line");
                Response::error("unknown", ERR_INVALID_REQUEST)
            }
        };

        let mut encoded = serde_json::to_vec(&response).context("Failed to encode response")?;
        encoded.push(b'\n');
        writer
            .write_all(&encoded)
            .await
            .context("Failed to write response")?;
        writer.flush().await.context("Failed to flush response")?;
        served += 1;
    }

    Ok(served)
}
