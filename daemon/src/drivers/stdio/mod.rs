//! Newline-delimited JSON over stdin/stdout, for clients that spawn the
//! daemon as a child process. Logs stay on stderr.

use crate::app::AppState;
use crate::drivers::{Driver, Drivers};
use crate::protocols::v1::ProtocolV1;
use crate::protocols::Protocol;
use log::{debug, info};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::select;
use tokio::sync::mpsc::unbounded_channel;
use tokio_util::sync::CancellationToken;

pub struct StdioDriver {
    app_state: AppState,
}

impl StdioDriver {
    pub fn new(app_state: AppState) -> Self {
        Self { app_state }
    }
}

#[async_trait::async_trait]
impl Driver for StdioDriver {
    async fn run(&self) -> anyhow::Result<()> {
        info!("serving tool calls on stdio");
        serve(
            self.app_state.protocol_v1.clone(),
            BufReader::new(tokio::io::stdin()),
            tokio::io::stdout(),
            self.app_state.stop_token.clone(),
        )
        .await
    }

    fn get_driver_type(&self) -> Drivers {
        Drivers::Stdio
    }
}

/// Reads one request per line and writes one response per line. Requests run
/// concurrently, so responses come back in completion order. Returns once the
/// input is exhausted and every in-flight request has been answered, or once
/// `stop` is cancelled.
pub async fn serve<R, W>(
    protocol: Arc<ProtocolV1>,
    reader: R,
    mut writer: W,
    stop: CancellationToken,
) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();
    let (reply_tx, mut reply_rx) = unbounded_channel::<String>();
    let mut reply_tx = Some(reply_tx);

    loop {
        select! {
            line = lines.next_line(), if reply_tx.is_some() => match line? {
                Some(line) if line.trim().is_empty() => {}
                Some(line) => {
                    if let Some(tx) = &reply_tx {
                        let tx = tx.clone();
                        let v1 = protocol.clone();
                        tokio::spawn(async move {
                            if let Some(reply) = v1.process_text(&line).await {
                                let _ = tx.send(reply);
                            }
                        });
                    }
                }
                None => {
                    debug!("stdin closed, draining in-flight requests");
                    reply_tx = None;
                }
            },
            reply = reply_rx.recv() => match reply {
                Some(reply) => {
                    writer.write_all(reply.as_bytes()).await?;
                    writer.write_all(b"\n").await?;
                    writer.flush().await?;
                }
                None => break,
            },
            _ = stop.cancelled() => {
                info!("stdio driver stopping");
                break;
            }
        }
    }
    Ok(())
}
