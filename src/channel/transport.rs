//! # channel::transport
//!
//! One spawned task per connection attempt. Owns the socket and talks to the
//! main task only through channels:
//!
//! ```text
//!   main ──outbound String──▶ transport ──▶ socket
//!   main ◀──TransportEvent─── transport ◀── socket
//! ```
//!
//! The task always ends by posting `Closed` for its generation, whatever
//! the cause (connect failure, read error, silence, server close, or the
//! outbound sender being dropped).

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::time::{sleep_until, Instant};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info};

use crate::error::ChannelError;

/// Everything the transport reports back to the main task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Opened       { generation: u64 },
    Frame        { generation: u64, text: String },
    Closed       { generation: u64, reason: String },
    /// Posted by a backoff timer, not by the socket.
    ReconnectDue { generation: u64 },
}

pub async fn run(
    url:          String,
    generation:   u64,
    read_timeout: Duration,
    events:       UnboundedSender<TransportEvent>,
    mut outbound: UnboundedReceiver<String>,
) {
    let reason = match drive(&url, generation, read_timeout, &events, &mut outbound).await {
        Ok(reason) => reason,
        Err(e) => e.to_string(),
    };
    debug!(generation, %reason, "Transport finished");
    let _ = events.send(TransportEvent::Closed { generation, reason });
}

async fn drive(
    url:          &str,
    generation:   u64,
    read_timeout: Duration,
    events:       &UnboundedSender<TransportEvent>,
    outbound:     &mut UnboundedReceiver<String>,
) -> Result<String, ChannelError> {
    let (ws, resp) = connect_async(url).await?;
    info!(generation, status = %resp.status(), "🔌 WebSocket connected: {}", url);

    if events.send(TransportEvent::Opened { generation }).is_err() {
        return Ok("receiver dropped".into());
    }

    let (mut write, mut read) = ws.split();
    let mut deadline = Instant::now() + read_timeout;

    loop {
        tokio::select! {
            _ = sleep_until(deadline) => {
                return Ok(format!("no data for {read_timeout:?}"));
            }

            msg = read.next() => {
                let msg = match msg {
                    Some(Ok(m)) => m,
                    Some(Err(e)) => return Err(e.into()),
                    None => return Ok("stream ended".into()),
                };
                deadline = Instant::now() + read_timeout;

                match msg {
                    Message::Text(text) => {
                        if events.send(TransportEvent::Frame { generation, text }).is_err() {
                            return Ok("receiver dropped".into());
                        }
                    }
                    Message::Ping(payload) => {
                        write.send(Message::Pong(payload)).await?;
                    }
                    Message::Close(frame) => {
                        return Ok(match frame {
                            Some(cf) => format!("server close: code={:?} reason={}", cf.code, cf.reason),
                            None => "server close".into(),
                        });
                    }
                    _ => {}
                }
            }

            cmd = outbound.recv() => {
                match cmd {
                    Some(text) => write.send(Message::Text(text)).await?,
                    None => {
                        let _ = write.send(Message::Close(None)).await;
                        return Ok("closed by client".into());
                    }
                }
            }
        }
    }
}
