//! # error
//!
//! Error types for the chart core and the stream channel.
//!
//! None of these are fatal: render refusals are caught at the call site,
//! channel errors end in a reconnect, and [`AppError`] only surfaces while
//! the binary is starting up.

use thiserror::Error;

use crate::models::{Instrument, Timestamp};

/// A chart surface refused a render call.
#[derive(Debug, Error, PartialEq)]
pub enum RenderError {
    /// The surface has no data yet, so it cannot place a visible range.
    #[error("chart has no data")]
    NoData,

    /// An incremental update older than the last rendered point.
    #[error("cannot update oldest data: last={last}, new={attempted}")]
    OutOfOrder { last: Timestamp, attempted: Timestamp },

    /// No surface registered for this instrument.
    #[error("no chart attached for {0}")]
    Detached(Instrument),
}

/// Stream channel failures.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// Inbound frame was not a valid tagged message.
    #[error("malformed frame: {0}")]
    Decode(#[from] serde_json::Error),

    /// Configured endpoint is not a ws:// or wss:// URL.
    #[error("invalid websocket url: {0}")]
    InvalidUrl(String),

    /// Outbound command while the link is not open. Nothing is queued.
    #[error("not connected (state: {0})")]
    NotConnected(String),

    #[error("websocket error: {0}")]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),
}

/// Top-level error for wiring the application together.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Channel(#[from] ChannelError),
}
