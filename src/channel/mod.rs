//! Resilient stream channel: reconnecting, heartbeat-aware, typed dispatch.

pub mod backoff;
pub mod client;
pub mod dispatch;
pub mod session;
pub mod transport;

pub use backoff::ReconnectPolicy;
pub use client::{ChannelStats, LinkStatus, MessageChannel, DEFAULT_READ_TIMEOUT};
pub use dispatch::{Dispatcher, Handler, Route};
pub use session::{ChannelSession, CloseOutcome, ConnectionState};
pub use transport::TransportEvent;
