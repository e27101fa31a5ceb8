//! # channel::client
//!
//! **Message Channel**: the main-task side of the stream connection.
//!
//! Owns the session state machine, the handler registry and link observers.
//! The socket itself lives in a [`transport`](super::transport) task; this
//! side only sees [`TransportEvent`]s, so everything here runs on one task
//! and handlers may freely hold `Rc`/`RefCell` state.

use std::time::Duration;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::backoff::ReconnectPolicy;
use super::dispatch::{Dispatcher, Handler, Route};
use super::session::{ChannelSession, CloseOutcome, ConnectionState};
use super::transport::{self, TransportEvent};
use crate::error::ChannelError;
use crate::events::{ClientCommand, ServerMessage};

pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(45);

/// Connection indicator changes pushed to observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStatus {
    Connected,
    Reconnecting { attempt: u32, delay: Duration },
    GaveUp,
    Closed,
}

pub type LinkObserver = Box<dyn FnMut(LinkStatus)>;

/// Frame counters, for the runtime summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelStats {
    pub frames:     u64,
    pub malformed:  u64,
    pub pings:      u64,
    pub reconnects: u64,
}

pub struct MessageChannel {
    url:          String,
    read_timeout: Duration,
    session:      ChannelSession,
    dispatcher:   Dispatcher,
    observers:    Vec<LinkObserver>,
    stats:        ChannelStats,

    outbound:     Option<UnboundedSender<String>>,
    events_tx:    UnboundedSender<TransportEvent>,
    events_rx:    UnboundedReceiver<TransportEvent>,
    transport:    Option<JoinHandle<()>>,
}

impl MessageChannel {
    pub fn new(
        url: impl Into<String>,
        policy: ReconnectPolicy,
        read_timeout: Duration,
    ) -> Result<Self, ChannelError> {
        let url = url.into();
        if !(url.starts_with("ws://") || url.starts_with("wss://")) {
            return Err(ChannelError::InvalidUrl(url));
        }
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Ok(Self {
            url,
            read_timeout,
            session: ChannelSession::new(policy),
            dispatcher: Dispatcher::new(),
            observers: Vec::new(),
            stats: ChannelStats::default(),
            outbound: None,
            events_tx,
            events_rx,
            transport: None,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn state(&self) -> ConnectionState {
        self.session.state()
    }

    pub fn stats(&self) -> ChannelStats {
        self.stats
    }

    // ─── Registration ─────────────────────────────────────────────────────────

    /// Adds a handler for `route`. Handlers on one route run in the order added.
    pub fn on(&mut self, route: impl Into<Route>, handler: Handler) {
        self.dispatcher.on(route, handler);
    }

    pub fn on_link_change(&mut self, observer: LinkObserver) {
        self.observers.push(observer);
    }

    // ─── Lifecycle ────────────────────────────────────────────────────────────

    /// Dials (or re-dials) with a fresh attempt budget. Must run inside a
    /// tokio runtime.
    pub fn connect(&mut self) {
        let generation = self.session.restart();
        info!(url = %self.url, generation, "🔌 Connecting");
        self.spawn_transport(generation);
    }

    /// Closes the link for good. Pending reconnect timers become no-ops.
    pub fn disconnect(&mut self) {
        self.session.disconnect();
        self.outbound = None;
        if let Some(handle) = self.transport.take() {
            handle.abort();
        }
        self.notify(LinkStatus::Closed);
    }

    fn spawn_transport(&mut self, generation: u64) {
        if let Some(old) = self.transport.take() {
            old.abort();
        }
        let (tx, rx) = mpsc::unbounded_channel();
        self.outbound = Some(tx);
        self.transport = Some(tokio::spawn(transport::run(
            self.url.clone(),
            generation,
            self.read_timeout,
            self.events_tx.clone(),
            rx,
        )));
    }

    // ─── Outbound ─────────────────────────────────────────────────────────────

    /// Sends one command. Dropped with a warning unless the link is open.
    pub fn send(&self, command: &ClientCommand) -> Result<(), ChannelError> {
        let not_connected = || ChannelError::NotConnected(self.session.state().to_string());

        if !self.session.is_open() {
            warn!(state = %self.session.state(), ?command, "⚠️ Not connected, dropping command");
            return Err(not_connected());
        }
        let tx = self.outbound.as_ref().ok_or_else(not_connected)?;
        tx.send(command.to_json()).map_err(|_| not_connected())?;
        debug!(?command, "📤 Sent");
        Ok(())
    }

    // ─── Event loop ───────────────────────────────────────────────────────────

    /// Waits for the next transport event. Never resolves to `None` while
    /// the channel is alive, since it holds a sender itself.
    pub async fn next_event(&mut self) -> Option<TransportEvent> {
        self.events_rx.recv().await
    }

    /// Applies one event. Returns the link change it caused, if any.
    pub fn handle_event(&mut self, event: TransportEvent) -> Option<LinkStatus> {
        match event {
            TransportEvent::Opened { generation } => {
                if !self.session.on_open(generation) {
                    debug!(generation, "Ignoring open from superseded connection");
                    return None;
                }
                info!("✅ Channel open");
                self.notify(LinkStatus::Connected);
                Some(LinkStatus::Connected)
            }

            TransportEvent::Frame { generation, text } => {
                if self.session.accepts(generation) && self.session.is_open() {
                    self.on_frame(&text);
                }
                None
            }

            TransportEvent::Closed { generation, reason } => match self.session.on_close(generation) {
                CloseOutcome::Reconnect { attempt, delay, generation } => {
                    warn!(%reason, "Channel closed");
                    self.outbound = None;
                    self.stats.reconnects += 1;
                    let tx = self.events_tx.clone();
                    tokio::spawn(async move {
                        tokio::time::sleep(delay).await;
                        let _ = tx.send(TransportEvent::ReconnectDue { generation });
                    });
                    let status = LinkStatus::Reconnecting { attempt, delay };
                    self.notify(status);
                    Some(status)
                }
                CloseOutcome::GaveUp { .. } => {
                    error!(%reason, "Channel closed for good");
                    self.outbound = None;
                    self.notify(LinkStatus::GaveUp);
                    Some(LinkStatus::GaveUp)
                }
                CloseOutcome::Ignored => None,
            },

            TransportEvent::ReconnectDue { generation } => {
                if let Some(next) = self.session.on_reconnect_due(generation) {
                    info!(attempt = self.session.attempt(), generation = next, "🔌 Reconnecting now");
                    self.spawn_transport(next);
                }
                None
            }
        }
    }

    fn on_frame(&mut self, text: &str) {
        self.stats.frames += 1;
        let msg = match ServerMessage::decode(text) {
            Ok(msg) => msg,
            Err(e) => {
                self.stats.malformed += 1;
                warn!(error = %e, "⚠️ Dropping malformed frame");
                return;
            }
        };

        if msg == ServerMessage::Ping {
            self.stats.pings += 1;
            if let Some(tx) = &self.outbound {
                let _ = tx.send(ClientCommand::Pong.to_json());
            }
            return;
        }

        self.dispatcher.dispatch(&msg);
    }

    fn notify(&mut self, status: LinkStatus) {
        for observer in self.observers.iter_mut() {
            observer(status);
        }
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
