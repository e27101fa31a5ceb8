//! # state
//!
//! The **application context**: owns config, charts, controller and channel,
//! and wires them together once at startup. There are no globals; everything
//! the runtime touches hangs off [`AppContext`].
//!
//! ```text
//!  MessageChannel ──typed handlers──▶ Rc<RefCell<DashboardController>>
//!        │                                   │
//!        └──link observer──▶ status line     └──▶ Reconciler ──▶ charts ◀──▶ ViewportSynchronizer
//! ```
//!
//! Everything here lives on the main task, so shared pieces are
//! `Rc<RefCell<_>>` / `Rc<Cell<_>>` rather than `Arc<RwLock<_>>`.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use tracing::{info, warn};

use crate::channel::{LinkStatus, MessageChannel, Route, TransportEvent};
use crate::chart::{
    ChartFactory, ChartHandle, Reconciler, SeriesStore, ViewportSynchronizer, ViewportTracker,
};
use crate::config::Config;
use crate::dashboard::DashboardController;
use crate::error::{AppError, ChannelError};
use crate::events::{ClientCommand, MessageKind};
use crate::models::Instrument;

/// Message kinds the controller consumes.
const CONTROLLER_ROUTES: [MessageKind; 11] = [
    MessageKind::LiveData,
    MessageKind::HistoryData,
    MessageKind::BacktestResults,
    MessageKind::ReplayStep,
    MessageKind::LiveUpdate,
    MessageKind::MarkerUpdate,
    MessageKind::PcrUpdate,
    MessageKind::DeltaSignals,
    MessageKind::ReplayInfo,
    MessageKind::ResetUi,
    MessageKind::Error,
];

// ─── AppContext ───────────────────────────────────────────────────────────────

pub struct AppContext {
    pub config:     Config,
    pub controller: Rc<RefCell<DashboardController>>,
    pub channel:    MessageChannel,

    charts:         Vec<(Instrument, ChartHandle)>,
    sync:           ViewportSynchronizer,
    /// Every dispatched message, any kind.
    messages:       Rc<Cell<u64>>,
}

impl AppContext {
    /// Creates the three charts through `factory` and wires the whole graph.
    pub fn build(config: Config, factory: &dyn ChartFactory) -> Result<Self, AppError> {
        let mut reconciler = Reconciler::new(
            SeriesStore::new(config.retention),
            ViewportTracker::new(config.viewport),
        );

        let mut charts = Vec::with_capacity(Instrument::ALL.len());
        for instrument in Instrument::ALL {
            let chart = factory.create_series(instrument)?;
            reconciler.attach(instrument, Rc::clone(&chart));
            charts.push((instrument, chart));
        }

        let handles: Vec<ChartHandle> = charts.iter().map(|(_, c)| Rc::clone(c)).collect();
        let sync = ViewportSynchronizer::attach(&handles);

        let controller = Rc::new(RefCell::new(DashboardController::new(
            reconciler,
            config.index.clone(),
            config.max_signals,
        )));

        let mut channel =
            MessageChannel::new(config.ws_url.clone(), config.reconnect, config.read_timeout)?;

        // ── Data routes → controller ─────────────────────────────────────────
        for kind in CONTROLLER_ROUTES {
            let ctl = Rc::clone(&controller);
            channel.on(kind, Box::new(move |msg| ctl.borrow_mut().handle(msg)));
        }

        // ── Wildcard: message counter ────────────────────────────────────────
        let messages = Rc::new(Cell::new(0));
        let counter = Rc::clone(&messages);
        channel.on(Route::Any, Box::new(move |_| counter.set(counter.get() + 1)));

        // ── Connection indicator ─────────────────────────────────────────────
        let ctl = Rc::clone(&controller);
        channel.on_link_change(Box::new(move |status| ctl.borrow_mut().set_link_status(status)));

        info!(url = %config.ws_url, index = %config.index, "🧩 Dashboard wired");

        Ok(Self { config, controller, channel, charts, sync, messages })
    }

    pub fn chart(&self, instrument: Instrument) -> Option<&ChartHandle> {
        self.charts.iter().find(|(i, _)| *i == instrument).map(|(_, c)| c)
    }

    pub fn synchronizer(&self) -> &ViewportSynchronizer {
        &self.sync
    }

    pub fn messages_seen(&self) -> u64 {
        self.messages.get()
    }

    /// Applies one transport event; re-requests live data on each (re)connect
    /// when auto-fetch is on.
    pub fn on_event(&mut self, event: TransportEvent) -> Option<LinkStatus> {
        let status = self.channel.handle_event(event);
        if status == Some(LinkStatus::Connected) && self.config.auto_fetch {
            if let Err(e) = self.command(|ctl| ctl.fetch_live()) {
                warn!(error = %e, "fetch_live not sent");
            }
        }
        status
    }

    /// Builds a command with the controller and sends it.
    pub fn command(
        &mut self,
        build: impl FnOnce(&mut DashboardController) -> ClientCommand,
    ) -> Result<(), ChannelError> {
        let cmd = build(&mut self.controller.borrow_mut());
        self.channel.send(&cmd)
    }

    pub fn log_summary(&self) {
        let ctl = self.controller.borrow();
        let store = ctl.reconciler().store();
        let ticks = ctl.tick_stats();
        let stats = self.channel.stats();
        info!(
            link     = %ctl.status.link,
            frames   = stats.frames,
            messages = self.messages_seen(),
            index    = store.len(Instrument::Index),
            ce       = store.len(Instrument::Ce),
            pe       = store.len(Instrument::Pe),
            accepted = ticks.accepted,
            rejected = ticks.rejected,
            signals  = ctl.signals.len(),
            "📊 {} | PnL {}",
            ctl.overview.summary(),
            ctl.pnl,
        );
    }
}
