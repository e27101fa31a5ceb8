//! # dashboard
//!
//! **Dashboard Controller**: classifies stream messages and hands them to
//! the reconciler and the panel models. Also builds every outbound command.
//!
//! ```text
//!  ServerMessage ─▶ handle()
//!                    ├─ snapshot      → Reconciler::load_snapshot ×3 + panels
//!                    ├─ live_update   → Reconciler::apply_tick
//!                    ├─ marker_update → Reconciler::add_marker + signal feed
//!                    ├─ pcr / delta / replay_info → panels
//!                    ├─ reset_ui      → clear everything
//!                    └─ error         → status notice
//! ```

pub mod widgets;

use std::collections::HashMap;

use chrono::NaiveDate;
use tracing::{debug, error, info};

use crate::channel::LinkStatus;
use crate::chart::{Reconciler, TimeRange, UpsertOutcome};
use crate::error::RenderError;
use crate::events::{
    ClientCommand, LiveUpdate, MarkerUpdate, ReplayAction, ReplayInfo, ServerMessage, Snapshot,
};
use crate::models::Instrument;

pub use widgets::{
    FeedEntry, LinkIndicator, MarketOverview, PnlPanel, PositionsPanel, ReplayPanel, SignalFeed,
    StatusLine, StrategyBoard,
};

/// What the server is currently streaming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Live,
    Replay,
    Backtest,
}

/// Counters for the runtime summary line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickStats {
    pub accepted: u64,
    pub rejected: u64,
    pub invalid:  u64,
}

pub struct DashboardController {
    reconciler:  Reconciler,
    index:       String,
    mode:        Mode,
    symbols:     HashMap<Instrument, String>,
    last_prices: HashMap<Instrument, f64>,
    ticks:       TickStats,

    pub overview:   MarketOverview,
    pub signals:    SignalFeed,
    pub pnl:        PnlPanel,
    pub positions:  PositionsPanel,
    pub strategies: StrategyBoard,
    pub replay:     ReplayPanel,
    pub status:     StatusLine,
}

impl DashboardController {
    pub fn new(reconciler: Reconciler, index: impl Into<String>, max_signals: usize) -> Self {
        Self {
            reconciler,
            index:       index.into(),
            mode:        Mode::Live,
            symbols:     HashMap::new(),
            last_prices: HashMap::new(),
            ticks:       TickStats::default(),
            overview:    MarketOverview::default(),
            signals:     SignalFeed::new(max_signals),
            pnl:         PnlPanel::default(),
            positions:   PositionsPanel::default(),
            strategies:  StrategyBoard::default(),
            replay:      ReplayPanel::default(),
            status:      StatusLine::default(),
        }
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    pub fn index(&self) -> &str {
        &self.index
    }

    pub fn set_index(&mut self, index: impl Into<String>) {
        self.index = index.into();
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn symbol(&self, instrument: Instrument) -> Option<&str> {
        self.symbols.get(&instrument).map(String::as_str)
    }

    pub fn last_price(&self, instrument: Instrument) -> Option<f64> {
        self.last_prices.get(&instrument).copied()
    }

    pub fn tick_stats(&self) -> TickStats {
        self.ticks
    }

    pub fn set_link_status(&mut self, status: LinkStatus) {
        self.status.link = status.into();
    }

    // ─── Inbound ──────────────────────────────────────────────────────────────

    pub fn handle(&mut self, msg: &ServerMessage) {
        match msg {
            ServerMessage::LiveData(snap)
            | ServerMessage::HistoryData(snap)
            | ServerMessage::BacktestResults(snap) => self.apply_snapshot(snap),

            ServerMessage::ReplayStep(snap) => {
                if let (Some(current_idx), Some(max_idx)) = (snap.current_idx, snap.max_idx) {
                    self.replay.apply(ReplayInfo { current_idx, max_idx });
                }
                self.apply_snapshot(snap);
            }

            ServerMessage::LiveUpdate(update) => self.apply_live_update(update),
            ServerMessage::MarkerUpdate(update) => self.apply_marker_update(update),

            ServerMessage::PcrUpdate(update) => {
                if let Some(pcr) = &update.pcr_insights {
                    self.overview.pcr = Some(pcr.clone());
                }
                if let Some(trend) = &update.trend {
                    self.overview.trend = Some(trend.clone());
                }
            }

            ServerMessage::DeltaSignals(update) => {
                self.signals.push_delta(update.delta_signals.clone());
            }

            ServerMessage::ReplayInfo(info) => self.replay.apply(*info),

            ServerMessage::ResetUi => self.reset(),

            ServerMessage::Error { message } => {
                error!(%message, "❌ Server error");
                self.status.notice = Some(message.clone());
            }

            ServerMessage::Ping | ServerMessage::Pong | ServerMessage::Unknown => {}
        }
    }

    fn apply_snapshot(&mut self, snap: &Snapshot) {
        for instrument in Instrument::ALL {
            if let Some(bars) = snap.bars(instrument) {
                self.reconciler.load_snapshot(instrument, bars.clone());
                self.track_price(instrument);
            }
            if let Some(markers) = snap.markers(instrument) {
                self.reconciler.set_markers(instrument, markers.clone());
            }
            if let Some(symbol) = snap.symbol(instrument) {
                self.symbols.insert(instrument, symbol.to_string());
            }
        }

        if let Some(trend) = &snap.trend {
            self.overview.trend = Some(trend.clone());
        }
        if let Some(pcr) = &snap.pcr_insights {
            self.overview.pcr = Some(pcr.clone());
        }
        if let Some(stats) = &snap.pnl_stats {
            self.pnl.stats = stats.clone();
        }
        if let Some(signals) = &snap.new_signals {
            for signal in signals {
                self.signals.push_signal(signal);
            }
        }
        if let Some(report) = &snap.strategy_report {
            self.strategies.set(report);
        }
        if let Some(positions) = &snap.active_positions {
            self.positions.positions = positions.clone();
        }
    }

    fn apply_live_update(&mut self, update: &LiveUpdate) {
        let (Some(instrument), Some(candle)) = (update.instrument(), update.candle) else {
            debug!("live_update without leg or candle");
            return;
        };

        match self.reconciler.apply_tick(instrument, candle) {
            UpsertOutcome::Rejected { .. } => self.ticks.rejected += 1,
            UpsertOutcome::Invalid => self.ticks.invalid += 1,
            _ => {
                self.ticks.accepted += 1;
                self.track_price(instrument);
            }
        }
    }

    fn apply_marker_update(&mut self, update: &MarkerUpdate) {
        for instrument in update.instruments() {
            self.reconciler.add_marker(instrument, update.marker.clone());
        }
        if let Some(signal) = &update.signal {
            if self.signals.push_signal(signal) {
                info!(strategy = ?signal.strat_name, entry = signal.entry_price, "📣 New signal");
            }
        }
    }

    fn track_price(&mut self, instrument: Instrument) {
        if let Some(last) = self.reconciler.store().last(instrument) {
            self.last_prices.insert(instrument, last.close);
            if instrument == Instrument::Index {
                self.overview.index_price = Some(last.close);
            }
        }
    }

    /// Clears every chart and panel. Idempotent.
    pub fn reset(&mut self) {
        self.reconciler.clear_all();
        self.signals.clear();
        self.pnl.reset();
        self.positions.clear();
        self.strategies.clear();
        self.last_prices.clear();
        self.overview.clear();
        self.status.notice = None;
    }

    // ─── Layout ───────────────────────────────────────────────────────────────

    pub fn align(&self, bars: usize) -> Option<TimeRange> {
        self.reconciler.align(bars)
    }

    pub fn resize(&self, instrument: Instrument, width: u32, height: u32) -> Result<(), RenderError> {
        self.reconciler.resize(instrument, width, height)
    }

    // ─── Outbound ─────────────────────────────────────────────────────────────

    pub fn fetch_live(&mut self) -> ClientCommand {
        self.mode = Mode::Live;
        ClientCommand::FetchLive { index: self.index.clone() }
    }

    /// Mode switch: charts are emptied before the replay data arrives.
    pub fn start_replay(&mut self, date: Option<NaiveDate>) -> ClientCommand {
        self.switch_mode(Mode::Replay);
        self.replay.clear();
        ClientCommand::StartReplay { index: self.index.clone(), date }
    }

    pub fn run_backtest(&mut self, date: Option<NaiveDate>) -> ClientCommand {
        self.switch_mode(Mode::Backtest);
        ClientCommand::RunBacktest { index: self.index.clone(), date }
    }

    pub fn replay_control(&self, action: ReplayAction) -> ClientCommand {
        ClientCommand::ReplayControl { action }
    }

    pub fn set_replay_index(&self, index: usize) -> ClientCommand {
        ClientCommand::SetReplayIndex { index }
    }

    pub fn set_replay_speed(&self, speed: f64) -> ClientCommand {
        ClientCommand::SetReplaySpeed { speed }
    }

    fn switch_mode(&mut self, mode: Mode) {
        info!(from = ?self.mode, to = ?mode, "🔀 Mode switch");
        self.mode = mode;
        self.reconciler.clear_all();
        self.last_prices.clear();
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
