//! # dashboard::widgets
//!
//! Panel models beside the charts. Each one is plain state plus the few
//! rules the side panels apply (dedupe, caps, ordering); nothing here
//! touches a chart.

use std::collections::{BTreeMap, HashSet, VecDeque};
use std::fmt;

use crate::channel::LinkStatus;
use crate::events::ReplayInfo;
use crate::models::{DeltaSignal, PcrInsights, PnlStats, Position, Signal, StrategyStats};

pub const DEFAULT_MAX_SIGNALS: usize = 50;

// ─── Market overview ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarketOverview {
    pub index_price: Option<f64>,
    pub trend:       Option<String>,
    pub pcr:         Option<PcrInsights>,
}

impl MarketOverview {
    /// `Trend: BULLISH | PCR: 1.12 (▲) | SHORT COVERING`
    pub fn summary(&self) -> String {
        let mut out = format!("Trend: {}", self.trend.as_deref().unwrap_or("N/A"));
        if let Some(pcr) = &self.pcr {
            let arrow = if pcr.pcr_change.unwrap_or(0.0) > 1.0 { '▲' } else { '▼' };
            out.push_str(&format!(" | PCR: {:.2} ({arrow})", pcr.pcr));
            if let Some(status) = &pcr.buildup_status {
                out.push_str(&format!(" | {status}"));
            }
        }
        out
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

// ─── Signal feed ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum FeedEntry {
    Signal { key: String, signal: Signal },
    Delta(DeltaSignal),
}

impl FeedEntry {
    /// One-line rendering as the feed shows it.
    pub fn label(&self) -> String {
        match self {
            FeedEntry::Signal { signal, .. } => {
                let side = if signal.is_put() { "PE" } else { "CE" };
                let sl = signal.sl.map(|s| format!(" (SL: {s:.2})")).unwrap_or_default();
                format!(
                    "[{}] {} ({side}) @ {:.2}{sl}",
                    signal.time_label().unwrap_or_else(|| "--:--:--".into()),
                    signal.strat_name.as_deref().unwrap_or("STRATEGY"),
                    signal.entry_price,
                )
            }
            FeedEntry::Delta(delta) => {
                let strikes: Vec<String> = delta.strikes.iter().map(|s| s.to_string()).collect();
                format!("{} (Delta: {:.0}) Strikes: {}", delta.kind, delta.net_delta, strikes.join(", "))
            }
        }
    }
}

/// Newest-first, deduplicated, capped list of alerts.
#[derive(Debug)]
pub struct SignalFeed {
    max:     usize,
    entries: VecDeque<FeedEntry>,
    seen:    HashSet<String>,
}

impl Default for SignalFeed {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SIGNALS)
    }
}

impl SignalFeed {
    pub fn new(max: usize) -> Self {
        Self { max: max.max(1), entries: VecDeque::new(), seen: HashSet::new() }
    }

    /// `false` if this signal is already listed.
    pub fn push_signal(&mut self, signal: &Signal) -> bool {
        let key = signal.dedupe_key();
        if !self.seen.insert(key.clone()) {
            return false;
        }
        self.push(FeedEntry::Signal { key, signal: signal.clone() });
        true
    }

    pub fn push_delta(&mut self, delta: DeltaSignal) {
        self.push(FeedEntry::Delta(delta));
    }

    fn push(&mut self, entry: FeedEntry) {
        self.entries.push_front(entry);
        while self.entries.len() > self.max {
            if let Some(FeedEntry::Signal { key, .. }) = self.entries.pop_back() {
                self.seen.remove(&key);
            }
        }
    }

    pub fn entries(&self) -> impl Iterator<Item = &FeedEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.seen.clear();
    }
}

// ─── PnL ──────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PnlPanel {
    pub stats: PnlStats,
}

impl PnlPanel {
    pub fn reset(&mut self) {
        self.stats = PnlStats::default();
    }
}

impl fmt::Display for PnlPanel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = &self.stats;
        write!(
            f,
            "₹{:.2} | Closed: {} | Open: {} | Win: {} | Loss: {} | WR: {}%",
            s.total_pnl,
            s.total_closed,
            s.open_trades(),
            s.win_count,
            s.loss_count,
            s.win_rate,
        )
    }
}

// ─── Positions ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PositionsPanel {
    pub positions: Vec<Position>,
}

impl PositionsPanel {
    pub fn total_pnl(&self) -> f64 {
        self.positions.iter().map(Position::effective_pnl).sum()
    }

    pub fn clear(&mut self) {
        self.positions.clear();
    }
}

// ─── Strategy board ───────────────────────────────────────────────────────────

/// Per-strategy rows, best PnL first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StrategyBoard {
    rows: Vec<(String, StrategyStats)>,
}

impl StrategyBoard {
    pub fn set(&mut self, report: &BTreeMap<String, StrategyStats>) {
        let mut rows: Vec<_> = report.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        rows.sort_by(|a, b| b.1.pnl.total_cmp(&a.1.pnl));
        self.rows = rows;
    }

    pub fn rows(&self) -> &[(String, StrategyStats)] {
        &self.rows
    }

    pub fn clear(&mut self) {
        self.rows.clear();
    }
}

// ─── Replay ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayPanel {
    pub current_idx: usize,
    pub max_idx:     usize,
}

impl ReplayPanel {
    pub fn apply(&mut self, info: ReplayInfo) {
        self.current_idx = info.current_idx;
        self.max_idx = info.max_idx;
    }

    /// 0.0 ..= 1.0
    pub fn progress(&self) -> f64 {
        if self.max_idx == 0 {
            return 0.0;
        }
        (self.current_idx as f64 / self.max_idx as f64).min(1.0)
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

// ─── Status line ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkIndicator {
    #[default]
    Offline,
    Online,
    Reconnecting { attempt: u32 },
    Failed,
}

impl From<LinkStatus> for LinkIndicator {
    fn from(status: LinkStatus) -> Self {
        match status {
            LinkStatus::Connected                    => LinkIndicator::Online,
            LinkStatus::Reconnecting { attempt, .. } => LinkIndicator::Reconnecting { attempt },
            LinkStatus::GaveUp                       => LinkIndicator::Failed,
            LinkStatus::Closed                       => LinkIndicator::Offline,
        }
    }
}

impl fmt::Display for LinkIndicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkIndicator::Offline                  => f.write_str("Disconnected"),
            LinkIndicator::Online                   => f.write_str("Connected"),
            LinkIndicator::Reconnecting { attempt } => write!(f, "Reconnecting (attempt {attempt})"),
            LinkIndicator::Failed                   => f.write_str("Connection lost"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusLine {
    pub link:   LinkIndicator,
    /// Last server-reported error, verbatim.
    pub notice: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_signal(strat: &str, time: i64, entry: f64) -> Signal {
        Signal {
            strat_name:  Some(strat.into()),
            time:        Some(time),
            entry_price: entry,
            sl:          Some(entry - 10.0),
            kind:        Some("BUY_CE".into()),
            reason:      None,
        }
    }

    #[test]
    fn test_feed_dedupes_and_orders_newest_first() {
        let mut feed = SignalFeed::default();
        assert!(feed.push_signal(&make_signal("ORB", 100, 250.0)));
        assert!(!feed.push_signal(&make_signal("ORB", 100, 250.0)));
        assert!(feed.push_signal(&make_signal("VWAP", 160, 251.5)));
        assert_eq!(feed.len(), 2);
        let first = feed.entries().next().unwrap();
        assert!(first.label().contains("VWAP"));
    }

    #[test]
    fn test_feed_cap_frees_dedupe_keys() {
        let mut feed = SignalFeed::new(2);
        feed.push_signal(&make_signal("A", 1, 1.0));
        feed.push_signal(&make_signal("B", 2, 1.0));
        feed.push_delta(DeltaSignal { kind: "BULLISH".into(), net_delta: 1200.0, strikes: vec![48000.0] });
        assert_eq!(feed.len(), 2);
        // "A" was evicted, so it may come back.
        assert!(feed.push_signal(&make_signal("A", 1, 1.0)));
    }

    #[test]
    fn test_signal_label_undoes_ist_shift() {
        let entry = FeedEntry::Signal { key: String::new(), signal: make_signal("ORB", 19_800 + 3_600, 250.0) };
        assert_eq!(entry.label(), "[01:00:00] ORB (CE) @ 250.00 (SL: 240.00)");
    }

    #[test]
    fn test_strategy_board_sorted_by_pnl() {
        let mut report = BTreeMap::new();
        report.insert("a".to_string(), StrategyStats { pnl: -5.0, total: 2, win_rate: 0.0 });
        report.insert("b".to_string(), StrategyStats { pnl: 40.0, total: 3, win_rate: 66.7 });
        report.insert("c".to_string(), StrategyStats { pnl: 12.5, total: 1, win_rate: 100.0 });
        let mut board = StrategyBoard::default();
        board.set(&report);
        let names: Vec<&str> = board.rows().iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["b", "c", "a"]);
    }

    #[test]
    fn test_pnl_reset_and_display() {
        let mut panel = PnlPanel::default();
        panel.stats.total_pnl = 120.0;
        panel.stats.total_trades = 3;
        panel.stats.total_closed = 2;
        assert!(panel.to_string().contains("Open: 1"));
        panel.reset();
        assert_eq!(panel.to_string(), "₹0.00 | Closed: 0 | Open: 0 | Win: 0 | Loss: 0 | WR: 0%");
    }

    #[test]
    fn test_replay_progress() {
        let mut replay = ReplayPanel::default();
        assert_eq!(replay.progress(), 0.0);
        replay.apply(ReplayInfo { current_idx: 75, max_idx: 300 });
        assert_eq!(replay.progress(), 0.25);
    }

    #[test]
    fn test_overview_summary() {
        let overview = MarketOverview {
            index_price: Some(48_000.0),
            trend:       Some("BULLISH".into()),
            pcr:         Some(PcrInsights {
                pcr:            1.12,
                pcr_change:     Some(1.03),
                buildup_status: Some("SHORT COVERING".into()),
            }),
        };
        assert_eq!(overview.summary(), "Trend: BULLISH | PCR: 1.12 (▲) | SHORT COVERING");
    }
}
