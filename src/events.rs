//! # events
//!
//! Wire model of the dashboard stream.
//!
//! Every frame is a JSON object tagged by `type`. [`ServerMessage`] covers
//! everything the server pushes, [`ClientCommand`] everything we send back.
//! [`MessageKind`] is the payload-free tag used to key handler routes.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ChannelError;
use crate::models::market::optional_pcr;
use crate::models::{
    Bar, DeltaSignal, Instrument, Marker, PcrInsights, PnlStats, Position, Signal, StrategyStats,
};

// ─── Inbound ──────────────────────────────────────────────────────────────────

/// Every message the server can push.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Response to `fetch_live`: full snapshot of all three legs.
    LiveData(Snapshot),
    HistoryData(Snapshot),
    BacktestResults(Snapshot),
    /// One replay step; carries the same snapshot plus progress counters.
    ReplayStep(Snapshot),

    /// One bar for one leg.
    LiveUpdate(LiveUpdate),
    /// One marker (and optionally its signal) for one or more legs.
    MarkerUpdate(MarkerUpdate),
    PcrUpdate(PcrUpdate),
    DeltaSignals(DeltaSignalUpdate),
    ReplayInfo(ReplayInfo),

    /// Clear every chart and panel.
    ResetUi,
    /// User-facing error text; the connection stays open.
    Error { message: String },

    Ping,
    Pong,

    /// Any tag this build does not know. Only wildcard handlers see it.
    #[serde(other)]
    Unknown,
}

/// Bulk payload shared by `live_data`, `history_data`, `backtest_results`
/// and `replay_step`. Each field is present only when relevant.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Snapshot {
    pub index_data:       Option<Vec<Bar>>,
    pub ce_data:          Option<Vec<Bar>>,
    pub pe_data:          Option<Vec<Bar>>,

    pub index_symbol:     Option<String>,
    pub ce_symbol:        Option<String>,
    pub pe_symbol:        Option<String>,

    pub index_markers:    Option<Vec<Marker>>,
    pub ce_markers:       Option<Vec<Marker>>,
    pub pe_markers:       Option<Vec<Marker>>,

    pub trend:            Option<String>,
    #[serde(deserialize_with = "optional_pcr")]
    pub pcr_insights:     Option<PcrInsights>,
    pub pnl_stats:        Option<PnlStats>,
    pub new_signals:      Option<Vec<Signal>>,
    pub strategy_report:  Option<BTreeMap<String, StrategyStats>>,
    pub active_positions: Option<Vec<Position>>,

    pub current_idx:      Option<usize>,
    pub max_idx:          Option<usize>,
}

impl Snapshot {
    pub fn bars(&self, instrument: Instrument) -> Option<&Vec<Bar>> {
        match instrument {
            Instrument::Index => self.index_data.as_ref(),
            Instrument::Ce    => self.ce_data.as_ref(),
            Instrument::Pe    => self.pe_data.as_ref(),
        }
    }

    pub fn symbol(&self, instrument: Instrument) -> Option<&str> {
        match instrument {
            Instrument::Index => self.index_symbol.as_deref(),
            Instrument::Ce    => self.ce_symbol.as_deref(),
            Instrument::Pe    => self.pe_symbol.as_deref(),
        }
    }

    pub fn markers(&self, instrument: Instrument) -> Option<&Vec<Marker>> {
        match instrument {
            Instrument::Index => self.index_markers.as_ref(),
            Instrument::Ce    => self.ce_markers.as_ref(),
            Instrument::Pe    => self.pe_markers.as_ref(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct LiveUpdate {
    pub candle:   Option<Bar>,
    pub is_index: bool,
    pub is_ce:    bool,
    pub is_pe:    bool,
}

impl LiveUpdate {
    pub fn instrument(&self) -> Option<Instrument> {
        Instrument::from_flags(self.is_index, self.is_ce, self.is_pe)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MarkerUpdate {
    pub marker:   Marker,
    #[serde(default)]
    pub is_index: bool,
    #[serde(default)]
    pub is_ce:    bool,
    #[serde(default)]
    pub is_pe:    bool,
    #[serde(default)]
    pub signal:   Option<Signal>,
}

impl MarkerUpdate {
    /// Unlike ticks, one marker may be flagged for several legs at once.
    pub fn instruments(&self) -> Vec<Instrument> {
        let flags = [self.is_index, self.is_ce, self.is_pe];
        Instrument::ALL
            .into_iter()
            .zip(flags)
            .filter_map(|(i, on)| on.then_some(i))
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct PcrUpdate {
    #[serde(deserialize_with = "optional_pcr")]
    pub pcr_insights: Option<PcrInsights>,
    pub trend:        Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DeltaSignalUpdate {
    pub delta_signals: DeltaSignal,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ReplayInfo {
    pub current_idx: usize,
    pub max_idx:     usize,
}

/// Payload-free tag of a [`ServerMessage`], used to key handler routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    LiveData,
    HistoryData,
    BacktestResults,
    ReplayStep,
    LiveUpdate,
    MarkerUpdate,
    PcrUpdate,
    DeltaSignals,
    ReplayInfo,
    ResetUi,
    Error,
    Ping,
    Pong,
    Unknown,
}

impl ServerMessage {
    pub fn kind(&self) -> MessageKind {
        match self {
            ServerMessage::LiveData(_)        => MessageKind::LiveData,
            ServerMessage::HistoryData(_)     => MessageKind::HistoryData,
            ServerMessage::BacktestResults(_) => MessageKind::BacktestResults,
            ServerMessage::ReplayStep(_)      => MessageKind::ReplayStep,
            ServerMessage::LiveUpdate(_)      => MessageKind::LiveUpdate,
            ServerMessage::MarkerUpdate(_)    => MessageKind::MarkerUpdate,
            ServerMessage::PcrUpdate(_)       => MessageKind::PcrUpdate,
            ServerMessage::DeltaSignals(_)    => MessageKind::DeltaSignals,
            ServerMessage::ReplayInfo(_)      => MessageKind::ReplayInfo,
            ServerMessage::ResetUi            => MessageKind::ResetUi,
            ServerMessage::Error { .. }       => MessageKind::Error,
            ServerMessage::Ping               => MessageKind::Ping,
            ServerMessage::Pong               => MessageKind::Pong,
            ServerMessage::Unknown            => MessageKind::Unknown,
        }
    }

    /// Parses one text frame.
    pub fn decode(frame: &str) -> Result<Self, ChannelError> {
        Ok(serde_json::from_str(frame)?)
    }
}

// ─── Outbound ─────────────────────────────────────────────────────────────────

/// Replay transport buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplayAction {
    Play,
    Pause,
    Step,
    Stop,
}

/// Every command the dashboard sends.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientCommand {
    FetchLive      { index: String },
    StartReplay    { index: String, date: Option<NaiveDate> },
    ReplayControl  { action: ReplayAction },
    SetReplayIndex { index: usize },
    SetReplaySpeed { speed: f64 },
    RunBacktest    { index: String, date: Option<NaiveDate> },
    Pong,
}

impl ClientCommand {
    /// JSON text frame for the socket.
    #[inline]
    pub fn to_json(&self) -> String {
        serde_json::to_string(self)
            .unwrap_or_else(|_| r#"{"type":"serialization_error"}"#.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_live_update() {
        let msg = ServerMessage::decode(
            r#"{"type":"live_update","is_ce":true,"candle":{"time":103,"open":13,"high":13,"low":13,"close":13,"volume":4}}"#,
        )
        .unwrap();
        let ServerMessage::LiveUpdate(update) = msg else { panic!("wrong variant") };
        assert_eq!(update.instrument(), Some(Instrument::Ce));
        assert_eq!(update.candle.map(|c| c.time), Some(103));
    }

    #[test]
    fn test_decode_snapshot_ignores_extra_fields() {
        let msg = ServerMessage::decode(
            r#"{"type":"replay_step","index_data":[{"time":100,"open":10,"high":12,"low":9,"close":11,"volume":0,"oi":5}],"current_idx":51,"max_idx":300,"footprint":[]}"#,
        )
        .unwrap();
        let ServerMessage::ReplayStep(snap) = msg else { panic!("wrong variant") };
        assert_eq!(snap.bars(Instrument::Index).map(Vec::len), Some(1));
        assert_eq!(snap.current_idx, Some(51));
        assert!(snap.ce_data.is_none());
    }

    #[test]
    fn test_decode_snapshot_with_empty_pcr_keeps_bars() {
        let msg = ServerMessage::decode(
            r#"{"type":"replay_step","index_data":[{"time":100,"open":10,"high":12,"low":9,"close":11}],"pcr_insights":{},"current_idx":1,"max_idx":10}"#,
        )
        .unwrap();
        let ServerMessage::ReplayStep(snap) = msg else { panic!("wrong variant") };
        assert!(snap.pcr_insights.is_none());
        assert_eq!(snap.bars(Instrument::Index).map(Vec::len), Some(1));
    }

    #[test]
    fn test_decode_snapshot_with_null_bar_fields() {
        let msg = ServerMessage::decode(
            r#"{"type":"live_data","ce_data":[
                {"time":100,"open":null,"high":null,"low":null,"close":null,"volume":null},
                {"time":160,"open":10,"high":12,"low":9,"close":11,"volume":null},
                {"time":220,"open":11,"high":13,"low":10,"close":12,"volume":7}
            ]}"#,
        )
        .unwrap();
        let ServerMessage::LiveData(snap) = msg else { panic!("wrong variant") };
        let bars = snap.bars(Instrument::Ce).cloned().unwrap_or_default();
        assert_eq!(bars.len(), 3);
        assert!(!bars[0].is_priced());
        assert_eq!(bars[1].volume, 0.0);
    }

    #[test]
    fn test_decode_unit_and_unknown_tags() {
        assert_eq!(ServerMessage::decode(r#"{"type":"ping"}"#).unwrap(), ServerMessage::Ping);
        assert_eq!(ServerMessage::decode(r#"{"type":"reset_ui","why":"mode"}"#).unwrap(), ServerMessage::ResetUi);
        assert_eq!(
            ServerMessage::decode(r#"{"type":"option_chain","rows":[]}"#).unwrap(),
            ServerMessage::Unknown,
        );
    }

    #[test]
    fn test_decode_rejects_untagged() {
        assert!(ServerMessage::decode(r#"{"index_data":[]}"#).is_err());
        assert!(ServerMessage::decode("not json").is_err());
    }

    #[test]
    fn test_marker_update_multi_leg() {
        let msg = ServerMessage::decode(
            r##"{"type":"marker_update","is_ce":true,"is_pe":true,"marker":{"time":5,"position":"aboveBar","shape":"circle","color":"#fff"}}"##,
        )
        .unwrap();
        let ServerMessage::MarkerUpdate(update) = msg else { panic!("wrong variant") };
        assert_eq!(update.instruments(), vec![Instrument::Ce, Instrument::Pe]);
    }

    #[test]
    fn test_command_encoding() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 18);
        let cmd = ClientCommand::StartReplay { index: "NIFTY".into(), date };
        assert_eq!(cmd.to_json(), r#"{"type":"start_replay","index":"NIFTY","date":"2024-01-18"}"#);
        assert_eq!(ClientCommand::Pong.to_json(), r#"{"type":"pong"}"#);
        assert_eq!(
            ClientCommand::ReplayControl { action: ReplayAction::Pause }.to_json(),
            r#"{"type":"replay_control","action":"pause"}"#,
        );
    }
}
