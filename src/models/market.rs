//! # models::market
//!
//! Side-panel payloads riding along with snapshots: signals, PCR, PnL,
//! positions and the per-strategy report. These are computed server-side;
//! the dashboard only stores and displays them.

use chrono::DateTime;
use serde::{Deserialize, Deserializer, Serialize};

use super::bar::Timestamp;

/// The feed stamps signal times already shifted by +05:30 (IST).
const IST_OFFSET_SECS: i64 = 19_800;

// ─── Signal ───────────────────────────────────────────────────────────────────

/// A strategy entry alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    #[serde(default)]
    pub strat_name:  Option<String>,
    #[serde(default)]
    pub time:        Option<Timestamp>,
    pub entry_price: f64,
    #[serde(default)]
    pub sl:          Option<f64>,
    /// e.g. `"BUY_CE"`, `"LONG_PE"`
    #[serde(rename = "type", default)]
    pub kind:        Option<String>,
    #[serde(default)]
    pub reason:      Option<String>,
}

impl Signal {
    /// Identity used to drop duplicates that arrive in both a snapshot and
    /// a `marker_update`.
    pub fn dedupe_key(&self) -> String {
        format!(
            "{}-{}-{}",
            self.strat_name.as_deref().unwrap_or("STRATEGY"),
            self.time.map(|t| t.to_string()).unwrap_or_default(),
            self.entry_price,
        )
    }

    /// Put-side signal if the type tag mentions PE; everything else is CE.
    pub fn is_put(&self) -> bool {
        self.kind.as_deref().is_some_and(|k| k.contains("PE"))
    }

    /// `HH:MM:SS` wall-clock label, undoing the feed's IST shift.
    pub fn time_label(&self) -> Option<String> {
        let t = self.time?;
        DateTime::from_timestamp(t - IST_OFFSET_SECS, 0).map(|dt| dt.format("%H:%M:%S").to_string())
    }
}

/// Net option-delta swing pushed by the `delta_signals` channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeltaSignal {
    /// `"BULLISH"` / `"BEARISH"`
    #[serde(rename = "type")]
    pub kind:      String,
    pub net_delta: f64,
    #[serde(default)]
    pub strikes:   Vec<f64>,
}

// ─── PCR ──────────────────────────────────────────────────────────────────────

/// Put/Call ratio insight.
///
/// Older servers send a bare number instead of the object; both decode.
/// An object without `pcr` is refused here; message payloads read it
/// through [`optional_pcr`] instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawPcr")]
pub struct PcrInsights {
    pub pcr:            f64,
    pub pcr_change:     Option<f64>,
    pub buildup_status: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawPcr {
    Bare(f64),
    Full {
        #[serde(default)]
        pcr: Option<f64>,
        #[serde(default)]
        pcr_change: Option<f64>,
        #[serde(default)]
        buildup_status: Option<String>,
    },
}

impl RawPcr {
    fn into_insights(self) -> Option<PcrInsights> {
        match self {
            RawPcr::Bare(pcr) => Some(PcrInsights { pcr, pcr_change: None, buildup_status: None }),
            RawPcr::Full { pcr, pcr_change, buildup_status } => {
                pcr.map(|pcr| PcrInsights { pcr, pcr_change, buildup_status })
            }
        }
    }
}

impl TryFrom<RawPcr> for PcrInsights {
    type Error = &'static str;

    fn try_from(raw: RawPcr) -> Result<Self, Self::Error> {
        raw.into_insights().ok_or("pcr insight without a pcr value")
    }
}

/// `null`, a bare number, or an object. The server sends `{}` before the
/// first option-chain fetch; that reads as no insight.
pub fn optional_pcr<'de, D: Deserializer<'de>>(d: D) -> Result<Option<PcrInsights>, D::Error> {
    Ok(Option::<RawPcr>::deserialize(d)?.and_then(RawPcr::into_insights))
}

/// Badge class derived from the buildup text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Buildup {
    LongBuildup,
    ShortBuildup,
    ShortCovering,
    Neutral,
}

impl PcrInsights {
    pub fn buildup(&self) -> Buildup {
        match self.buildup_status.as_deref() {
            Some(s) if s.contains("LONG BUILD")  => Buildup::LongBuildup,
            Some(s) if s.contains("SHORT BUILD") => Buildup::ShortBuildup,
            Some(s) if s.contains("SHORT COVER") => Buildup::ShortCovering,
            _ => Buildup::Neutral,
        }
    }
}

// ─── PnL / Positions / Strategy report ────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PnlStats {
    pub total_pnl:    f64,
    pub total_closed: u32,
    pub total_trades: u32,
    pub win_count:    u32,
    pub loss_count:   u32,
    pub win_rate:     f64,
}

impl PnlStats {
    pub fn open_trades(&self) -> u32 {
        self.total_trades.saturating_sub(self.total_closed)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub symbol:        String,
    #[serde(default)]
    pub strategy:      Option<String>,
    pub entry_price:   f64,
    pub current_price: f64,
    #[serde(default)]
    pub quantity:      Option<f64>,
    #[serde(default)]
    pub pnl:           Option<f64>,
}

impl Position {
    /// Server PnL if present, else `(ltp - entry) * qty` with qty defaulting to 1.
    pub fn effective_pnl(&self) -> f64 {
        self.pnl.unwrap_or_else(|| {
            (self.current_price - self.entry_price) * self.quantity.unwrap_or(1.0)
        })
    }

    /// Symbol without the exchange prefix (`NSE:`).
    pub fn display_symbol(&self) -> &str {
        self.symbol.strip_prefix("NSE:").unwrap_or(&self.symbol)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyStats {
    pub pnl:      f64,
    pub total:    u32,
    pub win_rate: f64,
}
