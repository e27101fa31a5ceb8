//! Domain models shared across the chart core, the channel and the dashboard.

pub mod bar;
pub mod instrument;
pub mod market;
pub mod marker;

pub use bar::{Bar, Timestamp};
pub use instrument::Instrument;
pub use market::{DeltaSignal, PcrInsights, PnlStats, Position, Signal, StrategyStats};
pub use marker::{Marker, MarkerPosition, MarkerShape};
