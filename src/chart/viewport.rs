//! # chart::viewport
//!
//! **Viewport Tracker**: picks what each chart should show after a data change.
//!
//! - Bulk load  → fit the whole series (user wants full context).
//! - Live tick  → trailing window of the last `window_bars` bars, plus a
//!   small right-hand buffer so the live bar is not flush against the edge.
//!
//! The tracker only computes; the reconciler applies the plan to the surface.

use std::collections::HashMap;

use super::surface::TimeRange;
use crate::models::{Bar, Instrument, Timestamp};

/// Bars visible in trailing mode.
pub const DEFAULT_WINDOW_BARS: usize = 60;
/// Right-hand padding, in bars.
pub const DEFAULT_BUFFER_BARS: i64 = 5;
/// Bar interval used to turn the padding into seconds.
pub const DEFAULT_BAR_INTERVAL_SECS: i64 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewportMode {
    FitContent,
    Trailing,
}

/// Current view of one chart. Always recomputable from the series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub mode:  ViewportMode,
    pub range: TimeRange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackerConfig {
    pub window_bars:    usize,
    pub buffer_secs:    Timestamp,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            window_bars: DEFAULT_WINDOW_BARS,
            buffer_secs: DEFAULT_BUFFER_BARS * DEFAULT_BAR_INTERVAL_SECS,
        }
    }
}

#[derive(Debug, Default)]
pub struct ViewportTracker {
    config: TrackerConfig,
    views:  HashMap<Instrument, Viewport>,
}

impl ViewportTracker {
    pub fn new(config: TrackerConfig) -> Self {
        Self { config, views: HashMap::new() }
    }

    /// Fit-to-content over the freshly loaded series. An empty load drops
    /// the previous view and returns `None`.
    pub fn on_bulk_load(&mut self, instrument: Instrument, bars: &[Bar]) -> Option<Viewport> {
        let (Some(first), Some(last)) = (bars.first(), bars.last()) else {
            self.views.remove(&instrument);
            return None;
        };
        let view = Viewport {
            mode:  ViewportMode::FitContent,
            range: TimeRange::new(first.time, last.time),
        };
        self.views.insert(instrument, view);
        Some(view)
    }

    /// Trailing window ending at the live bar. `None` if the series is empty.
    pub fn on_live_tick(&mut self, instrument: Instrument, bars: &[Bar]) -> Option<Viewport> {
        let range = self.trailing_range(bars, self.config.window_bars)?;
        let view = Viewport { mode: ViewportMode::Trailing, range };
        self.views.insert(instrument, view);
        Some(view)
    }

    /// `[time(max(0, N - window)), time(N - 1) + buffer]`
    pub fn trailing_range(&self, bars: &[Bar], window: usize) -> Option<TimeRange> {
        let last = bars.last()?;
        let start = bars.len().saturating_sub(window);
        Some(TimeRange::new(bars[start].time, last.time + self.config.buffer_secs))
    }

    pub fn viewport(&self, instrument: Instrument) -> Option<Viewport> {
        self.views.get(&instrument).copied()
    }

    pub fn reset(&mut self, instrument: Instrument) {
        self.views.remove(&instrument);
    }

    pub fn reset_all(&mut self) {
        self.views.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_series(times: impl IntoIterator<Item = Timestamp>) -> Vec<Bar> {
        times.into_iter().map(|t| Bar::new(t, 10.0, 11.0, 9.0, 10.5, 1.0)).collect()
    }

    #[test]
    fn test_bulk_load_fits_without_buffer() {
        let mut tracker = ViewportTracker::default();
        let view = tracker.on_bulk_load(Instrument::Index, &make_series([100, 101, 102])).unwrap();
        assert_eq!(view.mode, ViewportMode::FitContent);
        assert_eq!(view.range, TimeRange::new(100, 102));
    }

    #[test]
    fn test_live_tick_short_series_starts_at_first_bar() {
        let mut tracker = ViewportTracker::default();
        let view = tracker.on_live_tick(Instrument::Ce, &make_series([100, 101, 102, 103])).unwrap();
        assert_eq!(view.mode, ViewportMode::Trailing);
        assert_eq!(view.range, TimeRange::new(100, 103 + 300));
    }

    #[test]
    fn test_live_tick_long_series_trails_window() {
        let mut tracker = ViewportTracker::new(TrackerConfig { window_bars: 60, buffer_secs: 5 });
        let bars = make_series((0..200).map(|i| i * 60));
        let view = tracker.on_live_tick(Instrument::Pe, &bars).unwrap();
        assert_eq!(view.range.from, 140 * 60);
        assert_eq!(view.range.to, 199 * 60 + 5);
    }

    #[test]
    fn test_empty_series_yields_nothing() {
        let mut tracker = ViewportTracker::default();
        assert!(tracker.on_bulk_load(Instrument::Index, &[]).is_none());
        assert!(tracker.on_live_tick(Instrument::Index, &[]).is_none());
        assert!(tracker.viewport(Instrument::Index).is_none());
    }

    #[test]
    fn test_empty_bulk_load_drops_previous_view() {
        let mut tracker = ViewportTracker::default();
        tracker.on_live_tick(Instrument::Ce, &make_series([100, 101])).unwrap();
        tracker.on_bulk_load(Instrument::Pe, &make_series([100, 101])).unwrap();

        assert!(tracker.on_bulk_load(Instrument::Ce, &[]).is_none());
        assert!(tracker.viewport(Instrument::Ce).is_none());
        assert!(tracker.viewport(Instrument::Pe).is_some());

        tracker.reset_all();
        assert!(tracker.viewport(Instrument::Pe).is_none());
    }
}
