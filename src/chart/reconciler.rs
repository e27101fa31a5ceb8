//! # chart::reconciler
//!
//! **Live-Update Reconciler**: the only writer of the [`SeriesStore`] and the
//! only caller of data-changing render methods.
//!
//! ## Ordering (every call)
//! ```text
//! 1. Mutate the store            (replace / upsert / markers / clear)
//! 2. Render                      (set_data for bulk, update_point for ticks)
//! 3. Viewport                    (fit on bulk, trailing window on ticks)
//! ```
//!
//! `update_point` is only ever called with the stored last bar, so it can
//! never carry a time older than what the surface already shows.

use std::collections::HashMap;

use tracing::{debug, info, warn};

use super::store::{SeriesStore, UpsertOutcome};
use super::surface::{ChartHandle, TimeRange};
use super::viewport::{Viewport, ViewportMode, ViewportTracker};
use crate::error::RenderError;
use crate::models::{Bar, Instrument, Marker};

pub struct Reconciler {
    store:   SeriesStore,
    tracker: ViewportTracker,
    charts:  HashMap<Instrument, ChartHandle>,
}

impl Reconciler {
    pub fn new(store: SeriesStore, tracker: ViewportTracker) -> Self {
        Self { store, tracker, charts: HashMap::new() }
    }

    /// Registers the surface that renders `instrument`.
    pub fn attach(&mut self, instrument: Instrument, chart: ChartHandle) {
        self.charts.insert(instrument, chart);
    }

    pub fn store(&self) -> &SeriesStore {
        &self.store
    }

    pub fn viewport(&self, instrument: Instrument) -> Option<Viewport> {
        self.tracker.viewport(instrument)
    }

    fn chart(&self, instrument: Instrument) -> Result<&ChartHandle, RenderError> {
        self.charts.get(&instrument).ok_or(RenderError::Detached(instrument))
    }

    // ─── Bulk ─────────────────────────────────────────────────────────────────

    /// Snapshot load: replaces the series, pushes it with one `set_data`,
    /// then fits the chart to it. Returns the number of bars kept.
    pub fn load_snapshot(&mut self, instrument: Instrument, bars: Vec<Bar>) -> usize {
        let stored = self.store.replace(instrument, bars);
        let kept = stored.len();

        if let Some(chart) = self.charts.get(&instrument) {
            chart.set_data(stored);
            if let Some(view) = self.tracker.on_bulk_load(instrument, stored) {
                chart.fit_content();
                debug!(%instrument, from = view.range.from, to = view.range.to, "Fit to content");
            }
        } else {
            debug!(%instrument, "Snapshot stored without a chart attached");
        }

        info!(%instrument, bars = kept, "📥 Snapshot loaded");
        kept
    }

    // ─── Incremental ──────────────────────────────────────────────────────────

    /// One live bar. Rejected and invalid ticks never reach the surface.
    pub fn apply_tick(&mut self, instrument: Instrument, bar: Bar) -> UpsertOutcome {
        let outcome = self.store.upsert(instrument, bar);
        if !outcome.is_accepted() {
            return outcome;
        }

        let Some(chart) = self.charts.get(&instrument) else {
            return outcome;
        };
        let series = self.store.bars(instrument);
        let Some(live) = series.last() else {
            return outcome;
        };

        if let Err(e) = chart.update_point(live) {
            // Unreachable while the store gates every tick.
            warn!(%instrument, error = %e, "Surface refused update, re-pushing series");
            chart.set_data(series);
        }

        if let Some(view) = self.tracker.on_live_tick(instrument, series) {
            if let Err(e) = chart.set_visible_range(view.range) {
                debug!(%instrument, error = %e, "Trailing range not applied");
            }
        }

        outcome
    }

    // ─── Markers ──────────────────────────────────────────────────────────────

    pub fn set_markers(&mut self, instrument: Instrument, markers: Vec<Marker>) {
        let stored = self.store.set_markers(instrument, markers);
        if let Some(chart) = self.charts.get(&instrument) {
            chart.set_markers(stored);
        }
    }

    pub fn add_marker(&mut self, instrument: Instrument, marker: Marker) {
        let stored = self.store.add_marker(instrument, marker);
        if let Some(chart) = self.charts.get(&instrument) {
            chart.set_markers(stored);
        }
    }

    // ─── Reset ────────────────────────────────────────────────────────────────

    /// Empties one chart's bars and markers. Idempotent.
    pub fn clear(&mut self, instrument: Instrument) {
        self.store.clear(instrument);
        self.tracker.reset(instrument);
        if let Some(chart) = self.charts.get(&instrument) {
            chart.set_data(&[]);
            chart.set_markers(&[]);
        }
    }

    pub fn clear_all(&mut self) {
        for instrument in Instrument::ALL {
            self.clear(instrument);
        }
        self.tracker.reset_all();
        info!("🧹 All charts cleared");
    }

    // ─── Layout helpers ───────────────────────────────────────────────────────

    /// Shows the index chart's last `bars` bars on every chart.
    pub fn align(&self, bars: usize) -> Option<TimeRange> {
        let index = self.store.bars(Instrument::Index);
        let last = index.last()?;
        let start = index.len().saturating_sub(bars + 1);
        let range = TimeRange::new(index[start].time, last.time);

        for (instrument, chart) in &self.charts {
            if let Err(e) = chart.set_visible_range(range) {
                debug!(%instrument, error = %e, "Align skipped");
            }
        }
        Some(range)
    }

    /// Resizes one chart; zero-sized requests (hidden container) are ignored.
    pub fn resize(&self, instrument: Instrument, width: u32, height: u32) -> Result<(), RenderError> {
        let chart = self.chart(instrument)?;
        if width > 0 && height > 0 {
            chart.resize(width, height);
        }
        Ok(())
    }

    /// Current view mode of one chart, if any data has been shown.
    pub fn mode(&self, instrument: Instrument) -> Option<ViewportMode> {
        self.tracker.viewport(instrument).map(|v| v.mode)
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::chart::headless::HeadlessChart;
    use crate::chart::surface::ChartSurface;
    use crate::chart::viewport::TrackerConfig;
    use crate::models::Timestamp;

    fn make_bar(time: Timestamp, close: f64) -> Bar {
        Bar::new(time, close, close + 1.0, close - 1.0, close, 5.0)
    }

    fn make_reconciler() -> (Reconciler, Rc<HeadlessChart>) {
        let chart = Rc::new(HeadlessChart::new(Instrument::Index));
        let mut rec = Reconciler::new(SeriesStore::new(1000), ViewportTracker::new(TrackerConfig::default()));
        rec.attach(Instrument::Index, chart.clone());
        (rec, chart)
    }

    #[test]
    fn test_snapshot_uses_set_data_and_fits() {
        let (mut rec, chart) = make_reconciler();
        let kept = rec.load_snapshot(Instrument::Index, vec![make_bar(100, 11.0), make_bar(101, 12.0)]);
        assert_eq!(kept, 2);
        assert_eq!(chart.stats().set_data_calls, 1);
        assert_eq!(chart.visible_range(), Some(TimeRange::new(100, 101)));
        assert_eq!(rec.mode(Instrument::Index), Some(ViewportMode::FitContent));
    }

    #[test]
    fn test_ticks_use_update_only() {
        let (mut rec, chart) = make_reconciler();
        rec.load_snapshot(Instrument::Index, vec![make_bar(100, 11.0)]);
        for t in 101..110 {
            rec.apply_tick(Instrument::Index, make_bar(t, 12.0));
        }
        assert_eq!(chart.stats().set_data_calls, 1);
        assert_eq!(chart.stats().update_calls, 9);
        assert_eq!(chart.bars(), rec.store().bars(Instrument::Index));
        assert_eq!(rec.mode(Instrument::Index), Some(ViewportMode::Trailing));
    }

    #[test]
    fn test_rejected_tick_never_rendered() {
        let (mut rec, chart) = make_reconciler();
        rec.load_snapshot(Instrument::Index, vec![make_bar(100, 11.0), make_bar(105, 12.0)]);
        let outcome = rec.apply_tick(Instrument::Index, make_bar(101, 50.0));
        assert_eq!(outcome, UpsertOutcome::Rejected { drift: 4 });
        assert_eq!(chart.stats().update_calls, 0);
        assert_eq!(rec.mode(Instrument::Index), Some(ViewportMode::FitContent));
    }

    #[test]
    fn test_correction_renders_at_last_time() {
        let (mut rec, chart) = make_reconciler();
        rec.load_snapshot(Instrument::Index, vec![make_bar(100, 11.0), make_bar(101, 12.0)]);
        let outcome = rec.apply_tick(Instrument::Index, make_bar(100, 42.0));
        assert_eq!(outcome, UpsertOutcome::Corrected { stale_by: 1 });
        let rendered = chart.bars();
        assert_eq!(rendered.last().map(|b| (b.time, b.close)), Some((101, 42.0)));
        assert_eq!(rendered, rec.store().bars(Instrument::Index));
    }

    #[test]
    fn test_surface_divergence_is_resynced() {
        let (mut rec, chart) = make_reconciler();
        rec.load_snapshot(Instrument::Index, vec![make_bar(100, 11.0)]);
        // Someone else pushed a newer point straight to the surface.
        chart.update_point(&make_bar(500, 1.0)).unwrap();

        rec.apply_tick(Instrument::Index, make_bar(101, 12.0));
        assert_eq!(chart.stats().set_data_calls, 2);
        assert_eq!(chart.bars(), rec.store().bars(Instrument::Index));
    }

    #[test]
    fn test_rendered_series_follows_store_eviction() {
        let chart = Rc::new(HeadlessChart::with_capacity(Instrument::Index, 5));
        let mut rec = Reconciler::new(SeriesStore::new(5), ViewportTracker::new(TrackerConfig::default()));
        rec.attach(Instrument::Index, chart.clone());

        rec.load_snapshot(Instrument::Index, (100..105).map(|t| make_bar(t, 10.0)).collect());
        for t in 105..120 {
            let outcome = rec.apply_tick(Instrument::Index, make_bar(t, 11.0));
            assert_eq!(outcome, UpsertOutcome::Appended { evicted: true });
        }
        assert_eq!(chart.bars().len(), 5);
        assert_eq!(chart.bars(), rec.store().bars(Instrument::Index));
        assert_eq!(chart.stats().set_data_calls, 1);
    }

    #[test]
    fn test_empty_snapshot_drops_view() {
        let (mut rec, chart) = make_reconciler();
        rec.load_snapshot(Instrument::Index, vec![make_bar(100, 11.0), make_bar(101, 12.0)]);
        assert!(rec.viewport(Instrument::Index).is_some());

        assert_eq!(rec.load_snapshot(Instrument::Index, Vec::new()), 0);
        assert!(rec.viewport(Instrument::Index).is_none());
        assert!(chart.bars().is_empty());
        assert_eq!(chart.visible_range(), None);
    }

    #[test]
    fn test_markers_and_clear() {
        let (mut rec, chart) = make_reconciler();
        rec.load_snapshot(Instrument::Index, vec![make_bar(100, 11.0)]);
        let marker = Marker {
            time:     100,
            position: crate::models::MarkerPosition::AboveBar,
            shape:    crate::models::MarkerShape::ArrowDown,
            color:    "#EF5350".into(),
            text:     "SL".into(),
        };
        rec.set_markers(Instrument::Index, vec![marker.clone()]);
        rec.add_marker(Instrument::Index, marker);
        assert_eq!(chart.markers().len(), 2);

        rec.clear_all();
        rec.clear_all();
        assert!(chart.bars().is_empty());
        assert!(chart.markers().is_empty());
        assert!(rec.store().is_empty(Instrument::Index));
        assert!(rec.mode(Instrument::Index).is_none());
    }

    #[test]
    fn test_align_and_resize() {
        let (mut rec, chart) = make_reconciler();
        rec.load_snapshot(Instrument::Index, (100..200).map(|t| make_bar(t, 10.0)).collect());
        assert_eq!(rec.align(50), Some(TimeRange::new(149, 199)));
        assert_eq!(chart.visible_range(), Some(TimeRange::new(149, 199)));

        rec.resize(Instrument::Index, 0, 400).unwrap();
        assert_eq!(chart.size(), (300, 300));
        rec.resize(Instrument::Index, 800, 400).unwrap();
        assert_eq!(chart.size(), (800, 400));
        assert_eq!(rec.resize(Instrument::Pe, 1, 1), Err(RenderError::Detached(Instrument::Pe)));
    }
}
