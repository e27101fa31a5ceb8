//! # chart::store
//!
//! **Series Store**: per-instrument ordered bar buffer with bounded retention.
//!
//! Invariant held for every instrument: `time` strictly increasing across the
//! stored bars. The last bar is the in-progress one and may be rewritten in
//! place while its `time` stays put.
//!
//! ```text
//!  upsert(bar) vs last stored L
//!     │
//!     ├─ store empty            → insert
//!     ├─ bar.time >  L.time     → append (evict oldest past the ceiling)
//!     ├─ bar.time == L.time     → rewrite L
//!     ├─ L.time - bar.time <= 1 → rewrite L, keep L.time   (sub-second reorder)
//!     └─ L.time - bar.time >  1 → reject (drift warning)
//! ```

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::models::{Bar, Instrument, Marker, Timestamp};

/// Bars kept per instrument before the oldest is evicted.
pub const DEFAULT_RETENTION: usize = 1000;

/// Back-dated ticks within this many seconds of the last bar are folded into it.
pub const DRIFT_TOLERANCE_SECS: Timestamp = 1;

// ─── Outcome ──────────────────────────────────────────────────────────────────

/// What [`SeriesStore::upsert`] did with a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// First bar of an empty series.
    Inserted,
    /// New bar after the last one; `evicted` when the ceiling pushed one out.
    Appended { evicted: bool },
    /// Same time as the last bar, rewritten in place.
    Updated,
    /// Slightly older than the last bar, folded into it.
    Corrected { stale_by: Timestamp },
    /// Too old; the store is untouched.
    Rejected { drift: Timestamp },
    /// Non-positive prices; the store is untouched.
    Invalid,
}

impl UpsertOutcome {
    /// `true` when the store changed and the surface must be told.
    pub fn is_accepted(&self) -> bool {
        !matches!(self, UpsertOutcome::Rejected { .. } | UpsertOutcome::Invalid)
    }
}

// ─── Store ────────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct Series {
    bars:    Vec<Bar>,
    markers: Vec<Marker>,
}

#[derive(Debug)]
pub struct SeriesStore {
    retention: usize,
    series:    HashMap<Instrument, Series>,
}

impl Default for SeriesStore {
    fn default() -> Self {
        Self::new(DEFAULT_RETENTION)
    }
}

impl SeriesStore {
    pub fn new(retention: usize) -> Self {
        Self {
            retention: retention.max(1),
            series:    HashMap::new(),
        }
    }

    /// Bulk load. Unpriced placeholder bars are dropped, the rest ordered by
    /// time (last duplicate wins) and cut to the newest `retention` bars.
    /// Returns the stored sequence.
    pub fn replace(&mut self, instrument: Instrument, bars: Vec<Bar>) -> &[Bar] {
        let received = bars.len();
        let mut priced: Vec<Bar> = bars.into_iter().filter(Bar::is_priced).collect();
        let dropped = received - priced.len();

        priced.sort_by_key(|b| b.time);
        let mut ordered: Vec<Bar> = Vec::with_capacity(priced.len());
        for bar in priced {
            if ordered.last().is_some_and(|last| last.time == bar.time) {
                ordered.pop();
            }
            ordered.push(bar);
        }

        if ordered.len() > self.retention {
            let excess = ordered.len() - self.retention;
            ordered.drain(..excess);
        }

        if dropped > 0 {
            debug!(%instrument, dropped, kept = ordered.len(), "Dropped unpriced bars from snapshot");
        }

        let series = self.series.entry(instrument).or_default();
        series.bars = ordered;
        &series.bars
    }

    /// Merges one live tick. See the module diagram for the rules.
    pub fn upsert(&mut self, instrument: Instrument, bar: Bar) -> UpsertOutcome {
        if !bar.is_priced() {
            debug!(%instrument, time = bar.time, "Ignoring unpriced tick");
            return UpsertOutcome::Invalid;
        }

        let retention = self.retention;
        let series = self.series.entry(instrument).or_default();

        let Some(last_time) = series.bars.last().map(|b| b.time) else {
            series.bars.push(bar);
            return UpsertOutcome::Inserted;
        };

        if bar.time > last_time {
            series.bars.push(bar);
            let evicted = series.bars.len() > retention;
            if evicted {
                series.bars.remove(0);
            }
            return UpsertOutcome::Appended { evicted };
        }

        let stale_by = last_time - bar.time;
        if stale_by > DRIFT_TOLERANCE_SECS {
            warn!(
                %instrument,
                last = last_time,
                new  = bar.time,
                diff = stale_by,
                "⚠️ Ignoring back-dated candle"
            );
            return UpsertOutcome::Rejected { drift: stale_by };
        }

        // Same instant, or a sub-second reorder folded into the live bar.
        let tail = series.bars.len() - 1;
        let last = &mut series.bars[tail];
        if stale_by == 0 {
            *last = bar;
            UpsertOutcome::Updated
        } else {
            last.absorb(&bar);
            UpsertOutcome::Corrected { stale_by }
        }
    }

    pub fn bars(&self, instrument: Instrument) -> &[Bar] {
        self.series
            .get(&instrument)
            .map(|s| s.bars.as_slice())
            .unwrap_or(&[])
    }

    pub fn last(&self, instrument: Instrument) -> Option<&Bar> {
        self.bars(instrument).last()
    }

    pub fn len(&self, instrument: Instrument) -> usize {
        self.bars(instrument).len()
    }

    pub fn is_empty(&self, instrument: Instrument) -> bool {
        self.bars(instrument).is_empty()
    }

    pub fn markers(&self, instrument: Instrument) -> &[Marker] {
        self.series
            .get(&instrument)
            .map(|s| s.markers.as_slice())
            .unwrap_or(&[])
    }

    /// Replaces the marker list wholesale; returns the stored list.
    pub fn set_markers(&mut self, instrument: Instrument, markers: Vec<Marker>) -> &[Marker] {
        let series = self.series.entry(instrument).or_default();
        series.markers = markers;
        &series.markers
    }

    /// Appends one marker; returns the stored list.
    pub fn add_marker(&mut self, instrument: Instrument, marker: Marker) -> &[Marker] {
        let series = self.series.entry(instrument).or_default();
        series.markers.push(marker);
        &series.markers
    }

    pub fn clear(&mut self, instrument: Instrument) {
        if let Some(series) = self.series.get_mut(&instrument) {
            series.bars.clear();
            series.markers.clear();
        }
    }

    pub fn clear_all(&mut self) {
        for series in self.series.values_mut() {
            series.bars.clear();
            series.markers.clear();
        }
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MarkerPosition, MarkerShape};

    const IDX: Instrument = Instrument::Index;

    fn make_bar(time: Timestamp, close: f64) -> Bar {
        Bar::new(time, close, close * 1.1, close * 0.9, close, 10.0)
    }

    fn make_marker(time: Timestamp) -> Marker {
        Marker {
            time,
            position: MarkerPosition::BelowBar,
            shape:    MarkerShape::ArrowUp,
            color:    "#26A69A".into(),
            text:     "BUY".into(),
        }
    }

    fn loaded_store() -> SeriesStore {
        let mut store = SeriesStore::default();
        store.replace(IDX, vec![make_bar(100, 11.0), make_bar(101, 12.0), make_bar(102, 13.0)]);
        store
    }

    fn assert_strictly_increasing(bars: &[Bar]) {
        assert!(bars.windows(2).all(|w| w[0].time < w[1].time), "times not strictly increasing");
    }

    #[test]
    fn test_replace_drops_unpriced_and_orders() {
        let mut store = SeriesStore::default();
        let stored = store.replace(IDX, vec![
            make_bar(102, 13.0),
            Bar::new(101, 0.0, 0.0, 0.0, 0.0, 0.0),
            make_bar(100, 11.0),
            make_bar(102, 14.0),
            Bar::new(103, 5.0, -1.0, 5.0, 5.0, 0.0),
        ]);
        assert_eq!(stored.len(), 2);
        assert!(stored.iter().all(Bar::is_priced));
        assert_strictly_increasing(stored);
        assert_eq!(stored[1].close, 14.0);
    }

    #[test]
    fn test_replace_applies_retention() {
        let mut store = SeriesStore::new(3);
        let stored = store.replace(IDX, (0..10).map(|t| make_bar(t, 1.0 + t as f64)).collect());
        assert_eq!(stored.iter().map(|b| b.time).collect::<Vec<_>>(), vec![7, 8, 9]);
    }

    #[test]
    fn test_upsert_into_empty_inserts() {
        let mut store = SeriesStore::default();
        assert_eq!(store.upsert(Instrument::Ce, make_bar(50, 2.0)), UpsertOutcome::Inserted);
        assert_eq!(store.len(Instrument::Ce), 1);
    }

    #[test]
    fn test_upsert_same_bar_twice_is_idempotent() {
        let mut store = loaded_store();
        let bar = make_bar(103, 13.0);
        store.upsert(IDX, bar);
        let len = store.len(IDX);
        assert_eq!(store.upsert(IDX, bar), UpsertOutcome::Updated);
        assert_eq!(store.len(IDX), len);
        assert_eq!(store.last(IDX), Some(&bar));
    }

    #[test]
    fn test_upsert_non_decreasing_never_shrinks() {
        let mut store = SeriesStore::default();
        let times = [1, 1, 2, 2, 2, 5, 6, 6, 9];
        let mut prev_len = 0;
        for (i, t) in times.into_iter().enumerate() {
            store.upsert(IDX, make_bar(t, 1.0 + i as f64));
            assert!(store.len(IDX) >= prev_len);
            prev_len = store.len(IDX);
        }
        assert_eq!(prev_len, 5);
        assert_strictly_increasing(store.bars(IDX));
    }

    #[test]
    fn test_upsert_rejects_beyond_tolerance() {
        let mut store = loaded_store();
        let before = store.bars(IDX).to_vec();
        assert_eq!(store.upsert(IDX, make_bar(100, 99.0)), UpsertOutcome::Rejected { drift: 2 });
        assert_eq!(store.bars(IDX), before.as_slice());
    }

    #[test]
    fn test_upsert_corrects_within_tolerance() {
        let mut store = loaded_store();
        assert_eq!(store.upsert(IDX, make_bar(101, 99.0)), UpsertOutcome::Corrected { stale_by: 1 });
        let last = store.last(IDX).copied().unwrap();
        assert_eq!(last.time, 102);
        assert_eq!(last.close, 99.0);
        assert_eq!(store.len(IDX), 3);
        assert_strictly_increasing(store.bars(IDX));
    }

    #[test]
    fn test_upsert_ignores_unpriced_tick() {
        let mut store = loaded_store();
        let outcome = store.upsert(IDX, Bar::new(103, 0.0, 0.0, 0.0, 0.0, 0.0));
        assert_eq!(outcome, UpsertOutcome::Invalid);
        assert_eq!(store.len(IDX), 3);
    }

    #[test]
    fn test_retention_evicts_oldest() {
        let mut store = SeriesStore::new(1000);
        for t in 0..1001 {
            store.upsert(IDX, make_bar(t, 5.0));
        }
        assert_eq!(store.len(IDX), 1000);
        assert_eq!(store.bars(IDX)[0].time, 1);
        assert_eq!(store.last(IDX).map(|b| b.time), Some(1000));
    }

    #[test]
    fn test_markers_and_clear_are_idempotent() {
        let mut store = loaded_store();
        store.set_markers(IDX, vec![make_marker(100)]);
        assert_eq!(store.add_marker(IDX, make_marker(101)).len(), 2);

        store.clear(IDX);
        store.clear(IDX);
        assert!(store.is_empty(IDX));
        assert!(store.markers(IDX).is_empty());

        store.clear_all();
        assert!(store.is_empty(Instrument::Pe));
    }
}
