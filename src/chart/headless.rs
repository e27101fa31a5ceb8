//! # chart::headless
//!
//! In-memory [`ChartSurface`]. Behaves like the browser charting library
//! where it matters to the core:
//!
//! - `update_point` older than the last point fails,
//! - `set_visible_range` on an empty chart fails,
//! - programmatic range / crosshair changes notify subscribers synchronously,
//!   so the synchronizer's echo guard is exercised for real.
//!
//! Points appended through `update_point` are capped at the same retention
//! as the store, oldest dropped first.
//!
//! Used by the binary (no window) and by every test.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use tracing::trace;

use super::store::DEFAULT_RETENTION;
use super::surface::{
    ChartFactory, ChartHandle, ChartSurface, CrosshairHandler, RangeHandler, TimeRange,
};
use crate::error::RenderError;
use crate::models::{Bar, Instrument, Marker, Timestamp};

/// Call counters, for asserting what the core asked the surface to do.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    pub set_data_calls:      usize,
    pub update_calls:        usize,
    pub range_notifications: usize,
    pub crosshair_notifications: usize,
}

pub struct HeadlessChart {
    instrument: Instrument,
    capacity:   usize,
    bars:       RefCell<Vec<Bar>>,
    markers:    RefCell<Vec<Marker>>,
    range:      Cell<Option<TimeRange>>,
    crosshair:  Cell<Option<Timestamp>>,
    size:       Cell<(u32, u32)>,
    stats:      Cell<RenderStats>,

    crosshair_subs: RefCell<Vec<Rc<dyn Fn(Option<Timestamp>)>>>,
    range_subs:     RefCell<Vec<Rc<dyn Fn(Option<TimeRange>)>>>,
}

impl HeadlessChart {
    pub fn new(instrument: Instrument) -> Self {
        Self::with_capacity(instrument, DEFAULT_RETENTION)
    }

    pub fn with_capacity(instrument: Instrument, capacity: usize) -> Self {
        Self {
            instrument,
            capacity:       capacity.max(1),
            bars:           RefCell::new(Vec::new()),
            markers:        RefCell::new(Vec::new()),
            range:          Cell::new(None),
            crosshair:      Cell::new(None),
            size:           Cell::new((300, 300)),
            stats:          Cell::new(RenderStats::default()),
            crosshair_subs: RefCell::new(Vec::new()),
            range_subs:     RefCell::new(Vec::new()),
        }
    }

    pub fn instrument(&self) -> Instrument {
        self.instrument
    }

    pub fn bars(&self) -> Vec<Bar> {
        self.bars.borrow().clone()
    }

    pub fn markers(&self) -> Vec<Marker> {
        self.markers.borrow().clone()
    }

    pub fn visible_range(&self) -> Option<TimeRange> {
        self.range.get()
    }

    pub fn crosshair(&self) -> Option<Timestamp> {
        self.crosshair.get()
    }

    pub fn size(&self) -> (u32, u32) {
        self.size.get()
    }

    pub fn stats(&self) -> RenderStats {
        self.stats.get()
    }

    /// Pointer moved over `time`.
    pub fn hover(&self, time: Timestamp) {
        self.set_crosshair_position(time);
    }

    /// Pointer left the chart.
    pub fn leave(&self) {
        self.clear_crosshair_position();
    }

    fn bump(&self, f: impl FnOnce(&mut RenderStats)) {
        let mut stats = self.stats.get();
        f(&mut stats);
        self.stats.set(stats);
    }

    // Subscriber lists are cloned first: a handler may call back into this
    // chart (or subscribe) while we iterate.
    fn emit_range(&self, range: Option<TimeRange>) {
        self.bump(|s| s.range_notifications += 1);
        let subs = self.range_subs.borrow().clone();
        for handler in subs {
            handler(range);
        }
    }

    fn emit_crosshair(&self, time: Option<Timestamp>) {
        self.bump(|s| s.crosshair_notifications += 1);
        let subs = self.crosshair_subs.borrow().clone();
        for handler in subs {
            handler(time);
        }
    }
}

impl ChartSurface for HeadlessChart {
    fn set_data(&self, bars: &[Bar]) {
        trace!(instrument = %self.instrument, len = bars.len(), "set_data");
        *self.bars.borrow_mut() = bars.to_vec();
        if bars.is_empty() {
            self.range.set(None);
        }
        self.bump(|s| s.set_data_calls += 1);
    }

    fn update_point(&self, bar: &Bar) -> Result<(), RenderError> {
        {
            let mut bars = self.bars.borrow_mut();
            match bars.last().map(|b| b.time) {
                Some(last) if bar.time < last => {
                    return Err(RenderError::OutOfOrder { last, attempted: bar.time });
                }
                Some(last) if bar.time == last => {
                    if let Some(slot) = bars.last_mut() {
                        *slot = *bar;
                    }
                }
                _ => {
                    bars.push(*bar);
                    if bars.len() > self.capacity {
                        let excess = bars.len() - self.capacity;
                        bars.drain(..excess);
                    }
                }
            }
        }
        self.bump(|s| s.update_calls += 1);
        Ok(())
    }

    fn set_markers(&self, markers: &[Marker]) {
        *self.markers.borrow_mut() = markers.to_vec();
    }

    fn set_visible_range(&self, range: TimeRange) -> Result<(), RenderError> {
        if self.bars.borrow().is_empty() {
            return Err(RenderError::NoData);
        }
        self.range.set(Some(range));
        self.emit_range(Some(range));
        Ok(())
    }

    fn fit_content(&self) {
        let full = {
            let bars = self.bars.borrow();
            match (bars.first(), bars.last()) {
                (Some(first), Some(last)) => Some(TimeRange::new(first.time, last.time)),
                _ => None,
            }
        };
        if let Some(range) = full {
            self.range.set(Some(range));
            self.emit_range(Some(range));
        }
    }

    fn set_crosshair_position(&self, time: Timestamp) {
        self.crosshair.set(Some(time));
        self.emit_crosshair(Some(time));
    }

    fn clear_crosshair_position(&self) {
        self.crosshair.set(None);
        self.emit_crosshair(None);
    }

    fn subscribe_crosshair_move(&self, handler: CrosshairHandler) {
        self.crosshair_subs.borrow_mut().push(Rc::from(handler));
    }

    fn subscribe_visible_range_change(&self, handler: RangeHandler) {
        self.range_subs.borrow_mut().push(Rc::from(handler));
    }

    fn resize(&self, width: u32, height: u32) {
        self.size.set((width, height));
    }
}

/// Builds [`HeadlessChart`]s and keeps a typed handle to each for inspection.
pub struct HeadlessFactory {
    capacity: usize,
    charts:   RefCell<HashMap<Instrument, Rc<HeadlessChart>>>,
}

impl Default for HeadlessFactory {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_RETENTION)
    }
}

impl HeadlessFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Charts built by this factory keep at most `capacity` points.
    pub fn with_capacity(capacity: usize) -> Self {
        Self { capacity, charts: RefCell::new(HashMap::new()) }
    }

    pub fn chart(&self, instrument: Instrument) -> Option<Rc<HeadlessChart>> {
        self.charts.borrow().get(&instrument).cloned()
    }
}

impl ChartFactory for HeadlessFactory {
    fn create_series(&self, instrument: Instrument) -> Result<ChartHandle, RenderError> {
        let chart = Rc::new(HeadlessChart::with_capacity(instrument, self.capacity));
        self.charts.borrow_mut().insert(instrument, Rc::clone(&chart));
        Ok(chart)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(time: Timestamp, close: f64) -> Bar {
        Bar::new(time, close, close, close, close, 1.0)
    }

    #[test]
    fn test_update_point_rejects_older() {
        let chart = HeadlessChart::new(Instrument::Index);
        chart.set_data(&[bar(100, 1.0), bar(101, 2.0)]);
        assert_eq!(
            chart.update_point(&bar(100, 3.0)),
            Err(RenderError::OutOfOrder { last: 101, attempted: 100 }),
        );
        assert!(chart.update_point(&bar(101, 3.0)).is_ok());
        assert!(chart.update_point(&bar(102, 4.0)).is_ok());
        assert_eq!(chart.bars().len(), 3);
        assert_eq!(chart.bars()[1].close, 3.0);
    }

    #[test]
    fn test_appends_are_capped_oldest_first() {
        let chart = HeadlessChart::with_capacity(Instrument::Index, 3);
        chart.set_data(&[bar(100, 1.0), bar(101, 1.0)]);
        for t in 102..106 {
            chart.update_point(&bar(t, 2.0)).unwrap();
        }
        let times: Vec<_> = chart.bars().iter().map(|b| b.time).collect();
        assert_eq!(times, vec![103, 104, 105]);
    }

    #[test]
    fn test_range_needs_data() {
        let chart = HeadlessChart::new(Instrument::Ce);
        assert_eq!(chart.set_visible_range(TimeRange::new(1, 2)), Err(RenderError::NoData));
        chart.set_data(&[bar(5, 1.0), bar(9, 1.0)]);
        chart.fit_content();
        assert_eq!(chart.visible_range(), Some(TimeRange::new(5, 9)));
    }

    #[test]
    fn test_factory_keeps_handles() {
        let factory = HeadlessFactory::new();
        let handle = factory.create_series(Instrument::Pe).unwrap();
        handle.resize(640, 480);
        assert_eq!(factory.chart(Instrument::Pe).map(|c| c.size()), Some((640, 480)));
    }

    #[test]
    fn test_factory_passes_capacity() {
        let factory = HeadlessFactory::with_capacity(2);
        let handle = factory.create_series(Instrument::Ce).unwrap();
        for t in 1..=4 {
            handle.update_point(&bar(t, 1.0)).unwrap();
        }
        assert_eq!(factory.chart(Instrument::Ce).map(|c| c.bars().len()), Some(2));
    }
}
