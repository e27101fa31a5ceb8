//! # chart::surface
//!
//! The rendering capability the core drives. Anything that can draw a
//! candlestick series (a webview bridge, a native canvas, the in-memory
//! [`HeadlessChart`](super::headless::HeadlessChart)) implements
//! [`ChartSurface`]; the core never knows which one it talks to.
//!
//! Handles are `Rc<dyn ChartSurface>` and every method takes `&self`:
//! the synchronizer calls into sibling charts from inside another chart's
//! notification, so implementations keep their state behind `Cell`/`RefCell`
//! and must not hold a borrow while emitting notifications.

use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::error::RenderError;
use crate::models::{Bar, Instrument, Marker, Timestamp};

/// Visible time span of one chart, in bar timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub from: Timestamp,
    pub to:   Timestamp,
}

impl TimeRange {
    pub fn new(from: Timestamp, to: Timestamp) -> Self {
        Self { from, to }
    }
}

/// Crosshair notification: `None` means the pointer left the chart.
pub type CrosshairHandler = Box<dyn Fn(Option<Timestamp>)>;

/// Visible-range notification: `None` when the surface has nothing to show.
pub type RangeHandler = Box<dyn Fn(Option<TimeRange>)>;

/// Shared handle to one chart.
pub type ChartHandle = Rc<dyn ChartSurface>;

pub trait ChartSurface {
    /// Replaces the whole series (candles and volume).
    fn set_data(&self, bars: &[Bar]);

    /// Appends or rewrites the last point. Fails if `bar` predates it.
    fn update_point(&self, bar: &Bar) -> Result<(), RenderError>;

    fn set_markers(&self, markers: &[Marker]);

    /// Fails when the chart cannot place the range (e.g. no data yet).
    fn set_visible_range(&self, range: TimeRange) -> Result<(), RenderError>;

    fn fit_content(&self);

    fn set_crosshair_position(&self, time: Timestamp);

    fn clear_crosshair_position(&self);

    fn subscribe_crosshair_move(&self, handler: CrosshairHandler);

    fn subscribe_visible_range_change(&self, handler: RangeHandler);

    fn resize(&self, width: u32, height: u32);
}

/// Creates one chart + candlestick series per instrument.
pub trait ChartFactory {
    fn create_series(&self, instrument: Instrument) -> Result<ChartHandle, RenderError>;
}
