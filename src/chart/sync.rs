//! # chart::sync
//!
//! **Viewport Synchronizer**: keeps crosshair and visible range identical
//! across the index / CE / PE charts.
//!
//! ```text
//!  user pans A ─▶ A notifies ─▶ [guard acquired] ─▶ B.set_visible_range
//!                                                 │    └─ B notifies ─▶ guard held → ignored
//!                                                 └─▶ C.set_visible_range
//!                                                      └─ C notifies ─▶ guard held → ignored
//!                               [guard released]
//! ```
//!
//! One flag is shared by every subscription. It is only taken through
//! [`SyncGuard`], which clears it on drop.

use std::cell::Cell;
use std::rc::{Rc, Weak};

use tracing::debug;

use super::surface::{ChartHandle, ChartSurface, TimeRange};
use crate::models::Timestamp;

// ─── Guard ────────────────────────────────────────────────────────────────────

/// Shared re-entrancy flag.
#[derive(Debug, Clone, Default)]
pub struct SyncFlag(Rc<Cell<bool>>);

impl SyncFlag {
    /// `None` while another mirror is in flight.
    pub fn try_acquire(&self) -> Option<SyncGuard> {
        if self.0.replace(true) {
            return None;
        }
        Some(SyncGuard(Rc::clone(&self.0)))
    }

    pub fn is_syncing(&self) -> bool {
        self.0.get()
    }
}

/// Held for the duration of one mirror pass.
#[derive(Debug)]
pub struct SyncGuard(Rc<Cell<bool>>);

impl Drop for SyncGuard {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

// ─── Synchronizer ─────────────────────────────────────────────────────────────

/// Owns the subscriptions' shared flag. Subscriptions hold weak sibling
/// handles, so dropping the charts releases everything.
pub struct ViewportSynchronizer {
    flag:   SyncFlag,
    charts: usize,
}

impl ViewportSynchronizer {
    /// Subscribes every chart to mirror onto all the others.
    pub fn attach(charts: &[ChartHandle]) -> Self {
        let flag = SyncFlag::default();

        for (index, chart) in charts.iter().enumerate() {
            let siblings: Rc<[Weak<dyn ChartSurface>]> = charts
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != index)
                .map(|(_, c)| Rc::downgrade(c))
                .collect();

            // ── Crosshair ────────────────────────────────────────────────────
            let (guard_flag, others) = (flag.clone(), Rc::clone(&siblings));
            chart.subscribe_crosshair_move(Box::new(move |time| {
                let Some(_guard) = guard_flag.try_acquire() else { return };
                mirror_crosshair(&others, time);
            }));

            // ── Visible range ────────────────────────────────────────────────
            let (guard_flag, others) = (flag.clone(), Rc::clone(&siblings));
            chart.subscribe_visible_range_change(Box::new(move |range| {
                let Some(range) = range else { return };
                let Some(_guard) = guard_flag.try_acquire() else { return };
                mirror_range(&others, range);
            }));
        }

        debug!(charts = charts.len(), "🔗 Chart sync attached");
        Self { flag, charts: charts.len() }
    }

    pub fn is_syncing(&self) -> bool {
        self.flag.is_syncing()
    }

    pub fn chart_count(&self) -> usize {
        self.charts
    }
}

fn mirror_crosshair(siblings: &[Weak<dyn ChartSurface>], time: Option<Timestamp>) {
    for chart in siblings.iter().filter_map(Weak::upgrade) {
        match time {
            Some(t) => chart.set_crosshair_position(t),
            // Pointer left: clear everywhere rather than leave stale markers.
            None => chart.clear_crosshair_position(),
        }
    }
}

fn mirror_range(siblings: &[Weak<dyn ChartSurface>], range: TimeRange) {
    for chart in siblings.iter().filter_map(Weak::upgrade) {
        if let Err(e) = chart.set_visible_range(range) {
            debug!(error = %e, "Sibling rejected mirrored range");
        }
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
