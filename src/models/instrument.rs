//! # models::instrument
//!
//! The three legs shown side by side on the dashboard.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Which chart / series a datum belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Instrument {
    /// The underlying index (BANKNIFTY, NIFTY, ...)
    Index,
    /// Call option leg
    Ce,
    /// Put option leg
    Pe,
}

impl Instrument {
    /// Fixed display order: index on top, then CE, then PE.
    pub const ALL: [Instrument; 3] = [Instrument::Index, Instrument::Ce, Instrument::Pe];

    /// Prefix the server uses for per-leg payload keys (`index_data`, `ce_markers`, ...).
    pub fn key(self) -> &'static str {
        match self {
            Instrument::Index => "index",
            Instrument::Ce    => "ce",
            Instrument::Pe    => "pe",
        }
    }

    /// Picks the leg from the role booleans carried by `live_update` / `marker_update`.
    /// `is_index` wins over `is_ce`, which wins over `is_pe`.
    pub fn from_flags(is_index: bool, is_ce: bool, is_pe: bool) -> Option<Self> {
        if is_index {
            Some(Instrument::Index)
        } else if is_ce {
            Some(Instrument::Ce)
        } else if is_pe {
            Some(Instrument::Pe)
        } else {
            None
        }
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}
