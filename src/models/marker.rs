//! # models::marker
//!
//! Trade markers drawn on top of a series. Field names and enum spellings
//! follow the lightweight-charts wire shape the server already emits.

use serde::{Deserialize, Serialize};

use super::bar::Timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MarkerPosition {
    AboveBar,
    BelowBar,
    InBar,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MarkerShape {
    ArrowUp,
    ArrowDown,
    Circle,
    Square,
}

/// A single annotation pinned to a bar time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub time:     Timestamp,
    pub position: MarkerPosition,
    pub shape:    MarkerShape,
    pub color:    String,
    #[serde(default)]
    pub text:     String,
}
