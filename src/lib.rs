//! # OptionScalp chart core
//!
//! Three synchronized candlestick charts (index, call leg, put leg) fed by
//! one resilient WebSocket stream.
//!
//! ```text
//!  ws://…/ws ──▶ channel ──▶ dashboard ──▶ chart::Reconciler ──▶ SeriesStore
//!                  ▲            │                   │
//!                  │            ▼                   ▼
//!              commands     side panels       ChartSurface ×3 ◀──▶ ViewportSynchronizer
//! ```
//!
//! | Module      | Role                                                    |
//! |-------------|---------------------------------------------------------|
//! | `chart`     | series store, reconciler, viewport tracker, sync, surface |
//! | `channel`   | reconnecting transport, session state, typed dispatch   |
//! | `dashboard` | message routing, panel models, outbound commands        |
//! | `events`    | wire types                                              |
//! | `models`    | bars, markers, instruments, panel payloads              |
//! | `state`     | `AppContext` wiring                                     |

pub mod channel;
pub mod chart;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod events;
pub mod models;
pub mod state;
