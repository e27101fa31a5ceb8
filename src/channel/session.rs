//! # channel::session
//!
//! Pure connection state machine. No I/O: the client feeds it transport
//! events and acts on what it returns.
//!
//! ```text
//!  Idle ─connect─▶ Connecting ─open─▶ Open ─close─▶ Closed ─timer─▶ Connecting …
//!                      │                               │
//!                      └──────────close────────────────┘
//!  any ─disconnect─▶ Disconnected          Closed after max_attempts ─▶ GaveUp
//! ```
//!
//! Every connect bumps `generation`. Events tagged with an older generation
//! belong to a socket or timer we have already abandoned.

use std::fmt;
use std::time::Duration;

use tracing::{error, info, warn};

use super::backoff::ReconnectPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Idle,
    Connecting,
    Open,
    Closed,
    Disconnected,
    GaveUp,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionState::Idle         => "idle",
            ConnectionState::Connecting   => "connecting",
            ConnectionState::Open         => "open",
            ConnectionState::Closed       => "closed",
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::GaveUp       => "gave_up",
        };
        f.write_str(s)
    }
}

/// What to do after a close.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseOutcome {
    Reconnect { attempt: u32, delay: Duration, generation: u64 },
    GaveUp { attempts: u32 },
    /// Stale or deliberate close; nothing to do.
    Ignored,
}

#[derive(Debug)]
pub struct ChannelSession {
    policy:     ReconnectPolicy,
    state:      ConnectionState,
    attempt:    u32,
    generation: u64,
}

impl ChannelSession {
    pub fn new(policy: ReconnectPolicy) -> Self {
        Self { policy, state: ConnectionState::Idle, attempt: 0, generation: 0 }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn policy(&self) -> ReconnectPolicy {
        self.policy
    }

    pub fn is_open(&self) -> bool {
        self.state == ConnectionState::Open
    }

    /// `true` when an event from `generation` still concerns the live attempt.
    pub fn accepts(&self, generation: u64) -> bool {
        generation == self.generation
            && !matches!(self.state, ConnectionState::Disconnected | ConnectionState::GaveUp)
    }

    /// Starts a fresh attempt and returns its generation token.
    pub fn begin_connect(&mut self) -> u64 {
        self.generation += 1;
        self.state = ConnectionState::Connecting;
        self.generation
    }

    /// Explicit `connect()` from the user: resets the attempt budget.
    pub fn restart(&mut self) -> u64 {
        self.attempt = 0;
        self.begin_connect()
    }

    pub fn on_open(&mut self, generation: u64) -> bool {
        if !self.accepts(generation) {
            return false;
        }
        self.state = ConnectionState::Open;
        self.attempt = 0;
        true
    }

    pub fn on_close(&mut self, generation: u64) -> CloseOutcome {
        if !self.accepts(generation) {
            return CloseOutcome::Ignored;
        }

        self.attempt += 1;
        if !self.policy.allows(self.attempt) {
            self.state = ConnectionState::GaveUp;
            error!(attempts = self.policy.max_attempts, "❌ Giving up reconnecting");
            return CloseOutcome::GaveUp { attempts: self.policy.max_attempts };
        }

        self.state = ConnectionState::Closed;
        let delay = self.policy.delay_for(self.attempt);
        warn!(
            attempt  = self.attempt,
            max      = self.policy.max_attempts,
            delay_ms = delay.as_millis() as u64,
            "🔄 Reconnecting"
        );
        CloseOutcome::Reconnect { attempt: self.attempt, delay, generation: self.generation }
    }

    /// A backoff timer fired. Returns the new generation if we should dial.
    pub fn on_reconnect_due(&mut self, generation: u64) -> Option<u64> {
        if generation != self.generation || self.state != ConnectionState::Closed {
            return None;
        }
        Some(self.begin_connect())
    }

    /// Deliberate shutdown. Invalidates every outstanding event and timer.
    pub fn disconnect(&mut self) {
        self.generation += 1;
        self.state = ConnectionState::Disconnected;
        info!("🔌 Channel disconnected");
    }
}
