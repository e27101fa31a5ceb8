//! Reconnect delay policy: `min(base * 2^attempt, cap)`, no jitter.

use std::time::Duration;

pub const DEFAULT_BASE_MS: u64 = 1_000;
pub const DEFAULT_CAP_MS: u64 = 30_000;
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub base:         Duration,
    pub cap:          Duration,
    pub max_attempts: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            base:         Duration::from_millis(DEFAULT_BASE_MS),
            cap:          Duration::from_millis(DEFAULT_CAP_MS),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl ReconnectPolicy {
    /// Delay before reconnect attempt number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let base_ms = u64::try_from(self.base.as_millis()).unwrap_or(u64::MAX);
        let cap_ms = u64::try_from(self.cap.as_millis()).unwrap_or(u64::MAX);
        let multiplier = 1u64.checked_shl(attempt.min(63)).unwrap_or(u64::MAX);
        Duration::from_millis(base_ms.saturating_mul(multiplier).min(cap_ms))
    }

    /// `false` once `attempt` is past the budget.
    pub fn allows(&self, attempt: u32) -> bool {
        attempt <= self.max_attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_delay_sequence() {
        let policy = ReconnectPolicy::default();
        let delays: Vec<u128> = (1..=5).map(|a| policy.delay_for(a).as_millis()).collect();
        assert_eq!(delays, vec![2000, 4000, 8000, 16000, 30000]);
    }

    #[test]
    fn test_delay_saturates_at_cap() {
        let policy = ReconnectPolicy::default();
        assert_eq!(policy.delay_for(64), Duration::from_millis(DEFAULT_CAP_MS));
        assert_eq!(policy.delay_for(u32::MAX), Duration::from_millis(DEFAULT_CAP_MS));
    }

    #[test]
    fn test_attempt_budget() {
        let policy = ReconnectPolicy::default();
        assert!(policy.allows(5));
        assert!(!policy.allows(6));
    }
}
