//! Time source for defaulted log timestamps.
//!
//! Loki expects timestamps as decimal nanoseconds since the Unix epoch. The
//! clock is injected so tests can pin timestamps, and so runtimes without a
//! usable `SystemTime` (wasm32 Workers) can supply their own.

use chrono::Utc;

pub trait Clock {
    /// Current time in nanoseconds since the Unix epoch.
    fn now_nanos(&self) -> i64;

    /// Current time rendered the way Loki wants it.
    fn timestamp(&self) -> String {
        self.now_nanos().to_string()
    }
}

/// Wall clock backed by `chrono::Utc`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_nanos(&self) -> i64 {
        let now = Utc::now();
        // Out of range only past year 2262; fall back to millisecond precision.
        now.timestamp_nanos_opt()
            .unwrap_or_else(|| now.timestamp_millis().saturating_mul(1_000_000))
    }
}

/// Clock that always returns the same instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    nanos: i64,
}

impl FixedClock {
    pub const fn new(nanos: i64) -> Self {
        Self { nanos }
    }
}

impl Clock for FixedClock {
    fn now_nanos(&self) -> i64 {
        self.nanos
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_clock_timestamp() {
        let clock = FixedClock::new(1_705_327_800_000_000_000);
        assert_eq!(clock.timestamp(), "1705327800000000000");
    }

    #[test]
    fn test_system_clock_is_nanosecond_scale() {
        // 2020-01-01T00:00:00Z in nanoseconds
        let lower_bound = 1_577_836_800_000_000_000_i64;
        let nanos = SystemClock.now_nanos();
        assert!(nanos > lower_bound);
        assert_eq!(SystemClock.timestamp().len(), 19);
    }
}
