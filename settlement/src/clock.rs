//! Injectable time source
//!
//! Receipt numbers embed the business day and issuance timestamps come
//! from the engine, so time is taken through a trait and swapped out in
//! tests.

/// Current-time provider
pub trait Clock: Send + Sync {
    /// Current Unix timestamp in milliseconds
    fn now_ms(&self) -> i64;
}

/// Wall-clock time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        shared::util::now_millis()
    }
}

/// Fixed time for tests
#[cfg(test)]
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub i64);

#[cfg(test)]
impl Clock for FixedClock {
    fn now_ms(&self) -> i64 {
        self.0
    }
}
