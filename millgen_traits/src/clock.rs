use std::time::{Duration, SystemTime};

/// Wall-clock abstraction used to name output artifacts.
///
/// - now(): current wall-clock time
/// - ms_since_epoch(): helper for millisecond-resolution names
pub trait Clock {
    fn now(&self) -> SystemTime;

    /// Milliseconds since the Unix epoch, saturating at 0 for pre-epoch times.
    fn ms_since_epoch(&self) -> u128 {
        self.now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap_or(Duration::ZERO)
            .as_millis()
    }
}

/// Default clock backed by `SystemTime::now()`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl SystemClock {
    #[inline]
    pub fn new() -> Self {
        Self
    }
}

impl Clock for SystemClock {
    #[inline]
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// Deterministic clock pinned to a fixed instant.
///
/// now() = epoch + offset, where the offset can be moved for tests that
/// need two distinct artifact names.
#[derive(Debug, Clone)]
pub struct FixedClock {
    offset: std::sync::Arc<std::sync::Mutex<Duration>>,
}

impl FixedClock {
    pub fn at_unix_ms(ms: u64) -> Self {
        Self {
            offset: std::sync::Arc::new(std::sync::Mutex::new(Duration::from_millis(ms))),
        }
    }

    /// Advance the clock by the given duration.
    pub fn advance(&self, d: Duration) {
        if let Ok(mut off) = self.offset.lock() {
            *off = off.saturating_add(d);
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> SystemTime {
        let off = self.offset.lock().map(|g| *g).unwrap_or(Duration::ZERO);
        SystemTime::UNIX_EPOCH + off
    }
}
