use std::sync::{Arc, RwLock};

use time::{Duration, OffsetDateTime};

/// Source of the current UTC time.
pub trait Clock: Send + Sync {
    fn now_utc(&self) -> OffsetDateTime;
}

/// Shared clock handle.
pub type SharedClock = Arc<dyn Clock>;

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

/// Clock pinned to an instant until moved explicitly.
#[derive(Debug)]
pub struct FixedClock {
    now: RwLock<OffsetDateTime>,
}

impl FixedClock {
    pub fn new(now: OffsetDateTime) -> Self {
        Self {
            now: RwLock::new(now),
        }
    }

    /// Pin the clock to the current wall time.
    pub fn at_now() -> Self {
        Self::new(OffsetDateTime::now_utc())
    }

    pub fn set(&self, now: OffsetDateTime) {
        if let Ok(mut guard) = self.now.write() {
            *guard = now;
        }
    }

    pub fn advance(&self, by: Duration) {
        if let Ok(mut guard) = self.now.write() {
            *guard += by;
        }
    }
}

impl Clock for FixedClock {
    fn now_utc(&self) -> OffsetDateTime {
        match self.now.read() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}
