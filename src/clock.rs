use chrono::{DateTime, Utc};

/// Wall-clock time source for the stores.
///
/// Injected at construction so overdue/today filtering, quota cleanup
/// cutoffs, and timestamp assignment are deterministic under test.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock backed by the system time
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
