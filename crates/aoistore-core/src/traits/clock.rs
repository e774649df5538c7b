//! Time source abstraction.
//!
//! Every timestamp the store records (node creation, removal, version
//! creation) is taken from a [`Clock`], so tests can pin versions to exact
//! instants with [`ManualClock`] while production uses [`SystemClock`].

use std::sync::Mutex;

use chrono::{DateTime, Duration, TimeZone, Utc};

/// Source of the current instant.
pub trait Clock: Send + Sync + std::fmt::Debug + 'static {
    /// Current wall-clock instant.
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock backed by `Utc::now()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to.
///
/// With a non-zero step every read also advances it, which models the
/// wall clock moving between two reads.
#[derive(Debug)]
pub struct ManualClock {
    current: Mutex<DateTime<Utc>>,
    step: Mutex<Duration>,
}

impl ManualClock {
    /// Create a clock frozen at `start`.
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            current: Mutex::new(start),
            step: Mutex::new(Duration::zero()),
        }
    }

    /// Create a clock frozen `seconds` after the Unix epoch.
    pub fn at_seconds(seconds: i64) -> Self {
        Self::new(epoch_seconds(seconds))
    }

    /// Jump to an absolute instant.
    pub fn set(&self, instant: DateTime<Utc>) {
        let mut current = self.current.lock().unwrap_or_else(|p| p.into_inner());
        *current = instant;
    }

    /// Jump to `seconds` after the Unix epoch.
    pub fn set_seconds(&self, seconds: i64) {
        self.set(epoch_seconds(seconds));
    }

    /// Advance by `step` after every read.
    pub fn set_step(&self, step: Duration) {
        *self.step.lock().unwrap_or_else(|p| p.into_inner()) = step;
    }

    /// Move forward by `by`.
    pub fn advance(&self, by: Duration) {
        let mut current = self.current.lock().unwrap_or_else(|p| p.into_inner());
        *current += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        let step = *self.step.lock().unwrap_or_else(|p| p.into_inner());
        let mut current = self.current.lock().unwrap_or_else(|p| p.into_inner());
        let now = *current;
        *current += step;
        now
    }
}

/// Instant `seconds` after the Unix epoch.
pub fn epoch_seconds(seconds: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(seconds, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}
