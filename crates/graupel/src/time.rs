use core::time::Duration;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

/// Custom epoch: Wednesday, January 1, 2025 00:00:00 UTC
pub const CUSTOM_EPOCH: Duration = Duration::from_millis(1_735_689_600_000);

/// Twitter epoch: Thursday, November 4, 2010 1:42:54.657 UTC
pub const TWITTER_EPOCH: Duration = Duration::from_millis(1_288_834_974_657);

/// Standard UNIX epoch: Thursday, January 1, 1970 00:00:00 UTC
pub const UNIX_EPOCH_MS: Duration = Duration::from_millis(0);

/// A source of timestamps for ID generation.
///
/// This abstraction lets you plug in a real clock, a monotonic timer, or a
/// mocked time source in tests. The unit is expected to be **milliseconds**
/// (or whatever tick unit your layout is sized for) relative to a
/// configurable origin.
///
/// Implementations must be cheap to call repeatedly: the generator polls
/// this in a tight loop while waiting out sequence exhaustion.
///
/// # Example
///
/// ```
/// use graupel::TimeSource;
///
/// struct FixedTime;
/// impl TimeSource for FixedTime {
///     fn current_millis(&self) -> u64 {
///         1234
///     }
/// }
///
/// let time = FixedTime;
/// assert_eq!(time.current_millis(), 1234);
/// ```
pub trait TimeSource {
    /// Returns the current time in milliseconds since the configured epoch.
    fn current_millis(&self) -> u64;
}

/// A monotonic time source that returns elapsed time since process start,
/// offset from a user-defined epoch.
///
/// This avoids wall-clock adjustments (e.g., NTP or daylight savings
/// changes) while still aligning timestamps to a fixed origin: the offset
/// between `SystemTime::now()` and the epoch is captured once at
/// construction, and every subsequent reading adds the monotonic time
/// elapsed since then. Readings never go backward, even if the system clock
/// is adjusted externally.
#[derive(Clone, Debug)]
pub struct MonotonicClock {
    start: Instant,
    epoch_offset: u64, // in milliseconds
}

impl Default for MonotonicClock {
    /// Constructs a monotonic clock aligned to the default [`CUSTOM_EPOCH`].
    ///
    /// Panics if system time is earlier than the custom epoch.
    fn default() -> Self {
        Self::with_epoch(CUSTOM_EPOCH)
    }
}

impl MonotonicClock {
    /// Constructs a monotonic clock using a custom epoch as the origin
    /// (t = 0), specified as a [`Duration`] since 1970-01-01 UTC.
    ///
    /// The epoch defines the zero-point of all timestamps returned by this
    /// clock, and with it how long a layout's timestamp field lasts before
    /// overflow (the standard 41-bit field holds ~69 years of milliseconds
    /// past the epoch).
    ///
    /// # Panics
    ///
    /// Panics if the current system time is earlier than the given epoch.
    ///
    /// # Example
    ///
    /// ```
    /// use graupel::{MonotonicClock, TimeSource, TWITTER_EPOCH};
    ///
    /// let clock = MonotonicClock::with_epoch(TWITTER_EPOCH);
    /// let a = clock.current_millis();
    /// let b = clock.current_millis();
    /// assert!(b >= a);
    /// ```
    pub fn with_epoch(epoch: Duration) -> Self {
        let system_now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock before UNIX_EPOCH");
        let offset = system_now
            .checked_sub(epoch)
            .expect("system clock before custom epoch")
            .as_millis() as u64;

        Self {
            start: Instant::now(),
            epoch_offset: offset,
        }
    }
}

impl TimeSource for MonotonicClock {
    /// Returns the number of milliseconds since the configured epoch, based
    /// on the elapsed monotonic time since construction.
    fn current_millis(&self) -> u64 {
        self.epoch_offset + self.start.elapsed().as_millis() as u64
    }
}
