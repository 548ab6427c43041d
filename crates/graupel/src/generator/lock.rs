use parking_lot::Mutex;

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{
    error::{Error, Result},
    layout::{Layout, SnowflakeParts},
    time::{MonotonicClock, TimeSource},
};

/// State shared by every `next_id` call on one generator.
///
/// Mutated only inside the generator's lock. `last_timestamp` is `None`
/// until the first ID is minted.
struct GeneratorState {
    last_timestamp: Option<u64>,
    sequence: u64,
}

/// A lock-based Snowflake ID generator suitable for multi-threaded
/// environments.
///
/// The generator owns its [`Layout`], its clock, and the mutable state
/// (last-used tick, per-tick sequence) behind a single mutex, so the layout
/// and clock are fixed at construction and cannot drift between calls
/// against the same accumulated state. Construct one generator per logical
/// node; wrap it in an `Arc` to share across threads.
///
/// ## Features
/// - ✅ Thread-safe: all of `next_id` runs as one serialized region
/// - ✅ Any [`Layout`] bit split
/// - ✅ IDs from one generator are non-decreasing as unsigned integers
///
/// ## Blocking
/// When more than `max_sequence() + 1` IDs are requested within one clock
/// tick, the exhausted call busy-polls the clock *while holding the lock*
/// until it observes a strictly later tick. The call cannot be cancelled
/// or timed out: a delayed unique ID is preferred over a failure.
///
/// # Example
///
/// ```
/// use graupel::SnowflakeGenerator;
///
/// let generator = SnowflakeGenerator::standard();
/// let id = generator.next_id(42)?;
///
/// let parts = generator.decompose(id);
/// assert_eq!(parts.node_id, 42);
/// assert_eq!(parts.sequence, 0);
/// # Ok::<(), graupel::Error>(())
/// ```
pub struct SnowflakeGenerator<T = MonotonicClock>
where
    T: TimeSource,
{
    layout: Layout,
    clock: T,
    state: Mutex<GeneratorState>,
}

impl SnowflakeGenerator<MonotonicClock> {
    /// Creates a generator with the standard 41/10/12 layout and the
    /// default [`MonotonicClock`].
    ///
    /// # Panics
    ///
    /// Panics if the system time is earlier than [`CUSTOM_EPOCH`] (see
    /// [`MonotonicClock::default`]).
    ///
    /// [`CUSTOM_EPOCH`]: crate::CUSTOM_EPOCH
    pub fn standard() -> Self {
        Self::new(Layout::standard(), MonotonicClock::default())
    }
}

impl<T> SnowflakeGenerator<T>
where
    T: TimeSource,
{
    /// Creates a generator from a layout and a clock.
    ///
    /// # Parameters
    ///
    /// - `layout`: The bit split used to pack every ID this generator
    ///   mints. Decompose IDs under the same layout.
    /// - `clock`: A [`TimeSource`] supplying the timestamp for
    ///   [`Self::next_id`] and re-sampled on sequence exhaustion. It must
    ///   be cheap to call: it is polled in a tight loop while waiting for
    ///   the next tick.
    ///
    /// # Example
    ///
    /// ```
    /// use graupel::{Layout, MonotonicClock, SnowflakeGenerator, TWITTER_EPOCH};
    ///
    /// let layout = Layout::custom(43, 8, 12)?;
    /// let generator = SnowflakeGenerator::new(layout, MonotonicClock::with_epoch(TWITTER_EPOCH));
    /// let id = generator.next_id(255)?;
    /// # Ok::<(), graupel::Error>(())
    /// ```
    pub fn new(layout: Layout, clock: T) -> Self {
        Self {
            layout,
            clock,
            state: Mutex::new(GeneratorState {
                last_timestamp: None,
                sequence: 0,
            }),
        }
    }

    /// The layout this generator packs IDs with.
    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Mints the next ID at the clock's current time.
    ///
    /// Equivalent to [`Self::next_id_at`] with the generator clock's
    /// current reading as the timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidNodeId`] if `node_id` exceeds
    /// [`Layout::max_node_id`]. No state is mutated on failure.
    pub fn next_id(&self, node_id: u64) -> Result<u64> {
        self.next_id_at(node_id, self.clock.current_millis())
    }

    /// Mints the next ID for a caller-supplied timestamp.
    ///
    /// The whole read-modify-write below runs under the generator's lock,
    /// so concurrent callers receive IDs in lock-acquisition order:
    ///
    /// - If `timestamp` is on a strictly later tick than the last minted
    ///   ID, the sequence resets to 0 and `timestamp` is packed as given.
    /// - If the clock stalled or went backward (`timestamp` at or before
    ///   the last tick) and the current tick still has sequence room, the
    ///   ID is issued within the **current** tick with the next sequence
    ///   value. The stale caller timestamp is not packed: minted IDs never
    ///   sort below their predecessors.
    /// - If the current tick's sequence is exhausted, the call busy-polls
    ///   the clock until it observes a tick strictly after the last one,
    ///   then mints at that tick with sequence 0, overriding the caller's
    ///   timestamp.
    ///
    /// The timestamp that gets packed is always the one recorded as the
    /// new last tick.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidNodeId`] if `node_id` exceeds
    /// [`Layout::max_node_id`]. No state is mutated on failure.
    ///
    /// # Example
    ///
    /// ```
    /// use graupel::{Layout, MonotonicClock, SnowflakeGenerator};
    ///
    /// let generator = SnowflakeGenerator::new(Layout::standard(), MonotonicClock::default());
    ///
    /// let id = generator.next_id_at(7, 123_456_789)?;
    /// let parts = generator.decompose(id);
    /// assert_eq!(parts.timestamp, 123_456_789);
    /// assert_eq!(parts.node_id, 7);
    /// assert_eq!(parts.sequence, 0);
    /// # Ok::<(), graupel::Error>(())
    /// ```
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    pub fn next_id_at(&self, node_id: u64, timestamp: u64) -> Result<u64> {
        if node_id > self.layout.max_node_id() {
            return Err(Error::InvalidNodeId {
                node_id,
                max: self.layout.max_node_id(),
            });
        }

        let mut state = self.state.lock();

        let (effective, sequence) = match state.last_timestamp {
            Some(last) if timestamp <= last => {
                if state.sequence < self.layout.max_sequence() {
                    (last, state.sequence + 1)
                } else {
                    (self.spin_until_after(last), 0)
                }
            }
            _ => (timestamp, 0),
        };

        state.last_timestamp = Some(effective);
        state.sequence = sequence;

        Ok(self.layout.pack(effective, node_id, sequence))
    }

    /// Extracts the timestamp, node identifier, and sequence from an ID
    /// packed under this generator's layout.
    ///
    /// Pure arithmetic: touches no shared state, takes no lock, and is
    /// callable concurrently with [`Self::next_id`]. Defined for every
    /// 64-bit input; see [`Layout::decompose`].
    ///
    /// # Example
    ///
    /// ```
    /// use graupel::SnowflakeGenerator;
    ///
    /// let generator = SnowflakeGenerator::standard();
    /// let id = generator.next_id(5)?;
    /// assert_eq!(generator.decompose(id).node_id, 5);
    /// # Ok::<(), graupel::Error>(())
    /// ```
    pub fn decompose(&self, id: u64) -> SnowflakeParts {
        self.layout.decompose(id)
    }

    /// Busy-polls the clock until it reports a tick strictly after `last`.
    ///
    /// Runs inside the state lock, so every other caller queues behind the
    /// wait. Unbounded: returns only once the clock advances.
    #[cold]
    #[inline(never)]
    fn spin_until_after(&self, last: u64) -> u64 {
        loop {
            let now = self.clock.current_millis();
            if now > last {
                break now;
            }
            core::hint::spin_loop();
        }
    }
}
