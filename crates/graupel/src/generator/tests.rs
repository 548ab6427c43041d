use crate::{Error, Layout, MonotonicClock, SnowflakeGenerator, TimeSource};
use std::cell::Cell;
use std::collections::HashSet;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::scope;
use std::time::Duration;

struct MockTime {
    millis: u64,
}

impl TimeSource for MockTime {
    fn current_millis(&self) -> u64 {
        self.millis
    }
}

/// A settable clock for single-threaded rollover scenarios.
#[derive(Clone)]
struct SteppedTime {
    millis: Rc<Cell<u64>>,
}

impl SteppedTime {
    fn at(millis: u64) -> Self {
        Self {
            millis: Rc::new(Cell::new(millis)),
        }
    }
}

impl TimeSource for SteppedTime {
    fn current_millis(&self) -> u64 {
        self.millis.get()
    }
}

/// A settable clock that can be advanced from another thread.
#[derive(Clone)]
struct SharedTime {
    millis: Arc<AtomicU64>,
}

impl SharedTime {
    fn at(millis: u64) -> Self {
        Self {
            millis: Arc::new(AtomicU64::new(millis)),
        }
    }
}

impl TimeSource for SharedTime {
    fn current_millis(&self) -> u64 {
        self.millis.load(Ordering::Acquire)
    }
}

#[test]
fn sequence_increments_within_same_tick() {
    let generator = SnowflakeGenerator::new(Layout::standard(), MockTime { millis: 42 });

    let id1 = generator.next_id(1).unwrap();
    let id2 = generator.next_id(1).unwrap();
    let id3 = generator.next_id(1).unwrap();

    for (k, id) in [id1, id2, id3].into_iter().enumerate() {
        let parts = generator.decompose(id);
        assert_eq!(parts.timestamp, 42);
        assert_eq!(parts.node_id, 1);
        assert_eq!(parts.sequence, k as u64);
    }
    assert!(id1 < id2 && id2 < id3);
}

#[test]
fn first_id_after_clock_advance_has_sequence_zero() {
    let generator = SnowflakeGenerator::new(Layout::standard(), MockTime { millis: 0 });

    let parts = generator.decompose(generator.next_id_at(7, 123_456_789).unwrap());
    assert_eq!(parts.timestamp, 123_456_789);
    assert_eq!(parts.node_id, 7);
    assert_eq!(parts.sequence, 0);
}

#[test]
fn node_id_at_layout_maximum_is_accepted() {
    let generator = SnowflakeGenerator::new(Layout::standard(), MockTime { millis: 100 });

    let max = generator.layout().max_node_id();
    let parts = generator.decompose(generator.next_id(max).unwrap());
    assert_eq!(parts.node_id, max);
}

#[test]
fn node_id_past_layout_maximum_is_rejected() {
    let generator = SnowflakeGenerator::new(Layout::standard(), MockTime { millis: 100 });

    let max = generator.layout().max_node_id();
    assert_eq!(
        generator.next_id(max + 1),
        Err(Error::InvalidNodeId {
            node_id: max + 1,
            max,
        })
    );

    // narrower node field, same rule
    let layout = Layout::custom(45, 6, 12).unwrap();
    let generator = SnowflakeGenerator::new(layout, MockTime { millis: 100 });
    assert_eq!(
        generator.next_id(64),
        Err(Error::InvalidNodeId { node_id: 64, max: 63 })
    );
}

#[test]
fn rejected_node_id_leaves_state_untouched() {
    let generator = SnowflakeGenerator::new(Layout::standard(), MockTime { millis: 100 });

    assert!(generator.next_id_at(1024, 100).is_err());

    // still the first ID of tick 100
    let parts = generator.decompose(generator.next_id_at(0, 100).unwrap());
    assert_eq!(parts.timestamp, 100);
    assert_eq!(parts.sequence, 0);
}

#[test]
fn exhaustion_requires_a_strictly_later_tick() {
    let clock = SteppedTime::at(1_000);
    let generator = SnowflakeGenerator::new(Layout::standard(), clock.clone());
    let max_sequence = generator.layout().max_sequence();

    for k in 0..=max_sequence {
        let parts = generator.decompose(generator.next_id_at(5, 1_000).unwrap());
        assert_eq!(parts.timestamp, 1_000);
        assert_eq!(parts.node_id, 5);
        assert_eq!(parts.sequence, k);
    }

    // The tick is spent. The next call polls the generator's clock until it
    // reports a value past 1000 and mints there, ignoring the caller's
    // stale timestamp.
    clock.millis.set(1_001);
    let parts = generator.decompose(generator.next_id_at(5, 1_000).unwrap());
    assert_eq!(parts.timestamp, 1_001);
    assert_eq!(parts.node_id, 5);
    assert_eq!(parts.sequence, 0);
}

#[test]
fn exhausted_generator_blocks_until_clock_advances() {
    let clock = SharedTime::at(1_000);
    let generator = SnowflakeGenerator::new(Layout::standard(), clock.clone());

    for _ in 0..=generator.layout().max_sequence() {
        generator.next_id_at(5, 1_000).unwrap();
    }

    scope(|s| {
        s.spawn(|| {
            std::thread::sleep(Duration::from_millis(20));
            clock.millis.store(1_001, Ordering::Release);
        });

        // Blocks inside the call until the spawned thread moves the clock.
        let parts = generator.decompose(generator.next_id_at(5, 1_000).unwrap());
        assert_eq!(parts.timestamp, 1_001);
        assert_eq!(parts.sequence, 0);
    });
}

#[test]
fn clock_regression_stays_in_current_tick() {
    let generator = SnowflakeGenerator::new(Layout::standard(), MockTime { millis: 1_000 });

    let id1 = generator.next_id_at(1, 1_000).unwrap();

    // Caller clock ran backward: the ID is still issued within tick 1000 so
    // it sorts after its predecessor.
    let id2 = generator.next_id_at(1, 900).unwrap();
    let parts = generator.decompose(id2);
    assert_eq!(parts.timestamp, 1_000);
    assert_eq!(parts.sequence, 1);
    assert!(id2 > id1);
}

#[test]
fn custom_layout_round_trips_through_generation() {
    let layout = Layout::custom(39, 12, 12).unwrap();
    let generator = SnowflakeGenerator::new(layout, MockTime { millis: 77 });

    let parts = generator.decompose(generator.next_id(4_095).unwrap());
    assert_eq!(parts.timestamp, 77);
    assert_eq!(parts.node_id, 4_095);
    assert_eq!(parts.sequence, 0);
}

#[test]
fn sequential_ids_are_strictly_increasing() {
    const TOTAL_IDS: usize = 100_000;

    let generator = SnowflakeGenerator::new(Layout::standard(), MonotonicClock::default());
    let mut last = generator.next_id(1).unwrap();
    for _ in 1..TOTAL_IDS {
        let id = generator.next_id(1).unwrap();
        assert!(id > last);
        last = id;
    }
}

#[test]
fn threaded_generation_yields_unique_ids() {
    const THREADS: usize = 8;
    const IDS_PER_THREAD: usize = 8_192;
    const TOTAL_IDS: usize = THREADS * IDS_PER_THREAD;

    let generator = Arc::new(SnowflakeGenerator::new(
        Layout::standard(),
        MonotonicClock::default(),
    ));
    let seen_ids = Arc::new(std::sync::Mutex::new(HashSet::with_capacity(TOTAL_IDS)));

    scope(|s| {
        for _ in 0..THREADS {
            let generator = Arc::clone(&generator);
            let seen_ids = Arc::clone(&seen_ids);

            s.spawn(move || {
                for _ in 0..IDS_PER_THREAD {
                    let id = generator.next_id(3).unwrap();
                    assert!(seen_ids.lock().unwrap().insert(id));
                }
            });
        }
    });

    let final_count = seen_ids.lock().unwrap().len();
    assert_eq!(final_count, TOTAL_IDS, "Expected {TOTAL_IDS} unique IDs");
}
