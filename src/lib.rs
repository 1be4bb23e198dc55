//! A concurrent string-keyed map that shards its key space over a fixed
//! number of independently locked segments.
//!
//! A single map behind one lock serializes every operation, readers and
//! writers alike. This crate instead partitions the key space: a
//! [`ShardedMap`] owns a fixed array of [`Segment`]s, each holding a
//! disjoint subset of the entries behind its own reader/writer lock. Every
//! key is routed to exactly one segment by `hash(key) % segment_count`, so
//! threads working on different parts of the key space take different
//! locks and do not contend at all. Within one segment, any number of
//! readers proceed in parallel and a writer excludes everyone else — the
//! usual reader/writer discipline, just at segment granularity.
//!
//! The segment array is created eagerly at construction and never resized;
//! the only state that changes afterwards is the entries inside each
//! segment. There is no global lock anywhere.
//!
//! # Examples
//!
//! ```
//! use shardmap::ShardedMap;
//!
//! let map = ShardedMap::with_segments(4)?;
//! map.insert("alice".to_owned(), 1);
//! map.insert("bob".to_owned(), 2);
//!
//! assert_eq!(map.get("alice").as_deref(), Some(&1));
//! assert!(map.get("carol").is_none());
//!
//! let mut pairs = Vec::new();
//! map.range(|key, &value| {
//!     pairs.push((key.to_owned(), value));
//!     true
//! });
//! pairs.sort();
//! assert_eq!(pairs, vec![("alice".to_owned(), 1), ("bob".to_owned(), 2)]);
//! # Ok::<(), shardmap::InvalidConfiguration>(())
//! ```
//!
//! # Consistency
//!
//! Writes to a single key are linearized by its segment's write lock: the
//! value that remains after racing [`ShardedMap::insert`] calls is the one
//! whose caller acquired the lock last, and lock acquisition order under
//! contention is arbitrary. A read that is sequenced after a completed
//! write (through external synchronization, such as joining the writing
//! thread) observes that write or a later one. A read racing a write
//! observes the old value or the new one, never a torn mixture. No
//! ordering is promised across different keys.
//!
//! [`ShardedMap::len`] and [`Segment::len`] are point-in-time counts and
//! are deliberately not synchronized against concurrent mutation; callers
//! that need a stable count must quiesce writers themselves.
//!
//! # A note on guards and reentrancy
//!
//! [`ShardedMap::get`] hands back a guard that keeps the owning segment's
//! read lock held, and [`ShardedMap::range`] holds each segment's read
//! lock while traversing it. The locks are not reentrant: calling back
//! into the map from a `range` callback, or inserting while holding a
//! `get` guard, deadlocks if the operation routes to a locked segment.
//! Drop guards promptly and keep `range` callbacks free of map calls.
//!
//! # Hashing
//!
//! Keys route through a [`DefaultHashBuilder`] (ahash) by default; any
//! [`std::hash::BuildHasher`] can be substituted via
//! [`ShardedMap::with_segments_and_hasher`]. Routing only needs to be
//! deterministic within one map instance — no persisted or wire format
//! depends on hash output — so a fast, well-mixed, non-cryptographic hash
//! is the right tool.
//!
//! # Features
//!
//! - `serde`: `Serialize` and `Deserialize` for [`ShardedMap`].
//! - `rayon`: `ParallelExtend` and `FromParallelIterator` for
//!   [`ShardedMap`]; parallel inserts spread naturally over the segments.

#![warn(missing_docs, missing_debug_implementations, rust_2018_idioms)]

mod map;
mod segment;

#[cfg(feature = "rayon")]
mod rayon_impls;
#[cfg(feature = "serde")]
mod serde_impls;

pub use map::{InvalidConfiguration, ShardedMap};
pub use segment::Segment;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Once;

/// The default routing hasher for [`ShardedMap`].
///
/// See the crate-level [notes on hashing](crate#hashing).
pub type DefaultHashBuilder = ahash::RandomState;

static NCPU_INITIALIZER: Once = Once::new();
static NCPU: AtomicUsize = AtomicUsize::new(0);

/// Segment count used by [`ShardedMap::new`]: a few segments per available
/// CPU, so that concurrently running threads mostly land on disjoint locks.
pub(crate) fn default_segment_count() -> usize {
    NCPU_INITIALIZER.call_once(|| NCPU.store(num_cpus::get(), Ordering::Relaxed));
    4 * NCPU.load(Ordering::Relaxed).max(1)
}
