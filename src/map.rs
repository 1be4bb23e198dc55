use crate::segment::Segment;
use parking_lot::MappedRwLockReadGuard;
use std::error::Error;
use std::fmt::{self, Debug, Display, Formatter};
use std::hash::{BuildHasher, Hash, Hasher};
use std::iter::FromIterator;

/// A concurrent string-keyed map, sharded over independently locked
/// segments.
///
/// Every key is owned by exactly one [`Segment`], chosen by hashing the key
/// and reducing modulo the segment count. Each segment guards its entries
/// with its own reader/writer lock, so operations on keys that route to
/// different segments never block each other; only conflicting access to
/// the *same* segment contends. See the [crate-level
/// documentation](crate) for the full locking contract.
///
/// The segment array is sized at construction and never resized.
pub struct ShardedMap<V, S = crate::DefaultHashBuilder> {
    /// The segments, allocated eagerly at construction. The array itself is
    /// immutable afterwards; only the entries inside each segment change.
    segments: Box<[Segment<V>]>,

    build_hasher: S,
}

/// The error type returned by the fallible [`ShardedMap`] constructors.
///
/// A sharded map needs at least one segment; requesting zero leaves no
/// segment for any key to route to.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct InvalidConfiguration {
    /// The rejected segment count.
    pub segments: usize,
}

impl Display for InvalidConfiguration {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "segment count must be at least 1 (got {})",
            self.segments
        )
    }
}

impl Error for InvalidConfiguration {}

impl<V> ShardedMap<V, crate::DefaultHashBuilder> {
    /// Creates a new map with a default number of segments (a small multiple
    /// of the number of available CPUs, so that independent threads mostly
    /// land on disjoint locks).
    pub fn new() -> Self {
        Self::build(
            crate::default_segment_count(),
            crate::DefaultHashBuilder::default(),
        )
    }

    /// Creates a new map with exactly `segments` segments.
    ///
    /// Returns [`InvalidConfiguration`] if `segments` is zero. A map with a
    /// single segment is valid and behaves like one reader/writer-locked
    /// map (every key routes to segment 0).
    pub fn with_segments(segments: usize) -> Result<Self, InvalidConfiguration> {
        Self::with_segments_and_hasher(segments, crate::DefaultHashBuilder::default())
    }
}

impl<V, S> Default for ShardedMap<V, S>
where
    S: BuildHasher + Default,
{
    fn default() -> Self {
        Self::build(crate::default_segment_count(), S::default())
    }
}

impl<V, S> ShardedMap<V, S>
where
    S: BuildHasher,
{
    /// Creates a new map with exactly `segments` segments, routing keys
    /// through `build_hasher`.
    ///
    /// Returns [`InvalidConfiguration`] if `segments` is zero.
    pub fn with_segments_and_hasher(
        segments: usize,
        build_hasher: S,
    ) -> Result<Self, InvalidConfiguration> {
        if segments == 0 {
            return Err(InvalidConfiguration { segments });
        }
        Ok(Self::build(segments, build_hasher))
    }

    /// Allocates a map with `segments` segments. Callers have already
    /// checked `segments >= 1`.
    fn build(segments: usize, build_hasher: S) -> Self {
        debug_assert!(segments >= 1);
        Self {
            segments: (0..segments)
                .map(|_| Segment::new())
                .collect::<Vec<_>>()
                .into_boxed_slice(),
            build_hasher,
        }
    }

    /// Hashes `key` through this map's hasher, truncated to 32 bits.
    ///
    /// Nothing persisted or on the wire depends on the exact output; only
    /// routing consistency within this map instance does, so the hash only
    /// needs to be deterministic for the map's lifetime and well mixed in
    /// the low-order bits that survive the modulo below.
    fn hash(&self, key: &str) -> u32 {
        let mut h = self.build_hasher.build_hasher();
        key.hash(&mut h);
        h.finish() as u32
    }

    /// Index of the segment that owns `key`.
    ///
    /// Recomputed on every operation, never cached. `hash % segment_count`
    /// is slightly skewed whenever the count does not divide the 32-bit
    /// hash range evenly; no operation depends on exact balance, so the
    /// skew is accepted.
    fn segment_index(&self, key: &str) -> usize {
        self.hash(key) as usize % self.segments.len()
    }

    fn segment_for(&self, key: &str) -> &Segment<V> {
        &self.segments[self.segment_index(key)]
    }

    /// Maps `key` to `value`, returning the value previously mapped to
    /// `key`, if any.
    ///
    /// Takes only the owning segment's lock, in write mode; inserts to keys
    /// owned by other segments proceed in parallel. Racing inserts to the
    /// same key are serialized by that lock and the last writer wins, with
    /// no ordering promised between the racers.
    pub fn insert(&self, key: String, value: V) -> Option<V> {
        self.segment_for(&key).insert(key, value)
    }

    /// Returns a read-guarded reference to the value mapped to `key`, or
    /// `None` if the key is absent.
    ///
    /// Concurrent `get`s proceed in parallel, even on the same segment. The
    /// returned guard keeps the owning segment's lock held in read mode
    /// until it is dropped; do not insert into this map while holding a
    /// guard, since an insert routed to the same segment would deadlock.
    /// Callers that want an unguarded value can use
    /// [`ShardedMap::get_cloned`].
    pub fn get(&self, key: &str) -> Option<MappedRwLockReadGuard<'_, V>> {
        self.segment_for(key).get(key)
    }

    /// Returns a clone of the value mapped to `key`, or `None` if the key
    /// is absent. No lock is held once this returns.
    pub fn get_cloned(&self, key: &str) -> Option<V>
    where
        V: Clone,
    {
        self.segment_for(key).get_cloned(key)
    }

    /// Tests if `key` is a key in this map.
    pub fn contains_key(&self, key: &str) -> bool {
        self.segment_for(key).contains_key(key)
    }

    /// Calls `f` for every entry in the map, segment by segment in index
    /// order, in unspecified order within each segment.
    ///
    /// Each entry present for the whole traversal of its segment is visited
    /// exactly once. Entries inserted concurrently may or may not be seen,
    /// depending on whether their segment has been traversed yet.
    ///
    /// When `f` returns `false`, only the traversal of the *current
    /// segment* stops; traversal then continues with the next segment. A
    /// single `false` therefore does not end the whole iteration. This
    /// mirrors the behavior of the system this crate derives from and is
    /// kept deliberately; callers that need a global stop can track it in
    /// the closure and keep returning `false` once set.
    ///
    /// Each segment's lock is held in read mode while that segment is
    /// traversed, so `f` must not call back into this map: an insert (or a
    /// nested `range`) touching the segment currently being traversed
    /// deadlocks.
    pub fn range<F>(&self, mut f: F)
    where
        F: FnMut(&str, &V) -> bool,
    {
        for segment in self.segments.iter() {
            segment.range(&mut f);
        }
    }

    /// Returns the number of entries in the map, summed over all segments.
    ///
    /// Like [`Segment::len`], this is a point-in-time figure: segments are
    /// counted one after another without a global lock, so a concurrent
    /// writer can make the total stale before it is returned.
    pub fn len(&self) -> usize {
        self.segments.iter().map(Segment::len).sum()
    }

    /// Returns `true` if the map holds no entries. Subject to the same
    /// point-in-time caveat as [`ShardedMap::len`].
    pub fn is_empty(&self) -> bool {
        self.segments.iter().all(Segment::is_empty)
    }

    /// The number of segments this map was constructed with.
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// The map's segments, in index order.
    ///
    /// Useful for inspecting how keys spread over segments (e.g. occupancy
    /// per segment via [`Segment::len`]).
    pub fn segments(&self) -> &[Segment<V>] {
        &self.segments
    }
}

impl<V, S> Debug for ShardedMap<V, S>
where
    V: Debug,
    S: BuildHasher,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut entries = f.debug_map();
        self.range(|key, value| {
            entries.entry(&key, value);
            true
        });
        entries.finish()
    }
}

impl<V, S> Clone for ShardedMap<V, S>
where
    V: Clone,
    S: BuildHasher + Clone,
{
    fn clone(&self) -> Self {
        // The cloned hasher routes identically, so entries land at the same
        // segment indices as in the source map.
        let clone = Self::build(self.segments.len(), self.build_hasher.clone());
        self.range(|key, value| {
            clone.insert(key.to_owned(), value.clone());
            true
        });
        clone
    }
}

impl<V, S> PartialEq for ShardedMap<V, S>
where
    V: PartialEq,
    S: BuildHasher,
{
    fn eq(&self, other: &Self) -> bool {
        if std::ptr::eq(self, other) {
            return true;
        }
        if self.len() != other.len() {
            return false;
        }
        let mut equal = true;
        self.range(|key, value| {
            // range resumes with the next segment after a false, so latch
            // the verdict instead of recomputing it
            if !equal {
                return false;
            }
            equal = other.get(key).map_or(false, |theirs| *theirs == *value);
            equal
        });
        equal
    }
}

impl<V, S> Eq for ShardedMap<V, S>
where
    V: Eq,
    S: BuildHasher,
{
}

impl<V, S> Extend<(String, V)> for &ShardedMap<V, S>
where
    S: BuildHasher,
{
    fn extend<T: IntoIterator<Item = (String, V)>>(&mut self, iter: T) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

impl<V, S> FromIterator<(String, V)> for ShardedMap<V, S>
where
    S: BuildHasher + Default,
{
    fn from_iter<T: IntoIterator<Item = (String, V)>>(iter: T) -> Self {
        let map = Self::default();
        (&map).extend(iter);
        map
    }
}
