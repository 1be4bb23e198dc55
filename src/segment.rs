use parking_lot::{MappedRwLockReadGuard, RwLock, RwLockReadGuard};
use std::collections::HashMap;
use std::fmt::{self, Debug, Formatter};

/// One independently locked partition of a [`ShardedMap`](crate::ShardedMap).
///
/// A segment owns a disjoint slice of the key space behind a single
/// reader/writer lock: any number of readers proceed in parallel, a writer
/// excludes everyone else on this segment, and operations on other segments
/// are never affected. The segment's lock is not reentrant — see
/// [`Segment::range`] and the notes in the crate-level documentation.
pub struct Segment<V> {
    entries: RwLock<HashMap<String, V>>,
}

impl<V> Segment<V> {
    pub(crate) fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Maps `key` to `value` in this segment, returning the value previously
    /// mapped to `key`, if any.
    ///
    /// Takes the segment's lock in write mode; racing inserts to the same
    /// segment are serialized by the lock, last writer wins. The lock is
    /// released on every exit path, including unwinding.
    pub fn insert(&self, key: String, value: V) -> Option<V> {
        self.entries.write().insert(key, value)
    }

    /// Returns a read-guarded reference to the value mapped to `key`, or
    /// `None` if the key is absent.
    ///
    /// The returned guard keeps this segment's lock held in read mode:
    /// other readers proceed freely, but writers to this segment block
    /// until the guard is dropped. Do not insert into the same map while
    /// holding a guard for the key's segment.
    pub fn get(&self, key: &str) -> Option<MappedRwLockReadGuard<'_, V>> {
        RwLockReadGuard::try_map(self.entries.read(), |entries| entries.get(key)).ok()
    }

    /// Returns a clone of the value mapped to `key`, or `None` if the key
    /// is absent. The lock is released before this returns.
    pub fn get_cloned(&self, key: &str) -> Option<V>
    where
        V: Clone,
    {
        self.entries.read().get(key).cloned()
    }

    /// Tests if `key` is present in this segment.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.read().contains_key(key)
    }

    /// Calls `f` for every entry in this segment, in unspecified order,
    /// stopping early if `f` returns `false`.
    ///
    /// The segment's lock is held in read mode for the entire traversal and
    /// released exactly once when the traversal finishes or stops early.
    /// Because the lock is held throughout, `f` must not call back into the
    /// same segment (in particular, it must not insert into the owning map):
    /// the lock is not reentrant and doing so deadlocks.
    pub fn range<F>(&self, mut f: F)
    where
        F: FnMut(&str, &V) -> bool,
    {
        let entries = self.entries.read();
        for (key, value) in entries.iter() {
            if !f(key, value) {
                break;
            }
        }
    }

    /// Returns the number of entries in this segment.
    ///
    /// The count is a point-in-time snapshot: it is not synchronized against
    /// concurrent inserts, so by the time the caller looks at it the segment
    /// may already hold more entries. Callers that need a stable count must
    /// provide their own external synchronization.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns `true` if this segment holds no entries. Subject to the same
    /// point-in-time caveat as [`Segment::len`].
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl<V> Debug for Segment<V>
where
    V: Debug,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.entries.read().iter()).finish()
    }
}
