use crate::ShardedMap;
use serde::{
    de::{MapAccess, Visitor},
    ser::SerializeMap,
    Deserialize, Deserializer, Serialize, Serializer,
};
use std::fmt::{self, Formatter};
use std::hash::BuildHasher;
use std::marker::PhantomData;

impl<V, S> Serialize for ShardedMap<V, S>
where
    V: Serialize,
    S: BuildHasher,
{
    /// Serializes the map as one flat map, segment by segment.
    ///
    /// The traversal takes each segment's read lock in turn; entries
    /// inserted concurrently may or may not appear in the output, as with
    /// [`ShardedMap::range`].
    fn serialize<Sr>(&self, serializer: Sr) -> Result<Sr::Ok, Sr::Error>
    where
        Sr: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        let mut error = None;
        self.range(|key, value| {
            if error.is_some() {
                // range resumes with the next segment after a false; keep
                // returning false so no further entry is serialized.
                return false;
            }
            match map.serialize_entry(key, value) {
                Ok(()) => true,
                Err(e) => {
                    error = Some(e);
                    false
                }
            }
        });
        match error {
            Some(e) => Err(e),
            None => map.end(),
        }
    }
}

impl<'de, V, S> Deserialize<'de> for ShardedMap<V, S>
where
    V: Deserialize<'de>,
    S: Default + BuildHasher,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(ShardedMapVisitor::new())
    }
}

struct ShardedMapVisitor<V, S> {
    value_marker: PhantomData<V>,
    hash_builder_marker: PhantomData<S>,
}

impl<V, S> ShardedMapVisitor<V, S> {
    pub(crate) fn new() -> Self {
        Self {
            value_marker: PhantomData,
            hash_builder_marker: PhantomData,
        }
    }
}

impl<'de, V, S> Visitor<'de> for ShardedMapVisitor<V, S>
where
    V: Deserialize<'de>,
    S: Default + BuildHasher,
{
    type Value = ShardedMap<V, S>;

    fn expecting(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "a map")
    }

    fn visit_map<M>(self, mut access: M) -> Result<Self::Value, M::Error>
    where
        M: MapAccess<'de>,
    {
        let map = ShardedMap::default();

        while let Some((key, value)) = access.next_entry::<String, V>()? {
            map.insert(key, value);
        }

        Ok(map)
    }
}
