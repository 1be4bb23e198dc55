use shardmap::{DefaultHashBuilder, ShardedMap};
use std::hash::{BuildHasher, BuildHasherDefault, Hasher};

#[derive(Default)]
pub struct ZeroHasher;

pub struct ZeroHashBuilder;

impl Hasher for ZeroHasher {
    fn finish(&self) -> u64 {
        0
    }
    fn write(&mut self, _: &[u8]) {}
}

impl BuildHasher for ZeroHashBuilder {
    type Hasher = ZeroHasher;

    fn build_hasher(&self) -> ZeroHasher {
        ZeroHasher
    }
}

fn check<S: BuildHasher + Default>() {
    let range = if cfg!(miri) { 0..16 } else { 0..1000 };
    let map = ShardedMap::<usize, S>::default();
    for i in range.clone() {
        map.insert(format!("key{}", i), i);
    }

    assert!(!map.contains_key("missing"));
    for i in range.clone() {
        assert!(map.contains_key(&format!("key{}", i)));
        assert_eq!(map.get(&format!("key{}", i)).as_deref(), Some(&i));
    }
    assert!(!map.contains_key(&format!("key{}", range.end)));
}

#[test]
fn test_default_hasher() {
    check::<DefaultHashBuilder>();
}

#[test]
fn test_zero_hasher() {
    check::<BuildHasherDefault<ZeroHasher>>();
}

#[test]
fn test_max_hasher() {
    #[derive(Default)]
    struct MaxHasher;

    impl Hasher for MaxHasher {
        fn finish(&self) -> u64 {
            u64::MAX
        }
        fn write(&mut self, _: &[u8]) {}
    }

    check::<BuildHasherDefault<MaxHasher>>();
}
