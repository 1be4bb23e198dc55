use crate::ShardedMap;
use rayon::iter::{FromParallelIterator, IntoParallelIterator, ParallelExtend, ParallelIterator};
use std::hash::BuildHasher;

impl<V, S> ParallelExtend<(String, V)> for ShardedMap<V, S>
where
    V: Send + Sync,
    S: BuildHasher + Sync,
{
    fn par_extend<I>(&mut self, par_iter: I)
    where
        I: IntoParallelIterator<Item = (String, V)>,
    {
        self.par_extend_shared(par_iter);
    }
}

impl<V, S> ShardedMap<V, S>
where
    V: Send + Sync,
    S: BuildHasher + Sync,
{
    /// Inserts every pair produced by `par_iter`, from rayon's worker
    /// threads.
    ///
    /// Unlike [`ParallelExtend::par_extend`] this takes `&self`: inserts
    /// only need a shared reference, and the worker threads spread over the
    /// map's segments with no lock shared between them beyond the segments
    /// their keys happen to route to.
    pub fn par_extend_shared<I>(&self, par_iter: I)
    where
        I: IntoParallelIterator<Item = (String, V)>,
    {
        par_iter.into_par_iter().for_each(|(key, value)| {
            self.insert(key, value);
        });
    }
}

impl<V> FromParallelIterator<(String, V)> for ShardedMap<V, crate::DefaultHashBuilder>
where
    V: Send + Sync,
{
    fn from_par_iter<I>(par_iter: I) -> Self
    where
        I: IntoParallelIterator<Item = (String, V)>,
    {
        let map = ShardedMap::new();
        map.par_extend_shared(par_iter);
        map
    }
}
