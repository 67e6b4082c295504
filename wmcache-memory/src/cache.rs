// Copyright 2025 foyer Project Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::{borrow::Cow, fmt::Debug, hash::Hash, sync::Arc};

use equivalent::Equivalent;
use mixtrics::{metrics::BoxedRegistry, registry::noop::NoopMetricsRegistry};
use wmcache_common::{
    code::{DefaultHashBuilder, HashBuilder, Key, Value},
    error::Result,
    metrics::Metrics,
};

use crate::{
    config::{CacheConfig, EvictionPolicy},
    raw::{PostEvictionCallback, RawCache, RawCacheConfig},
};

/// In-memory cache builder.
pub struct CacheBuilder<K, V, S = DefaultHashBuilder>
where
    K: Key,
    V: Value,
    S: HashBuilder,
{
    name: Cow<'static, str>,
    config: CacheConfig,
    hash_builder: S,
    post_eviction_callback: Option<Arc<dyn PostEvictionCallback<V>>>,
    registry: BoxedRegistry,
    _marker: std::marker::PhantomData<K>,
}

impl<K, V> Default for CacheBuilder<K, V>
where
    K: Key,
    V: Value,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> CacheBuilder<K, V>
where
    K: Key,
    V: Value,
{
    /// Create in-memory cache builder with the default configuration: LRU, both watermarks at [`usize::MAX`].
    pub fn new() -> Self {
        Self {
            name: "wmcache".into(),
            config: CacheConfig::default(),
            hash_builder: DefaultHashBuilder::default(),
            post_eviction_callback: None,
            registry: Box::new(NoopMetricsRegistry),
            _marker: std::marker::PhantomData,
        }
    }
}

impl<K, V, S> CacheBuilder<K, V, S>
where
    K: Key,
    V: Value,
    S: HashBuilder,
{
    /// Set the name of the in-memory cache.
    ///
    /// The name is used as the label of the metrics.
    pub fn with_name(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.name = name.into();
        self
    }

    /// Set in-memory cache eviction policy.
    pub fn with_eviction_policy(mut self, eviction_policy: EvictionPolicy) -> Self {
        self.config.eviction_policy = eviction_policy;
        self
    }

    /// Set in-memory cache watermarks.
    ///
    /// Requires `1 <= low_watermark <= high_watermark`.
    pub fn with_watermarks(mut self, low_watermark: usize, high_watermark: usize) -> Self {
        self.config.low_watermark = low_watermark;
        self.config.high_watermark = high_watermark;
        self
    }

    /// Replace eviction policy and watermarks with the given configuration.
    pub fn with_config(mut self, config: CacheConfig) -> Self {
        self.config = config;
        self
    }

    /// Set in-memory cache hash builder.
    pub fn with_hash_builder<OS>(self, hash_builder: OS) -> CacheBuilder<K, V, OS>
    where
        OS: HashBuilder,
    {
        CacheBuilder {
            name: self.name,
            config: self.config,
            hash_builder,
            post_eviction_callback: self.post_eviction_callback,
            registry: self.registry,
            _marker: std::marker::PhantomData,
        }
    }

    /// Set the callback invoked for every entry evicted, popped or erased.
    pub fn with_post_eviction_callback(mut self, callback: impl PostEvictionCallback<V>) -> Self {
        self.post_eviction_callback = Some(Arc::new(callback));
        self
    }

    /// Set metrics registry.
    ///
    /// Default: [`NoopMetricsRegistry`].
    pub fn with_metrics_registry(mut self, registry: BoxedRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Build in-memory cache with the given configuration.
    pub fn build(self) -> Cache<K, V, S> {
        let metrics = Arc::new(Metrics::new(self.name.clone(), &self.registry));
        let raw = RawCache::new(RawCacheConfig {
            name: self.name,
            eviction_policy: self.config.eviction_policy,
            low_watermark: self.config.low_watermark,
            high_watermark: self.config.high_watermark,
            hash_builder: self.hash_builder,
            post_eviction_callback: self.post_eviction_callback,
            metrics,
        });
        Cache { raw }
    }
}

/// Thread-safe in-memory key-value cache with watermark-bounded LRU or FIFO eviction.
///
/// # Eviction
///
/// Entries are ordered by an eviction queue. With [`EvictionPolicy::Fifo`] the order is the insertion order. With
/// [`EvictionPolicy::Lru`] a lookup also moves the entry to the back.
///
/// Before every insert, if the entry count has reached the high watermark, entries are evicted from the front of the
/// queue until the count drops below the low watermark. One insert may evict many entries.
///
/// Overwriting an existing key replaces its value handle and moves it to the back of the queue for both policies.
///
/// # Post-eviction callback
///
/// The callback receives the value handle of each entry removed by eviction, [`Cache::pop_front`] or
/// [`Cache::erase`], in removal order. [`Cache::clear`], overwrites and dropping the cache never invoke it.
///
/// The callback runs while the cache write lock is held. Calling into the same cache from the callback deadlocks.
///
/// # Complexity
///
/// [`Cache::insert`], [`Cache::try_get_value`], [`Cache::pop_front`] and [`Cache::erase`] are *O(1)* amortized,
/// plus the evictions an insert triggers. [`Cache::visit`] and [`Cache::clear`] are *O(n)*.
///
/// # Locking
///
/// One reader-writer lock guards the cache. Lookups that do not reorder take the shared lock. An LRU lookup takes an
/// upgradable lock and upgrades it only if the entry is not at the back yet, so repeated hits on the most recently
/// used key never block other readers.
pub struct Cache<K, V, S = DefaultHashBuilder>
where
    K: Key,
    V: Value,
    S: HashBuilder,
{
    raw: RawCache<K, V, S>,
}

impl<K, V, S> Clone for Cache<K, V, S>
where
    K: Key,
    V: Value,
    S: HashBuilder,
{
    fn clone(&self) -> Self {
        Self { raw: self.raw.clone() }
    }
}

impl<K, V, S> Debug for Cache<K, V, S>
where
    K: Key,
    V: Value,
    S: HashBuilder,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.raw.fmt(f)
    }
}

impl<K, V> Default for Cache<K, V>
where
    K: Key,
    V: Value,
{
    fn default() -> Self {
        CacheBuilder::new().build()
    }
}

impl<K, V> Cache<K, V>
where
    K: Key,
    V: Value,
{
    /// Create a cache with the default hash builder.
    ///
    /// Requires `1 <= low_watermark <= high_watermark`.
    pub fn new(eviction_policy: EvictionPolicy, low_watermark: usize, high_watermark: usize) -> Self {
        CacheBuilder::new()
            .with_eviction_policy(eviction_policy)
            .with_watermarks(low_watermark, high_watermark)
            .build()
    }
}

impl<K, V, S> Cache<K, V, S>
where
    K: Key,
    V: Value,
    S: HashBuilder,
{
    /// Insert or overwrite the value of the key.
    ///
    /// Fails with [`ErrorKind::NoSpace`](wmcache_common::error::ErrorKind::NoSpace) if room for a new key cannot be
    /// allocated. The cache content is then unchanged, apart from the evictions the watermarks demanded.
    pub fn insert(&self, key: K, value: V) -> Result<()> {
        self.insert_arc(key, Arc::new(value))
    }

    /// Insert or overwrite the key with an existing value handle.
    pub fn insert_arc(&self, key: K, value: Arc<V>) -> Result<()> {
        self.raw.insert(key, value)
    }

    /// Get the value handle of the key.
    ///
    /// With [`EvictionPolicy::Lru`] the entry is moved to the back of the eviction queue.
    pub fn try_get_value<Q>(&self, key: &Q) -> Option<Arc<V>>
    where
        Q: Hash + Equivalent<K> + ?Sized,
    {
        self.try_get_value_with(key, true)
    }

    /// Get the value handle of the key, moving it to the back of the eviction queue only if
    /// `modify_eviction_queue` is set and the policy is [`EvictionPolicy::Lru`].
    pub fn try_get_value_with<Q>(&self, key: &Q, modify_eviction_queue: bool) -> Option<Arc<V>>
    where
        Q: Hash + Equivalent<K> + ?Sized,
    {
        self.raw.get(key, modify_eviction_queue)
    }

    /// Returns `true` if the key is cached. Never reorders.
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        Q: Hash + Equivalent<K> + ?Sized,
    {
        self.raw.contains(key)
    }

    /// Evict the entry at the front of the eviction queue.
    ///
    /// Returns `false` if the cache is empty.
    pub fn pop_front(&self) -> bool {
        self.raw.pop_front()
    }

    /// Remove the entry of the key.
    ///
    /// Returns `false` if the key is not cached.
    pub fn erase<Q>(&self, key: &Q) -> bool
    where
        Q: Hash + Equivalent<K> + ?Sized,
    {
        self.raw.remove(key)
    }

    /// Replace the post-eviction callback.
    pub fn set_post_eviction_callback(&self, callback: impl PostEvictionCallback<V>) {
        self.raw.set_post_eviction_callback(Some(Arc::new(callback)));
    }

    /// Remove the post-eviction callback.
    pub fn unset_post_eviction_callback(&self) {
        self.raw.set_post_eviction_callback(None);
    }

    /// Remove all entries without invoking the post-eviction callback.
    pub fn clear(&self) {
        self.raw.clear();
    }

    /// Visit entries in eviction order until the visitor returns `false`.
    ///
    /// The shared lock is held for the whole visit. A slow visitor blocks writers, and a visitor that writes to the
    /// same cache deadlocks.
    pub fn visit<F>(&self, visitor: F)
    where
        F: FnMut(&K, &V) -> bool,
    {
        self.raw.visit(visitor)
    }

    /// Entry count.
    pub fn size(&self) -> usize {
        self.raw.size()
    }

    /// Returns `true` if the cache holds no entry.
    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Eviction policy.
    pub fn eviction_policy(&self) -> EvictionPolicy {
        self.raw.eviction_policy()
    }

    /// Low watermark.
    pub fn low_watermark(&self) -> usize {
        self.raw.low_watermark()
    }

    /// High watermark.
    pub fn high_watermark(&self) -> usize {
        self.raw.high_watermark()
    }

    /// Hash builder.
    pub fn hash_builder(&self) -> &S {
        self.raw.hash_builder()
    }

    /// Cache name.
    pub fn name(&self) -> &str {
        self.raw.name()
    }

    /// Metrics of the cache.
    pub fn metrics(&self) -> &Arc<Metrics> {
        self.raw.metrics()
    }

    /// Assert that the index map and the eviction queue hold exactly the same entries.
    #[cfg(any(test, feature = "sanity"))]
    pub fn check_sanity(&self) {
        self.raw.check_sanity()
    }
}

#[cfg(test)]
mod tests {
    use std::{
        hash::BuildHasher,
        sync::atomic::{AtomicU64, Ordering},
        thread,
    };

    use itertools::Itertools;
    use parking_lot::Mutex;
    use rand::{rngs::SmallRng, Rng, SeedableRng};
    use wmcache_common::hasher::ModHasher;

    use super::*;

    fn keys<S: HashBuilder>(cache: &Cache<u64, u64, S>) -> Vec<u64> {
        let mut keys = vec![];
        cache.visit(|k, _| {
            keys.push(*k);
            true
        });
        keys
    }

    fn recorder() -> (Arc<Mutex<Vec<u64>>>, impl PostEvictionCallback<u64>) {
        let evicted = Arc::new(Mutex::new(vec![]));
        let e = evicted.clone();
        (evicted, move |v: Arc<u64>| e.lock().push(*v))
    }

    #[test_log::test]
    fn test_lru_order() {
        let cache = Cache::new(EvictionPolicy::Lru, 2, 3);
        for k in [1u64, 2, 3] {
            cache.insert(k, k).unwrap();
        }
        assert_eq!(cache.try_get_value(&1).as_deref(), Some(&1));

        cache.insert(4, 4).unwrap();
        assert!(cache.contains(&1));
        assert!(!cache.contains(&2));
        assert_eq!(keys(&cache), vec![1, 4]);
    }

    #[test_log::test]
    fn test_fifo_order() {
        let (evicted, callback) = recorder();
        let cache = CacheBuilder::new()
            .with_eviction_policy(EvictionPolicy::Fifo)
            .with_watermarks(1, 5)
            .with_post_eviction_callback(callback)
            .build();
        for k in 0..5u64 {
            cache.insert(k, k).unwrap();
        }
        for k in (0..5u64).rev() {
            assert_eq!(cache.try_get_value(&k).as_deref(), Some(&k));
        }
        while cache.pop_front() {}
        assert_eq!(*evicted.lock(), (0..5).collect_vec());
    }

    #[test_log::test]
    fn test_watermarks() {
        for (low, high) in [(1, 1), (1, 4), (3, 4), (4, 4), (2, 7)] {
            let (evicted, callback) = recorder();
            let cache = CacheBuilder::new()
                .with_watermarks(low, high)
                .with_post_eviction_callback(callback)
                .build();
            for k in 0..32u64 {
                let before = cache.size();
                let evicted_before = evicted.lock().len();
                cache.insert(k, k).unwrap();
                assert!(cache.size() <= high, "low: {low}, high: {high}");
                let evicted_now = evicted.lock().len() - evicted_before;
                if before >= high {
                    // Evictions never stop before the count drops below the low watermark.
                    assert_eq!(before - evicted_now, low - 1, "low: {low}, high: {high}");
                } else {
                    assert_eq!(evicted_now, 0);
                }
                cache.check_sanity();
            }
        }
    }

    #[test]
    fn test_erase_idempotent() {
        let (evicted, callback) = recorder();
        let cache = CacheBuilder::new().with_post_eviction_callback(callback).build();
        cache.insert(1, 10).unwrap();
        cache.insert(2, 20).unwrap();

        assert!(cache.erase(&1));
        for _ in 0..3 {
            assert!(!cache.erase(&1));
            assert_eq!(cache.size(), 1);
            assert_eq!(keys(&cache), vec![2]);
        }
        assert_eq!(*evicted.lock(), vec![10]);
    }

    #[test]
    fn test_clear_is_silent() {
        let (evicted, callback) = recorder();
        let cache = CacheBuilder::new()
            .with_watermarks(8, 8)
            .with_post_eviction_callback(callback)
            .build();
        for k in 0..6 {
            cache.insert(k, k).unwrap();
        }
        cache.clear();
        assert!(cache.is_empty());
        assert!(evicted.lock().is_empty());

        for k in 0..6 {
            cache.insert(k, k).unwrap();
        }
        drop(cache);
        assert!(evicted.lock().is_empty());
    }

    #[test]
    fn test_overwrite() {
        let (evicted, callback) = recorder();
        let cache = CacheBuilder::new()
            .with_eviction_policy(EvictionPolicy::Fifo)
            .with_post_eviction_callback(callback)
            .build();
        for k in 0..3 {
            cache.insert(k, k).unwrap();
        }
        let old = cache.try_get_value(&0).unwrap();
        cache.insert(0, 100).unwrap();

        assert_eq!(*old, 0);
        assert_eq!(cache.try_get_value(&0).as_deref(), Some(&100));
        assert_eq!(keys(&cache), vec![1, 2, 0]);
        assert_eq!(cache.size(), 3);
        assert!(evicted.lock().is_empty());
    }

    #[test]
    fn test_visit_early_stop() {
        let cache = Cache::new(EvictionPolicy::Lru, 16, 16);
        for k in 0..8u64 {
            cache.insert(k, k * k).unwrap();
        }
        let mut visited = vec![];
        cache.visit(|k, v| {
            visited.push((*k, *v));
            *k < 3
        });
        assert_eq!(visited, vec![(0, 0), (1, 1), (2, 4), (3, 9)]);
    }

    #[test]
    fn test_borrowed_lookup() {
        let cache: Cache<String, Vec<u8>> = Cache::default();
        cache.insert("alpha".to_string(), b"a".to_vec()).unwrap();
        assert_eq!(cache.try_get_value("alpha").as_deref(), Some(&b"a".to_vec()));
        assert!(cache.contains("alpha"));
        assert!(cache.erase("alpha"));
        assert!(cache.try_get_value("alpha").is_none());
    }

    #[test]
    fn test_accessors() {
        let cache = CacheBuilder::<u64, u64>::new()
            .with_name("accessors")
            .with_config(CacheConfig {
                eviction_policy: EvictionPolicy::Fifo,
                low_watermark: 3,
                high_watermark: 9,
            })
            .with_hash_builder(ModHasher::default())
            .build();
        assert_eq!(cache.name(), "accessors");
        assert_eq!(cache.eviction_policy(), EvictionPolicy::Fifo);
        assert_eq!(cache.low_watermark(), 3);
        assert_eq!(cache.high_watermark(), 9);
        assert_eq!(cache.hash_builder().hash_one(42u64), 42);

        cache.insert(1, 1).unwrap();
        assert_eq!(
            format!("{cache:?}"),
            r#"Cache { name: "accessors", eviction_policy: Fifo, low_watermark: 3, high_watermark: 9, size: 1 }"#
        );

        let default = Cache::<u64, u64>::default();
        assert_eq!(default.eviction_policy(), EvictionPolicy::Lru);
        assert_eq!(default.low_watermark(), usize::MAX);
        assert_eq!(default.high_watermark(), usize::MAX);
    }

    #[test]
    fn test_metrics_registry() {
        let cache = CacheBuilder::new()
            .with_name("registry")
            .with_watermarks(1, 2)
            .with_metrics_registry(Box::new(NoopMetricsRegistry))
            .build();
        for k in 0..4u64 {
            cache.insert(k, k).unwrap();
        }
        assert_eq!(cache.try_get_value(&3).as_deref(), Some(&3));
        assert_eq!(keys(&cache), vec![2, 3]);
    }

    #[test_log::test]
    fn test_multi_threads() {
        const THREADS: usize = 8;
        const OPS: usize = 10_000;
        const KEYS: u64 = 256;

        for policy in [EvictionPolicy::Lru, EvictionPolicy::Fifo] {
            let evicted = Arc::new(AtomicU64::new(0));
            let e = evicted.clone();
            let cache = CacheBuilder::new()
                .with_eviction_policy(policy)
                .with_watermarks(48, 64)
                .with_post_eviction_callback(move |_: Arc<u64>| {
                    e.fetch_add(1, Ordering::Relaxed);
                })
                .build();

            let handles = (0..THREADS)
                .map(|i| {
                    let cache = cache.clone();
                    thread::spawn(move || {
                        let mut rng = SmallRng::seed_from_u64(i as u64);
                        for _ in 0..OPS {
                            let key = rng.random_range(0..KEYS);
                            match rng.random_range(0..10) {
                                0..=3 => cache.insert(key, key).unwrap(),
                                4..=7 => {
                                    if let Some(v) = cache.try_get_value_with(&key, rng.random_bool(0.8)) {
                                        assert_eq!(*v, key);
                                    }
                                }
                                8 => {
                                    cache.erase(&key);
                                }
                                _ => {
                                    let mut prev = None;
                                    cache.visit(|k, v| {
                                        assert_eq!(k, v);
                                        assert_ne!(prev, Some(*k));
                                        prev = Some(*k);
                                        rng.random_bool(0.9)
                                    });
                                }
                            }
                            assert!(cache.size() <= 64);
                        }
                    })
                })
                .collect_vec();
            handles.into_iter().for_each(|h| h.join().unwrap());

            cache.check_sanity();
            assert!(cache.size() <= 64);
            assert!(evicted.load(Ordering::Relaxed) > 0);
        }
    }
}
