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
use parking_lot::{RwLock, RwLockUpgradableReadGuard};
use wmcache_common::{
    code::{HashBuilder, Key, Value},
    error::Result,
    event::Event,
    metrics::Metrics,
    scope::Rollback,
    strict_assert,
};

use crate::{config::EvictionPolicy, indexer::Indexer, queue::EvictionQueue, record::Record};

/// The callback invoked with the value handle of every entry that leaves the cache by eviction, pop or erase.
///
/// The callback runs synchronously while the cache write lock is held. It must not call back into the same cache,
/// or it deadlocks.
pub trait PostEvictionCallback<V>: Fn(Arc<V>) + Send + Sync + 'static {}
impl<V, T> PostEvictionCallback<V> for T where T: Fn(Arc<V>) + Send + Sync + 'static {}

pub struct RawCacheConfig<V, S>
where
    S: HashBuilder,
{
    pub name: Cow<'static, str>,
    pub eviction_policy: EvictionPolicy,
    pub low_watermark: usize,
    pub high_watermark: usize,
    pub hash_builder: S,
    pub post_eviction_callback: Option<Arc<dyn PostEvictionCallback<V>>>,
    pub metrics: Arc<Metrics>,
}

struct RawCacheShard<K, V>
where
    K: Key,
    V: Value,
{
    indexer: Indexer<K, V>,
    queue: EvictionQueue<K, V>,

    low_watermark: usize,
    high_watermark: usize,

    post_eviction_callback: Option<Arc<dyn PostEvictionCallback<V>>>,
    metrics: Arc<Metrics>,
}

impl<K, V> RawCacheShard<K, V>
where
    K: Key,
    V: Value,
{
    /// Account for a record that has been unlinked from both the indexer and the queue.
    fn release(&self, record: &Record<K, V>, event: Event) {
        strict_assert!(!record.is_in_indexer());
        strict_assert!(!record.is_in_queue());

        self.metrics.memory_size.decrease(1);
        tracing::trace!(hash = record.hash(), %event, "[raw]: release entry");

        if event.notifies() {
            if let Some(callback) = self.post_eviction_callback.as_ref() {
                callback(record.value().clone());
            }
        }
    }

    fn pop_front(&mut self) -> Option<Arc<Record<K, V>>> {
        let record = self.queue.pop_front()?;
        let indexed = self.indexer.remove(record.hash(), record.key());
        strict_assert!(indexed.as_ref().is_some_and(|r| Arc::ptr_eq(r, &record)));
        Some(record)
    }

    /// Evict from the front until the entry count drops below the low watermark, if the high watermark is reached.
    #[cfg_attr(
        feature = "tracing",
        fastrace::trace(name = "wmcache::memory::raw::shard::enforce_high_watermark")
    )]
    fn enforce_high_watermark(&mut self) {
        let before = self.indexer.len();
        if before < self.high_watermark {
            return;
        }

        while self.indexer.len() >= self.low_watermark {
            let Some(record) = self.pop_front() else {
                break;
            };
            self.metrics.memory_evict.increase(1);
            self.release(&record, Event::Evict);
        }

        tracing::debug!(
            before,
            after = self.indexer.len(),
            evicted = before - self.indexer.len(),
            low_watermark = self.low_watermark,
            high_watermark = self.high_watermark,
            "[raw]: enforce high watermark"
        );
    }

    #[cfg_attr(feature = "tracing", fastrace::trace(name = "wmcache::memory::raw::shard::emplace"))]
    fn emplace(&mut self, record: Arc<Record<K, V>>) -> Result<()> {
        self.enforce_high_watermark();

        if let Some(old) = self.indexer.replace(record.clone()) {
            let unlinked = self.queue.remove(&old);
            strict_assert!(unlinked.is_some());
            self.queue.push_back(record);
            self.metrics.memory_replace.increase(1);
            return Ok(());
        }

        self.queue.push_back(record.clone());
        let queue = Rollback::new(&mut self.queue, |queue: &mut &mut EvictionQueue<K, V>| {
            let record = queue.pop_back();
            tracing::debug!(hash = record.map(|r| r.hash()), "[raw]: roll back queue push");
        });
        self.indexer.reserve_one()?;
        self.indexer.insert_unique(record);
        queue.commit();

        self.metrics.memory_insert.increase(1);
        self.metrics.memory_size.increase(1);
        Ok(())
    }

    fn get<Q>(&self, hash: u64, key: &Q) -> Option<&Arc<Record<K, V>>>
    where
        Q: Equivalent<K> + ?Sized,
    {
        match self.indexer.get(hash, key) {
            Some(record) => {
                self.metrics.memory_hit.increase(1);
                strict_assert!(record.is_in_indexer());
                strict_assert!(record.is_in_queue());
                Some(record)
            }
            None => {
                self.metrics.memory_miss.increase(1);
                None
            }
        }
    }

    #[cfg_attr(feature = "tracing", fastrace::trace(name = "wmcache::memory::raw::shard::remove"))]
    fn remove<Q>(&mut self, hash: u64, key: &Q) -> Option<Arc<Record<K, V>>>
    where
        Q: Equivalent<K> + ?Sized,
    {
        let record = self.indexer.remove(hash, key)?;
        let unlinked = self.queue.remove(&record);
        strict_assert!(unlinked.is_some());
        Some(record)
    }

    #[cfg_attr(feature = "tracing", fastrace::trace(name = "wmcache::memory::raw::shard::clear"))]
    fn clear(&mut self) -> usize {
        let records = self.queue.clear();
        let drained = self.indexer.drain().count();
        strict_assert!(records.len() == drained);

        self.metrics.memory_clear.increase(records.len() as _);
        for record in records.iter() {
            self.release(record, Event::Clear);
        }
        records.len()
    }
}

struct RawCacheInner<K, V, S>
where
    K: Key,
    V: Value,
    S: HashBuilder,
{
    shard: RwLock<RawCacheShard<K, V>>,

    name: Cow<'static, str>,
    eviction_policy: EvictionPolicy,
    low_watermark: usize,
    high_watermark: usize,

    hash_builder: S,
    metrics: Arc<Metrics>,
}

/// The locked core of the cache: one [`RwLock`] guards the indexer and the eviction queue as a unit.
pub struct RawCache<K, V, S>
where
    K: Key,
    V: Value,
    S: HashBuilder,
{
    inner: Arc<RawCacheInner<K, V, S>>,
}

impl<K, V, S> Clone for RawCache<K, V, S>
where
    K: Key,
    V: Value,
    S: HashBuilder,
{
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<K, V, S> Debug for RawCache<K, V, S>
where
    K: Key,
    V: Value,
    S: HashBuilder,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cache")
            .field("name", &self.inner.name)
            .field("eviction_policy", &self.inner.eviction_policy)
            .field("low_watermark", &self.inner.low_watermark)
            .field("high_watermark", &self.inner.high_watermark)
            .field("size", &self.size())
            .finish()
    }
}

impl<K, V, S> RawCache<K, V, S>
where
    K: Key,
    V: Value,
    S: HashBuilder,
{
    pub fn new(config: RawCacheConfig<V, S>) -> Self {
        strict_assert!(config.low_watermark >= 1, "low watermark must be at least 1");
        strict_assert!(
            config.low_watermark <= config.high_watermark,
            "low watermark must not exceed high watermark"
        );

        tracing::debug!(
            name = %config.name,
            eviction_policy = ?config.eviction_policy,
            low_watermark = config.low_watermark,
            high_watermark = config.high_watermark,
            "[raw]: create cache"
        );

        let shard = RawCacheShard {
            indexer: Indexer::default(),
            queue: EvictionQueue::default(),
            low_watermark: config.low_watermark,
            high_watermark: config.high_watermark,
            post_eviction_callback: config.post_eviction_callback,
            metrics: config.metrics.clone(),
        };

        let inner = RawCacheInner {
            shard: RwLock::new(shard),
            name: config.name,
            eviction_policy: config.eviction_policy,
            low_watermark: config.low_watermark,
            high_watermark: config.high_watermark,
            hash_builder: config.hash_builder,
            metrics: config.metrics,
        };

        Self { inner: Arc::new(inner) }
    }

    #[cfg_attr(feature = "tracing", fastrace::trace(name = "wmcache::memory::raw::insert"))]
    pub fn insert(&self, key: K, value: Arc<V>) -> Result<()> {
        let hash = self.inner.hash_builder.hash_one(&key);
        let record = Arc::new(Record::new(key, value, hash));
        self.inner.shard.write().emplace(record)
    }

    #[cfg_attr(feature = "tracing", fastrace::trace(name = "wmcache::memory::raw::get"))]
    pub fn get<Q>(&self, key: &Q, modify_eviction_queue: bool) -> Option<Arc<V>>
    where
        Q: Hash + Equivalent<K> + ?Sized,
    {
        let hash = self.inner.hash_builder.hash_one(key);

        if !modify_eviction_queue || self.inner.eviction_policy == EvictionPolicy::Fifo {
            let shard = self.inner.shard.read();
            return shard.get(hash, key).map(|record| record.value().clone());
        }

        let shard = self.inner.shard.upgradable_read();
        let record = shard.get(hash, key).cloned()?;
        if !shard.queue.is_back(&record) {
            let mut shard = RwLockUpgradableReadGuard::upgrade(shard);
            shard.queue.move_to_back(&record);
            shard.metrics.memory_reorder.increase(1);
            tracing::trace!(hash, "[raw]: move entry to back");
        }
        Some(record.value().clone())
    }

    #[cfg_attr(feature = "tracing", fastrace::trace(name = "wmcache::memory::raw::contains"))]
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        Q: Hash + Equivalent<K> + ?Sized,
    {
        let hash = self.inner.hash_builder.hash_one(key);
        self.inner.shard.read().indexer.get(hash, key).is_some()
    }

    #[cfg_attr(feature = "tracing", fastrace::trace(name = "wmcache::memory::raw::pop_front"))]
    pub fn pop_front(&self) -> bool {
        let mut shard = self.inner.shard.write();
        match shard.pop_front() {
            Some(record) => {
                shard.metrics.memory_pop.increase(1);
                shard.release(&record, Event::Evict);
                true
            }
            None => false,
        }
    }

    #[cfg_attr(feature = "tracing", fastrace::trace(name = "wmcache::memory::raw::remove"))]
    pub fn remove<Q>(&self, key: &Q) -> bool
    where
        Q: Hash + Equivalent<K> + ?Sized,
    {
        let hash = self.inner.hash_builder.hash_one(key);
        let mut shard = self.inner.shard.write();
        match shard.remove(hash, key) {
            Some(record) => {
                shard.metrics.memory_remove.increase(1);
                shard.release(&record, Event::Remove);
                true
            }
            None => false,
        }
    }

    pub fn set_post_eviction_callback(&self, callback: Option<Arc<dyn PostEvictionCallback<V>>>) {
        let mut shard = self.inner.shard.write();
        tracing::debug!(
            name = %self.inner.name,
            set = callback.is_some(),
            "[raw]: replace post-eviction callback"
        );
        shard.post_eviction_callback = callback;
    }

    #[cfg_attr(feature = "tracing", fastrace::trace(name = "wmcache::memory::raw::clear"))]
    pub fn clear(&self) {
        let count = self.inner.shard.write().clear();
        tracing::debug!(name = %self.inner.name, count, "[raw]: clear");
    }

    pub fn visit<F>(&self, mut visitor: F)
    where
        F: FnMut(&K, &V) -> bool,
    {
        let shard = self.inner.shard.read();
        for record in shard.queue.iter() {
            if !visitor(record.key(), record.value().as_ref()) {
                break;
            }
        }
    }

    pub fn size(&self) -> usize {
        self.inner.shard.read().indexer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.shard.read().indexer.is_empty()
    }

    pub fn eviction_policy(&self) -> EvictionPolicy {
        self.inner.eviction_policy
    }

    pub fn low_watermark(&self) -> usize {
        self.inner.low_watermark
    }

    pub fn high_watermark(&self) -> usize {
        self.inner.high_watermark
    }

    pub fn hash_builder(&self) -> &S {
        &self.inner.hash_builder
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.inner.metrics
    }

    /// Check that the indexer and the eviction queue hold exactly the same records.
    #[cfg(any(test, feature = "sanity"))]
    pub fn check_sanity(&self) {
        let shard = self.inner.shard.read();
        assert_eq!(shard.indexer.len(), shard.queue.len());
        assert_eq!(shard.queue.iter().count(), shard.queue.len());
        for record in shard.queue.iter() {
            assert!(record.is_in_queue());
            assert!(record.is_in_indexer());
            let indexed = shard
                .indexer
                .get(record.hash(), record.key())
                .expect("queued record must be indexed");
            assert!(std::ptr::eq(indexed.as_ref(), record));
        }
    }

    #[cfg(test)]
    fn fail_next_reserve(&self) {
        self.inner.shard.write().indexer.fail_next_reserve();
    }
}
