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

use std::{
    fmt::Debug,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use bitflags::bitflags;
use intrusive_collections::LinkedListAtomicLink;
use wmcache_common::code::{Key, Value};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct Flags: u64 {
        const IN_INDEXER = 0b00000001;
        const IN_QUEUE = 0b00000010;
    }
}

/// [`Record`] holds the information of the cached entry.
///
/// A record is shared by the indexer, which owns the map slot, and the eviction queue, which owns the ordering
/// position through the intrusive `link`. The value is held by an [`Arc`] so that callers and the post-eviction
/// callback keep it alive after the record leaves the cache.
pub struct Record<K, V> {
    key: K,
    value: Arc<V>,
    hash: u64,
    pub(crate) link: LinkedListAtomicLink,
    flags: AtomicU64,
}

impl<K, V> Debug for Record<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Record")
            .field("hash", &self.hash)
            .field("flags", &Flags::from_bits_truncate(self.flags.load(Ordering::Relaxed)))
            .finish()
    }
}

impl<K, V> Record<K, V>
where
    K: Key,
    V: Value,
{
    /// Create a record that is neither indexed nor queued.
    pub fn new(key: K, value: Arc<V>, hash: u64) -> Self {
        Self {
            key,
            value,
            hash,
            link: LinkedListAtomicLink::new(),
            flags: AtomicU64::new(0),
        }
    }

    /// Get the immutable reference of the record key.
    pub fn key(&self) -> &K {
        &self.key
    }

    /// Get the shared value handle of the record.
    pub fn value(&self) -> &Arc<V> {
        &self.value
    }

    /// Get the record hash.
    pub fn hash(&self) -> u64 {
        self.hash
    }

    /// Set in indexer flag.
    pub fn set_in_indexer(&self, val: bool) {
        self.set_flags(Flags::IN_INDEXER, val, Ordering::Release);
    }

    /// Get in indexer flag.
    pub fn is_in_indexer(&self) -> bool {
        self.get_flags(Flags::IN_INDEXER, Ordering::Acquire)
    }

    /// Set in eviction queue flag.
    pub fn set_in_queue(&self, val: bool) {
        self.set_flags(Flags::IN_QUEUE, val, Ordering::Release);
    }

    /// Get in eviction queue flag.
    pub fn is_in_queue(&self) -> bool {
        self.get_flags(Flags::IN_QUEUE, Ordering::Acquire)
    }

    fn set_flags(&self, flags: Flags, val: bool, order: Ordering) {
        match val {
            true => self.flags.fetch_or(flags.bits(), order),
            false => self.flags.fetch_and(!flags.bits(), order),
        };
    }

    fn get_flags(&self, flags: Flags, order: Ordering) -> bool {
        self.flags.load(order) & flags.bits() == flags.bits()
    }
}
