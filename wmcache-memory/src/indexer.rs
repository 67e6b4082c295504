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

use std::sync::Arc;

use equivalent::Equivalent;
use hashbrown::hash_table::HashTable;
use wmcache_common::{
    code::{Key, Value},
    error::{Error, Result},
    strict_assert,
};

use crate::record::Record;

/// Key to record index backed by [`HashTable`].
///
/// Lookups compare hashes first and then keys through [`Equivalent`], so a borrowed form of the key can be used.
pub struct Indexer<K, V> {
    table: HashTable<Arc<Record<K, V>>>,
    #[cfg(test)]
    fail_next_reserve: bool,
}

impl<K, V> Default for Indexer<K, V> {
    fn default() -> Self {
        Self {
            table: HashTable::new(),
            #[cfg(test)]
            fail_next_reserve: false,
        }
    }
}

impl<K, V> Indexer<K, V>
where
    K: Key,
    V: Value,
{
    /// Reserve room for one more record.
    ///
    /// Fails with [`ErrorKind::NoSpace`](wmcache_common::error::ErrorKind::NoSpace) if the table cannot grow. The
    /// table is left untouched on failure.
    pub fn reserve_one(&mut self) -> Result<()> {
        #[cfg(test)]
        if std::mem::take(&mut self.fail_next_reserve) {
            return Err(Error::no_space(self.table.len(), 1).with_context("reason", "injected"));
        }

        self.table
            .try_reserve(1, |r| r.hash())
            .map_err(|e| Error::no_space(self.table.len(), 1).with_context("reason", format!("{e:?}")))
    }

    /// Insert a record whose key must not be indexed yet.
    ///
    /// Call [`Indexer::reserve_one`] first to make the insertion infallible.
    pub fn insert_unique(&mut self, record: Arc<Record<K, V>>) {
        strict_assert!(!record.is_in_indexer());
        record.set_in_indexer(true);
        self.table.insert_unique(record.hash(), record, |r| r.hash());
    }

    /// Replace the record indexed under the same key and return the old one.
    ///
    /// Returns `None` and leaves the table untouched if no record shares the key.
    pub fn replace(&mut self, record: Arc<Record<K, V>>) -> Option<Arc<Record<K, V>>> {
        let slot = self.table.find_mut(record.hash(), |r| r.key() == record.key())?;
        strict_assert!(!record.is_in_indexer());
        record.set_in_indexer(true);
        let old = std::mem::replace(slot, record);
        old.set_in_indexer(false);
        Some(old)
    }

    /// Get the record indexed under the key.
    pub fn get<Q>(&self, hash: u64, key: &Q) -> Option<&Arc<Record<K, V>>>
    where
        Q: Equivalent<K> + ?Sized,
    {
        self.table.find(hash, |r| key.equivalent(r.key()))
    }

    /// Remove and return the record indexed under the key.
    pub fn remove<Q>(&mut self, hash: u64, key: &Q) -> Option<Arc<Record<K, V>>>
    where
        Q: Equivalent<K> + ?Sized,
    {
        match self.table.find_entry(hash, |r| key.equivalent(r.key())) {
            Ok(o) => {
                let (record, _) = o.remove();
                strict_assert!(record.is_in_indexer());
                record.set_in_indexer(false);
                Some(record)
            }
            Err(_) => None,
        }
    }

    /// Remove all records and return them in arbitrary order.
    pub fn drain(&mut self) -> impl Iterator<Item = Arc<Record<K, V>>> + '_ {
        self.table.drain().inspect(|record| {
            strict_assert!(record.is_in_indexer());
            record.set_in_indexer(false);
        })
    }

    /// Count of indexed records.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns `true` if no record is indexed.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn capacity(&self) -> usize {
        self.table.capacity()
    }

    #[cfg(test)]
    pub(crate) fn fail_next_reserve(&mut self) {
        self.fail_next_reserve = true;
    }
}
