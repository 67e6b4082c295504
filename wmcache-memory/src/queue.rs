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

use intrusive_collections::{intrusive_adapter, LinkedList, LinkedListAtomicLink};
use wmcache_common::{
    code::{Key, Value},
    strict_assert,
};

use crate::record::Record;

intrusive_adapter! { Adapter<K, V> = Arc<Record<K, V>>: Record<K, V> { link => LinkedListAtomicLink } where K: Key, V: Value }

/// Doubly linked eviction order over cached records.
///
/// The front is the next eviction victim and the back is the most recently inserted (or, for LRU, most recently
/// accessed) record. Every operation is *O(1)*. A record may only be linked into one queue at a time, which is
/// tracked by its in-queue flag.
pub struct EvictionQueue<K, V>
where
    K: Key,
    V: Value,
{
    list: LinkedList<Adapter<K, V>>,
    len: usize,
}

impl<K, V> Default for EvictionQueue<K, V>
where
    K: Key,
    V: Value,
{
    fn default() -> Self {
        Self {
            list: LinkedList::new(Adapter::new()),
            len: 0,
        }
    }
}

impl<K, V> EvictionQueue<K, V>
where
    K: Key,
    V: Value,
{
    /// Link the record at the back.
    pub fn push_back(&mut self, record: Arc<Record<K, V>>) {
        strict_assert!(!record.is_in_queue());
        record.set_in_queue(true);
        self.list.push_back(record);
        self.len += 1;
    }

    /// Unlink and return the record at the front.
    pub fn pop_front(&mut self) -> Option<Arc<Record<K, V>>> {
        let record = self.list.pop_front()?;
        self.unlinked(&record);
        Some(record)
    }

    /// Unlink and return the record at the back.
    pub fn pop_back(&mut self) -> Option<Arc<Record<K, V>>> {
        let record = self.list.pop_back()?;
        self.unlinked(&record);
        Some(record)
    }

    /// Returns `true` if the record is linked at the back.
    pub fn is_back(&self, record: &Arc<Record<K, V>>) -> bool {
        self.list
            .back()
            .get()
            .is_some_and(|back| std::ptr::eq(back, Arc::as_ptr(record)))
    }

    /// Unlink the record from wherever it is.
    ///
    /// Returns `None` if the record is not linked.
    pub fn remove(&mut self, record: &Arc<Record<K, V>>) -> Option<Arc<Record<K, V>>> {
        if !record.is_in_queue() {
            return None;
        }
        // SAFETY: The in-queue flag guarantees the record is linked into this queue.
        let record = unsafe { self.list.cursor_mut_from_ptr(Arc::as_ptr(record)).remove() }?;
        self.unlinked(&record);
        Some(record)
    }

    /// Relink the record at the back, keeping the relative order of the others.
    pub fn move_to_back(&mut self, record: &Arc<Record<K, V>>) {
        if let Some(record) = self.remove(record) {
            self.push_back(record);
        }
    }

    /// Unlink all records, front to back.
    pub fn clear(&mut self) -> Vec<Arc<Record<K, V>>> {
        let mut records = Vec::with_capacity(self.len);
        while let Some(record) = self.pop_front() {
            records.push(record);
        }
        records
    }

    /// Iterate records front to back.
    pub fn iter(&self) -> impl Iterator<Item = &Record<K, V>> + '_ {
        self.list.iter()
    }

    /// Count of linked records.
    pub fn len(&self) -> usize {
        self.len
    }

    fn unlinked(&mut self, record: &Arc<Record<K, V>>) {
        strict_assert!(record.is_in_queue());
        record.set_in_queue(false);
        self.len -= 1;
    }
}

impl<K, V> Drop for EvictionQueue<K, V>
where
    K: Key,
    V: Value,
{
    fn drop(&mut self) {
        self.clear();
    }
}
