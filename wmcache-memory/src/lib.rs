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

//! A thread-safe in-memory key-value cache bounded by a pair of watermarks.
//!
//! Once the entry count reaches the high watermark, the next insert first evicts entries from the front of the
//! eviction queue until the count drops below the low watermark. The queue follows either LRU or FIFO order.
//!
//! ```
//! use std::sync::Arc;
//!
//! use parking_lot::Mutex;
//! use wmcache_memory::{Cache, CacheBuilder, EvictionPolicy};
//!
//! let evicted = Arc::new(Mutex::new(vec![]));
//! let e = evicted.clone();
//!
//! let cache: Cache<u64, String> = CacheBuilder::new()
//!     .with_eviction_policy(EvictionPolicy::Lru)
//!     .with_watermarks(3, 4)
//!     .with_post_eviction_callback(move |v: Arc<String>| e.lock().push(v.to_string()))
//!     .build();
//!
//! for (k, v) in [(0, "Alex"), (1, "John"), (2, "Rob"), (3, "Steve")] {
//!     cache.insert(k, v.to_string()).unwrap();
//! }
//! assert_eq!(cache.try_get_value(&1).as_deref().map(String::as_str), Some("John"));
//!
//! cache.insert(4, "Tim".to_string()).unwrap();
//! assert_eq!(cache.size(), 3);
//! assert_eq!(*evicted.lock(), vec!["Alex".to_string(), "Rob".to_string()]);
//! ```
//!
//! The post-eviction callback runs under the cache write lock and must not call into the same cache. The visitor of
//! [`Cache::visit`] runs under the shared lock, so a slow visitor delays writers.

mod cache;
mod config;
mod indexer;
mod queue;
mod raw;
mod record;

/// Re-exported public API.
pub mod prelude;
pub use prelude::*;
