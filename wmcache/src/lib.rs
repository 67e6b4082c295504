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

//! wmcache is a thread-safe in-memory key-value cache with LRU or FIFO eviction bounded by low and high watermarks.
//!
//! ```
//! use wmcache::{Cache, EvictionPolicy};
//!
//! let cache: Cache<u64, &str> = Cache::new(EvictionPolicy::Fifo, 1, 2);
//! cache.insert(1, "one").unwrap();
//! cache.insert(2, "two").unwrap();
//! cache.insert(3, "three").unwrap();
//!
//! assert!(!cache.contains(&1));
//! assert!(!cache.contains(&2));
//! assert_eq!(cache.try_get_value(&3).as_deref(), Some(&"three"));
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]

pub use wmcache_common as common;
pub use wmcache_memory as memory;

mod prelude;
pub use prelude::*;
