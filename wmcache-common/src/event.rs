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

use std::fmt::Display;

/// Event identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Event {
    /// Evicted from the front of the eviction queue, by watermark enforcement or an explicit pop.
    Evict,
    /// Removed by key.
    Remove,
    /// Dropped by a bulk clear. Never reported to the post-eviction callback.
    Clear,
}

impl Event {
    /// Convert self into static str.
    pub fn into_static(self) -> &'static str {
        match self {
            Event::Evict => "evict",
            Event::Remove => "remove",
            Event::Clear => "clear",
        }
    }

    /// Returns `true` if the post-eviction callback is invoked for the event.
    pub fn notifies(self) -> bool {
        !matches!(self, Event::Clear)
    }
}

impl Display for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.into_static())
    }
}
