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

//! Shared components and utils for wmcache.

/// Allow enable debug assertions in release profile with feature "strict_assertion".
pub mod assert;
/// Key, value and hash builder abstractions.
pub mod code;
/// Error type and result alias.
pub mod error;
/// Events that describe why an entry leaves the cache.
pub mod event;
/// Deterministic hashers for tests.
pub mod hasher;
/// Metrics of the in-memory cache.
pub mod metrics;
/// Scope guards.
pub mod scope;
