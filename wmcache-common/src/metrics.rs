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

use std::borrow::Cow;

use mixtrics::{
    metrics::{BoxedCounter, BoxedGauge, BoxedRegistry},
    registry::noop::NoopMetricsRegistry,
};

/// Metrics of an in-memory cache instance.
#[derive(Debug)]
pub struct Metrics {
    /// Fresh key inserted.
    pub memory_insert: BoxedCounter,
    /// Value handle of an existing key replaced.
    pub memory_replace: BoxedCounter,
    /// Lookup hit.
    pub memory_hit: BoxedCounter,
    /// Lookup miss.
    pub memory_miss: BoxedCounter,
    /// Entry moved to the back of the eviction queue by a lookup.
    pub memory_reorder: BoxedCounter,
    /// Entry removed by key.
    pub memory_remove: BoxedCounter,
    /// Entry evicted by watermark enforcement.
    pub memory_evict: BoxedCounter,
    /// Entry evicted by an explicit pop.
    pub memory_pop: BoxedCounter,
    /// Entry dropped by a bulk clear.
    pub memory_clear: BoxedCounter,

    /// Entry count.
    pub memory_size: BoxedGauge,
}

impl Metrics {
    /// Create a new metric with the given name.
    pub fn new(name: impl Into<Cow<'static, str>>, registry: &BoxedRegistry) -> Self {
        let name = name.into();

        let wmcache_memory_op_total = registry.register_counter_vec(
            "wmcache_memory_op_total".into(),
            "wmcache in-memory cache operations".into(),
            &["name", "op"],
        );
        let wmcache_memory_size = registry.register_gauge_vec(
            "wmcache_memory_size".into(),
            "wmcache in-memory cache entry count".into(),
            &["name"],
        );

        let op = |op: &'static str| wmcache_memory_op_total.counter(&[name.clone(), op.into()]);

        Self {
            memory_insert: op("insert"),
            memory_replace: op("replace"),
            memory_hit: op("hit"),
            memory_miss: op("miss"),
            memory_reorder: op("reorder"),
            memory_remove: op("remove"),
            memory_evict: op("evict"),
            memory_pop: op("pop"),
            memory_clear: op("clear"),
            memory_size: wmcache_memory_size.gauge(&[name.clone()]),
        }
    }

    /// Build noop metrics.
    ///
    /// Note: `noop` is only supposed to be called by other wmcache components.
    #[doc(hidden)]
    pub fn noop() -> Self {
        Self::new("test", &(Box::new(NoopMetricsRegistry) as BoxedRegistry))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noop_metrics() {
        let metrics = Metrics::noop();
        metrics.memory_insert.increase(1);
        metrics.memory_size.increase(2);
        metrics.memory_size.decrease(1);
        metrics.memory_size.absolute(0);
    }
}
