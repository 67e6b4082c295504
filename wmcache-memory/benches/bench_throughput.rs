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

//! micro benchmark for wmcache in-memory cache throughput and hit ratio

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use rand::{rngs::SmallRng, SeedableRng};
use rand_distr::{Distribution, Zipf};
use wmcache_memory::{Cache, EvictionPolicy};

const ITEMS: usize = 100_000;
const ITERATIONS: usize = 1_000_000;
const THREADS: usize = 4;

/*
cargo bench --bench bench_throughput

Each thread replays its own zipf key stream as read-through requests: a miss inserts the key.
*/
fn replay(cache: Cache<u64, u64>, keys: Arc<Vec<u64>>) -> (usize, Duration) {
    let mut hit = 0;
    let now = Instant::now();
    for key in keys.iter() {
        if cache.try_get_value(key).is_some() {
            hit += 1;
        } else {
            cache.insert(*key, *key).unwrap();
        }
    }
    (hit, now.elapsed())
}

fn zipf_keys(zipf_exp: f64, seed: u64) -> Vec<u64> {
    let mut rng = SmallRng::seed_from_u64(seed);
    let zipf = Zipf::new(ITEMS as f64, zipf_exp).unwrap();
    (0..ITERATIONS).map(|_| zipf.sample(&mut rng) as u64).collect()
}

fn bench_one(policy: EvictionPolicy, zipf_exp: f64, cache_size_percent: f64) {
    let high = ((ITEMS as f64 * cache_size_percent) as usize).max(1);
    let low = (high * 9 / 10).max(1);
    let cache = Cache::new(policy, low, high);

    let handles = (0..THREADS)
        .map(|i| {
            let cache = cache.clone();
            let keys = Arc::new(zipf_keys(zipf_exp, i as u64));
            std::thread::spawn(move || replay(cache, keys))
        })
        .collect::<Vec<_>>();

    let mut hit = 0;
    let mut elapsed = Duration::ZERO;
    for handle in handles {
        let (h, e) = handle.join().unwrap();
        hit += h;
        elapsed = elapsed.max(e);
    }

    let ops = THREADS * ITERATIONS;
    println!(
        "{:>6}{:8.2}{:8.3}{:15.2}%{:15.0}",
        format!("{policy:?}").to_lowercase(),
        zipf_exp,
        cache_size_percent,
        hit as f64 / ops as f64 * 100.0,
        ops as f64 / elapsed.as_secs_f64(),
    );
}

fn main() {
    println!(
        "{:>6}{:>8}{:>8}{:>16}{:>15}",
        "policy", "zipf", "size", "hit ratio", "ops/s"
    );
    for policy in [EvictionPolicy::Fifo, EvictionPolicy::Lru] {
        for zipf_exp in [0.9, 1.0, 1.1] {
            for cache_size_percent in [0.01, 0.05, 0.25] {
                bench_one(policy, zipf_exp, cache_size_percent);
            }
        }
    }
}
