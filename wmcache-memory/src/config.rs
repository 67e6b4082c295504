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

use serde::{Deserialize, Serialize};
use wmcache_common::error::{Error, Result};

/// Order in which entries leave the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvictionPolicy {
    /// Least recently used. Lookups move the entry to the back of the eviction queue.
    #[default]
    Lru,
    /// First in, first out. Lookups never reorder the eviction queue.
    Fifo,
}

/// Serializable cache configuration.
///
/// Both watermarks default to [`usize::MAX`], so a default cache never evicts on its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Eviction policy.
    pub eviction_policy: EvictionPolicy,
    /// Evictions triggered by the high watermark stop once the entry count drops below this value.
    pub low_watermark: usize,
    /// An insert evicts first if the entry count has reached this value.
    pub high_watermark: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            eviction_policy: EvictionPolicy::default(),
            low_watermark: usize::MAX,
            high_watermark: usize::MAX,
        }
    }
}

impl CacheConfig {
    /// Check `1 <= low_watermark <= high_watermark`.
    pub fn validate(&self) -> Result<()> {
        if self.low_watermark == 0 || self.low_watermark > self.high_watermark {
            return Err(Error::invalid_watermarks(self.low_watermark, self.high_watermark));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use wmcache_common::error::ErrorKind;

    use super::*;

    #[test]
    fn test_config_validate() {
        CacheConfig::default().validate().unwrap();

        for (low, high, ok) in [(1, 1, true), (3, 4, true), (0, 4, false), (5, 4, false), (0, 0, false)] {
            let config = CacheConfig {
                low_watermark: low,
                high_watermark: high,
                ..Default::default()
            };
            match config.validate() {
                Ok(()) => assert!(ok, "low: {low}, high: {high}"),
                Err(e) => {
                    assert!(!ok, "low: {low}, high: {high}");
                    assert_eq!(e.kind(), ErrorKind::Config);
                }
            }
        }
    }

    #[test]
    fn test_config_serde() {
        let config: CacheConfig = serde_json::from_str(r#"{ "eviction_policy": "fifo", "high_watermark": 16 }"#).unwrap();
        assert_eq!(
            config,
            CacheConfig {
                eviction_policy: EvictionPolicy::Fifo,
                low_watermark: usize::MAX,
                high_watermark: 16,
            }
        );
        // The defaulted low watermark exceeds the explicit high watermark.
        assert!(config.validate().is_err());

        let json = serde_json::to_string(&CacheConfig {
            eviction_policy: EvictionPolicy::Lru,
            low_watermark: 3,
            high_watermark: 4,
        })
        .unwrap();
        assert_eq!(json, r#"{"eviction_policy":"lru","low_watermark":3,"high_watermark":4}"#);
    }
}
