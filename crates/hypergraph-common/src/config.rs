// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Dragonscale Team

/// Configuration for the background crawler.
#[derive(Clone, Debug)]
pub struct CrawlerConfig {
    /// Maximum hop distance from the crawl root (default: 64).
    pub max_depth: usize,

    /// Maximum number of vertices visited per crawl (default: 100_000).
    pub max_visited: usize,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_depth: 64,
            max_visited: 100_000,
        }
    }
}

/// Configuration for the query engine.
#[derive(Clone, Debug)]
pub struct QueryConfig {
    /// Depth cap for `repeat` when the caller does not supply one
    /// (default: 64).
    pub max_repeat_depth: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            max_repeat_depth: 64,
        }
    }
}

/// Top-level configuration for a HyperGraphDB instance.
#[derive(Clone, Debug, Default)]
pub struct HyperGraphConfig {
    pub crawler: CrawlerConfig,
    pub query: QueryConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = HyperGraphConfig::default();
        assert_eq!(config.crawler.max_depth, 64);
        assert_eq!(config.crawler.max_visited, 100_000);
        assert_eq!(config.query.max_repeat_depth, 64);
    }
}
