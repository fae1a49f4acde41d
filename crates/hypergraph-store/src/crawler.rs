// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Dragonscale Team

//! Background crawler: walks the graph breadth-first from a root vertex
//! and feeds every registered index rule.

use crate::index::{IndexRule, InvertedIndex, Posting};
use crate::store::VertexStore;
use crate::txcache::TransactionCache;
use fxhash::{FxHashMap, FxHashSet};
use hypergraph_common::{CrawlerConfig, Result, VertexPointer};
use parking_lot::RwLock;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlStats {
    /// Vertices visited (and run through every rule).
    pub visited: usize,
    /// Index entries inserted.
    pub indexed: usize,
    /// True when the per-crawl visit bound cut the walk short.
    pub truncated: bool,
}

pub struct Crawler {
    store: Arc<VertexStore>,
    config: CrawlerConfig,
    rules: RwLock<Vec<Arc<dyn IndexRule>>>,
    indexes: RwLock<FxHashMap<String, Arc<InvertedIndex>>>,
    // Index mutation is single-writer: concurrent crawls serialize here.
    crawl_lock: Mutex<()>,
}

impl Crawler {
    pub fn new(store: Arc<VertexStore>, config: CrawlerConfig) -> Self {
        Self {
            store,
            config,
            rules: RwLock::new(Vec::new()),
            indexes: RwLock::new(FxHashMap::default()),
            crawl_lock: Mutex::new(()),
        }
    }

    /// Registers a rule and creates its index if missing.
    pub fn add_rule(&self, rule: Arc<dyn IndexRule>) {
        self.indexes
            .write()
            .entry(rule.name().to_string())
            .or_insert_with(|| Arc::new(InvertedIndex::new(rule.name())));
        self.rules.write().push(rule);
    }

    pub fn index(&self, name: &str) -> Option<Arc<InvertedIndex>> {
        self.indexes.read().get(name).cloned()
    }

    pub fn indexes(&self) -> Vec<Arc<InvertedIndex>> {
        self.indexes.read().values().cloned().collect()
    }

    /// Walks the graph from `root`, applying every registered rule to
    /// each vertex seen for the first time this crawl.
    ///
    /// An unresolvable vertex (e.g. an edge into a feed that has not
    /// replicated) is skipped, not fatal.
    #[instrument(skip(self), fields(root = %root))]
    pub async fn crawl(&self, root: VertexPointer) -> Result<CrawlStats> {
        let _guard = self.crawl_lock.lock().await;
        let start = Instant::now();
        let rules: Vec<Arc<dyn IndexRule>> = self.rules.read().clone();
        let cache = TransactionCache::new(self.store.clone());

        let mut stats = CrawlStats::default();
        let mut visited: FxHashSet<VertexPointer> = FxHashSet::default();
        let mut queue: VecDeque<(VertexPointer, usize)> = VecDeque::new();
        queue.push_back((root, 0));

        while let Some((pointer, depth)) = queue.pop_front() {
            if visited.len() >= self.config.max_visited {
                stats.truncated = true;
                warn!(
                    bound = self.config.max_visited,
                    "Crawl visit bound reached"
                );
                break;
            }

            let (vertex, canonical) = match cache.get_or_open(&pointer.feed, None).await {
                Ok(tr) => {
                    let loaded = self.store.get_in_transaction(pointer.id, &tr).await;
                    let first = tr.resolve_first(pointer.id).await;
                    match (loaded, first) {
                        (Ok(vertex), Ok(first)) => {
                            (vertex, VertexPointer::new(pointer.feed, first))
                        }
                        (Err(e), _) | (_, Err(e)) => {
                            debug!(pointer = %pointer, error = %e, "Skipping unresolvable vertex");
                            continue;
                        }
                    }
                }
                Err(e) => {
                    debug!(feed = %pointer.feed, error = %e, "Skipping unreachable feed");
                    continue;
                }
            };

            // A revised vertex moves to a new id; its first revision id
            // is the stable identity the visited set and the postings
            // are keyed on.
            if !visited.insert(canonical) {
                continue;
            }
            stats.visited += 1;
            metrics::counter!("hypergraph_crawl_visits_total").increment(1);

            let mut follow: Vec<String> = Vec::new();
            for rule in &rules {
                for (key, weight) in rule.extract(&vertex) {
                    if let Some(index) = self.index(rule.name()) {
                        index.insert(
                            &key,
                            Posting {
                                pointer: canonical,
                                weight,
                            },
                        );
                        stats.indexed += 1;
                    }
                }
                for label in rule.traverse(&vertex) {
                    if !follow.contains(&label) {
                        follow.push(label);
                    }
                }
            }

            if depth >= self.config.max_depth {
                continue;
            }
            for label in &follow {
                for edge in vertex.edges_labeled(label) {
                    let target = VertexPointer::new(
                        edge.feed.unwrap_or(canonical.feed),
                        edge.target,
                    );
                    if !visited.contains(&target) {
                        queue.push_back((target, depth + 1));
                    }
                }
            }
        }

        metrics::histogram!("hypergraph_crawl_duration_seconds")
            .record(start.elapsed().as_secs_f64());
        info!(
            visited = stats.visited,
            indexed = stats.indexed,
            truncated = stats.truncated,
            "Crawl completed"
        );
        Ok(stats)
    }
}
