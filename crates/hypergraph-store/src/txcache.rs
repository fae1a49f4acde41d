// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Dragonscale Team

//! Per-query transaction cache.
//!
//! Keyed `feed_hex[@version]`. The cache is owned by the query that
//! created it; dropping the query releases every cached transaction.

use crate::feed::transaction::FeedTransaction;
use crate::store::VertexStore;
use fxhash::FxHashMap;
use hypergraph_common::{FeedKey, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Mutex;

pub struct TransactionCache {
    store: Arc<VertexStore>,
    // tokio Mutex: held across the open so concurrent callers asking for
    // the same key coalesce to a single open.
    inner: Mutex<FxHashMap<String, Arc<FeedTransaction>>>,
    opened: AtomicUsize,
}

impl TransactionCache {
    pub fn new(store: Arc<VertexStore>) -> Self {
        Self {
            store,
            inner: Mutex::new(FxHashMap::default()),
            opened: AtomicUsize::new(0),
        }
    }

    fn cache_key(feed: &FeedKey, version: Option<u64>) -> String {
        match version {
            Some(v) => format!("{}@{}", feed.to_hex(), v),
            None => feed.to_hex(),
        }
    }

    /// Returns the cached transaction for `feed_hex[@version]`, opening
    /// one if absent.
    pub async fn get_or_open(
        &self,
        feed: &FeedKey,
        version: Option<u64>,
    ) -> Result<Arc<FeedTransaction>> {
        let key = Self::cache_key(feed, version);
        let mut inner = self.inner.lock().await;
        if let Some(tr) = inner.get(&key) {
            return Ok(tr.clone());
        }
        let tr = self.store.transaction(feed, version).await?;
        inner.insert(key, tr.clone());
        self.opened.fetch_add(1, Ordering::Relaxed);
        Ok(tr)
    }

    /// Number of distinct transactions this cache has opened.
    pub fn opened_count(&self) -> usize {
        self.opened.load(Ordering::Relaxed)
    }
}
