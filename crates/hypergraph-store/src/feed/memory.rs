// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Dragonscale Team

use crate::feed::{AppendLog, Corestore};
use async_trait::async_trait;
use bytes::Bytes;
use fxhash::FxHashMap;
use hypergraph_common::{FeedKey, HyperGraphError, Result, VertexId};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use tracing::debug;

/// In-memory append-only log.
pub struct MemoryFeed {
    key: FeedKey,
    writable: bool,
    blocks: RwLock<Vec<Bytes>>,
}

impl MemoryFeed {
    pub fn new(key: FeedKey, writable: bool) -> Self {
        Self {
            key,
            writable,
            blocks: RwLock::new(Vec::new()),
        }
    }
}

#[async_trait]
impl AppendLog for MemoryFeed {
    fn key(&self) -> FeedKey {
        self.key
    }

    fn writable(&self) -> bool {
        self.writable
    }

    async fn len(&self) -> Result<u64> {
        Ok(self.blocks.read().len() as u64)
    }

    async fn get(&self, seq: u64) -> Result<Bytes> {
        let blocks = self.blocks.read();
        blocks
            .get(seq as usize)
            .cloned()
            .ok_or_else(|| HyperGraphError::VertexLoading {
                feed: self.key,
                id: VertexId::new(seq + 1),
                version: None,
                view: None,
            })
    }

    async fn append(&self, block: Bytes) -> Result<u64> {
        if !self.writable {
            return Err(HyperGraphError::WritePermission {
                message: format!("feed {} is not locally writable", self.key),
            });
        }
        let mut blocks = self.blocks.write();
        blocks.push(block);
        Ok(blocks.len() as u64 - 1)
    }
}

/// In-memory corestore: a map of feed keys to [`MemoryFeed`]s.
///
/// Feeds created locally are writable; feeds opened by an unknown key are
/// empty non-writable placeholders standing in for a remote writer whose
/// data has not replicated.
pub struct MemoryCorestore {
    feeds: RwLock<FxHashMap<FeedKey, Arc<MemoryFeed>>>,
    default_key: Mutex<Option<FeedKey>>,
}

impl MemoryCorestore {
    pub fn new() -> Self {
        Self {
            feeds: RwLock::new(FxHashMap::default()),
            default_key: Mutex::new(None),
        }
    }

    fn open_or_placeholder(&self, key: &FeedKey) -> Arc<MemoryFeed> {
        let mut feeds = self.feeds.write();
        if let Some(feed) = feeds.get(key) {
            return feed.clone();
        }
        debug!(feed = %key, "Opening placeholder for unknown feed");
        let feed = Arc::new(MemoryFeed::new(*key, false));
        feeds.insert(*key, feed.clone());
        feed
    }

    fn create(&self) -> Arc<MemoryFeed> {
        let key = FeedKey::random();
        let feed = Arc::new(MemoryFeed::new(key, true));
        self.feeds.write().insert(key, feed.clone());
        debug!(feed = %key, "Created local writable feed");
        feed
    }
}

impl Default for MemoryCorestore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Corestore for MemoryCorestore {
    async fn default_feed(&self) -> Result<Arc<dyn AppendLog>> {
        let feed = {
            let mut default_key = self.default_key.lock();
            match *default_key {
                Some(key) => self.open_or_placeholder(&key),
                None => {
                    let feed = self.create();
                    *default_key = Some(feed.key());
                    feed
                }
            }
        };
        Ok(feed)
    }

    async fn feed(&self, key: &FeedKey) -> Result<Arc<dyn AppendLog>> {
        Ok(self.open_or_placeholder(key))
    }

    async fn create_feed(&self) -> Result<Arc<dyn AppendLog>> {
        Ok(self.create())
    }
}
