// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Dragonscale Team

//! Snapshot transactions over one feed.
//!
//! A transaction observes a fixed feed length. Because a re-persisted
//! vertex lands at a new position while older edges still reference a
//! prior revision id, each transaction lazily builds a revision index:
//! a scan of record preambles (the leading `prev_id` varint) that maps
//! any revision id to the latest revision at the snapshot length.

use crate::envelope;
use crate::feed::AppendLog;
use bytes::Bytes;
use fxhash::FxHashMap;
use hypergraph_common::{FeedKey, HyperGraphError, Result, VertexId};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;
use tracing::{debug, warn};

#[derive(Default)]
struct RevisionIndex {
    /// revision id -> id of the first revision in its chain
    root_of: FxHashMap<u64, u64>,
    /// chain root id -> id of the latest revision
    latest: FxHashMap<u64, u64>,
    built_to: u64,
}

impl RevisionIndex {
    fn ingest(&mut self, id: u64, prev: u64) {
        let root = match self.root_of.get(&prev) {
            Some(r) if prev != 0 => *r,
            _ => id,
        };
        self.root_of.insert(id, root);
        self.latest.insert(root, id);
    }
}

/// A read (or read/write, for locally writable feeds) snapshot over one
/// feed at a fixed length.
pub struct FeedTransaction {
    log: Arc<dyn AppendLog>,
    snapshot: AtomicU64,
    pinned: Option<u64>,
    index: Mutex<RevisionIndex>,
}

impl FeedTransaction {
    /// Opens a transaction at the current feed length, or at `version`
    /// if pinned.
    pub async fn open(log: Arc<dyn AppendLog>, version: Option<u64>) -> Result<Self> {
        let len = log.len().await?;
        let snapshot = match version {
            Some(v) if v > len => {
                return Err(HyperGraphError::Input {
                    message: format!(
                        "version {} exceeds feed {} length {}",
                        v,
                        log.key(),
                        len
                    ),
                });
            }
            Some(v) => v,
            None => len,
        };
        debug!(feed = %log.key(), snapshot, pinned = version.is_some(), "Opened transaction");
        Ok(Self {
            log,
            snapshot: AtomicU64::new(snapshot),
            pinned: version,
            index: Mutex::new(RevisionIndex::default()),
        })
    }

    /// The owning feed's key.
    pub fn key(&self) -> FeedKey {
        self.log.key()
    }

    pub fn writable(&self) -> bool {
        self.log.writable()
    }

    /// The feed length this transaction observes. Grows only through
    /// this transaction's own `put`s.
    pub fn version(&self) -> u64 {
        self.snapshot.load(Ordering::Acquire)
    }

    /// The explicitly pinned version, if any.
    pub fn pinned(&self) -> Option<u64> {
        self.pinned
    }

    /// Reads the raw record at exactly `id` (no revision resolution).
    pub async fn get(&self, id: VertexId) -> Result<Bytes> {
        if id.as_u64() > self.version() {
            return Err(HyperGraphError::VertexLoading {
                feed: self.key(),
                id,
                version: self.pinned,
                view: None,
            });
        }
        self.log.get(id.as_u64() - 1).await
    }

    /// Appends a record; the transaction immediately observes it.
    pub async fn put(&self, block: Bytes) -> Result<VertexId> {
        if !self.writable() {
            return Err(HyperGraphError::WritePermission {
                message: format!("feed {} is not locally writable", self.key()),
            });
        }
        let seq = self.log.append(block).await?;
        let id = seq + 1;
        self.snapshot.fetch_max(id, Ordering::AcqRel);
        Ok(VertexId::new(id))
    }

    /// Resolves any revision id to the id of the latest revision of the
    /// same vertex, as of this transaction's snapshot.
    pub async fn resolve_latest(&self, id: VertexId) -> Result<VertexId> {
        let (_, latest) = self.resolve_chain(id).await?;
        Ok(latest)
    }

    /// Resolves any revision id to the first revision's id — the stable
    /// identity of a vertex across re-persists.
    pub async fn resolve_first(&self, id: VertexId) -> Result<VertexId> {
        let (first, _) = self.resolve_chain(id).await?;
        Ok(first)
    }

    async fn resolve_chain(&self, id: VertexId) -> Result<(VertexId, VertexId)> {
        let snapshot = self.version();
        let mut index = self.index.lock().await;
        while index.built_to < snapshot {
            let pos = index.built_to + 1;
            let block = self.log.get(pos - 1).await?;
            match envelope::peek_prev_id(&block) {
                Ok(prev) => index.ingest(pos, prev),
                Err(e) => {
                    // Malformed preamble: index the record as its own
                    // chain; the decode error surfaces on direct access.
                    warn!(feed = %self.key(), pos, error = %e, "Unreadable record preamble");
                    index.ingest(pos, 0);
                }
            }
            index.built_to = pos;
        }
        let missing = || HyperGraphError::VertexLoading {
            feed: self.key(),
            id,
            version: self.pinned,
            view: None,
        };
        let root = index.root_of.get(&id.as_u64()).ok_or_else(missing)?;
        let latest = index.latest.get(root).ok_or_else(missing)?;
        Ok((VertexId::new(*root), VertexId::new(*latest)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::Corestore;
    use crate::feed::memory::MemoryCorestore;
    use bytes::BytesMut;

    fn record(prev: u64) -> Bytes {
        let mut buf = BytesMut::new();
        envelope::write_varint(&mut buf, prev);
        // timestamp + empty tag + no content + no edges
        envelope::write_varint(&mut buf, 1);
        envelope::write_varint(&mut buf, 0);
        envelope::write_varint(&mut buf, 0);
        envelope::write_varint(&mut buf, 0);
        buf.freeze()
    }

    #[tokio::test]
    async fn test_snapshot_bounds_reads() -> Result<()> {
        let store = MemoryCorestore::new();
        let log = store.create_feed().await?;
        log.append(record(0)).await?;
        log.append(record(0)).await?;

        let tr = FeedTransaction::open(log.clone(), Some(1)).await?;
        assert!(tr.get(VertexId::new(1)).await.is_ok());
        assert!(tr.get(VertexId::new(2)).await.is_err());

        // A later append is invisible to the pinned transaction.
        log.append(record(0)).await?;
        assert!(tr.get(VertexId::new(3)).await.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn test_pin_beyond_length_rejected() -> Result<()> {
        let store = MemoryCorestore::new();
        let log = store.create_feed().await?;
        assert!(FeedTransaction::open(log, Some(5)).await.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn test_resolve_latest_follows_revision_chain() -> Result<()> {
        let store = MemoryCorestore::new();
        let log = store.create_feed().await?;
        log.append(record(0)).await?; // id 1, chain root
        log.append(record(0)).await?; // id 2, unrelated
        log.append(record(1)).await?; // id 3, revision of 1
        log.append(record(3)).await?; // id 4, revision of 3

        let tr = FeedTransaction::open(log.clone(), None).await?;
        assert_eq!(tr.resolve_latest(VertexId::new(1)).await?.as_u64(), 4);
        assert_eq!(tr.resolve_latest(VertexId::new(3)).await?.as_u64(), 4);
        assert_eq!(tr.resolve_latest(VertexId::new(4)).await?.as_u64(), 4);
        assert_eq!(tr.resolve_latest(VertexId::new(2)).await?.as_u64(), 2);

        // Pinned before the second revision: the chain stops at 3.
        let pinned = FeedTransaction::open(log, Some(3)).await?;
        assert_eq!(pinned.resolve_latest(VertexId::new(1)).await?.as_u64(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn test_resolve_first_is_stable_across_revisions() -> Result<()> {
        let store = MemoryCorestore::new();
        let log = store.create_feed().await?;
        log.append(record(0)).await?; // id 1
        log.append(record(1)).await?; // id 2, revision of 1
        log.append(record(2)).await?; // id 3, revision of 2

        let tr = FeedTransaction::open(log, None).await?;
        for id in 1..=3u64 {
            assert_eq!(tr.resolve_first(VertexId::new(id)).await?.as_u64(), 1);
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_put_extends_snapshot() -> Result<()> {
        let store = MemoryCorestore::new();
        let log = store.create_feed().await?;
        let tr = FeedTransaction::open(log, None).await?;
        let id = tr.put(record(0)).await?;
        assert_eq!(id.as_u64(), 1);
        assert!(tr.get(id).await.is_ok());
        assert_eq!(tr.resolve_latest(id).await?, id);
        Ok(())
    }
}
