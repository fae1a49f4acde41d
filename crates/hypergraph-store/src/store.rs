// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Dragonscale Team

//! The transactional vertex store: binary-encoded `put`/`get` of
//! vertices over feeds, with default-feed resolution.

use crate::codec::CodecRegistry;
use crate::envelope::VertexEnvelope;
use crate::feed::Corestore;
use crate::feed::transaction::FeedTransaction;
use crate::vertex::Vertex;
use bytes::Bytes;
use hypergraph_common::{FeedKey, HyperGraphError, Result, VertexId};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, instrument};

fn now_millis() -> u64 {
    chrono::Utc::now().timestamp_millis() as u64
}

pub struct VertexStore {
    corestore: Arc<dyn Corestore>,
    codecs: Arc<CodecRegistry>,
    default_key: Mutex<Option<FeedKey>>,
}

impl VertexStore {
    /// `default_key` pins the default feed; when `None` the corestore's
    /// local writable feed is used (and created on first need).
    pub fn new(
        corestore: Arc<dyn Corestore>,
        codecs: Arc<CodecRegistry>,
        default_key: Option<FeedKey>,
    ) -> Self {
        Self {
            corestore,
            codecs,
            default_key: Mutex::new(default_key),
        }
    }

    pub fn codecs(&self) -> &Arc<CodecRegistry> {
        &self.codecs
    }

    /// Returns (creating if absent) the key of the default feed.
    pub async fn default_feed(&self) -> Result<FeedKey> {
        if let Some(key) = *self.default_key.lock() {
            return Ok(key);
        }
        let feed = self.corestore.default_feed().await?;
        let key = feed.key();
        *self.default_key.lock() = Some(key);
        Ok(key)
    }

    /// Opens a snapshot transaction on `feed`, optionally pinned to a
    /// historical feed length.
    pub async fn transaction(
        &self,
        feed: &FeedKey,
        version: Option<u64>,
    ) -> Result<Arc<FeedTransaction>> {
        let log = self.corestore.feed(feed).await?;
        let tr = FeedTransaction::open(log, version).await?;
        metrics::counter!("hypergraph_transactions_opened_total").increment(1);
        Ok(Arc::new(tr))
    }

    /// Persists `vertex` to `feed`. A transient vertex is bound to
    /// `(feed, id)`; a bound one gains a new revision id whose record
    /// links back to the prior id.
    pub async fn put(&self, feed: &FeedKey, vertex: &mut Vertex) -> Result<VertexId> {
        let tr = self.transaction(feed, None).await?;
        self.put_in_transaction(&tr, vertex).await
    }

    /// Persists all vertices in insertion order within one transaction.
    /// Every vertex is encoded up front so an invalid payload aborts the
    /// batch before anything is written.
    #[instrument(skip(self, vertices), fields(feed = %feed, count = vertices.len()))]
    pub async fn put_all(&self, feed: &FeedKey, vertices: &mut [&mut Vertex]) -> Result<Vec<VertexId>> {
        let tr = self.transaction(feed, None).await?;
        let mut encoded: Vec<(Bytes, u64)> = Vec::with_capacity(vertices.len());
        for vertex in vertices.iter() {
            encoded.push(self.encode_vertex(&tr, vertex)?);
        }
        let mut ids = Vec::with_capacity(vertices.len());
        for (vertex, (block, timestamp)) in vertices.iter_mut().zip(encoded) {
            let id = tr.put(block).await?;
            vertex.bind(tr.key(), id, timestamp);
            vertex.set_writable(true);
            ids.push(id);
        }
        metrics::counter!("hypergraph_vertices_written_total").increment(ids.len() as u64);
        debug!(first = ?ids.first(), "Persisted vertex batch");
        Ok(ids)
    }

    /// Persists one vertex through an already-open transaction.
    pub async fn put_in_transaction(
        &self,
        tr: &FeedTransaction,
        vertex: &mut Vertex,
    ) -> Result<VertexId> {
        let (block, timestamp) = self.encode_vertex(tr, vertex)?;
        let id = tr.put(block).await?;
        vertex.bind(tr.key(), id, timestamp);
        vertex.set_writable(true);
        metrics::counter!("hypergraph_vertices_written_total").increment(1);
        Ok(id)
    }

    fn encode_vertex(&self, tr: &FeedTransaction, vertex: &Vertex) -> Result<(Bytes, u64)> {
        if let Some(bound) = vertex.feed()
            && bound != tr.key()
        {
            return Err(HyperGraphError::Input {
                message: format!(
                    "vertex is bound to feed {} and cannot be persisted to {}",
                    bound,
                    tr.key()
                ),
            });
        }
        let timestamp = now_millis();
        let (codec_tag, content) = match vertex.content() {
            Some(content) => {
                let (tag, bytes) =
                    self.codecs
                        .encode(content)
                        .map_err(|e| HyperGraphError::Codec {
                            tag: content.tag().to_string(),
                            message: e.to_string(),
                        })?;
                (tag, Some(bytes))
            }
            None => (crate::codec::JsonCodec::TAG.to_string(), None),
        };
        let envelope = VertexEnvelope {
            prev_id: vertex.id(),
            timestamp,
            codec_tag,
            content,
            edges: vertex.edges().to_vec(),
        };
        Ok((envelope.encode(), timestamp))
    }

    /// Loads the latest revision reachable from `(feed, id)`.
    pub async fn get(&self, feed: &FeedKey, id: VertexId) -> Result<Vertex> {
        let tr = self.transaction(feed, None).await?;
        self.get_in_transaction(id, &tr).await
    }

    /// Same, without opening a fresh transaction.
    pub async fn get_in_transaction(
        &self,
        id: VertexId,
        tr: &FeedTransaction,
    ) -> Result<Vertex> {
        let latest = tr.resolve_latest(id).await?;
        let bytes = tr.get(latest).await?;
        let envelope =
            VertexEnvelope::decode(&bytes).map_err(|e| HyperGraphError::VertexDecoding {
                feed: tr.key(),
                id: latest,
                source: e,
            })?;
        let content = match &envelope.content {
            Some(payload) => Some(
                self.codecs
                    .decode(&envelope.codec_tag, payload)
                    .map_err(|e| HyperGraphError::VertexDecoding {
                        feed: tr.key(),
                        id: latest,
                        source: e,
                    })?,
            ),
            None => None,
        };
        metrics::counter!("hypergraph_vertices_read_total").increment(1);
        Ok(Vertex::restore(
            tr.key(),
            latest,
            envelope.timestamp,
            envelope.prev_id,
            content,
            envelope.edges,
            tr.writable(),
        ))
    }
}
