// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Dragonscale Team

pub mod builder;
pub mod paths;

use futures::StreamExt;
use futures::stream;
use hypergraph_common::{
    FeedKey, HyperGraphConfig, HyperGraphError, Result, VertexId, VertexPointer,
};
use hypergraph_query::{Query, QueryState, ViewConstructor, ViewFactory};
use hypergraph_store::{
    Codec, CrawlStats, Crawler, Corestore, InvertedIndex, IndexRule, Vertex, VertexStore,
};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::instrument;

use builder::HyperGraphBuilder;

/// Main entry point.
///
/// Couples a vertex store over some corestore backend with the crawler
/// and the per-query view machinery. Queries each get a fresh
/// [`ViewFactory`] whose views share one transaction cache for the
/// query's lifetime.
pub struct HyperGraphDB {
    pub(crate) store: Arc<VertexStore>,
    pub(crate) crawler: Arc<Crawler>,
    pub(crate) config: HyperGraphConfig,
    pub(crate) views: RwLock<Vec<(String, ViewConstructor)>>,
}

impl HyperGraphDB {
    /// Opens a graph over `corestore`. Configure and finish with
    /// [`HyperGraphBuilder::build`].
    pub fn open(corestore: Arc<dyn Corestore>) -> HyperGraphBuilder {
        HyperGraphBuilder::new(corestore)
    }

    /// A transient vertex; persist it with [`Self::put`].
    pub fn create_vertex(&self) -> Vertex {
        Vertex::new()
    }

    /// Key of the local default feed, created on first use.
    pub async fn default_feed(&self) -> Result<FeedKey> {
        self.store.default_feed().await
    }

    /// Persists a vertex to its bound feed, or to the default feed if
    /// transient.
    pub async fn put(&self, vertex: &mut Vertex) -> Result<VertexId> {
        let feed = match vertex.feed() {
            Some(feed) => feed,
            None => self.store.default_feed().await?,
        };
        self.store.put(&feed, vertex).await
    }

    /// Persists a vertex to an explicit feed.
    pub async fn put_in(&self, feed: &FeedKey, vertex: &mut Vertex) -> Result<VertexId> {
        self.store.put(feed, vertex).await
    }

    /// Persists vertices in insertion order within one transaction on
    /// `feed`. The first error aborts the batch.
    pub async fn put_all_in(
        &self,
        feed: &FeedKey,
        vertices: &mut [&mut Vertex],
    ) -> Result<Vec<VertexId>> {
        self.store.put_all(feed, vertices).await
    }

    /// Like [`Self::put_all_in`] on the default feed.
    pub async fn put_all(&self, vertices: &mut [&mut Vertex]) -> Result<Vec<VertexId>> {
        let feed = self.store.default_feed().await?;
        self.put_all_in(&feed, vertices).await
    }

    /// Loads a vertex from the default feed.
    pub async fn get(&self, id: VertexId) -> Result<Vertex> {
        let feed = self.store.default_feed().await?;
        self.store.get(&feed, id).await
    }

    /// Loads a vertex from `feed`.
    pub async fn get_from(&self, feed: &FeedKey, id: VertexId) -> Result<Vertex> {
        self.store.get(feed, id).await
    }

    /// Registers a content codec. Registration is write-once at startup;
    /// register everything before reading foreign content.
    pub fn register_codec(&self, codec: Arc<dyn Codec>) {
        self.store.codecs().register(codec);
    }

    /// Registers a view constructor under `name` for all future queries.
    pub fn register_view(&self, name: impl Into<String>, constructor: ViewConstructor) {
        self.views.write().push((name.into(), constructor));
    }

    /// Fresh per-query view factory (own transaction cache).
    pub fn query_factory(&self) -> Arc<ViewFactory> {
        let views = self.views.read().clone();
        ViewFactory::new(self.store.clone(), &views)
    }

    /// A query rooted at a vertex already in memory.
    pub fn query_at_vertex(&self, vertex: &Vertex) -> Query {
        Query::from_vertex(
            self.query_factory(),
            self.config.query.clone(),
            vertex.clone(),
        )
    }

    /// A query rooted at `(feed, id)`; the root loads lazily.
    pub fn query_at_id(&self, feed: &FeedKey, id: VertexId) -> Query {
        Query::from_pointer(
            self.query_factory(),
            self.config.query.clone(),
            VertexPointer::new(*feed, id),
        )
    }

    /// A query walking `path` (slash-separated labels) from `vertex`.
    /// An empty path is the query at the vertex itself.
    pub fn query_path_at_vertex(&self, path: &str, vertex: &Vertex) -> Query {
        let mut query = self.query_at_vertex(vertex);
        for segment in paths::path_segments(path) {
            query = query.out(Some(&segment));
        }
        query
    }

    /// A query over every vertex indexed under `(name, key)`: one
    /// transaction per distinct feed (coalesced by the query's cache),
    /// hits loaded lazily in index insertion order.
    pub fn query_index(&self, name: &str, key: &str) -> Result<Query> {
        let index = self
            .crawler
            .index(name)
            .ok_or_else(|| HyperGraphError::IndexNotFound {
                name: name.to_string(),
            })?;
        let hits = index.get(key);

        let factory = self.query_factory();
        let cache = factory.transaction_cache();
        let store = self.store.clone();
        let stream = stream::iter(hits)
            .then(move |pointer| {
                let cache = cache.clone();
                let store = store.clone();
                async move {
                    let tr = cache.get_or_open(&pointer.feed, None).await?;
                    let vertex = store.get_in_transaction(pointer.id, &tr).await?;
                    Ok(QueryState::new(vertex))
                }
            })
            .boxed();
        Ok(Query::from_stream(
            factory,
            self.config.query.clone(),
            stream,
        ))
    }

    /// Registers an index rule with the crawler (creating the index).
    pub fn add_index_rule(&self, rule: Arc<dyn IndexRule>) {
        self.crawler.add_rule(rule);
    }

    /// All indexes maintained by the crawler.
    pub fn indexes(&self) -> Vec<Arc<InvertedIndex>> {
        self.crawler.indexes()
    }

    /// Walks the graph from `root` and feeds every registered rule.
    #[instrument(skip(self))]
    pub async fn crawl(&self, root: VertexPointer) -> Result<CrawlStats> {
        self.crawler.crawl(root).await
    }

    /// The underlying vertex store.
    pub fn vertex_store(&self) -> &Arc<VertexStore> {
        &self.store
    }

    /// The crawler driving index maintenance.
    pub fn crawler(&self) -> &Arc<Crawler> {
        &self.crawler
    }
}
