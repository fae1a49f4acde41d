// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Dragonscale Team

//! # HyperGraphDB
//!
//! A distributed, append-only, multi-writer graph database layered over
//! content-addressed append-only logs ("feeds"). Vertices live in one
//! writer's feed; edges may cross feeds by referring to `(feed, id)`
//! pairs. Readers materialize a coherent picture through snapshot
//! transactions over the feeds a traversal reaches.
//!
//! ```no_run
//! use hypergraph::{Content, HyperGraphDB, MemoryCorestore};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> hypergraph::Result<()> {
//!     let db = HyperGraphDB::open(Arc::new(MemoryCorestore::new())).build();
//!
//!     let mut doc = db.create_vertex();
//!     doc.set_content(Content::json(serde_json::json!({ "name": "readme" })));
//!     db.put(&mut doc).await?;
//!
//!     let mut root = db.create_vertex();
//!     db.put(&mut root).await?;
//!     db.create_edges_to_path("docs/guides", &mut root).await?;
//!     Ok(())
//! }
//! ```

pub mod api;

pub use api::builder::HyperGraphBuilder;
pub use api::HyperGraphDB;

// Re-exports from internal crates
pub use hypergraph_common::{
    CrawlerConfig, FeedKey, HyperGraphConfig, HyperGraphError, QueryConfig, Result, VertexId,
    VertexPointer,
};
pub use hypergraph_query::{
    GRAPH_VIEW, GraphView, Hop, Query, QueryState, STATIC_VIEW, StaticView, View, ViewConstructor,
    ViewCore, ViewFactory,
};
pub use hypergraph_store::{
    AppendLog, Codec, CodecRegistry, Content, Corestore, CrawlStats, Crawler, Edge, EdgeOptions,
    FeedTransaction, IndexRule, InvertedIndex, JsonCodec, MemoryCorestore, MemoryFeed, Posting,
    Restriction, TransactionCache, Vertex, VertexStore,
};

// Re-export crates
pub use hypergraph_common as common;
pub use hypergraph_query as query;
pub use hypergraph_store as store;
