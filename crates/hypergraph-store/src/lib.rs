// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Dragonscale Team

//! Storage layer for HyperGraphDB: the feed boundary, the binary vertex
//! envelope, the transactional vertex store and the crawler/index pair.

pub mod codec;
pub mod crawler;
pub mod envelope;
pub mod feed;
pub mod index;
pub mod store;
pub mod txcache;
pub mod vertex;

pub use codec::{Codec, CodecRegistry, Content, JsonCodec};
pub use crawler::{CrawlStats, Crawler};
pub use feed::memory::{MemoryCorestore, MemoryFeed};
pub use feed::transaction::FeedTransaction;
pub use feed::{AppendLog, Corestore};
pub use index::{IndexRule, InvertedIndex, Posting};
pub use store::VertexStore;
pub use txcache::TransactionCache;
pub use vertex::{Edge, EdgeOptions, Restriction, Vertex};
