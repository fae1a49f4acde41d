// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Dragonscale Team

//! The append-only log boundary.
//!
//! HyperGraphDB does not implement its own log; it consumes any backend
//! that can hand out feeds keyed by [`FeedKey`] and append/read opaque
//! blocks. [`memory`] provides the in-memory reference backend used by
//! tests and as the default.

pub mod memory;
pub mod transaction;

use async_trait::async_trait;
use bytes::Bytes;
use hypergraph_common::{FeedKey, Result};
use std::sync::Arc;

/// One append-only log. Blocks are addressed by 0-based sequence number;
/// the vertex layer above maps those to 1-based vertex ids.
#[async_trait]
pub trait AppendLog: Send + Sync {
    /// The feed's cryptographic key.
    fn key(&self) -> FeedKey;

    /// True iff this process holds write authority for the feed.
    fn writable(&self) -> bool;

    /// Current number of blocks.
    async fn len(&self) -> Result<u64>;

    /// Reads the block at `seq`.
    async fn get(&self, seq: u64) -> Result<Bytes>;

    /// Appends a block and returns its sequence number.
    async fn append(&self, block: Bytes) -> Result<u64>;
}

/// A registry of feeds: opens known ones, creates local writable ones.
#[async_trait]
pub trait Corestore: Send + Sync {
    /// Opens or creates the local default writable feed.
    async fn default_feed(&self) -> Result<Arc<dyn AppendLog>>;

    /// Opens a feed by key. Unknown keys yield an empty non-writable
    /// handle (its content arrives by replication, which is out of scope
    /// here — reads simply fail until then).
    async fn feed(&self, key: &FeedKey) -> Result<Arc<dyn AppendLog>>;

    /// Creates a fresh local writable feed under a new random key.
    async fn create_feed(&self) -> Result<Arc<dyn AppendLog>>;
}
