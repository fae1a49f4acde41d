// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Dragonscale Team

use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Length of a feed key in bytes.
pub const FEED_KEY_LEN: usize = 32;

/// Cryptographic key identifying an append-only log ("feed").
///
/// Rendered as lowercase hex in all cross-feed identifiers.
#[derive(Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct FeedKey([u8; FEED_KEY_LEN]);

impl FeedKey {
    pub fn from_bytes(bytes: [u8; FEED_KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Parses a key from a byte slice.
    ///
    /// # Errors
    ///
    /// Returns an error if the slice is not exactly 32 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let inner: [u8; FEED_KEY_LEN] = bytes.try_into().map_err(|_| {
            anyhow!(
                "Invalid feed key length: expected {} bytes, got {}",
                FEED_KEY_LEN,
                bytes.len()
            )
        })?;
        Ok(Self(inner))
    }

    /// Generates a random key for a freshly created feed.
    pub fn random() -> Self {
        use rand::Rng;
        let mut rng = rand::thread_rng();
        let mut bytes = [0u8; FEED_KEY_LEN];
        rng.fill(&mut bytes);
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; FEED_KEY_LEN] {
        &self.0
    }

    /// Canonical lowercase hex rendering.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parses a key from its canonical lowercase hex rendering.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not valid hex or does not decode
    /// to exactly 32 bytes.
    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes = hex::decode(s).map_err(|e| anyhow!("Invalid feed key hex: {}", e))?;
        Self::from_slice(&bytes)
    }
}

impl fmt::Debug for FeedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FeedKey({}..)", &self.to_hex()[..8])
    }
}

impl fmt::Display for FeedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl FromStr for FeedKey {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s)
    }
}

/// Position of a vertex revision within its feed, 1-based.
///
/// Assigned on first persist and immutable thereafter; `0` is never a
/// valid id and is used on the wire to encode "absent".
#[derive(Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct VertexId(u64);

impl VertexId {
    /// Creates a vertex id.
    ///
    /// # Panics
    ///
    /// Panics on `0`: ids are 1-based and `0` is the wire encoding of
    /// "absent". Constructing it would silently corrupt revision links.
    pub fn new(id: u64) -> Self {
        assert!(id != 0, "VertexId must be 1-based, got 0");
        Self(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }

    /// Wire decoding helper: `0` means absent.
    pub fn from_wire(raw: u64) -> Option<Self> {
        if raw == 0 { None } else { Some(Self(raw)) }
    }
}

impl fmt::Debug for VertexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VertexId({})", self.0)
    }
}

impl fmt::Display for VertexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Cross-feed vertex address `(feed, id)`.
#[derive(Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Debug, Serialize, Deserialize)]
pub struct VertexPointer {
    pub feed: FeedKey,
    pub id: VertexId,
}

impl VertexPointer {
    pub fn new(feed: FeedKey, id: VertexId) -> Self {
        Self { feed, id }
    }
}

impl fmt::Display for VertexPointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.feed, self.id)
    }
}
