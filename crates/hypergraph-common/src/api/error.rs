// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Dragonscale Team

use crate::core::id::{FeedKey, VertexId};
use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum HyperGraphError {
    /// Underlying read failed or the record does not exist at the
    /// transaction's snapshot length.
    #[error("Failed to load vertex {id} from feed {feed}{}", fmt_version(.version))]
    VertexLoading {
        feed: FeedKey,
        id: VertexId,
        version: Option<u64>,
        view: Option<String>,
    },

    /// The record exists but its envelope is malformed or the codec
    /// rejected the payload bytes.
    #[error("Failed to decode vertex {id} from feed {feed}")]
    VertexDecoding {
        feed: FeedKey,
        id: VertexId,
        #[source]
        source: anyhow::Error,
    },

    /// A single traversal hop failed. Sibling hops continue; terminal
    /// operators surface this on iteration. `feed_hint` carries only the
    /// first two hex chars of the target feed key.
    #[error("Failed to traverse edge '{label}' from vertex {source_id} in feed {source_feed} (target feed {})", .feed_hint.as_deref().unwrap_or("<same>"))]
    EdgeTraversing {
        source_feed: FeedKey,
        source_id: VertexId,
        label: String,
        feed_hint: Option<String>,
        #[source]
        source: Box<HyperGraphError>,
    },

    /// Mutation attempted on a feed without local write authority.
    #[error("Write permission denied: {message}")]
    WritePermission { message: String },

    #[error("Index '{name}' not found")]
    IndexNotFound { name: String },

    /// Malformed path or bad argument.
    #[error("Invalid input: {message}")]
    Input { message: String },

    #[error("Codec '{tag}' error: {message}")]
    Codec { tag: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

fn fmt_version(version: &Option<u64>) -> String {
    match version {
        Some(v) => format!(" at version {v}"),
        None => String::new(),
    }
}

impl HyperGraphError {
    /// Sanitized hint for a feed key that may not be disclosed in full:
    /// just the first two hex characters.
    pub fn feed_hint(feed: &FeedKey) -> String {
        feed.to_hex().chars().take(2).collect()
    }
}

pub type Result<T> = std::result::Result<T, HyperGraphError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loading_error_display() {
        let feed = FeedKey::from_bytes([0xab; 32]);
        let err = HyperGraphError::VertexLoading {
            feed,
            id: VertexId::new(7),
            version: Some(12),
            view: None,
        };
        let msg = err.to_string();
        assert!(msg.contains("vertex 7"));
        assert!(msg.contains("at version 12"));
        assert!(msg.contains(&feed.to_hex()));
    }

    #[test]
    fn test_feed_hint_is_two_chars() {
        let feed = FeedKey::from_bytes([0xcd; 32]);
        assert_eq!(HyperGraphError::feed_hint(&feed), "cd");
    }

    #[test]
    fn test_traversing_error_chains_cause() {
        let feed = FeedKey::from_bytes([1; 32]);
        let cause = HyperGraphError::VertexLoading {
            feed,
            id: VertexId::new(3),
            version: None,
            view: None,
        };
        let err = HyperGraphError::EdgeTraversing {
            source_feed: feed,
            source_id: VertexId::new(1),
            label: "child".to_string(),
            feed_hint: Some(HyperGraphError::feed_hint(&feed)),
            source: Box::new(cause),
        };
        assert!(std::error::Error::source(&err).is_some());
        assert!(err.to_string().contains("'child'"));
    }
}
