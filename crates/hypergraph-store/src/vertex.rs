// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Dragonscale Team

//! The in-memory vertex model.
//!
//! A vertex starts transient: no feed, no id, no timestamp. Persisting
//! binds all three exactly once; later persists keep the feed and swap
//! the id for the new revision's position.

use crate::codec::Content;
use bytes::Bytes;
use hypergraph_common::{FeedKey, HyperGraphError, Result, VertexId, VertexPointer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Path rule attached to traversal state when an edge carrying it is
/// followed. `rule` is a glob over slash-joined traversal paths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Restriction {
    pub rule: String,
    pub exclude: bool,
}

/// Directed, labeled reference to a vertex, possibly in another feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub label: String,
    /// Target vertex id; resolved against `feed` (or the source vertex's
    /// feed when absent).
    pub target: VertexId,
    /// Target feed; `None` means the same feed as the source vertex.
    pub feed: Option<FeedKey>,
    /// Name of the view that should interpret traversal through this
    /// edge, if any.
    pub view: Option<String>,
    /// Opaque per-edge hints (e.g. decryption parameters). Sorted so the
    /// wire encoding is deterministic.
    pub metadata: BTreeMap<String, Bytes>,
    pub restrictions: Vec<Restriction>,
    /// Pinned feed length for reproducible reads.
    pub version: Option<u64>,
}

impl Edge {
    /// Edge identity is the `(label, target, feed, view)` tuple; content
    /// fields like metadata do not participate.
    pub fn same_identity(&self, other: &Edge) -> bool {
        self.label == other.label
            && self.target == other.target
            && self.feed == other.feed
            && self.view == other.view
    }
}

/// Options for [`Vertex::add_edge_to`].
#[derive(Debug, Clone, Default)]
pub struct EdgeOptions {
    pub view: Option<String>,
    pub metadata: BTreeMap<String, Bytes>,
    pub restrictions: Vec<Restriction>,
    pub version: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Binding {
    feed: FeedKey,
    id: VertexId,
    timestamp: u64,
}

/// A graph vertex.
#[derive(Debug, Clone, PartialEq)]
pub struct Vertex {
    binding: Option<Binding>,
    prev_id: Option<VertexId>,
    content: Option<Content>,
    edges: Vec<Edge>,
    writable: bool,
}

impl Vertex {
    /// Creates a transient vertex. It becomes addressable on first
    /// persist.
    pub fn new() -> Self {
        Self {
            binding: None,
            prev_id: None,
            content: None,
            edges: Vec::new(),
            writable: true,
        }
    }

    pub fn id(&self) -> Option<VertexId> {
        self.binding.map(|b| b.id)
    }

    pub fn feed(&self) -> Option<FeedKey> {
        self.binding.map(|b| b.feed)
    }

    pub fn timestamp(&self) -> Option<u64> {
        self.binding.map(|b| b.timestamp)
    }

    pub fn pointer(&self) -> Option<VertexPointer> {
        self.binding.map(|b| VertexPointer::new(b.feed, b.id))
    }

    /// Id of the revision this one superseded, if any.
    pub fn prev_id(&self) -> Option<VertexId> {
        self.prev_id
    }

    /// True iff the owning feed is locally writable (transient vertices
    /// are writable by definition).
    pub fn writable(&self) -> bool {
        self.writable
    }

    pub fn content(&self) -> Option<&Content> {
        self.content.as_ref()
    }

    pub fn set_content(&mut self, content: Content) {
        self.content = Some(content);
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Edges whose label equals `label`, in insertion order.
    pub fn edges_labeled<'a>(&'a self, label: &'a str) -> impl Iterator<Item = &'a Edge> {
        self.edges.iter().filter(move |e| e.label == label)
    }

    /// Appends an edge to a persisted target. The target feed is
    /// recorded only when it differs from this vertex's own feed.
    pub fn add_edge_to(&mut self, target: &Vertex, label: &str, opts: EdgeOptions) -> Result<()> {
        let pointer = target.pointer().ok_or_else(|| HyperGraphError::Input {
            message: format!("edge target for '{}' has not been persisted", label),
        })?;
        let feed = match self.feed() {
            Some(own) if own == pointer.feed => None,
            Some(_) => Some(pointer.feed),
            None => Some(pointer.feed),
        };
        self.edges.push(Edge {
            label: label.to_string(),
            target: pointer.id,
            feed,
            view: opts.view,
            metadata: opts.metadata,
            restrictions: opts.restrictions,
            version: opts.version,
        });
        Ok(())
    }

    /// Appends a pre-built edge verbatim.
    pub fn add_edge(&mut self, edge: Edge) {
        self.edges.push(edge);
    }

    /// Applies `transform` to every edge referencing `target`. Returns
    /// how many edges matched.
    pub fn replace_edge_to(
        &mut self,
        target: &Vertex,
        mut transform: impl FnMut(&mut Edge),
    ) -> Result<usize> {
        let pointer = target.pointer().ok_or_else(|| HyperGraphError::Input {
            message: "edge target has not been persisted".to_string(),
        })?;
        let own_feed = self.feed();
        let mut matched = 0;
        for edge in &mut self.edges {
            let edge_feed = edge.feed.or(own_feed);
            if edge.target == pointer.id && edge_feed == Some(pointer.feed) {
                transform(edge);
                matched += 1;
            }
        }
        Ok(matched)
    }

    /// Removes every edge identity-equal to `edge`. Returns how many
    /// were removed.
    pub fn remove_edge(&mut self, edge: &Edge) -> usize {
        let before = self.edges.len();
        self.edges.retain(|e| !e.same_identity(edge));
        before - self.edges.len()
    }

    pub(crate) fn bind(&mut self, feed: FeedKey, id: VertexId, timestamp: u64) {
        self.prev_id = self.binding.map(|b| b.id);
        self.binding = Some(Binding {
            feed,
            id,
            timestamp,
        });
    }

    pub(crate) fn set_writable(&mut self, writable: bool) {
        self.writable = writable;
    }

    pub(crate) fn restore(
        feed: FeedKey,
        id: VertexId,
        timestamp: u64,
        prev_id: Option<VertexId>,
        content: Option<Content>,
        edges: Vec<Edge>,
        writable: bool,
    ) -> Self {
        Self {
            binding: Some(Binding {
                feed,
                id,
                timestamp,
            }),
            prev_id,
            content,
            edges,
            writable,
        }
    }
}

impl Default for Vertex {
    fn default() -> Self {
        Self::new()
    }
}
