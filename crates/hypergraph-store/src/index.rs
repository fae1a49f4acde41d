// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Dragonscale Team

//! In-memory inverted indexes maintained by the crawler.
//!
//! Single-writer (the crawler) / multi-reader (queries). Readers get a
//! consistent snapshot of a key's posting list per `get` call. Index
//! state is not persisted; a restart re-crawls.

use crate::vertex::Vertex;
use fxhash::FxHashMap;
use hypergraph_common::VertexPointer;
use parking_lot::RwLock;

/// A rule the crawler applies to every visited vertex.
pub trait IndexRule: Send + Sync {
    /// Name of the index this rule feeds.
    fn name(&self) -> &str;

    /// Zero-or-more `(key, weight)` entries for a vertex. Must be pure.
    fn extract(&self, vertex: &Vertex) -> Vec<(String, Option<f64>)>;

    /// Labels of outgoing edges the crawler should follow from this
    /// vertex.
    fn traverse(&self, vertex: &Vertex) -> Vec<String>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct Posting {
    pub pointer: VertexPointer,
    pub weight: Option<f64>,
}

/// `key -> [{feed, id}, ...]`, insertion-ordered per key.
pub struct InvertedIndex {
    name: String,
    postings: RwLock<FxHashMap<String, Vec<Posting>>>,
}

impl InvertedIndex {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            postings: RwLock::new(FxHashMap::default()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Appends a posting unless the pointer is already listed under
    /// `key`, keeping re-crawls idempotent.
    pub fn insert(&self, key: &str, posting: Posting) {
        let mut postings = self.postings.write();
        let list = postings.entry(key.to_string()).or_default();
        if list.iter().any(|p| p.pointer == posting.pointer) {
            return;
        }
        list.push(posting);
    }

    /// Snapshot of the pointers indexed under `key`, in insertion order.
    pub fn get(&self, key: &str) -> Vec<VertexPointer> {
        self.postings
            .read()
            .get(key)
            .map(|list| list.iter().map(|p| p.pointer).collect())
            .unwrap_or_default()
    }

    /// Snapshot of the full postings under `key`.
    pub fn postings(&self, key: &str) -> Vec<Posting> {
        self.postings.read().get(key).cloned().unwrap_or_default()
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.postings.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.postings.read().is_empty()
    }
}
