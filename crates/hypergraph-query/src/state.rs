// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Dragonscale Team

//! Per-path traversal state.
//!
//! Every streamed value carries the vertex it reached, the label path
//! walked so far (rooted at the start vertex's feed key in hex) and the
//! restrictions accumulated from followed edges. Views consult the
//! state before emitting further hops.

use globset::{Glob, GlobMatcher};
use hypergraph_common::{HyperGraphError, Result};
use hypergraph_store::{Restriction, Vertex};

/// A restriction rule with its glob compiled once, when the edge
/// carrying it is followed.
#[derive(Clone)]
pub struct CompiledRestriction {
    rule: Restriction,
    matcher: GlobMatcher,
}

impl CompiledRestriction {
    pub fn compile(rule: Restriction) -> Result<Self> {
        let matcher = Glob::new(&rule.rule)
            .map_err(|e| HyperGraphError::Input {
                message: format!("invalid restriction glob '{}': {}", rule.rule, e),
            })?
            .compile_matcher();
        Ok(Self { rule, matcher })
    }

    pub fn rule(&self) -> &Restriction {
        &self.rule
    }

    pub fn matches(&self, path: &str) -> bool {
        self.matcher.is_match(path)
    }
}

impl std::fmt::Debug for CompiledRestriction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledRestriction")
            .field("rule", &self.rule)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct QueryState {
    vertex: Vertex,
    path: Vec<String>,
    restrictions: Vec<CompiledRestriction>,
}

impl QueryState {
    /// Roots a state at `vertex`; the path starts with the vertex's feed
    /// key in hex (empty for a transient vertex).
    pub fn new(vertex: Vertex) -> Self {
        let path = match vertex.feed() {
            Some(feed) => vec![feed.to_hex()],
            None => Vec::new(),
        };
        Self {
            vertex,
            path,
            restrictions: Vec::new(),
        }
    }

    pub fn vertex(&self) -> &Vertex {
        &self.vertex
    }

    pub fn into_vertex(self) -> Vertex {
        self.vertex
    }

    pub fn path(&self) -> &[String] {
        &self.path
    }

    pub fn restrictions(&self) -> &[CompiledRestriction] {
        &self.restrictions
    }

    /// Slash-joined path a hop through `label` would reach.
    pub fn child_path(&self, label: &str) -> String {
        if self.path.is_empty() {
            label.to_string()
        } else {
            format!("{}/{}", self.path.join("/"), label)
        }
    }

    /// Evaluates the accumulated restrictions against a candidate path:
    /// any matching exclude rule rejects; when include rules exist, at
    /// least one must match.
    pub fn allows(&self, path: &str) -> bool {
        if self
            .restrictions
            .iter()
            .any(|r| r.rule().exclude && r.matches(path))
        {
            return false;
        }
        let mut saw_include = false;
        for restriction in &self.restrictions {
            if restriction.rule().exclude {
                continue;
            }
            saw_include = true;
            if restriction.matches(path) {
                return true;
            }
        }
        !saw_include
    }

    /// The successor state after following an edge labeled `label` to
    /// `vertex`, attaching the edge's restrictions (if any) to the new
    /// state.
    pub fn follow(&self, label: &str, vertex: Vertex, added: &[Restriction]) -> Result<Self> {
        let mut path = self.path.clone();
        path.push(label.to_string());
        let mut restrictions = self.restrictions.clone();
        for rule in added {
            restrictions.push(CompiledRestriction::compile(rule.clone())?);
        }
        Ok(Self {
            vertex,
            path,
            restrictions,
        })
    }
}
