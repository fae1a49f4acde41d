// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Dragonscale Team

use crate::state::QueryState;
use crate::view::graph::tag_view;
use crate::view::{Hop, STATIC_VIEW, View, ViewCore, enumerate_edges, hop_for_edge};
use async_trait::async_trait;
use bytes::Bytes;
use hypergraph_common::{Result, VertexPointer};
use hypergraph_store::Vertex;
use std::collections::BTreeMap;

/// Enumerates edges exactly like [`crate::view::graph::GraphView`] but
/// never delegates: `edge.view` and `edge.metadata` are ignored, every
/// hop is interpreted by this view itself. The resulting traversal is
/// deterministic and metadata-free.
pub struct StaticView {
    core: ViewCore,
}

impl StaticView {
    pub fn new(core: ViewCore) -> Self {
        Self { core }
    }
}

#[async_trait]
impl View for StaticView {
    fn name(&self) -> &str {
        STATIC_VIEW
    }

    async fn get(
        &self,
        pointer: VertexPointer,
        version: Option<u64>,
        _view_desc: Option<&str>,
        _metadata: Option<&BTreeMap<String, Bytes>>,
    ) -> Result<Vertex> {
        self.core
            .load(pointer, version)
            .await
            .map_err(|e| tag_view(e, self.name()))
    }

    async fn out(&self, state: &QueryState, label: Option<&str>) -> Result<Vec<Hop>> {
        let (source, edges) = enumerate_edges(state, label)?;
        let me = self.core.own_handle(self.name())?;
        let hops = edges
            .map(|edge| hop_for_edge(me.clone(), None, None, state.clone(), edge.clone(), source))
            .collect();
        Ok(hops)
    }
}
