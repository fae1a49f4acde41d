// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Dragonscale Team

use crate::state::QueryState;
use crate::view::{GRAPH_VIEW, Hop, View, ViewCore, enumerate_edges, hop_for_edge};
use async_trait::async_trait;
use bytes::Bytes;
use hypergraph_common::{HyperGraphError, Result, VertexPointer};
use hypergraph_store::Vertex;
use std::collections::BTreeMap;

/// Default view. Resolves every edge through the view the edge names
/// (when registered), handing the edge's metadata along, so edges can
/// delegate their interpretation — e.g. to a decrypting view.
pub struct GraphView {
    core: ViewCore,
}

impl GraphView {
    pub fn new(core: ViewCore) -> Self {
        Self { core }
    }
}

#[async_trait]
impl View for GraphView {
    fn name(&self) -> &str {
        GRAPH_VIEW
    }

    async fn get(
        &self,
        pointer: VertexPointer,
        version: Option<u64>,
        view_desc: Option<&str>,
        metadata: Option<&BTreeMap<String, Bytes>>,
    ) -> Result<Vertex> {
        if let Some(name) = view_desc
            && name != self.name()
            && let Some(delegate) = self.core.view(name)
        {
            tracing::debug!(view = name, pointer = %pointer, "Delegating edge interpretation");
            return delegate.get(pointer, version, None, metadata).await;
        }
        self.core
            .load(pointer, version)
            .await
            .map_err(|e| tag_view(e, self.name()))
    }

    async fn out(&self, state: &QueryState, label: Option<&str>) -> Result<Vec<Hop>> {
        let (source, edges) = enumerate_edges(state, label)?;
        let me = self.core.own_handle(self.name())?;
        let hops = edges
            .map(|edge| {
                hop_for_edge(
                    me.clone(),
                    edge.view.clone(),
                    Some(edge.metadata.clone()),
                    state.clone(),
                    edge.clone(),
                    source,
                )
            })
            .collect();
        Ok(hops)
    }
}

/// Records which view a load failed under.
pub(crate) fn tag_view(error: HyperGraphError, view: &str) -> HyperGraphError {
    match error {
        HyperGraphError::VertexLoading {
            feed,
            id,
            version,
            view: None,
        } => HyperGraphError::VertexLoading {
            feed,
            id,
            version,
            view: Some(view.to_string()),
        },
        other => other,
    }
}
