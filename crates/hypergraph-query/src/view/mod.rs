// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Dragonscale Team

//! Views: strategies for interpreting a vertex's edges.
//!
//! A view resolves edge references through the per-query transaction
//! cache and decides how much of an edge's interpretation hints (target
//! view, metadata) to honor. Views collaborating in one query are built
//! by a [`ViewFactory`] and share one transaction cache.

pub mod graph;
pub mod static_view;

use crate::state::QueryState;
use async_trait::async_trait;
use bytes::Bytes;
use futures::future::BoxFuture;
use hypergraph_common::{HyperGraphError, Result, VertexPointer};
use hypergraph_store::{Edge, TransactionCache, Vertex, VertexStore};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Weak};

pub const GRAPH_VIEW: &str = "graph";
pub const STATIC_VIEW: &str = "static";

/// One lazy traversal result. Hops are independently awaitable; a failed
/// hop resolves to an error without affecting its siblings.
pub type Hop = BoxFuture<'static, Result<QueryState>>;

#[async_trait]
pub trait View: Send + Sync {
    fn name(&self) -> &str;

    /// Resolves a vertex. When `view_desc` names another registered
    /// view, delegation to it is mandatory; an unknown name falls back
    /// to the current view.
    async fn get(
        &self,
        pointer: VertexPointer,
        version: Option<u64>,
        view_desc: Option<&str>,
        metadata: Option<&BTreeMap<String, Bytes>>,
    ) -> Result<Vertex>;

    /// One hop per matching outgoing edge of the state's vertex, in
    /// edge insertion order.
    async fn out(&self, state: &QueryState, label: Option<&str>) -> Result<Vec<Hop>>;
}

/// Shared behavior every view composes: the store handle, the query's
/// transaction cache and a pointer back to the factory for delegation.
#[derive(Clone)]
pub struct ViewCore {
    store: Arc<VertexStore>,
    cache: Arc<TransactionCache>,
    factory: Weak<ViewFactory>,
}

impl ViewCore {
    pub fn store(&self) -> &Arc<VertexStore> {
        &self.store
    }

    pub fn cache(&self) -> &Arc<TransactionCache> {
        &self.cache
    }

    /// Reads a vertex through the query's transaction cache.
    pub async fn load(&self, pointer: VertexPointer, version: Option<u64>) -> Result<Vertex> {
        let tr = self.cache.get_or_open(&pointer.feed, version).await?;
        self.store.get_in_transaction(pointer.id, &tr).await
    }

    /// Looks up a collaborating view by name.
    pub fn view(&self, name: &str) -> Option<Arc<dyn View>> {
        self.factory.upgrade().and_then(|f| f.view(name))
    }

    /// The registered handle of a view (used to hand a view's own Arc
    /// into hop futures).
    pub(crate) fn own_handle(&self, name: &str) -> Result<Arc<dyn View>> {
        self.view(name).ok_or_else(|| {
            HyperGraphError::Internal(anyhow::anyhow!("view '{}' is not registered", name))
        })
    }
}

/// Builds a view instance over the shared per-query behavior.
pub type ViewConstructor = Arc<dyn Fn(ViewCore) -> Arc<dyn View> + Send + Sync>;

/// Per-query registry of views sharing one transaction cache.
pub struct ViewFactory {
    cache: Arc<TransactionCache>,
    views: RwLock<HashMap<String, Arc<dyn View>>>,
}

impl ViewFactory {
    /// Creates the factory with both built-in views plus any user
    /// constructors, all wired to one fresh transaction cache.
    pub fn new(store: Arc<VertexStore>, extra: &[(String, ViewConstructor)]) -> Arc<Self> {
        let cache = Arc::new(TransactionCache::new(store.clone()));
        Arc::new_cyclic(|weak: &Weak<ViewFactory>| {
            let core = ViewCore {
                store,
                cache: cache.clone(),
                factory: weak.clone(),
            };
            let mut views: HashMap<String, Arc<dyn View>> = HashMap::new();
            views.insert(
                GRAPH_VIEW.to_string(),
                Arc::new(graph::GraphView::new(core.clone())),
            );
            views.insert(
                STATIC_VIEW.to_string(),
                Arc::new(static_view::StaticView::new(core.clone())),
            );
            for (name, constructor) in extra {
                views.insert(name.clone(), constructor(core.clone()));
            }
            ViewFactory {
                cache,
                views: RwLock::new(views),
            }
        })
    }

    pub fn view(&self, name: &str) -> Option<Arc<dyn View>> {
        self.views.read().get(name).cloned()
    }

    pub fn default_view(&self) -> Arc<dyn View> {
        self.view(GRAPH_VIEW).expect("built-in view is registered")
    }

    /// The transaction cache shared by this query's views.
    pub fn transaction_cache(&self) -> Arc<TransactionCache> {
        self.cache.clone()
    }
}

/// Builds the hop future for one edge. `resolver` is the view that will
/// interpret the target; `view_desc`/`metadata` are what the resolver is
/// allowed to see of the edge's hints.
pub(crate) fn hop_for_edge(
    resolver: Arc<dyn View>,
    view_desc: Option<String>,
    metadata: Option<BTreeMap<String, Bytes>>,
    state: QueryState,
    edge: Edge,
    source: VertexPointer,
) -> Hop {
    Box::pin(async move {
        let pointer = VertexPointer::new(edge.feed.unwrap_or(source.feed), edge.target);
        let hopped = async {
            let vertex = resolver
                .get(pointer, edge.version, view_desc.as_deref(), metadata.as_ref())
                .await?;
            state.follow(&edge.label, vertex, &edge.restrictions)
        }
        .await;
        hopped.map_err(|e| HyperGraphError::EdgeTraversing {
            source_feed: source.feed,
            source_id: source.id,
            label: edge.label.clone(),
            feed_hint: edge.feed.map(|f| HyperGraphError::feed_hint(&f)),
            source: Box::new(e),
        })
    })
}

/// Shared `out` enumeration: both built-in views emit one hop per
/// matching edge, in insertion order, after the restriction check.
pub(crate) fn enumerate_edges<'a>(
    state: &'a QueryState,
    label: Option<&'a str>,
) -> Result<(VertexPointer, impl Iterator<Item = &'a Edge>)> {
    let source = state
        .vertex()
        .pointer()
        .ok_or_else(|| HyperGraphError::Input {
            message: "query state holds an unpersisted vertex".to_string(),
        })?;
    let edges = state
        .vertex()
        .edges()
        .iter()
        .filter(move |edge| label.is_none_or(|l| edge.label == l))
        .filter(|edge| state.allows(&state.child_path(&edge.label)));
    Ok((source, edges))
}
