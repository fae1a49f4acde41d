// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Dragonscale Team

//! The lazy query engine.
//!
//! A [`Query`] wraps a pull-based stream of [`QueryState`]s. Operators
//! build bigger streams; nothing executes until a terminal pulls.
//! Per-hop failures travel through the stream as `Err` items so sibling
//! paths keep flowing; terminals partition them out.

use crate::state::QueryState;
use crate::view::{View, ViewFactory};
use futures::stream::{self, BoxStream, StreamExt};
use fxhash::FxHashSet;
use hypergraph_common::{HyperGraphError, QueryConfig, Result, VertexPointer};
use hypergraph_store::{TransactionCache, Vertex};
use std::sync::Arc;

pub type QueryStream = BoxStream<'static, Result<QueryState>>;

/// Predicate deciding when `repeat` stops expanding.
pub type UntilFn = Arc<dyn Fn(&QueryState) -> bool + Send + Sync>;

type ActionFn = Arc<dyn Fn(Query) -> Query + Send + Sync>;

pub struct Query {
    factory: Arc<ViewFactory>,
    view: Arc<dyn View>,
    config: QueryConfig,
    stream: QueryStream,
}

impl Query {
    /// A query over already-materialized states (still lazy: the stream
    /// is not consumed until a terminal runs).
    pub fn from_states(
        factory: Arc<ViewFactory>,
        config: QueryConfig,
        states: Vec<Result<QueryState>>,
    ) -> Self {
        let view = factory.default_view();
        Self {
            factory,
            view,
            config,
            stream: stream::iter(states).boxed(),
        }
    }

    /// A query rooted at a vertex already in memory.
    pub fn from_vertex(factory: Arc<ViewFactory>, config: QueryConfig, vertex: Vertex) -> Self {
        Self::from_states(factory, config, vec![Ok(QueryState::new(vertex))])
    }

    /// A query rooted at `(feed, id)`; the root loads lazily through the
    /// default view when the first terminal pulls.
    pub fn from_pointer(
        factory: Arc<ViewFactory>,
        config: QueryConfig,
        pointer: VertexPointer,
    ) -> Self {
        let view = factory.default_view();
        let loader = view.clone();
        let stream = stream::once(async move {
            let vertex = loader.get(pointer, None, None, None).await?;
            Ok(QueryState::new(vertex))
        })
        .boxed();
        Self {
            factory,
            view,
            config,
            stream,
        }
    }

    /// A query over an arbitrary state stream.
    pub fn from_stream(
        factory: Arc<ViewFactory>,
        config: QueryConfig,
        stream: QueryStream,
    ) -> Self {
        let view = factory.default_view();
        Self {
            factory,
            view,
            config,
            stream,
        }
    }

    /// Switches the view driving subsequent operators.
    pub fn with_view(mut self, name: &str) -> Result<Self> {
        self.view = self
            .factory
            .view(name)
            .ok_or_else(|| HyperGraphError::Input {
                message: format!("unknown view '{}'", name),
            })?;
        Ok(self)
    }

    /// The transaction cache backing this query's views.
    pub fn transaction_cache(&self) -> Arc<TransactionCache> {
        self.factory.transaction_cache()
    }

    /// Follows outgoing edges (optionally only those labeled `label`).
    /// Within one hop, results keep the source vertex's edge insertion
    /// order; across vertices, the input stream's order.
    pub fn out(self, label: Option<&str>) -> Query {
        let Query {
            factory,
            view,
            config,
            stream,
        } = self;
        let hop_view = view.clone();
        let label: Option<String> = label.map(str::to_string);
        let stream = stream
            .then(move |item| {
                let view = hop_view.clone();
                let label = label.clone();
                async move {
                    let hops: QueryStream = match item {
                        Ok(state) => match view.out(&state, label.as_deref()).await {
                            Ok(hops) => stream::iter(hops).then(|hop| hop).boxed(),
                            Err(e) => stream::iter(vec![Err(e)]).boxed(),
                        },
                        Err(e) => stream::iter(vec![Err(e)]).boxed(),
                    };
                    hops
                }
            })
            .flatten()
            .boxed();
        Query {
            factory,
            view,
            config,
            stream,
        }
    }

    /// Keeps states whose vertex satisfies `predicate`. Errors pass
    /// through untouched.
    pub fn matches<F>(self, predicate: F) -> Query
    where
        F: Fn(&Vertex) -> bool + Send + Sync + 'static,
    {
        let Query {
            factory,
            view,
            config,
            stream,
        } = self;
        let stream = stream
            .filter(move |item| {
                let keep = match item {
                    Ok(state) => predicate(state.vertex()),
                    Err(_) => true,
                };
                futures::future::ready(keep)
            })
            .boxed();
        Query {
            factory,
            view,
            config,
            stream,
        }
    }

    /// Applies `action` to the stream level by level (BFS-like: order
    /// within a level is preserved) until the frontier dries up, a state
    /// satisfies `until`, or the depth cap is reached. States already
    /// seen this query — keyed `(feed, id)` — are not re-expanded or
    /// re-emitted.
    pub fn repeat<F>(self, action: F, until: Option<UntilFn>, max_depth: Option<usize>) -> Query
    where
        F: Fn(Query) -> Query + Send + Sync + 'static,
    {
        let Query {
            factory,
            view,
            config,
            stream,
        } = self;
        let level_factory = factory.clone();
        let level_view = view.clone();
        let level_config = config.clone();
        let action: ActionFn = Arc::new(action);
        let depth = max_depth.unwrap_or(config.max_repeat_depth);

        let seed = RepeatState {
            source: Some(stream),
            frontier: Vec::new(),
            seen: FxHashSet::default(),
            depth,
            stopped: false,
        };
        let stream = stream::unfold(seed, move |mut st| {
            let factory = level_factory.clone();
            let view = level_view.clone();
            let config = level_config.clone();
            let action = action.clone();
            let until = until.clone();
            async move {
                // First pull: drain the input into the initial frontier.
                // Input errors are emitted; input states are not (only
                // what the action produces flows out).
                if let Some(mut source) = st.source.take() {
                    let mut errors: Vec<Result<QueryState>> = Vec::new();
                    while let Some(item) = source.next().await {
                        match item {
                            Ok(state) => {
                                if mark_seen(&mut st.seen, &state) {
                                    st.frontier.push(state);
                                }
                            }
                            Err(e) => errors.push(Err(e)),
                        }
                    }
                    if !errors.is_empty() {
                        return Some((errors, st));
                    }
                }

                if st.stopped || st.depth == 0 || st.frontier.is_empty() {
                    return None;
                }
                st.depth -= 1;

                let frontier = std::mem::take(&mut st.frontier);
                let level = Query {
                    factory: factory.clone(),
                    view: view.clone(),
                    config: config.clone(),
                    stream: stream::iter(frontier.into_iter().map(Ok)).boxed(),
                };
                let (states, errors) = action(level).states().await;

                let mut chunk: Vec<Result<QueryState>> =
                    errors.into_iter().map(Err).collect();
                for state in states {
                    if !mark_seen(&mut st.seen, &state) {
                        continue;
                    }
                    if let Some(until) = &until
                        && until(&state)
                    {
                        st.stopped = true;
                    }
                    st.frontier.push(state.clone());
                    chunk.push(Ok(state));
                }
                if chunk.is_empty() && st.frontier.is_empty() {
                    return None;
                }
                Some((chunk, st))
            }
        })
        .map(stream::iter)
        .flatten()
        .boxed();

        Query {
            factory,
            view,
            config,
            stream,
        }
    }

    /// Terminal: the raw state stream (drop it to cancel the query).
    pub fn generator(self) -> QueryStream {
        self.stream
    }

    /// Terminal: drains the stream, partitioning states from per-path
    /// errors.
    pub async fn states(self) -> (Vec<QueryState>, Vec<HyperGraphError>) {
        let mut states = Vec::new();
        let mut errors = Vec::new();
        let mut stream = self.stream;
        while let Some(item) = stream.next().await {
            match item {
                Ok(state) => states.push(state),
                Err(e) => errors.push(e),
            }
        }
        tracing::debug!(
            states = states.len(),
            errors = errors.len(),
            "Query drained"
        );
        (states, errors)
    }

    /// Terminal: materializes the reached vertices.
    pub async fn vertices(self) -> (Vec<Vertex>, Vec<HyperGraphError>) {
        let (states, errors) = self.states().await;
        (
            states.into_iter().map(QueryState::into_vertex).collect(),
            errors,
        )
    }

    /// Terminal: materializes all vertices and applies `selector`.
    pub async fn values<T>(
        self,
        selector: impl Fn(&Vertex) -> T,
    ) -> (Vec<T>, Vec<HyperGraphError>) {
        let (vertices, errors) = self.vertices().await;
        (vertices.iter().map(selector).collect(), errors)
    }
}

struct RepeatState {
    source: Option<QueryStream>,
    frontier: Vec<QueryState>,
    seen: FxHashSet<VertexPointer>,
    depth: usize,
    stopped: bool,
}

/// Returns true when the state is new. Transient vertices have no
/// pointer and are always considered new.
fn mark_seen(seen: &mut FxHashSet<VertexPointer>, state: &QueryState) -> bool {
    match state.vertex().pointer() {
        Some(pointer) => seen.insert(pointer),
        None => true,
    }
}
