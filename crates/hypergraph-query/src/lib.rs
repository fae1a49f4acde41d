// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Dragonscale Team

//! Traversal layer for HyperGraphDB: query state with restriction
//! propagation, pluggable views and the lazy query engine.

pub mod query;
pub mod state;
pub mod view;

pub use query::{Query, QueryStream, UntilFn};
pub use state::{CompiledRestriction, QueryState};
pub use view::graph::GraphView;
pub use view::static_view::StaticView;
pub use view::{GRAPH_VIEW, Hop, STATIC_VIEW, View, ViewConstructor, ViewCore, ViewFactory};
