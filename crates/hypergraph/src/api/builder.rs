// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Dragonscale Team

use crate::api::HyperGraphDB;
use hypergraph_common::{FeedKey, HyperGraphConfig};
use hypergraph_query::ViewConstructor;
use hypergraph_store::{Codec, CodecRegistry, Corestore, Crawler, VertexStore};
use parking_lot::RwLock;
use std::sync::Arc;

/// Configures and assembles a [`HyperGraphDB`].
pub struct HyperGraphBuilder {
    corestore: Arc<dyn Corestore>,
    key: Option<FeedKey>,
    config: HyperGraphConfig,
    codecs: Vec<Arc<dyn Codec>>,
    views: Vec<(String, ViewConstructor)>,
}

impl HyperGraphBuilder {
    pub fn new(corestore: Arc<dyn Corestore>) -> Self {
        Self {
            corestore,
            key: None,
            config: HyperGraphConfig::default(),
            codecs: Vec::new(),
            views: Vec::new(),
        }
    }

    /// Pins the default feed to `key` instead of the corestore's local
    /// writable feed. Useful for opening someone else's graph read-only.
    pub fn key(mut self, key: FeedKey) -> Self {
        self.key = Some(key);
        self
    }

    pub fn config(mut self, config: HyperGraphConfig) -> Self {
        self.config = config;
        self
    }

    /// Registers a content codec ahead of first use.
    pub fn codec(mut self, codec: Arc<dyn Codec>) -> Self {
        self.codecs.push(codec);
        self
    }

    /// Registers a user view available to every query.
    pub fn view(mut self, name: impl Into<String>, constructor: ViewConstructor) -> Self {
        self.views.push((name.into(), constructor));
        self
    }

    pub fn build(self) -> HyperGraphDB {
        let registry = Arc::new(CodecRegistry::new());
        for codec in self.codecs {
            registry.register(codec);
        }
        let store = Arc::new(VertexStore::new(self.corestore, registry, self.key));
        let crawler = Arc::new(Crawler::new(store.clone(), self.config.crawler.clone()));
        HyperGraphDB {
            store,
            crawler,
            config: self.config,
            views: RwLock::new(self.views),
        }
    }
}
