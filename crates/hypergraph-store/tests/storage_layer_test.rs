// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Dragonscale Team

//! Cross-module storage tests: envelope bytes on the feed, revision
//! resolution through the store, codec dispatch.

use anyhow::Result;
use bytes::Bytes;
use hypergraph_store::envelope::VertexEnvelope;
use hypergraph_store::{
    CodecRegistry, Content, Corestore, EdgeOptions, MemoryCorestore, Vertex, VertexStore,
};
use serde_json::json;
use std::sync::Arc;

fn store_over(corestore: Arc<MemoryCorestore>) -> VertexStore {
    VertexStore::new(corestore, Arc::new(CodecRegistry::new()), None)
}

#[tokio::test]
async fn test_persisted_record_is_a_canonical_envelope() -> Result<()> {
    let corestore = Arc::new(MemoryCorestore::new());
    let store = store_over(corestore.clone());
    let feed = store.default_feed().await?;

    let mut target = Vertex::new();
    store.put(&feed, &mut target).await?;

    let mut v = Vertex::new();
    v.set_content(Content::json(json!({ "name": "envelope" })));
    v.add_edge_to(&target, "child", EdgeOptions::default())?;
    let id = store.put(&feed, &mut v).await?;

    // Read the raw block and check canonical round-trip.
    let log = corestore.feed(&feed).await?;
    let block = log.get(id.as_u64() - 1).await?;
    let envelope = VertexEnvelope::decode(&block)?;
    assert_eq!(envelope.encode(), block);
    assert_eq!(envelope.edges.len(), 1);
    assert_eq!(envelope.timestamp, v.timestamp().unwrap());
    assert_eq!(envelope.prev_id, None);
    Ok(())
}

#[tokio::test]
async fn test_revision_chain_spans_store_reads() -> Result<()> {
    let corestore = Arc::new(MemoryCorestore::new());
    let store = store_over(corestore);
    let feed = store.default_feed().await?;

    let mut v = Vertex::new();
    v.set_content(Content::json(json!({ "n": 0 })));
    let first = store.put(&feed, &mut v).await?;
    for n in 1..=3 {
        v.set_content(Content::json(json!({ "n": n })));
        store.put(&feed, &mut v).await?;
    }

    let loaded = store.get(&feed, first).await?;
    assert_eq!(loaded.id(), v.id());
    assert_eq!(
        loaded.content().and_then(|c| c.as_json()),
        Some(&json!({ "n": 3 }))
    );
    Ok(())
}

#[tokio::test]
async fn test_malformed_record_is_a_decoding_error() -> Result<()> {
    let corestore = Arc::new(MemoryCorestore::new());
    let store = store_over(corestore.clone());
    let feed = store.default_feed().await?;

    let log = corestore.feed(&feed).await?;
    // A bare varint 0 is a truncated envelope.
    log.append(Bytes::from_static(b"\x00")).await?;

    let err = store
        .get(&feed, hypergraph_common::VertexId::new(1))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        hypergraph_common::HyperGraphError::VertexDecoding { .. }
    ));
    Ok(())
}
