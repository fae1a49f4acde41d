// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Dragonscale Team

//! View plumbing: delegation, static traversal, failure isolation.

use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use hypergraph::{
    Content, Edge, EdgeOptions, Hop, HyperGraphDB, HyperGraphError, MemoryCorestore, QueryState,
    Vertex, VertexId, VertexPointer, View, ViewCore,
};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;

fn name_of(v: &Vertex) -> String {
    v.content()
        .and_then(|c| c.as_json())
        .and_then(|j| j.get("name"))
        .and_then(|n| n.as_str())
        .unwrap_or_default()
        .to_string()
}

/// Test view that replaces loaded content with a marker, to make it
/// observable which view interpreted a hop.
struct MaskView {
    core: ViewCore,
}

#[async_trait]
impl View for MaskView {
    fn name(&self) -> &str {
        "mask"
    }

    async fn get(
        &self,
        pointer: VertexPointer,
        version: Option<u64>,
        _view_desc: Option<&str>,
        _metadata: Option<&BTreeMap<String, Bytes>>,
    ) -> hypergraph::Result<Vertex> {
        let mut vertex = self.core.load(pointer, version).await?;
        vertex.set_content(Content::json(json!({ "name": "masked" })));
        Ok(vertex)
    }

    async fn out(
        &self,
        _state: &QueryState,
        _label: Option<&str>,
    ) -> hypergraph::Result<Vec<Hop>> {
        Ok(Vec::new())
    }
}

fn db_with_mask() -> HyperGraphDB {
    let db = HyperGraphDB::open(Arc::new(MemoryCorestore::new())).build();
    db.register_view(
        "mask",
        Arc::new(|core: ViewCore| Arc::new(MaskView { core }) as Arc<dyn View>),
    );
    db
}

async fn graph_with_viewed_edge(db: &HyperGraphDB, view: &str) -> Result<Vertex> {
    let mut child = db.create_vertex();
    child.set_content(Content::json(json!({ "name": "plain" })));
    db.put(&mut child).await?;

    let mut root = db.create_vertex();
    let opts = EdgeOptions {
        view: Some(view.to_string()),
        ..Default::default()
    };
    root.add_edge_to(&child, "child", opts)?;
    db.put(&mut root).await?;
    Ok(root)
}

#[tokio::test]
async fn test_graph_view_delegates_to_edge_view() -> Result<()> {
    let db = db_with_mask();
    let root = graph_with_viewed_edge(&db, "mask").await?;

    let (names, errors) = db
        .query_at_vertex(&root)
        .out(Some("child"))
        .values(name_of)
        .await;
    assert!(errors.is_empty());
    assert_eq!(names, vec!["masked"]);
    Ok(())
}

#[tokio::test]
async fn test_static_view_ignores_edge_view() -> Result<()> {
    let db = db_with_mask();
    let root = graph_with_viewed_edge(&db, "mask").await?;

    let (names, errors) = db
        .query_at_vertex(&root)
        .with_view("static")?
        .out(Some("child"))
        .values(name_of)
        .await;
    assert!(errors.is_empty());
    assert_eq!(names, vec!["plain"]);
    Ok(())
}

#[tokio::test]
async fn test_unknown_edge_view_falls_back_to_current() -> Result<()> {
    let db = HyperGraphDB::open(Arc::new(MemoryCorestore::new())).build();
    let root = graph_with_viewed_edge(&db, "no-such-view").await?;

    let (names, errors) = db
        .query_at_vertex(&root)
        .out(Some("child"))
        .values(name_of)
        .await;
    assert!(errors.is_empty());
    assert_eq!(names, vec!["plain"]);
    Ok(())
}

#[tokio::test]
async fn test_failed_hop_does_not_poison_siblings() -> Result<()> {
    let db = HyperGraphDB::open(Arc::new(MemoryCorestore::new())).build();

    let mut first = db.create_vertex();
    first.set_content(Content::json(json!({ "name": "first" })));
    let mut second = db.create_vertex();
    second.set_content(Content::json(json!({ "name": "second" })));
    db.put_all(&mut [&mut first, &mut second]).await?;

    let mut a = db.create_vertex();
    a.add_edge_to(&first, "child", EdgeOptions::default())?;
    a.add_edge(Edge {
        label: "child".to_string(),
        target: VertexId::new(999),
        feed: None,
        view: None,
        metadata: BTreeMap::new(),
        restrictions: Vec::new(),
        version: None,
    });
    a.add_edge_to(&second, "child", EdgeOptions::default())?;
    db.put(&mut a).await?;

    let (vertices, errors) = db.query_at_vertex(&a).out(None).vertices().await;
    let names: Vec<_> = vertices.iter().map(name_of).collect();
    assert_eq!(names, vec!["first", "second"]);
    assert_eq!(errors.len(), 1);
    match &errors[0] {
        HyperGraphError::EdgeTraversing { label, source, .. } => {
            assert_eq!(label, "child");
            assert!(matches!(
                source.as_ref(),
                HyperGraphError::VertexLoading { .. }
            ));
        }
        other => panic!("expected EdgeTraversing, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn test_edge_version_pins_the_read() -> Result<()> {
    let db = HyperGraphDB::open(Arc::new(MemoryCorestore::new())).build();

    let mut doc = db.create_vertex();
    doc.set_content(Content::json(json!({ "rev": 1 })));
    let rev1 = db.put(&mut doc).await?;
    doc.set_content(Content::json(json!({ "rev": 2 })));
    db.put(&mut doc).await?;

    let mut root = db.create_vertex();
    root.add_edge(Edge {
        label: "pinned".to_string(),
        target: rev1,
        feed: None,
        view: None,
        metadata: BTreeMap::new(),
        restrictions: Vec::new(),
        // Pin to the feed length right after the first revision.
        version: Some(rev1.as_u64()),
    });
    root.add_edge(Edge {
        label: "live".to_string(),
        target: rev1,
        feed: None,
        view: None,
        metadata: BTreeMap::new(),
        restrictions: Vec::new(),
        version: None,
    });
    db.put(&mut root).await?;

    let (pinned, errors) = db
        .query_at_vertex(&root)
        .out(Some("pinned"))
        .vertices()
        .await;
    assert!(errors.is_empty());
    assert_eq!(
        pinned[0].content().and_then(|c| c.as_json()),
        Some(&json!({ "rev": 1 }))
    );

    let (live, errors) = db.query_at_vertex(&root).out(Some("live")).vertices().await;
    assert!(errors.is_empty());
    assert_eq!(
        live[0].content().and_then(|c| c.as_json()),
        Some(&json!({ "rev": 2 }))
    );
    Ok(())
}

#[tokio::test]
async fn test_views_share_one_transaction_cache_per_query() -> Result<()> {
    let db = db_with_mask();
    let root = graph_with_viewed_edge(&db, "mask").await?;

    let query = db.query_at_vertex(&root);
    let cache = query.transaction_cache();
    let (names, errors) = query.out(Some("child")).values(name_of).await;
    assert!(errors.is_empty());
    assert_eq!(names, vec!["masked"]);
    // GraphView and MaskView both read the same feed: one transaction.
    assert_eq!(cache.opened_count(), 1);
    Ok(())
}
