// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Dragonscale Team

//! Crawler-maintained indexes and `query_index` composition.

use anyhow::Result;
use hypergraph::{
    Content, Corestore, HyperGraphDB, HyperGraphError, IndexRule, MemoryCorestore, Vertex,
};
use serde_json::json;
use std::sync::Arc;

struct ByName;

impl IndexRule for ByName {
    fn name(&self) -> &str {
        "byName"
    }

    fn extract(&self, vertex: &Vertex) -> Vec<(String, Option<f64>)> {
        vertex
            .content()
            .and_then(|c| c.as_json())
            .and_then(|v| v.get("name"))
            .and_then(|n| n.as_str())
            .map(|n| vec![(n.to_string(), None)])
            .unwrap_or_default()
    }

    fn traverse(&self, _vertex: &Vertex) -> Vec<String> {
        vec!["child".to_string()]
    }
}

fn named(db: &HyperGraphDB, name: &str) -> Vertex {
    let mut v = db.create_vertex();
    v.set_content(Content::json(json!({ "name": name })));
    v
}

#[tokio::test]
async fn test_query_index_returns_hits_in_insertion_order() -> Result<()> {
    let db = HyperGraphDB::open(Arc::new(MemoryCorestore::new())).build();
    db.add_index_rule(Arc::new(ByName));

    // root("foo") -> first("foo") -> second("foo"), plus an unrelated
    // "bar" child under root.
    let mut second = named(&db, "foo");
    db.put(&mut second).await?;
    let mut first = named(&db, "foo");
    first.add_edge_to(&second, "child", Default::default())?;
    db.put(&mut first).await?;
    let mut other = named(&db, "bar");
    db.put(&mut other).await?;
    let mut root = named(&db, "foo");
    root.add_edge_to(&first, "child", Default::default())?;
    root.add_edge_to(&other, "child", Default::default())?;
    db.put(&mut root).await?;

    let stats = db.crawl(root.pointer().unwrap()).await?;
    assert_eq!(stats.visited, 4);

    let (vertices, errors) = db.query_index("byName", "foo")?.vertices().await;
    assert!(errors.is_empty());
    let ids: Vec<_> = vertices.iter().map(|v| v.id().unwrap()).collect();
    assert_eq!(
        ids,
        vec![root.id().unwrap(), first.id().unwrap(), second.id().unwrap()]
    );

    let (bars, _) = db.query_index("byName", "bar")?.vertices().await;
    assert_eq!(bars.len(), 1);
    assert_eq!(bars[0].id(), other.id());

    let (none, _) = db.query_index("byName", "baz")?.vertices().await;
    assert!(none.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_unknown_index_is_an_error() {
    let db = HyperGraphDB::open(Arc::new(MemoryCorestore::new())).build();
    match db.query_index("nope", "x") {
        Err(HyperGraphError::IndexNotFound { name }) => assert_eq!(name, "nope"),
        other => panic!("expected IndexNotFound, got {:?}", other.is_ok()),
    }
}

#[tokio::test]
async fn test_indexes_lists_registered_rules() {
    let db = HyperGraphDB::open(Arc::new(MemoryCorestore::new())).build();
    assert!(db.indexes().is_empty());
    db.add_index_rule(Arc::new(ByName));
    let names: Vec<_> = db.indexes().iter().map(|i| i.name().to_string()).collect();
    assert_eq!(names, vec!["byName"]);
}

#[tokio::test]
async fn test_crawl_follows_cross_feed_edges() -> Result<()> {
    let corestore = Arc::new(MemoryCorestore::new());
    let db = HyperGraphDB::open(corestore.clone()).build();
    db.add_index_rule(Arc::new(ByName));

    let f2 = corestore.create_feed().await?.key();
    let mut remote = named(&db, "foo");
    db.put_all_in(&f2, &mut [&mut remote]).await?;

    let mut root = named(&db, "foo");
    root.add_edge_to(&remote, "child", Default::default())?;
    db.put(&mut root).await?;

    db.crawl(root.pointer().unwrap()).await?;
    let hits = db.crawler().index("byName").unwrap().get("foo");
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[1].feed, f2);
    Ok(())
}

#[tokio::test]
async fn test_recrawl_after_new_vertices_extends_index() -> Result<()> {
    let db = HyperGraphDB::open(Arc::new(MemoryCorestore::new())).build();
    db.add_index_rule(Arc::new(ByName));

    let mut root = named(&db, "foo");
    db.put(&mut root).await?;
    db.crawl(root.pointer().unwrap()).await?;
    assert_eq!(db.crawler().index("byName").unwrap().get("foo").len(), 1);

    let mut child = named(&db, "foo");
    db.put(&mut child).await?;
    root.add_edge_to(&child, "child", Default::default())?;
    db.put(&mut root).await?;

    db.crawl(root.pointer().unwrap()).await?;
    let hits = db.crawler().index("byName").unwrap().get("foo");
    assert_eq!(hits.len(), 2);
    Ok(())
}
