// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Dragonscale Team

//! Idempotent materialization of a label path within one writer's feed.

use crate::api::HyperGraphDB;
use hypergraph_common::{HyperGraphError, Result};
use hypergraph_store::{EdgeOptions, Vertex};
use tracing::{debug, instrument};

/// Splits `path` into segments: `\` normalizes to `/`, empty segments
/// drop out.
pub(crate) fn path_segments(path: &str) -> Vec<String> {
    path.replace('\\', "/")
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .collect()
}

/// Which vertex a walk step landed on.
#[derive(Clone, Copy)]
enum Slot {
    Root,
    Existing(usize),
    Created(usize),
}

impl HyperGraphDB {
    /// Walks `path` from `root` inside `root`'s feed, creating the
    /// missing chain of vertices and edges. Returns the newly created
    /// vertices; a second identical call returns an empty list.
    ///
    /// When a segment matches several same-feed edges, the child with
    /// the highest timestamp wins; ties break toward the higher id.
    #[instrument(skip(self, root), fields(path = %path))]
    pub async fn create_edges_to_path(
        &self,
        path: &str,
        root: &mut Vertex,
    ) -> Result<Vec<Vertex>> {
        if !root.writable() {
            return Err(HyperGraphError::WritePermission {
                message: "passed root vertex has to be writeable".to_string(),
            });
        }
        let root_pointer = root.pointer().ok_or_else(|| HyperGraphError::Input {
            message: "path root vertex has not been persisted".to_string(),
        })?;

        let parts = path_segments(path);
        if parts.is_empty() {
            return Ok(Vec::new());
        }

        let tr = self.store.transaction(&root_pointer.feed, None).await?;
        let feed = tr.key();

        let mut existing: Vec<Vertex> = Vec::new();
        let mut created: Vec<Vertex> = Vec::new();
        let mut route: Vec<(Slot, usize, String)> = Vec::new();
        let mut current = Slot::Root;

        for segment in &parts {
            let at = match current {
                Slot::Root => &*root,
                Slot::Existing(i) => &existing[i],
                Slot::Created(i) => &created[i],
            };

            // Only same-feed edges participate; absent edge feed means
            // same feed by convention.
            let candidate_ids: Vec<_> = at
                .edges_labeled(segment)
                .filter(|e| e.feed.is_none() || e.feed == Some(feed))
                .map(|e| e.target)
                .collect();

            let mut candidates: Vec<Vertex> = Vec::new();
            for id in candidate_ids {
                match self.store.get_in_transaction(id, &tr).await {
                    Ok(vertex) => {
                        // Revisions of one vertex resolve to the same
                        // latest record; keep it once.
                        if !candidates.iter().any(|c| c.pointer() == vertex.pointer()) {
                            candidates.push(vertex);
                        }
                    }
                    // A dangling edge is a per-path condition, not a
                    // failure of the whole walk.
                    Err(HyperGraphError::VertexLoading { .. }) => {
                        debug!(segment = %segment, id = %id, "Skipping dangling path candidate");
                        continue;
                    }
                    Err(e) => return Err(e),
                }
            }

            current = match pick_latest(candidates) {
                Some(found) => {
                    existing.push(found);
                    Slot::Existing(existing.len() - 1)
                }
                None => {
                    created.push(Vertex::new());
                    let index = created.len() - 1;
                    route.push((current, index, segment.clone()));
                    Slot::Created(index)
                }
            };
        }

        if created.is_empty() {
            debug!("Path already materialized");
            return Ok(Vec::new());
        }

        // New vertices first, insertion order, so they obtain ids.
        for vertex in created.iter_mut() {
            self.store.put_in_transaction(&tr, vertex).await?;
        }

        // Then wire each parent to its new child and re-persist every
        // distinct parent once.
        let mut parent_slots: Vec<Slot> = Vec::new();
        for (parent, child_index, label) in &route {
            let child = created[*child_index].clone();
            let parent_vertex = match parent {
                Slot::Root => &mut *root,
                Slot::Existing(i) => &mut existing[*i],
                Slot::Created(i) => &mut created[*i],
            };
            parent_vertex.add_edge_to(&child, label, EdgeOptions::default())?;
            if !parent_slots
                .iter()
                .any(|slot| slot_key(slot) == slot_key(parent))
            {
                parent_slots.push(*parent);
            }
        }
        for slot in parent_slots {
            let parent = match slot {
                Slot::Root => &mut *root,
                Slot::Existing(i) => &mut existing[i],
                Slot::Created(i) => &mut created[i],
            };
            self.store.put_in_transaction(&tr, parent).await?;
        }

        debug!(created = created.len(), "Materialized path segments");
        Ok(created)
    }
}

/// Concurrent-writer tie-break: highest timestamp, then highest id.
fn pick_latest(candidates: Vec<Vertex>) -> Option<Vertex> {
    candidates.into_iter().max_by_key(|v| {
        (
            v.timestamp().unwrap_or(0),
            v.id().map(|id| id.as_u64()).unwrap_or(0),
        )
    })
}

fn slot_key(slot: &Slot) -> (u8, usize) {
    match slot {
        Slot::Root => (0, 0),
        Slot::Existing(i) => (1, *i),
        Slot::Created(i) => (2, *i),
    }
}
