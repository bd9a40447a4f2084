//! In-process property graph and its on-disk snapshot.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use serde::{Deserialize, Serialize};

use crate::db::repository::all_relationships;
use crate::db::{Db, SqliteVendorRepository};
use crate::error::{Result, VendorGraphError};
use crate::graph::{aggregate_network_stats, VendorRepository};
use crate::model::{NetworkStats, Vendor, VendorRelationship};

/// Serialized form of the graph store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub synced_at: DateTime<Utc>,
    pub vendors: Vec<Vendor>,
    pub relationships: Vec<VendorRelationship>,
}

impl GraphSnapshot {
    pub fn read(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write via a sibling temp file and rename, so readers never see a
    /// partial snapshot.
    pub fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(self)?)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }
}

/// Directed multigraph of vendors keyed by vendor id.
///
/// Loading merges: a repeated vendor id or (source, target, type) triple
/// overwrites the earlier entry. Relationships whose endpoints are missing
/// are dropped.
#[derive(Debug)]
pub struct GraphStore {
    graph: DiGraph<Vendor, VendorRelationship>,
    index: HashMap<String, NodeIndex>,
    synced_at: DateTime<Utc>,
}

impl GraphStore {
    pub fn from_snapshot(snapshot: GraphSnapshot) -> Self {
        let mut graph = DiGraph::new();
        let mut index = HashMap::new();

        let vendors: BTreeMap<String, Vendor> = snapshot
            .vendors
            .into_iter()
            .map(|v| (v.vendor_id.clone(), v))
            .collect();
        for (id, vendor) in vendors {
            index.insert(id, graph.add_node(vendor));
        }

        let mut merged: HashMap<(String, String, String), VendorRelationship> = HashMap::new();
        for rel in snapshot.relationships {
            let key = (
                rel.source_vendor_id.clone(),
                rel.target_vendor_id.clone(),
                rel.relationship_type.clone(),
            );
            merged.insert(key, rel);
        }
        let mut relationships: Vec<VendorRelationship> = merged.into_values().collect();
        relationships.sort_by_key(|r| r.id);

        let mut dropped = 0usize;
        for rel in relationships {
            match (
                index.get(&rel.source_vendor_id),
                index.get(&rel.target_vendor_id),
            ) {
                (Some(&from), Some(&to)) => {
                    graph.add_edge(from, to, rel);
                }
                _ => dropped += 1,
            }
        }
        if dropped > 0 {
            log::warn!("Graph snapshot: dropped {} relationships with unknown endpoints", dropped);
        }

        Self {
            graph,
            index,
            synced_at: snapshot.synced_at,
        }
    }

    pub fn vendor_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn relationship_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn synced_at(&self) -> DateTime<Utc> {
        self.synced_at
    }

    pub fn vendor(&self, vendor_id: &str) -> Option<&Vendor> {
        self.index.get(vendor_id).map(|&n| &self.graph[n])
    }

    pub fn vendors(&self) -> Vec<Vendor> {
        let mut vendors: Vec<Vendor> = self.graph.node_weights().cloned().collect();
        vendors.sort_by(|a, b| a.vendor_id.cmp(&b.vendor_id));
        vendors
    }

    pub(super) fn graph(&self) -> &DiGraph<Vendor, VendorRelationship> {
        &self.graph
    }

    pub(super) fn node(&self, vendor_id: &str) -> Option<NodeIndex> {
        self.index.get(vendor_id).copied()
    }

    pub(super) fn require_node(&self, vendor_id: &str) -> Result<NodeIndex> {
        self.node(vendor_id)
            .ok_or_else(|| VendorGraphError::NotFound(format!("vendor {}", vendor_id)))
    }

    pub fn network_stats(&self, vendor_id: &str) -> Result<NetworkStats> {
        let node = self.require_node(vendor_id)?;
        let outgoing = self.edges_by_id(node, Direction::Outgoing);
        let incoming = self.edges_by_id(node, Direction::Incoming);
        Ok(aggregate_network_stats(vendor_id, outgoing, incoming))
    }

    pub fn all_network_stats(&self) -> Result<Vec<(Vendor, NetworkStats)>> {
        self.vendors()
            .into_iter()
            .map(|vendor| {
                let stats = self.network_stats(&vendor.vendor_id)?;
                Ok((vendor, stats))
            })
            .collect()
    }

    // Id order, matching the relational store's summation order.
    fn edges_by_id(&self, node: NodeIndex, direction: Direction) -> Vec<&VendorRelationship> {
        let mut edges: Vec<&VendorRelationship> = self
            .graph
            .edges_directed(node, direction)
            .map(|e| e.weight())
            .collect();
        edges.sort_by_key(|e| e.id);
        edges
    }
}

/// Connection handle for the graph store.
///
/// Closed until [`open`](Self::open) succeeds. Queries take a session, an
/// `Arc` of the loaded store, so a concurrent reload never disturbs a
/// traversal in flight.
#[derive(Debug)]
pub struct GraphStoreHandle {
    snapshot_path: PathBuf,
    store: RwLock<Option<Arc<GraphStore>>>,
}

impl GraphStoreHandle {
    pub fn new<P: AsRef<Path>>(snapshot_path: P) -> Self {
        Self {
            snapshot_path: snapshot_path.as_ref().to_path_buf(),
            store: RwLock::new(None),
        }
    }

    pub fn snapshot_path(&self) -> &Path {
        &self.snapshot_path
    }

    /// Load the snapshot. On failure the handle stays in its previous state.
    pub fn open(&self) -> Result<()> {
        let snapshot = GraphSnapshot::read(&self.snapshot_path).map_err(|e| {
            VendorGraphError::ServiceUnavailable(format!(
                "graph store at {}: {}",
                self.snapshot_path.display(),
                e
            ))
        })?;
        let store = GraphStore::from_snapshot(snapshot);
        log::info!(
            "Graph store opened: {} vendors, {} relationships (synced {})",
            store.vendor_count(),
            store.relationship_count(),
            store.synced_at()
        );
        *self.write_guard()? = Some(Arc::new(store));
        Ok(())
    }

    pub fn reload(&self) -> Result<()> {
        self.open()
    }

    pub fn close(&self) {
        if let Ok(mut guard) = self.store.write() {
            *guard = None;
        }
    }

    pub fn is_open(&self) -> bool {
        self.store.read().map(|g| g.is_some()).unwrap_or(false)
    }

    pub fn session(&self) -> Result<Arc<GraphStore>> {
        let guard = self
            .store
            .read()
            .map_err(|_| VendorGraphError::ServiceUnavailable("graph store lock poisoned".into()))?;
        guard
            .clone()
            .ok_or_else(|| VendorGraphError::ServiceUnavailable("graph store is closed".into()))
    }

    fn write_guard(&self) -> Result<std::sync::RwLockWriteGuard<'_, Option<Arc<GraphStore>>>> {
        self.store
            .write()
            .map_err(|_| VendorGraphError::ServiceUnavailable("graph store lock poisoned".into()))
    }
}

/// Counts written by [`sync_graph_store`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub vendors: usize,
    pub relationships: usize,
}

/// Export the relational store into a graph snapshot at `snapshot_path`.
pub async fn sync_graph_store(db: &Db, snapshot_path: &Path) -> Result<SyncReport> {
    let (vendors, relationships) = db
        .with_connection(|conn| {
            let vendors = SqliteVendorRepository::new(conn).list_vendors()?;
            let relationships = all_relationships(conn)?;
            Ok((vendors, relationships))
        })
        .await?;
    let report = SyncReport {
        vendors: vendors.len(),
        relationships: relationships.len(),
    };
    let snapshot = GraphSnapshot {
        synced_at: Utc::now(),
        vendors,
        relationships,
    };
    let path = snapshot_path.to_path_buf();
    tokio::task::spawn_blocking(move || snapshot.write(&path))
        .await
        .map_err(|e| VendorGraphError::ServiceUnavailable(format!("snapshot task failed: {}", e)))??;
    log::info!(
        "Synced graph store: {} vendors, {} relationships -> {}",
        report.vendors,
        report.relationships,
        snapshot_path.display()
    );
    Ok(report)
}
