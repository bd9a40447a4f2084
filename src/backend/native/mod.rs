mod pattern;
mod store;

pub use pattern::MatchPattern;
pub use store::{sync_graph_store, GraphSnapshot, GraphStore, GraphStoreHandle, SyncReport};

use std::sync::Arc;

use async_trait::async_trait;

use crate::backend::{BackendKind, GraphBackend};
use crate::error::{Result, VendorGraphError};
use crate::graph::TraversalBudget;
use crate::model::{NetworkStats, PathQuery, RelationshipPath, ShortestPathQuery, Vendor};

/// Pattern matching over a snapshot-backed [`GraphStore`].
///
/// Fails with `ServiceUnavailable` while the handle is closed. The snapshot
/// only reflects the relational store as of the last sync.
#[derive(Debug, Clone)]
pub struct NativeBackend {
    handle: Arc<GraphStoreHandle>,
}

impl NativeBackend {
    pub fn new(handle: Arc<GraphStoreHandle>) -> Self {
        Self { handle }
    }

    async fn run<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&GraphStore) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let store = self.handle.session()?;
        tokio::task::spawn_blocking(move || f(&store))
            .await
            .map_err(|e| VendorGraphError::ServiceUnavailable(format!("graph task failed: {}", e)))?
    }
}

#[async_trait]
impl GraphBackend for NativeBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Native
    }

    async fn find_paths(
        &self,
        query: &PathQuery,
        budget: &TraversalBudget,
    ) -> Result<Vec<RelationshipPath>> {
        query.validate()?;
        let pattern = MatchPattern::from_query(query);
        let budget = budget.clone();
        self.run(move |store| store.match_paths(&pattern, &budget)).await
    }

    async fn find_shortest_path(
        &self,
        query: &ShortestPathQuery,
        budget: &TraversalBudget,
    ) -> Result<Option<RelationshipPath>> {
        query.validate()?;
        let query = query.clone();
        let budget = budget.clone();
        self.run(move |store| {
            store.shortest_path(
                &query.source_vendor_id,
                &query.target_vendor_id,
                query.max_depth,
                &budget,
            )
        })
        .await
    }

    async fn network_stats(&self, vendor_id: &str) -> Result<NetworkStats> {
        let store = self.handle.session()?;
        store.network_stats(vendor_id)
    }

    async fn all_network_stats(&self) -> Result<Vec<(Vendor, NetworkStats)>> {
        self.run(|store| store.all_network_stats()).await
    }

    async fn vendor(&self, vendor_id: &str) -> Result<Vendor> {
        let store = self.handle.session()?;
        store
            .vendor(vendor_id)
            .cloned()
            .ok_or_else(|| VendorGraphError::NotFound(format!("vendor {}", vendor_id)))
    }

    async fn list_vendors(&self) -> Result<Vec<Vendor>> {
        Ok(self.handle.session()?.vendors())
    }
}
