use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::backend::{BackendKind, GraphBackend, GraphStoreHandle, NativeBackend, RelationalBackend};
use crate::config::Config;
use crate::db::Db;
use crate::error::{Result, VendorGraphError};
use crate::graph::TraversalBudget;
use crate::model::{NetworkStats, PathQuery, RelationshipPath, ShortestPathQuery, Vendor};

type BackendFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Paths found by a single backend.
#[derive(Debug, Clone, Serialize)]
pub struct PathSearch {
    pub backend: BackendKind,
    pub paths_found: usize,
    pub paths: Vec<RelationshipPath>,
}

impl PathSearch {
    fn new(backend: BackendKind, paths: Vec<RelationshipPath>) -> Self {
        Self {
            backend,
            paths_found: paths.len(),
            paths,
        }
    }
}

/// Native-first dispatch with a single relational fallback.
///
/// Each call validates its parameters, tries the native backend once and,
/// if that fails with a store error or an unknown vendor, asks the
/// relational backend once. Budget exhaustion is returned as is.
pub struct BackendSelector {
    native: Option<Box<dyn GraphBackend>>,
    relational: Box<dyn GraphBackend>,
    deadline: Option<Duration>,
}

impl BackendSelector {
    pub fn new(relational: Box<dyn GraphBackend>) -> Self {
        Self {
            native: None,
            relational,
            deadline: None,
        }
    }

    pub fn with_native(mut self, native: Box<dyn GraphBackend>) -> Self {
        self.native = Some(native);
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Migrate the relational store and attach the graph store when
    /// enabled. A snapshot that fails to open leaves the native backend
    /// attached but closed, so queries fall back until it is reloaded.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let db = Db::open_migrated(config.db_path()).await?;
        let mut selector = Self::new(Box::new(RelationalBackend::new(db)));

        if config.graph_store.enabled {
            let handle = Arc::new(GraphStoreHandle::new(config.snapshot_path()));
            if let Err(e) = handle.open() {
                log::warn!("Graph store not loaded, using relational backend: {}", e);
            }
            selector = selector.with_native(Box::new(NativeBackend::new(handle)));
        }
        if let Some(deadline) = config.deadline() {
            selector = selector.with_deadline(deadline);
        }
        Ok(selector)
    }

    /// Fresh budget from the configured deadline.
    pub fn budget(&self) -> TraversalBudget {
        match self.deadline {
            Some(deadline) => TraversalBudget::with_timeout(deadline),
            None => TraversalBudget::unbounded(),
        }
    }

    pub async fn find_paths(&self, query: &PathQuery) -> Result<PathSearch> {
        let budget = self.budget();
        self.find_paths_with_budget(query, &budget).await
    }

    pub async fn find_paths_with_budget(
        &self,
        query: &PathQuery,
        budget: &TraversalBudget,
    ) -> Result<PathSearch> {
        query.validate()?;
        let (backend, paths) = self
            .dispatch("find_paths", |b| b.find_paths(query, budget))
            .await?;
        Ok(PathSearch::new(backend, paths))
    }

    pub async fn find_shortest_path(
        &self,
        query: &ShortestPathQuery,
    ) -> Result<Option<RelationshipPath>> {
        query.validate()?;
        let budget = self.budget();
        let (_, path) = self
            .dispatch("find_shortest_path", |b| b.find_shortest_path(query, &budget))
            .await?;
        Ok(path)
    }

    pub async fn network_stats(&self, vendor_id: &str) -> Result<NetworkStats> {
        let (_, stats) = self
            .dispatch("network_stats", |b| b.network_stats(vendor_id))
            .await?;
        Ok(stats)
    }

    pub async fn vendor(&self, vendor_id: &str) -> Result<Vendor> {
        let (_, vendor) = self.dispatch("vendor", |b| b.vendor(vendor_id)).await?;
        Ok(vendor)
    }

    /// Every vendor's stats, all from the one backend that served the call.
    pub async fn all_network_stats(&self) -> Result<(BackendKind, Vec<(Vendor, NetworkStats)>)> {
        self.dispatch("all_network_stats", |b| b.all_network_stats()).await
    }

    async fn dispatch<'a, T, F>(&'a self, operation: &str, call: F) -> Result<(BackendKind, T)>
    where
        F: Fn(&'a dyn GraphBackend) -> BackendFuture<'a, T>,
    {
        if let Some(native) = &self.native {
            match call(&**native).await {
                Ok(value) => {
                    log::debug!("{} served by {} backend", operation, native.kind());
                    return Ok((native.kind(), value));
                }
                Err(err) if err.triggers_fallback() => {
                    log::warn!(
                        "{} failed on {} backend, falling back to {}: {}",
                        operation,
                        native.kind(),
                        self.relational.kind(),
                        err
                    );
                }
                Err(err) => return Err(err),
            }
        }

        let value = call(&*self.relational)
            .await
            .map_err(VendorGraphError::into_unavailable)?;
        log::debug!("{} served by {} backend", operation, self.relational.kind());
        Ok((self.relational.kind(), value))
    }
}
