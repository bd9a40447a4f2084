//! Graph backends behind one async contract.
//!
//! Two implementations answer the same questions over different storage:
//!
//! - [`RelationalBackend`]: imperative BFS over the SQLite adjacency table,
//!   one query per expansion step.
//! - [`NativeBackend`]: variable-length pattern matching over an in-process
//!   property graph loaded from a snapshot.
//!
//! [`BackendSelector`] owns the policy of trying the native backend first and
//! falling back to the relational one, once, on failure.

mod native;
mod relational;
mod selector;

pub use native::{
    sync_graph_store, GraphSnapshot, GraphStore, GraphStoreHandle, MatchPattern, NativeBackend,
    SyncReport,
};
pub use relational::RelationalBackend;
pub use selector::{BackendSelector, PathSearch};

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::graph::TraversalBudget;
use crate::model::{NetworkStats, PathQuery, RelationshipPath, ShortestPathQuery, Vendor};

/// Which storage engine produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    Native,
    Relational,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Native => write!(f, "native"),
            BackendKind::Relational => write!(f, "relational"),
        }
    }
}

/// Read-only graph queries shared by every storage engine.
#[async_trait]
pub trait GraphBackend: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// Simple paths from the query source within its hop window, sorted by
    /// (length asc, strength desc) and truncated to `limit`.
    async fn find_paths(
        &self,
        query: &PathQuery,
        budget: &TraversalBudget,
    ) -> Result<Vec<RelationshipPath>>;

    /// A minimum-hop path, or `None` when unreachable within `max_depth`.
    async fn find_shortest_path(
        &self,
        query: &ShortestPathQuery,
        budget: &TraversalBudget,
    ) -> Result<Option<RelationshipPath>>;

    async fn network_stats(&self, vendor_id: &str) -> Result<NetworkStats>;

    /// Stats for every vendor, ordered by id, all read from one view of
    /// the store.
    async fn all_network_stats(&self) -> Result<Vec<(Vendor, NetworkStats)>>;

    /// The vendor record, or `NotFound`.
    async fn vendor(&self, vendor_id: &str) -> Result<Vendor>;

    /// All vendors known to this backend, ordered by id.
    async fn list_vendors(&self) -> Result<Vec<Vendor>>;
}
