//! Vendor graph engine: bounded multi-path enumeration, hop-count shortest
//! path and degree statistics over any [`VendorRepository`].
//!
//! The engines are synchronous and read-only. Each expansion step issues its
//! own repository read, so a traversal running next to concurrent writers may
//! see edges added or removed part-way through.

mod arena;
mod budget;
mod explorer;
mod shortest;
mod stats;

pub use budget::{CancelToken, TraversalBudget};
pub use explorer::PathExplorer;
pub use shortest::ShortestPathFinder;
pub use stats::{aggregate_network_stats, NetworkStatsCalculator};

use crate::error::Result;
use crate::model::{Vendor, VendorRelationship};

/// Read access to vendors and their edges.
///
/// Edge listings must be ordered by ascending relationship id; tie-breaking
/// in both traversals depends on it.
pub trait VendorRepository {
    fn get_vendor(&self, vendor_id: &str) -> Result<Option<Vendor>>;

    /// Outgoing edges of `vendor_id` with `strength >= min_strength`,
    /// restricted to `relationship_types` when given.
    fn outgoing_edges(
        &self,
        vendor_id: &str,
        relationship_types: Option<&[String]>,
        min_strength: f64,
    ) -> Result<Vec<VendorRelationship>>;

    fn incoming_edges(&self, vendor_id: &str) -> Result<Vec<VendorRelationship>>;

    /// All vendors, ordered by id.
    fn list_vendors(&self) -> Result<Vec<Vendor>>;
}
