use std::collections::BTreeMap;

use crate::error::{Result, VendorGraphError};
use crate::graph::VendorRepository;
use crate::model::{NetworkStats, Vendor, VendorRelationship};

/// Degree statistics for one vendor from its direct edges.
pub struct NetworkStatsCalculator<'r, R: VendorRepository + ?Sized> {
    repo: &'r R,
}

impl<'r, R: VendorRepository + ?Sized> NetworkStatsCalculator<'r, R> {
    pub fn new(repo: &'r R) -> Self {
        Self { repo }
    }

    pub fn network_stats(&self, vendor_id: &str) -> Result<NetworkStats> {
        if self.repo.get_vendor(vendor_id)?.is_none() {
            return Err(VendorGraphError::NotFound(format!("vendor {}", vendor_id)));
        }
        let outgoing = self.repo.outgoing_edges(vendor_id, None, 0.0)?;
        let incoming = self.repo.incoming_edges(vendor_id)?;
        Ok(aggregate_network_stats(vendor_id, &outgoing, &incoming))
    }

    /// Stats for every listed vendor, in listing order.
    pub fn all_network_stats(&self) -> Result<Vec<(Vendor, NetworkStats)>> {
        self.repo
            .list_vendors()?
            .into_iter()
            .map(|vendor| {
                let outgoing = self.repo.outgoing_edges(&vendor.vendor_id, None, 0.0)?;
                let incoming = self.repo.incoming_edges(&vendor.vendor_id)?;
                let stats = aggregate_network_stats(&vendor.vendor_id, &outgoing, &incoming);
                Ok((vendor, stats))
            })
            .collect()
    }
}

/// Fold direct edges into counts, per-type counts and mean strengths.
/// Means are 0.0 over an empty edge set.
pub fn aggregate_network_stats<'a, O, I>(vendor_id: &str, outgoing: O, incoming: I) -> NetworkStats
where
    O: IntoIterator<Item = &'a VendorRelationship>,
    I: IntoIterator<Item = &'a VendorRelationship>,
{
    let (outgoing_count, outgoing_by_type, avg_outgoing_strength) = summarize(outgoing);
    let (incoming_count, incoming_by_type, avg_incoming_strength) = summarize(incoming);
    NetworkStats {
        vendor_id: vendor_id.to_string(),
        outgoing_count,
        incoming_count,
        total_connections: outgoing_count + incoming_count,
        outgoing_by_type,
        incoming_by_type,
        avg_outgoing_strength,
        avg_incoming_strength,
    }
}

fn summarize<'a>(
    edges: impl IntoIterator<Item = &'a VendorRelationship>,
) -> (usize, BTreeMap<String, usize>, f64) {
    let mut count = 0usize;
    let mut by_type = BTreeMap::new();
    let mut strength_sum = 0.0;
    for edge in edges {
        count += 1;
        strength_sum += edge.strength;
        *by_type.entry(edge.relationship_type.clone()).or_insert(0) += 1;
    }
    let avg = if count == 0 { 0.0 } else { strength_sum / count as f64 };
    (count, by_type, avg)
}
