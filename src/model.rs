//! Vendor graph data model: vendors, directed relationships, derived paths
//! and the query parameter types shared by both backends.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, VendorGraphError};

/// Deepest hop window any traversal accepts.
pub const MAX_TRAVERSAL_DEPTH: usize = 15;
/// Largest result limit a path query accepts.
pub const MAX_PATH_LIMIT: usize = 1000;
/// Result limit used when the caller does not pick one.
pub const DEFAULT_PATH_LIMIT: usize = 100;

/// A vendor record as owned by the CRUD layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vendor {
    /// Business key, globally unique.
    pub vendor_id: String,
    pub name: String,
    pub industry: Option<String>,
    pub country: Option<String>,
    pub description: Option<String>,
}

/// A directed, typed, weighted edge between two vendors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VendorRelationship {
    /// Store row id. Edges are always expanded in ascending id order.
    pub id: i64,
    pub source_vendor_id: String,
    pub target_vendor_id: String,
    /// Free-form tag, e.g. `supplier`, `subcontractor`.
    pub relationship_type: String,
    /// Confidence in [0, 1], multiplied along a path.
    pub strength: f64,
    pub verified: bool,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A vendor as it appears inside a path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VendorNode {
    pub vendor_id: String,
    pub vendor_name: String,
    pub industry: Option<String>,
    /// Hop index from the source; the source itself is depth 0.
    pub depth: usize,
}

impl VendorNode {
    pub fn from_vendor(vendor: &Vendor, depth: usize) -> Self {
        Self {
            vendor_id: vendor.vendor_id.clone(),
            vendor_name: vendor.name.clone(),
            industry: vendor.industry.clone(),
            depth,
        }
    }
}

/// A simple (acyclic) path from a source vendor. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipPath {
    pub source_vendor_id: String,
    pub target_vendor_id: String,
    /// Source first, at depth 0.
    pub nodes: Vec<VendorNode>,
    pub relationships: Vec<VendorRelationship>,
    /// Product of all edge strengths.
    pub total_strength: f64,
    /// Hop count, equal to `relationships.len()`.
    pub path_length: usize,
    /// `1 - total_strength`.
    pub risk_score: f64,
}

impl RelationshipPath {
    /// Build a path from its nodes (source first) and traversed edges,
    /// deriving strength, length and risk.
    pub fn new(nodes: Vec<VendorNode>, relationships: Vec<VendorRelationship>) -> Self {
        debug_assert_eq!(nodes.len(), relationships.len() + 1);
        let total_strength = relationships.iter().fold(1.0, |acc, r| acc * r.strength);
        let source_vendor_id = nodes
            .first()
            .map(|n| n.vendor_id.clone())
            .unwrap_or_default();
        let target_vendor_id = nodes
            .last()
            .map(|n| n.vendor_id.clone())
            .unwrap_or_default();
        Self {
            source_vendor_id,
            target_vendor_id,
            path_length: relationships.len(),
            nodes,
            relationships,
            total_strength,
            risk_score: 1.0 - total_strength,
        }
    }

    /// Ordered vendor ids, source included.
    pub fn vendor_ids(&self) -> Vec<&str> {
        self.nodes.iter().map(|n| n.vendor_id.as_str()).collect()
    }
}

/// Sort key shared by every path listing: shorter first, then stronger first.
pub fn sort_paths(paths: &mut [RelationshipPath]) {
    paths.sort_by(|a, b| {
        a.path_length
            .cmp(&b.path_length)
            .then_with(|| b.total_strength.total_cmp(&a.total_strength))
    });
}

/// Degree statistics over a vendor's direct edges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkStats {
    pub vendor_id: String,
    pub outgoing_count: usize,
    pub incoming_count: usize,
    pub total_connections: usize,
    pub outgoing_by_type: BTreeMap<String, usize>,
    pub incoming_by_type: BTreeMap<String, usize>,
    pub avg_outgoing_strength: f64,
    pub avg_incoming_strength: f64,
}

/// Parameters of a bounded multi-path search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathQuery {
    pub source_vendor_id: String,
    pub min_depth: usize,
    pub max_depth: usize,
    /// `None` or an empty list means every type.
    #[serde(default)]
    pub relationship_types: Option<Vec<String>>,
    #[serde(default)]
    pub min_strength: f64,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    DEFAULT_PATH_LIMIT
}

impl PathQuery {
    pub fn new(source_vendor_id: impl Into<String>, min_depth: usize, max_depth: usize) -> Self {
        Self {
            source_vendor_id: source_vendor_id.into(),
            min_depth,
            max_depth,
            relationship_types: None,
            min_strength: 0.0,
            limit: DEFAULT_PATH_LIMIT,
        }
    }

    pub fn with_relationship_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.relationship_types = Some(types.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_min_strength(mut self, min_strength: f64) -> Self {
        self.min_strength = min_strength;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Effective type filter; an empty list filters nothing.
    pub fn type_filter(&self) -> Option<&[String]> {
        match self.relationship_types.as_deref() {
            Some([]) | None => None,
            Some(types) => Some(types),
        }
    }

    /// Reject malformed parameters before any traversal work.
    pub fn validate(&self) -> Result<()> {
        validate_depth("min_depth", self.min_depth)?;
        validate_depth("max_depth", self.max_depth)?;
        if self.min_depth > self.max_depth {
            return Err(VendorGraphError::Validation(format!(
                "min_depth ({}) must not exceed max_depth ({})",
                self.min_depth, self.max_depth
            )));
        }
        if self.limit == 0 || self.limit > MAX_PATH_LIMIT {
            return Err(VendorGraphError::Validation(format!(
                "limit must be between 1 and {}, got {}",
                MAX_PATH_LIMIT, self.limit
            )));
        }
        validate_strength(self.min_strength)
    }
}

/// Parameters of a hop-count shortest path search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShortestPathQuery {
    pub source_vendor_id: String,
    pub target_vendor_id: String,
    pub max_depth: usize,
}

impl ShortestPathQuery {
    pub fn new(
        source_vendor_id: impl Into<String>,
        target_vendor_id: impl Into<String>,
        max_depth: usize,
    ) -> Self {
        Self {
            source_vendor_id: source_vendor_id.into(),
            target_vendor_id: target_vendor_id.into(),
            max_depth,
        }
    }

    pub fn validate(&self) -> Result<()> {
        validate_depth("max_depth", self.max_depth)
    }
}

pub(crate) fn validate_depth(name: &str, depth: usize) -> Result<()> {
    if !(1..=MAX_TRAVERSAL_DEPTH).contains(&depth) {
        return Err(VendorGraphError::Validation(format!(
            "{} must be between 1 and {}, got {}",
            name, MAX_TRAVERSAL_DEPTH, depth
        )));
    }
    Ok(())
}

pub(crate) fn validate_strength(strength: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&strength) {
        return Err(VendorGraphError::Validation(format!(
            "min_strength must be between 0.0 and 1.0, got {}",
            strength
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(id: i64, from: &str, to: &str, strength: f64) -> VendorRelationship {
        VendorRelationship {
            id,
            source_vendor_id: from.to_string(),
            target_vendor_id: to.to_string(),
            relationship_type: "supplier".to_string(),
            strength,
            verified: true,
            description: None,
            created_at: Utc::now(),
        }
    }

    fn node(id: &str, depth: usize) -> VendorNode {
        VendorNode {
            vendor_id: id.to_string(),
            vendor_name: id.to_string(),
            industry: None,
            depth,
        }
    }

    #[test]
    fn test_path_derives_strength_and_risk() {
        let path = RelationshipPath::new(
            vec![node("A", 0), node("B", 1), node("C", 2)],
            vec![edge(1, "A", "B", 0.9), edge(2, "B", "C", 0.8)],
        );
        assert_eq!(path.source_vendor_id, "A");
        assert_eq!(path.target_vendor_id, "C");
        assert_eq!(path.path_length, 2);
        assert!((path.total_strength - 0.72).abs() < 1e-9);
        assert!((path.risk_score - 0.28).abs() < 1e-9);
    }

    #[test]
    fn test_sort_paths_length_then_strength() {
        let weak = RelationshipPath::new(vec![node("A", 0), node("B", 1)], vec![edge(1, "A", "B", 0.2)]);
        let strong = RelationshipPath::new(vec![node("A", 0), node("C", 1)], vec![edge(2, "A", "C", 0.9)]);
        let long = RelationshipPath::new(
            vec![node("A", 0), node("C", 1), node("D", 2)],
            vec![edge(2, "A", "C", 0.9), edge(3, "C", "D", 1.0)],
        );
        let mut paths = vec![long, weak, strong];
        sort_paths(&mut paths);
        let targets: Vec<_> = paths.iter().map(|p| p.target_vendor_id.as_str()).collect();
        assert_eq!(targets, vec!["C", "B", "D"]);
    }

    #[test]
    fn test_validate_depth_window() {
        assert!(PathQuery::new("A", 1, 15).validate().is_ok());
        assert!(matches!(
            PathQuery::new("A", 0, 3).validate(),
            Err(VendorGraphError::Validation(_))
        ));
        assert!(matches!(
            PathQuery::new("A", 4, 3).validate(),
            Err(VendorGraphError::Validation(_))
        ));
        assert!(matches!(
            PathQuery::new("A", 1, 16).validate(),
            Err(VendorGraphError::Validation(_))
        ));
    }

    #[test]
    fn test_validate_limit_and_strength() {
        assert!(PathQuery::new("A", 1, 3).with_limit(0).validate().is_err());
        assert!(PathQuery::new("A", 1, 3).with_limit(1001).validate().is_err());
        assert!(PathQuery::new("A", 1, 3).with_limit(1000).validate().is_ok());
        assert!(PathQuery::new("A", 1, 3).with_min_strength(1.5).validate().is_err());
        assert!(PathQuery::new("A", 1, 3).with_min_strength(-0.1).validate().is_err());
        assert!(PathQuery::new("A", 1, 3).with_min_strength(f64::NAN).validate().is_err());
    }

    #[test]
    fn test_empty_type_list_is_no_filter() {
        let query = PathQuery::new("A", 1, 3).with_relationship_types(Vec::<String>::new());
        assert!(query.type_filter().is_none());
        let query = PathQuery::new("A", 1, 3).with_relationship_types(["supplier"]);
        assert_eq!(query.type_filter().map(<[String]>::len), Some(1));
    }

    #[test]
    fn test_query_deserialize_defaults() {
        let query: PathQuery =
            serde_json::from_str(r#"{"source_vendor_id":"A","min_depth":1,"max_depth":3}"#).unwrap();
        assert_eq!(query.limit, DEFAULT_PATH_LIMIT);
        assert_eq!(query.min_strength, 0.0);
        assert!(query.relationship_types.is_none());
    }
}
