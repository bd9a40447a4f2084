//! Minimal write path used by the fixture loader and tests. Production CRUD
//! lives outside this crate; the graph engine itself never writes.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use serde::Deserialize;

use crate::error::{Result, VendorGraphError};
use crate::model::Vendor;

/// A relationship to insert; the store assigns the id.
#[derive(Debug, Clone, Deserialize)]
pub struct NewRelationship {
    pub source_vendor_id: String,
    pub target_vendor_id: String,
    pub relationship_type: String,
    pub strength: f64,
    #[serde(default)]
    pub verified: bool,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl NewRelationship {
    pub fn new(source: &str, target: &str, relationship_type: &str, strength: f64) -> Self {
        Self {
            source_vendor_id: source.to_string(),
            target_vendor_id: target.to_string(),
            relationship_type: relationship_type.to_string(),
            strength,
            verified: false,
            description: None,
            created_at: None,
        }
    }
}

/// Insert or update a vendor keyed by `vendor_id`.
pub fn upsert_vendor(conn: &Connection, vendor: &Vendor) -> Result<()> {
    conn.execute(
        "INSERT INTO vendors (vendor_id, vendor_name, industry, country, description)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(vendor_id) DO UPDATE SET
            vendor_name = excluded.vendor_name,
            industry = excluded.industry,
            country = excluded.country,
            description = excluded.description",
        params![
            vendor.vendor_id,
            vendor.name,
            vendor.industry,
            vendor.country,
            vendor.description
        ],
    )?;
    Ok(())
}

/// Insert a relationship, or update strength/verification/description when
/// the (source, target, type) triple already exists. Returns the row id.
pub fn upsert_relationship(conn: &Connection, rel: &NewRelationship) -> Result<i64> {
    if !(0.0..=1.0).contains(&rel.strength) {
        return Err(VendorGraphError::Validation(format!(
            "strength must be between 0.0 and 1.0, got {}",
            rel.strength
        )));
    }
    let created_at = rel.created_at.unwrap_or_else(Utc::now);
    let id = conn.query_row(
        "INSERT INTO vendor_relationships
            (source_vendor_id, target_vendor_id, relationship_type, strength, verified, description, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT(source_vendor_id, target_vendor_id, relationship_type) DO UPDATE SET
            strength = excluded.strength,
            verified = excluded.verified,
            description = excluded.description
         RETURNING id",
        params![
            rel.source_vendor_id,
            rel.target_vendor_id,
            rel.relationship_type,
            rel.strength,
            rel.verified,
            rel.description,
            created_at
        ],
        |row| row.get(0),
    )?;
    Ok(id)
}

/// Remove one relationship by id. Returns whether a row was deleted.
pub fn delete_relationship(conn: &Connection, id: i64) -> Result<bool> {
    let affected = conn.execute("DELETE FROM vendor_relationships WHERE id = ?1", [id])?;
    Ok(affected > 0)
}
