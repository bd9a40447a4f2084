//! `VendorRepository` over a SQLite connection.

use rusqlite::{Connection, OptionalExtension, Row};

use crate::error::Result;
use crate::graph::VendorRepository;
use crate::model::{Vendor, VendorRelationship};

const RELATIONSHIP_COLUMNS: &str = "id, source_vendor_id, target_vendor_id, relationship_type, \
     strength, verified, description, created_at";

/// Read-only view of the relational store through one borrowed connection.
///
/// Each call runs its own statement; nothing ties two calls to the same
/// snapshot.
pub struct SqliteVendorRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteVendorRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

fn vendor_from_row(row: &Row<'_>) -> rusqlite::Result<Vendor> {
    Ok(Vendor {
        vendor_id: row.get(0)?,
        name: row.get(1)?,
        industry: row.get(2)?,
        country: row.get(3)?,
        description: row.get(4)?,
    })
}

fn relationship_from_row(row: &Row<'_>) -> rusqlite::Result<VendorRelationship> {
    Ok(VendorRelationship {
        id: row.get(0)?,
        source_vendor_id: row.get(1)?,
        target_vendor_id: row.get(2)?,
        relationship_type: row.get(3)?,
        strength: row.get(4)?,
        verified: row.get(5)?,
        description: row.get(6)?,
        created_at: row.get(7)?,
    })
}

impl VendorRepository for SqliteVendorRepository<'_> {
    fn get_vendor(&self, vendor_id: &str) -> Result<Option<Vendor>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT vendor_id, vendor_name, industry, country, description \
             FROM vendors WHERE vendor_id = ?1",
        )?;
        let vendor = stmt.query_row([vendor_id], vendor_from_row).optional()?;
        Ok(vendor)
    }

    fn outgoing_edges(
        &self,
        vendor_id: &str,
        relationship_types: Option<&[String]>,
        min_strength: f64,
    ) -> Result<Vec<VendorRelationship>> {
        let mut params: Vec<&dyn rusqlite::ToSql> = Vec::with_capacity(2);
        params.push(&vendor_id);
        params.push(&min_strength);
        let query = match relationship_types {
            Some(types) if !types.is_empty() => {
                let placeholders = (0..types.len())
                    .map(|i| format!("?{}", i + 3))
                    .collect::<Vec<_>>()
                    .join(",");
                for t in types {
                    params.push(t);
                }
                format!(
                    "SELECT {} FROM vendor_relationships \
                     WHERE source_vendor_id = ?1 AND strength >= ?2 AND relationship_type IN ({}) \
                     ORDER BY id",
                    RELATIONSHIP_COLUMNS, placeholders
                )
            }
            _ => format!(
                "SELECT {} FROM vendor_relationships \
                 WHERE source_vendor_id = ?1 AND strength >= ?2 \
                 ORDER BY id",
                RELATIONSHIP_COLUMNS
            ),
        };

        let mut stmt = self.conn.prepare_cached(&query)?;
        let edges = stmt
            .query_map(params.as_slice(), relationship_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(edges)
    }

    fn incoming_edges(&self, vendor_id: &str) -> Result<Vec<VendorRelationship>> {
        let query = format!(
            "SELECT {} FROM vendor_relationships WHERE target_vendor_id = ?1 ORDER BY id",
            RELATIONSHIP_COLUMNS
        );
        let mut stmt = self.conn.prepare_cached(&query)?;
        let edges = stmt
            .query_map([vendor_id], relationship_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(edges)
    }

    fn list_vendors(&self) -> Result<Vec<Vendor>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT vendor_id, vendor_name, industry, country, description \
             FROM vendors ORDER BY vendor_id",
        )?;
        let vendors = stmt
            .query_map([], vendor_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(vendors)
    }
}

/// Every relationship in the store, ordered by id.
pub fn all_relationships(conn: &Connection) -> Result<Vec<VendorRelationship>> {
    let query = format!(
        "SELECT {} FROM vendor_relationships ORDER BY id",
        RELATIONSHIP_COLUMNS
    );
    let mut stmt = conn.prepare(&query)?;
    let edges = stmt
        .query_map([], relationship_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(edges)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::migrated_connection_with_chain;

    #[test]
    fn test_get_vendor() {
        let conn = migrated_connection_with_chain();
        let repo = SqliteVendorRepository::new(&conn);

        let vendor = repo.get_vendor("A").unwrap().unwrap();
        assert_eq!(vendor.name, "Vendor A");
        assert!(repo.get_vendor("missing").unwrap().is_none());
    }

    #[test]
    fn test_outgoing_edges_filters() {
        let conn = migrated_connection_with_chain();
        let repo = SqliteVendorRepository::new(&conn);

        let all = repo.outgoing_edges("B", None, 0.0).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].relationship_type, "subcontractor");

        let typed = repo
            .outgoing_edges("B", Some(&["supplier".to_string()]), 0.0)
            .unwrap();
        assert!(typed.is_empty());

        let strong = repo.outgoing_edges("A", None, 0.95).unwrap();
        assert!(strong.is_empty());
        let weak_ok = repo.outgoing_edges("A", None, 0.9).unwrap();
        assert_eq!(weak_ok.len(), 1);
    }

    #[test]
    fn test_incoming_edges_and_listing() {
        let conn = migrated_connection_with_chain();
        let repo = SqliteVendorRepository::new(&conn);

        let incoming = repo.incoming_edges("C").unwrap();
        assert_eq!(incoming.len(), 1);
        assert_eq!(incoming[0].source_vendor_id, "B");

        let ids: Vec<_> = repo
            .list_vendors()
            .unwrap()
            .into_iter()
            .map(|v| v.vendor_id)
            .collect();
        assert_eq!(ids, vec!["A", "B", "C", "D"]);
        assert_eq!(all_relationships(&conn).unwrap().len(), 3);
    }
}
