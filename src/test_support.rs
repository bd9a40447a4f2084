//! Fixtures shared by unit tests across modules.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashSet};

use chrono::{TimeZone, Utc};
use rusqlite::Connection;
use tempfile::TempDir;

use crate::db::writer::{upsert_relationship, upsert_vendor, NewRelationship};
use crate::db::{migrate, Db};
use crate::error::Result;
use crate::graph::VendorRepository;
use crate::model::{Vendor, VendorRelationship};

pub fn vendor(id: &str) -> Vendor {
    Vendor {
        vendor_id: id.to_string(),
        name: format!("Vendor {}", id),
        industry: Some("manufacturing".to_string()),
        country: None,
        description: None,
    }
}

pub fn relationship(id: i64, from: &str, to: &str, strength: f64) -> VendorRelationship {
    VendorRelationship {
        id,
        source_vendor_id: from.to_string(),
        target_vendor_id: to.to_string(),
        relationship_type: "supplier".to_string(),
        strength,
        verified: true,
        description: None,
        created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
    }
}

type OutgoingHook = Box<dyn Fn(&MemoryRepository)>;

/// In-memory repository with interior mutability so tests can change the
/// graph while a traversal is running.
#[derive(Default)]
pub struct MemoryRepository {
    vendors: RefCell<BTreeMap<String, Vendor>>,
    edges: RefCell<Vec<VendorRelationship>>,
    hooks: RefCell<Vec<(String, OutgoingHook)>>,
}

impl MemoryRepository {
    pub fn with_vendors<'a>(ids: impl IntoIterator<Item = &'a str>) -> Self {
        let repo = Self::default();
        for id in ids {
            repo.add_vendor(id);
        }
        repo
    }

    pub fn add_vendor(&self, id: &str) {
        self.vendors.borrow_mut().insert(id.to_string(), vendor(id));
    }

    /// Append an edge with the next id.
    pub fn add_edge(&self, from: &str, to: &str, relationship_type: &str, strength: f64) {
        let mut edges = self.edges.borrow_mut();
        let id = edges.len() as i64 + 1;
        let mut edge = relationship(id, from, to, strength);
        edge.relationship_type = relationship_type.to_string();
        edges.push(edge);
    }

    /// Run `hook` once, the first time outgoing edges of `vendor_id` are read.
    pub fn on_outgoing(&self, vendor_id: &str, hook: impl Fn(&MemoryRepository) + 'static) {
        self.hooks
            .borrow_mut()
            .push((vendor_id.to_string(), Box::new(hook)));
    }

    pub fn vendors(&self) -> Vec<Vendor> {
        self.vendors.borrow().values().cloned().collect()
    }

    pub fn edges(&self) -> Vec<VendorRelationship> {
        self.edges.borrow().clone()
    }

    fn fire_hooks(&self, vendor_id: &str) {
        let fired: Vec<OutgoingHook> = {
            let mut hooks = self.hooks.borrow_mut();
            let (fired, kept): (Vec<_>, Vec<_>) =
                hooks.drain(..).partition(|(id, _)| id == vendor_id);
            *hooks = kept;
            fired.into_iter().map(|(_, hook)| hook).collect()
        };
        for hook in fired {
            hook(self);
        }
    }
}

impl VendorRepository for MemoryRepository {
    fn get_vendor(&self, vendor_id: &str) -> Result<Option<Vendor>> {
        Ok(self.vendors.borrow().get(vendor_id).cloned())
    }

    fn outgoing_edges(
        &self,
        vendor_id: &str,
        relationship_types: Option<&[String]>,
        min_strength: f64,
    ) -> Result<Vec<VendorRelationship>> {
        self.fire_hooks(vendor_id);
        Ok(self
            .edges
            .borrow()
            .iter()
            .filter(|e| e.source_vendor_id == vendor_id && e.strength >= min_strength)
            .filter(|e| relationship_types.map_or(true, |types| types.contains(&e.relationship_type)))
            .cloned()
            .collect())
    }

    fn incoming_edges(&self, vendor_id: &str) -> Result<Vec<VendorRelationship>> {
        Ok(self
            .edges
            .borrow()
            .iter()
            .filter(|e| e.target_vendor_id == vendor_id)
            .cloned()
            .collect())
    }

    fn list_vendors(&self) -> Result<Vec<Vendor>> {
        Ok(self.vendors())
    }
}

/// A→B (0.9, supplier), B→C (0.8, subcontractor), C→D (0.7, supplier).
pub fn chain_repository() -> MemoryRepository {
    let repo = MemoryRepository::with_vendors(["A", "B", "C", "D"]);
    repo.add_edge("A", "B", "supplier", 0.9);
    repo.add_edge("B", "C", "subcontractor", 0.8);
    repo.add_edge("C", "D", "supplier", 0.7);
    repo
}

/// Deterministic xorshift generator for reproducible graphs.
struct XorShift(u64);

impl XorShift {
    fn next(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }

    fn below(&mut self, n: usize) -> usize {
        (self.next() % n as u64) as usize
    }
}

const RANDOM_TYPES: [&str; 3] = ["supplier", "partner", "subcontractor"];

/// Random directed graph with `vendors` nodes and up to `edges` distinct
/// (source, target, type) edges. Self-loops are allowed; strengths are
/// multiples of 0.05.
pub fn random_graph(seed: u64, vendors: usize, edges: usize) -> (MemoryRepository, Vec<String>) {
    let mut rng = XorShift(seed.wrapping_mul(0x9E37_79B9_7F4A_7C15) | 1);
    let ids: Vec<String> = (0..vendors).map(|i| format!("V{:02}", i)).collect();
    let repo = MemoryRepository::with_vendors(ids.iter().map(String::as_str));
    let mut seen = HashSet::new();
    for _ in 0..edges {
        let from = rng.below(vendors);
        let to = rng.below(vendors);
        let kind = RANDOM_TYPES[rng.below(RANDOM_TYPES.len())];
        if !seen.insert((from, to, kind)) {
            continue;
        }
        let strength = (1 + rng.below(20)) as f64 * 0.05;
        repo.add_edge(&ids[from], &ids[to], kind, strength);
    }
    (repo, ids)
}

/// Copy vendors and edges into a SQLite connection. Edges must be given in
/// id order starting at 1 so the store assigns the same ids.
pub fn populate_rows(conn: &Connection, vendors: &[Vendor], edges: &[VendorRelationship]) {
    for v in vendors {
        upsert_vendor(conn, v).unwrap();
    }
    for e in edges {
        let mut rel = NewRelationship::new(
            &e.source_vendor_id,
            &e.target_vendor_id,
            &e.relationship_type,
            e.strength,
        );
        rel.verified = e.verified;
        rel.created_at = Some(e.created_at);
        let id = upsert_relationship(conn, &rel).unwrap();
        assert_eq!(id, e.id);
    }
}

/// Migrated in-memory SQLite holding the A→B→C→D chain.
pub fn migrated_connection_with_chain() -> Connection {
    let mut conn = Connection::open_in_memory().unwrap();
    migrate::run_migrations(&mut conn).unwrap();
    let repo = chain_repository();
    populate_rows(&conn, &repo.vendors(), &repo.edges());
    conn
}

/// On-disk migrated database holding `repo`'s contents.
pub async fn temp_db(repo: &MemoryRepository) -> (Db, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db = Db::open_migrated(temp_dir.path().join("vendors.db")).await.unwrap();
    let vendors = repo.vendors();
    let edges = repo.edges();
    db.with_connection(move |conn| {
        populate_rows(conn, &vendors, &edges);
        Ok(())
    })
    .await
    .unwrap();
    (db, temp_dir)
}
