use async_trait::async_trait;

use crate::backend::{BackendKind, GraphBackend};
use crate::db::{Db, SqliteVendorRepository};
use crate::error::{Result, VendorGraphError};
use crate::graph::{
    NetworkStatsCalculator, PathExplorer, ShortestPathFinder, TraversalBudget, VendorRepository,
};
use crate::model::{NetworkStats, PathQuery, RelationshipPath, ShortestPathQuery, Vendor};

/// BFS engines over the SQLite adjacency table.
///
/// Every expansion step is its own SELECT and no transaction spans a
/// traversal, so concurrent CRUD writes can be observed part-way through.
#[derive(Debug, Clone)]
pub struct RelationalBackend {
    db: Db,
}

impl RelationalBackend {
    pub fn new(db: Db) -> Self {
        Self { db }
    }
}

#[async_trait]
impl GraphBackend for RelationalBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Relational
    }

    async fn find_paths(
        &self,
        query: &PathQuery,
        budget: &TraversalBudget,
    ) -> Result<Vec<RelationshipPath>> {
        let query = query.clone();
        let budget = budget.clone();
        self.db
            .with_connection(move |conn| {
                let repo = SqliteVendorRepository::new(conn);
                PathExplorer::new(&repo).find_paths(&query, &budget)
            })
            .await
    }

    async fn find_shortest_path(
        &self,
        query: &ShortestPathQuery,
        budget: &TraversalBudget,
    ) -> Result<Option<RelationshipPath>> {
        let query = query.clone();
        let budget = budget.clone();
        self.db
            .with_connection(move |conn| {
                let repo = SqliteVendorRepository::new(conn);
                ShortestPathFinder::new(&repo).find_shortest_path(&query, &budget)
            })
            .await
    }

    async fn network_stats(&self, vendor_id: &str) -> Result<NetworkStats> {
        let vendor_id = vendor_id.to_string();
        self.db
            .with_connection(move |conn| {
                let repo = SqliteVendorRepository::new(conn);
                NetworkStatsCalculator::new(&repo).network_stats(&vendor_id)
            })
            .await
    }

    async fn all_network_stats(&self) -> Result<Vec<(Vendor, NetworkStats)>> {
        self.db
            .with_connection(|conn| {
                // One read transaction for the whole listing.
                let tx = conn.transaction()?;
                let all = {
                    let repo = SqliteVendorRepository::new(&tx);
                    NetworkStatsCalculator::new(&repo).all_network_stats()?
                };
                tx.commit()?;
                Ok(all)
            })
            .await
    }

    async fn vendor(&self, vendor_id: &str) -> Result<Vendor> {
        let vendor_id = vendor_id.to_string();
        self.db
            .with_connection(move |conn| {
                SqliteVendorRepository::new(conn)
                    .get_vendor(&vendor_id)?
                    .ok_or_else(|| VendorGraphError::NotFound(format!("vendor {}", vendor_id)))
            })
            .await
    }

    async fn list_vendors(&self) -> Result<Vec<Vendor>> {
        self.db
            .with_connection(|conn| SqliteVendorRepository::new(conn).list_vendors())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::writer::{upsert_relationship, NewRelationship};
    use crate::test_support::{chain_repository, temp_db};

    #[tokio::test]
    async fn test_relational_chain_queries() {
        let (db, _temp) = temp_db(&chain_repository()).await;
        let backend = RelationalBackend::new(db);
        let budget = TraversalBudget::unbounded();

        let paths = backend
            .find_paths(&PathQuery::new("A", 1, 3), &budget)
            .await
            .unwrap();
        let lengths: Vec<_> = paths.iter().map(|p| p.path_length).collect();
        assert_eq!(lengths, vec![1, 2, 3]);
        assert!((paths[2].total_strength - 0.504).abs() < 1e-9);

        let shortest = backend
            .find_shortest_path(&ShortestPathQuery::new("A", "D", 3), &budget)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(shortest.path_length, 3);

        let stats = backend.network_stats("C").await.unwrap();
        assert_eq!(stats.total_connections, 2);
        assert_eq!(backend.list_vendors().await.unwrap().len(), 4);
        let all = backend.all_network_stats().await.unwrap();
        assert_eq!(all.len(), 4);
        assert_eq!(all[2].1, stats);
        assert_eq!(backend.vendor("B").await.unwrap().name, "Vendor B");
        assert!(matches!(
            backend.vendor("ghost").await,
            Err(VendorGraphError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_relational_unknown_source() {
        let (db, _temp) = temp_db(&chain_repository()).await;
        let backend = RelationalBackend::new(db);
        let result = backend
            .find_paths(&PathQuery::new("ghost", 1, 3), &TraversalBudget::unbounded())
            .await;
        assert!(matches!(result, Err(VendorGraphError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_relational_reads_live_edges() {
        let (db, _temp) = temp_db(&chain_repository()).await;
        let backend = RelationalBackend::new(db.clone());
        let query = PathQuery::new("A", 1, 1);

        let before = backend.find_paths(&query, &TraversalBudget::unbounded()).await.unwrap();
        db.with_connection(|conn| {
            upsert_relationship(conn, &NewRelationship::new("A", "C", "partner", 0.4))?;
            Ok(())
        })
        .await
        .unwrap();
        let after = backend.find_paths(&query, &TraversalBudget::unbounded()).await.unwrap();

        assert_eq!(before.len(), 1);
        assert_eq!(after.len(), 2);
    }

    #[tokio::test]
    async fn test_missing_database_file_is_an_error() {
        let temp = tempfile::TempDir::new().unwrap();
        // A directory path cannot be opened as a database.
        let backend = RelationalBackend::new(Db::new(temp.path()));
        let result = backend.network_stats("A").await;
        assert!(result.is_err());
    }
}
