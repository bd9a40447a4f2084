use rusqlite::{params, Connection};
use crate::error::Result;

/// A schema migration compiled into the binary.
struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

/// Ordered by version.
const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "001_vendor_graph",
        sql: include_str!("../../migrations/001_vendor_graph.sql"),
    },
    Migration {
        version: 2,
        name: "002_relationship_indexes",
        sql: include_str!("../../migrations/002_relationship_indexes.sql"),
    },
];

fn ensure_migrations_table(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;
    Ok(())
}

/// Names of applied migrations, oldest first.
pub fn get_applied_migrations(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT name FROM schema_migrations ORDER BY version")?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;
    Ok(names)
}

/// Number of migrations this build knows about.
pub fn known_migrations() -> usize {
    MIGRATIONS.len()
}

/// Apply every pending migration, each in its own transaction.
pub fn run_migrations(conn: &mut Connection) -> Result<()> {
    ensure_migrations_table(conn)?;
    let applied = get_applied_migrations(conn)?;

    for migration in MIGRATIONS {
        if applied.iter().any(|name| name == migration.name) {
            log::debug!("Migration {} already applied, skipping", migration.name);
            continue;
        }

        log::info!("Applying migration: {} (version {})", migration.name, migration.version);
        let tx = conn.transaction()?;
        tx.execute_batch(migration.sql)?;
        tx.execute(
            "INSERT INTO schema_migrations (version, name) VALUES (?1, ?2)",
            params![migration.version, migration.name],
        )?;
        tx.commit()?;
    }

    log::debug!("Schema up to date ({} migrations)", MIGRATIONS.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_apply_once() {
        let mut conn = Connection::open_in_memory().unwrap();
        run_migrations(&mut conn).unwrap();
        run_migrations(&mut conn).unwrap();

        let applied = get_applied_migrations(&conn).unwrap();
        assert_eq!(applied, vec!["001_vendor_graph", "002_relationship_indexes"]);
        assert_eq!(applied.len(), known_migrations());
    }

    #[test]
    fn test_strength_check_constraint() {
        let mut conn = Connection::open_in_memory().unwrap();
        run_migrations(&mut conn).unwrap();
        conn.execute_batch(
            "INSERT INTO vendors (vendor_id, vendor_name) VALUES ('A', 'Acme'), ('B', 'Beta');",
        )
        .unwrap();

        let result = conn.execute(
            "INSERT INTO vendor_relationships
                (source_vendor_id, target_vendor_id, relationship_type, strength, created_at)
             VALUES ('A', 'B', 'supplier', 1.5, '2024-01-01T00:00:00Z')",
            [],
        );
        assert!(result.is_err());
    }
}
