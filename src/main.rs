use anyhow::Result;
use vendorgraph::backend::sync_graph_store;
use vendorgraph::db::{migrate, Db};
use vendorgraph::error::VendorGraphError;
use vendorgraph::Config;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;
    env_logger::Builder::from_env(config.log_env()).init();

    let args: Vec<String> = std::env::args().collect();
    let command = args.get(1).map(|s| s.as_str()).unwrap_or("verify");

    match command {
        "sync" => run_sync(&config).await?,
        "verify" => run_schema_verification(&config).await?,
        other => anyhow::bail!("Unknown command: {}\nUsage: vendorgraph [verify|sync]", other),
    }

    Ok(())
}

/// Export the relational store into the graph snapshot
async fn run_sync(config: &Config) -> Result<()> {
    let db = Db::open_migrated(config.db_path()).await?;
    log::info!("Database initialized: {}", config.db_path().display());

    if !config.graph_store.enabled {
        log::warn!("graph_store.enabled = false; writing the snapshot anyway");
    }
    let report = sync_graph_store(&db, config.snapshot_path()).await?;
    println!(
        "Synced {} vendors and {} relationships to {}",
        report.vendors,
        report.relationships,
        config.snapshot_path().display()
    );
    Ok(())
}

/// Run database schema verification
async fn run_schema_verification(config: &Config) -> Result<()> {
    log::info!("Starting vendorgraph v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Configuration loaded successfully");
    log::info!("Database path: {}", config.db_path().display());
    log::info!(
        "Graph store: {} ({})",
        if config.graph_store.enabled { "enabled" } else { "disabled" },
        config.snapshot_path().display()
    );

    let db = Db::open_migrated(config.db_path()).await?;
    log::info!("Database initialized successfully");

    verify_database_schema(&db).await?;

    if config.graph_store.enabled && !config.snapshot_path().exists() {
        log::warn!(
            "No graph snapshot at {}; run `vendorgraph sync` to enable the native backend",
            config.snapshot_path().display()
        );
    }

    Ok(())
}

/// Verify that all expected database objects exist
async fn verify_database_schema(db: &Db) -> Result<()> {
    db.with_connection(|conn| {
        let mut stmt = conn.prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")?;
        let tables: Vec<String> = stmt.query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;

        for table in ["schema_migrations", "vendor_relationships", "vendors"] {
            if !tables.iter().any(|t| t == table) {
                return Err(VendorGraphError::Config(format!("Missing table: {}", table)));
            }
            log::debug!("✓ Table exists: {}", table);
        }

        let applied = migrate::get_applied_migrations(conn)?;
        if applied.len() < migrate::known_migrations() {
            return Err(VendorGraphError::Config(format!(
                "Expected {} migrations, found {}",
                migrate::known_migrations(),
                applied.len()
            )));
        }
        log::debug!("✓ {} migrations applied", applied.len());

        let mut stmt = conn.prepare("SELECT name FROM sqlite_master WHERE type='index' AND name LIKE 'idx_%' ORDER BY name")?;
        let indexes: Vec<String> = stmt.query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;

        for index_name in ["idx_relationships_source_strength", "idx_relationships_target"] {
            if indexes.iter().any(|i| i == index_name) {
                log::debug!("✓ Adjacency index exists: {}", index_name);
            } else {
                log::warn!("Adjacency index not found: {}", index_name);
            }
        }

        let journal_mode: String = conn.query_row("PRAGMA journal_mode", [], |row| row.get(0))?;
        if journal_mode.to_uppercase() != "WAL" {
            return Err(VendorGraphError::Config(format!("Journal mode is not WAL: {}", journal_mode)));
        }
        log::debug!("✓ Journal mode: WAL");

        let foreign_keys: i32 = conn.query_row("PRAGMA foreign_keys", [], |row| row.get(0))?;
        if foreign_keys != 1 {
            return Err(VendorGraphError::Config("Foreign keys not enabled".to_string()));
        }
        log::debug!("✓ Foreign keys enabled");

        let integrity: String = conn.query_row("PRAGMA integrity_check", [], |row| row.get(0))?;
        if integrity != "ok" {
            return Err(VendorGraphError::Config(format!("Database integrity check failed: {}", integrity)));
        }
        log::info!("✓ Database integrity: OK");

        let vendors: i64 = conn.query_row("SELECT COUNT(*) FROM vendors", [], |row| row.get(0))?;
        let relationships: i64 =
            conn.query_row("SELECT COUNT(*) FROM vendor_relationships", [], |row| row.get(0))?;
        log::info!("{} vendors, {} relationships", vendors, relationships);

        Ok(())
    }).await?;

    log::info!("✓ Database schema verification complete");
    Ok(())
}
