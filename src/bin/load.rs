use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;
use std::path::PathBuf;
use vendorgraph::backend::sync_graph_store;
use vendorgraph::db::writer::{upsert_relationship, upsert_vendor, NewRelationship};
use vendorgraph::db::Db;
use vendorgraph::model::Vendor;
use vendorgraph::Config;

#[derive(Parser, Debug)]
#[command(name = "load")]
#[command(about = "Load vendors and relationships from a JSON fixture into the vendor store")]
struct Args {
    /// Fixture file with `vendors` and `relationships` arrays
    fixture: PathBuf,

    /// Export the graph snapshot after loading
    #[arg(short, long)]
    sync: bool,
}

#[derive(Debug, Deserialize)]
struct Fixture {
    vendors: Vec<Vendor>,
    #[serde(default)]
    relationships: Vec<NewRelationship>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = Config::load()?;
    env_logger::Builder::from_env(config.log_env()).init();

    let raw = std::fs::read_to_string(&args.fixture)
        .with_context(|| format!("Failed to read fixture: {}", args.fixture.display()))?;
    let fixture: Fixture = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse fixture: {}", args.fixture.display()))?;
    log::info!(
        "Loading {} vendors and {} relationships from {}",
        fixture.vendors.len(),
        fixture.relationships.len(),
        args.fixture.display()
    );

    let db = Db::open_migrated(config.db_path()).await?;
    let (vendors, relationships) = db
        .with_connection(move |conn| {
            let tx = conn.transaction()?;
            for vendor in &fixture.vendors {
                upsert_vendor(&tx, vendor)?;
            }
            for rel in &fixture.relationships {
                upsert_relationship(&tx, rel)?;
            }
            tx.commit()?;
            Ok((fixture.vendors.len(), fixture.relationships.len()))
        })
        .await
        .context("Failed to load fixture")?;

    println!("Loaded {} vendors and {} relationships into {}", vendors, relationships, config.db_path().display());

    if args.sync {
        let report = sync_graph_store(&db, config.snapshot_path()).await?;
        println!(
            "Synced {} vendors and {} relationships to {}",
            report.vendors,
            report.relationships,
            config.snapshot_path().display()
        );
    }

    Ok(())
}
