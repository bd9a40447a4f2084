use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use vendorgraph::config::TraversalConfig;
use vendorgraph::model::{PathQuery, ShortestPathQuery};
use vendorgraph::{BackendSelector, Config, RiskAggregator};

#[derive(Parser, Debug)]
#[command(name = "query")]
#[command(about = "Query the vendor relationship graph and print JSON")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// All paths from a vendor within a hop window
    Paths(PathArgs),
    /// Fewest-hop path between two vendors
    Shortest {
        source: String,
        target: String,
        #[arg(long, default_value_t = 5)]
        max_depth: usize,
    },
    /// Direct connection counts for one vendor
    Stats { vendor_id: String },
    /// Paths up to a depth, grouped by level
    Deep {
        vendor_id: String,
        #[arg(long, default_value_t = 10)]
        max_depth: usize,
    },
    /// Highly connected vendors
    Hotspots {
        /// Defaults to risk.hotspot_min_connections
        #[arg(long)]
        min_connections: Option<usize>,
    },
    /// Distinct vendors exactly N hops away
    Nth {
        vendor_id: String,
        #[arg(long, default_value_t = 3)]
        level: usize,
    },
    /// Paths ordered by risk, highest first
    SupplyChain(PathArgs),
}

#[derive(Args, Debug)]
struct PathArgs {
    vendor_id: String,
    #[arg(long, default_value_t = 1)]
    min_depth: usize,
    #[arg(long, default_value_t = 3)]
    max_depth: usize,
    /// Comma-separated relationship types
    #[arg(long, value_delimiter = ',')]
    types: Vec<String>,
    /// Defaults to traversal.default_min_strength
    #[arg(long)]
    min_strength: Option<f64>,
    /// Defaults to traversal.default_limit
    #[arg(long)]
    limit: Option<usize>,
}

impl PathArgs {
    fn into_query(self, defaults: &TraversalConfig) -> PathQuery {
        let mut query = PathQuery::new(self.vendor_id, self.min_depth, self.max_depth)
            .with_min_strength(self.min_strength.unwrap_or(defaults.default_min_strength))
            .with_limit(self.limit.unwrap_or(defaults.default_limit));
        if !self.types.is_empty() {
            query = query.with_relationship_types(self.types);
        }
        query
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load()?;
    env_logger::Builder::from_env(config.log_env()).init();
    let selector = BackendSelector::from_config(&config).await?;
    let risk = RiskAggregator::new(selector, config.risk.clone());

    match cli.command {
        Command::Paths(args) => {
            let search = risk.selector().find_paths(&args.into_query(&config.traversal)).await?;
            print_json(&search)?;
        }
        Command::Shortest { source, target, max_depth } => {
            let path = risk
                .selector()
                .find_shortest_path(&ShortestPathQuery::new(source, target, max_depth))
                .await?;
            print_json(&path)?;
        }
        Command::Stats { vendor_id } => {
            print_json(&risk.selector().network_stats(&vendor_id).await?)?;
        }
        Command::Deep { vendor_id, max_depth } => {
            print_json(&risk.deep_search(&vendor_id, max_depth).await?)?;
        }
        Command::Hotspots { min_connections } => {
            let min = min_connections.unwrap_or(config.risk.hotspot_min_connections);
            print_json(&risk.hotspots(min).await?)?;
        }
        Command::Nth { vendor_id, level } => {
            print_json(&risk.nth_party_assessment(&vendor_id, level).await?)?;
        }
        Command::SupplyChain(args) => {
            let report = risk
                .supply_chain_analysis(&args.into_query(&config.traversal))
                .await?;
            print_json(&report)?;
        }
    }

    Ok(())
}
