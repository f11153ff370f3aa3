use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod aggregate;
mod api;
mod config;
mod error;
mod filter;
mod ingest;
mod models;
mod report;

use api::{ApiClient, NoToken, StaticToken, TokenProvider};
use config::Config;
use filter::{Filter, FilterOptions, Selection};
use models::{AggregationResult, RecordSet};

#[derive(Parser)]
#[command(name = "volunteer-insights")]
#[command(about = "Analytics over volunteer opportunity exports", long_about = None)]
struct Cli {
    #[command(flatten)]
    scope: Scope,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Scope {
    /// CSV export to load; repeat to append several files
    #[arg(long, global = true)]
    csv: Vec<PathBuf>,
    /// Also fetch records from VOLUNTEER_API_URL
    #[arg(long, global = true)]
    api: bool,
    #[arg(long, global = true, default_value = "All")]
    category: Selection,
    #[arg(long, global = true, default_value = "All")]
    borough: Selection,
}

#[derive(Subcommand)]
enum Commands {
    /// Print headline figures
    Summary,
    /// Generate a markdown report
    Report {
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// Write chart data as JSON
    Export {
        #[arg(long, default_value = "aggregates.json")]
        out: PathBuf,
    },
    /// List the categories and boroughs available for filtering
    Options {
        /// Print the lists as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::load();
    let set = load_records(&cli.scope, &config).await?;

    let filter = Filter {
        category: cli.scope.category,
        borough: cli.scope.borough,
    };

    match cli.command {
        Commands::Summary => {
            let result = aggregate_filtered(&filter, &set);
            print!("{}", report::build_summary(&filter, &set.stats, &result));
        }
        Commands::Report { out } => {
            let result = aggregate_filtered(&filter, &set);
            let report = report::build_report(&filter, &result);
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
        Commands::Export { out } => {
            let result = aggregate_filtered(&filter, &set);
            let json = serde_json::to_string_pretty(&result)?;
            std::fs::write(&out, json)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Chart data written to {}.", out.display());
        }
        Commands::Options { json } => {
            let options = FilterOptions::collect(&set.records);
            if json {
                println!("{}", serde_json::to_string_pretty(&options)?);
            } else {
                print!("{}", report::build_options(&options));
            }
        }
    }

    Ok(())
}

fn aggregate_filtered(filter: &Filter, set: &RecordSet) -> AggregationResult {
    let filtered = filter.apply(&set.records);
    if !filter.is_unrestricted() {
        info!(
            kept = filtered.len(),
            total = set.len(),
            category = %filter.category,
            borough = %filter.borough,
            "Applied filter"
        );
    }
    aggregate::aggregate(&filtered, Utc::now().date_naive())
}

async fn load_records(scope: &Scope, config: &Config) -> anyhow::Result<RecordSet> {
    if scope.csv.is_empty() && !scope.api {
        anyhow::bail!("nothing to load: pass --csv <PATH> and/or --api");
    }

    let mut set = RecordSet::default();

    if scope.api {
        let base_url = config
            .api_url
            .clone()
            .context("VOLUNTEER_API_URL must be set to use --api")?;
        let tokens: Arc<dyn TokenProvider> = match &config.api_token {
            Some(token) => Arc::new(StaticToken(token.clone())),
            None => Arc::new(NoToken),
        };
        let client = ApiClient::new(base_url, tokens);
        set.append(client.fetch_opportunities(&config.api_path).await?);
    }

    for path in &scope.csv {
        let loaded = ingest::load_csv(path)
            .with_context(|| format!("failed to import {}", path.display()))?;
        set.append(loaded);
    }

    info!(
        records = set.len(),
        invalid_dates = set.stats.invalid_dates,
        invalid_vol_requests = set.stats.invalid_vol_requests,
        "Records ready"
    );
    Ok(set)
}
