// src/bin/isin_cli.rs
use anyhow::Context;
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use isin_enrich::config::{DatabaseConfig, FigiConfig};
use isin_enrich::error::IsinError;
use isin_enrich::exchange::{self, ExchangeMapping};
use isin_enrich::figi::FigiClient;
use isin_enrich::output::DEFAULT_FIGI_OUTPUT;
use isin_enrich::pipeline::{self, DEFAULT_IDENTIFIERS};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "isin-cli")]
#[command(about = "ISIN lookup, exchange-code enrichment and OpenFIGI mapping", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Look up ISINs in the identifier table
    Fetch {
        /// Identifiers to search for; defaults to the built-in list
        ids: Vec<String>,
        /// JSON file mapping ExchangeId to exchange code
        #[arg(short, long)]
        exchange_map: Option<PathBuf>,
    },
    /// Map the built-in ISIN table through OpenFIGI and save it as xlsx
    Figi {
        #[arg(short, long, default_value = DEFAULT_FIGI_OUTPUT)]
        output: PathBuf,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Fetch {
        ids: Vec::new(),
        exchange_map: None,
    });

    match command {
        Commands::Fetch { ids, exchange_map } => {
            if let Err(e) = run_fetch(ids, exchange_map).await {
                if e.is_connection_error() {
                    log::error!("Error connecting to database: {}", e);
                } else {
                    log::error!("❌ {}", e);
                }
                std::process::exit(1);
            }
        }
        Commands::Figi { output } => {
            if let Err(e) = run_figi(output).await {
                log::error!("❌ {}", e);
                std::process::exit(1);
            }
        }
    }
}

async fn run_fetch(ids: Vec<String>, exchange_map: Option<PathBuf>) -> Result<(), IsinError> {
    let ids = if ids.is_empty() {
        DEFAULT_IDENTIFIERS.iter().map(|s| s.to_string()).collect()
    } else {
        ids
    };

    let mapping = match exchange_map {
        Some(path) => Some(load_exchange_map(&path)?),
        None => None,
    };

    let config = DatabaseConfig::from_env()?;
    let outcome = pipeline::pull_identifiers(&config, &ids, mapping.as_ref()).await?;
    println!("{}", outcome.preview());
    Ok(())
}

fn load_exchange_map(path: &Path) -> anyhow::Result<ExchangeMapping> {
    exchange::load_mapping(path)
        .with_context(|| format!("Failed to load exchange map {}", path.display()))
}

async fn run_figi(output: PathBuf) -> Result<(), IsinError> {
    let client = FigiClient::new(FigiConfig::from_env()?);
    let requests = pipeline::default_mapping_requests();

    match pipeline::export_figi(&client, &requests, &output).await? {
        Some((table, path)) => {
            println!("{}", pipeline::figi_preview(&table));
            println!("✅ Saved {} rows to {}", table.len(), path.display());
        }
        None => println!("⚠️  No mapping result from {}; nothing written", client.endpoint()),
    }
    Ok(())
}
