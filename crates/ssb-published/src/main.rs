//! SSB Table Publication Checker - Entry Point
//!
//! Prints `<published> <table id>` for every table, one table's metadata, or
//! a table's data as JSON-stat2 lines.

use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use ssb_published::{
    Config, DataQueryRunner, EmptyPolicy, MetadataFilter, SsbClient, TableFetchLoop,
    config::tables::TABLE_IDS, formatters,
};
#[derive(Parser, Debug)]
#[command(name = "ssb-published")]
#[command(about = "Report when Statistics Norway tables were last published")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Table endpoint (overrides SSB_API_URL)
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Pause after each lookup in milliseconds (overrides SSB_DELAY_MS, default 1000)
    #[arg(long, global = true)]
    delay_ms: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info", env = "RUST_LOG")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
enum Command {
    /// Print the publication timestamp of each table (the default)
    Published {
        /// Tables to check instead of the built-in list
        ids: Vec<u32>,

        /// Skip tables whose lookup comes back empty instead of aborting
        #[arg(long)]
        skip_empty: bool,
    },
    /// Print the variables (dimensions) of one table
    Metadata {
        /// Table to describe
        id: u32,

        /// Also list every value code with its label
        #[arg(long)]
        values: bool,
    },
    /// Download a table as JSON-stat2, one dataset per line
    Data {
        /// Table to download
        id: u32,

        /// Restrict variables to chosen values, e.g. "Region=0301,1103&Tid=2022"
        #[arg(long)]
        filter: Option<MetadataFilter>,

        /// Row limit per query (default 800000)
        #[arg(long)]
        max_rows: Option<usize>,
    },
}

impl Cli {
    /// Subcommand to run; checking the built-in table list when none is given.
    fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Published { ids: Vec::new(), skip_empty: false })
    }
}

/// Apply command-line overrides on top of the environment configuration.
fn build_config(cli: &Cli, mut config: Config) -> anyhow::Result<Config> {
    if let Some(url) = &cli.base_url {
        config = config.with_table_api_url(url)?;
    }
    if let Some(millis) = cli.delay_ms {
        config = config.with_fetch_delay(Duration::from_millis(millis));
    }

    match cli.command() {
        Command::Published { skip_empty: true, .. } => {
            config = config.with_empty_policy(EmptyPolicy::Skip);
        }
        Command::Data { max_rows: Some(rows), .. } => {
            config = config.with_max_query_rows(rows);
        }
        _ => {}
    }

    Ok(config)
}

fn init_tracing(log_level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if json {
        subscriber.with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr)).init();
    } else {
        subscriber
            .with(tracing_subscriber::fmt::layer().compact().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    init_tracing(&cli.log_level, cli.json_logs);

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting ssb-published");

    let config = build_config(&cli, Config::from_env()?)?;
    let fetch = TableFetchLoop::from_config(&config);
    let runner = DataQueryRunner::from_config(&config);
    let client = SsbClient::new(config)?;

    tracing::info!(endpoint = client.table_api_url(), "Using table endpoint");

    match cli.command() {
        Command::Published { ids, .. } => {
            let table_ids = if ids.is_empty() { TABLE_IDS } else { ids.as_slice() };
            fetch.run(&client, table_ids, &mut std::io::stdout().lock()).await?;
        }
        Command::Metadata { id, values } => {
            let meta = client.table_metadata(id).await?;
            print!("{}", formatters::format_metadata(&meta, values));
        }
        Command::Data { id, filter, .. } => {
            runner.run(&client, id, filter.as_ref(), &mut std::io::stdout().lock()).await?;
        }
    }

    Ok(())
}
