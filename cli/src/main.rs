//! qset CLI — command-line access to the qset time-series service.
//!
//! # Commands
//! ```text
//! qset datasets
//! qset overview <dataset>
//! qset range    <dataset> [--tickers A,B]
//! qset show     <dataset> --start <ts> --end <ts> [--tickers ..] [--columns ..] [--limit N]
//! qset download <dataset> --output <file.csv> (--start <ts> --end <ts> | --query <json>)
//! ```

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use qset_core::config::{API_KEY_ENV, API_URL_ENV, DEFAULT_API_URL};
use qset_core::{ClientConfig, Progress};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod cmd_meta;
mod cmd_read;
mod progress;

use cmd_read::QueryArgs;
use progress::BarProgress;

#[derive(Parser)]
#[command(
    name = "qset",
    about = "Read time-series datasets from the qset service",
    long_about = "
Read time-series datasets from the qset service.

ENVIRONMENT VARIABLES:
  QSET_API_KEY   API key sent with every request
  QSET_API_URL   API root (default http://api.qset.ai:8000/v0)
  QSET_LOG       tracing filter, e.g. 'info' or 'qset_core=debug'
",
    version
)]
struct Cli {
    /// API root
    #[arg(long, global = true, env = API_URL_ENV, default_value = DEFAULT_API_URL)]
    api_url: String,

    /// API key
    #[arg(long, global = true, env = API_KEY_ENV, hide_env_values = true)]
    api_key: Option<String>,

    /// Log request details
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Hide the progress bar
    #[arg(long, global = true)]
    no_progress: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the datasets available to this API key
    Datasets,

    /// Show columns, kind and request width of a dataset
    Overview { dataset: String },

    /// Show the time window a dataset has data for
    Range {
        dataset: String,
        /// Restrict to these tickers (comma separated)
        #[arg(long, value_delimiter = ',')]
        tickers: Vec<String>,
    },

    /// Print rows of a dataset as CSV
    Show {
        dataset: String,
        #[command(flatten)]
        query: QueryArgs,
        /// Stop after this many rows
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Write a dataset to a new CSV file
    Download {
        dataset: String,
        /// Destination; must not exist yet
        #[arg(short, long)]
        output: PathBuf,
        #[command(flatten)]
        query: QueryArgs,
    },
}

fn init_tracing(verbose: bool, json: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_env("QSET_LOG").unwrap_or_else(|_| EnvFilter::new(default));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.json_logs);

    let mut config = ClientConfig::default().with_api_url(cli.api_url);
    config.api_key = cli.api_key;

    tracing::debug!(api_url = %config.api_url, "connecting");
    let mut client = qset_http::connect(config)?;
    if !cli.no_progress {
        client = client.with_progress(|_| Box::new(BarProgress::new()) as Box<dyn Progress>);
    }

    match cli.command {
        Commands::Datasets => cmd_meta::datasets(&client).await,
        Commands::Overview { dataset } => cmd_meta::overview(&client, &dataset).await,
        Commands::Range { dataset, tickers } => cmd_meta::range(&client, &dataset, &tickers).await,
        Commands::Show { dataset, query, limit } => cmd_read::show(&client, &dataset, &query, limit).await,
        Commands::Download { dataset, output, query } => {
            cmd_read::download(&client, &dataset, &output, &query).await
        }
    }
}
