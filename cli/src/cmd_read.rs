//! `show` and `download` commands.

use std::io;
use std::path::Path;

use anyhow::{bail, Context, Result};
use futures::StreamExt;
use qset_core::{CsvSink, QsetClient, Query, ReadEvent, ReadSink, Transport};

/// Query selection shared by the read commands.
#[derive(clap::Args, Debug)]
pub struct QueryArgs {
    /// Start of the window (inclusive), e.g. 2020-01-01 or 2020-01-01T09:30:00
    #[arg(long, conflicts_with = "query")]
    pub start: Option<String>,
    /// End of the window (exclusive)
    #[arg(long, conflicts_with = "query")]
    pub end: Option<String>,
    /// Restrict to these tickers (comma separated)
    #[arg(long, value_delimiter = ',', conflicts_with = "query")]
    pub tickers: Vec<String>,
    /// Return only these columns, in this order (comma separated)
    #[arg(long, value_delimiter = ',', conflicts_with = "query")]
    pub columns: Vec<String>,
    /// Full query as JSON: '{"start": "...", "end": "...", "tickers": [...]}'
    #[arg(long)]
    pub query: Option<String>,
}

impl QueryArgs {
    pub fn to_query(&self) -> Result<Query> {
        if let Some(doc) = &self.query {
            return Query::from_json(doc).context("parsing --query");
        }
        let (Some(start), Some(end)) = (&self.start, &self.end) else {
            bail!("either --query or both --start and --end are required");
        };
        let mut query = Query::parse(start, end)?;
        if !self.tickers.is_empty() {
            query = query.with_tickers(self.tickers.iter().cloned());
        }
        if !self.columns.is_empty() {
            query = query.with_columns(self.columns.iter().cloned());
        }
        Ok(query)
    }
}

/// Print the first `limit` rows as CSV on stdout. Stops fetching once the
/// limit is reached.
pub async fn show<T: Transport>(
    client: &QsetClient<T>,
    dataset: &str,
    args: &QueryArgs,
    limit: Option<usize>,
) -> Result<()> {
    let query = args.to_query()?;
    let mut sink = CsvSink::new(io::stdout().lock());
    let mut remaining = limit.unwrap_or(usize::MAX);

    let stream = client.iter_dataset(dataset, query);
    futures::pin_mut!(stream);
    while let Some(event) = stream.next().await {
        let event = event.with_context(|| format!("reading '{dataset}'"))?;
        match event {
            ReadEvent::Values(mut rows) => {
                rows.truncate(remaining);
                remaining -= rows.len();
                sink.on_event(ReadEvent::Values(rows))?;
            }
            columns => sink.on_event(columns)?,
        }
        if remaining == 0 {
            tracing::debug!(dataset, ?limit, "row limit reached, stopping read");
            break;
        }
    }
    sink.finish()?;
    Ok(())
}

pub async fn download<T: Transport>(
    client: &QsetClient<T>,
    dataset: &str,
    output: &Path,
    args: &QueryArgs,
) -> Result<()> {
    let query = args.to_query()?;
    let rows = client
        .download_dataset(dataset, output, query)
        .await
        .with_context(|| format!("downloading '{dataset}' to {}", output.display()))?;
    tracing::info!(dataset, rows, path = %output.display(), "download complete");
    eprintln!("wrote {rows} rows to {}", output.display());
    Ok(())
}
