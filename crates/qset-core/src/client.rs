//! High-level client for the qset service.

use std::path::Path;
use std::sync::Arc;

use chrono::NaiveDateTime;
use futures::Stream;

use crate::api;
use crate::error::Result;
use crate::fetcher::RetryingFetcher;
use crate::policy::RetryConfig;
use crate::progress::Progress;
use crate::reader::ChunkedDatasetReader;
use crate::sink::{drain, CsvSink, TableSink};
use crate::transport::Transport;
use crate::types::{AssetRange, Chunk, DatasetOverview, DatasetTable, Query, ReadEvent};

/// Builds a progress observer for each chunked read, given the dataset name.
pub type ProgressFactory = Arc<dyn Fn(&str) -> Box<dyn Progress> + Send + Sync>;

/// Client over any [`Transport`].
///
/// ```ignore
/// let client = QsetClient::new(transport, RetryConfig::default());
/// let query = Query::parse("2020-01-01", "2021-01-01")?.with_tickers(["AAPL"]);
/// let table = client.get_dataset("daily_prices", query).await?;
/// ```
pub struct QsetClient<T> {
    fetcher: RetryingFetcher<T>,
    progress: Option<ProgressFactory>,
}

impl<T: Transport> QsetClient<T> {
    pub fn new(transport: T, retry: RetryConfig) -> Self {
        Self {
            fetcher: RetryingFetcher::new(transport, retry),
            progress: None,
        }
    }

    /// Report progress of every chunked read through observers built by `factory`.
    pub fn with_progress<F>(mut self, factory: F) -> Self
    where
        F: Fn(&str) -> Box<dyn Progress> + Send + Sync + 'static,
    {
        self.progress = Some(Arc::new(factory));
        self
    }

    pub fn fetcher(&self) -> &RetryingFetcher<T> {
        &self.fetcher
    }

    pub async fn available_datasets(&self) -> Result<Vec<serde_json::Value>> {
        api::available_datasets(&self.fetcher).await
    }

    pub async fn dataset_overview(&self, dataset: &str) -> Result<DatasetOverview> {
        api::dataset_overview(&self.fetcher, dataset).await
    }

    pub async fn asset_dataset_range(&self, dataset: &str, tickers: Option<&[String]>) -> Result<AssetRange> {
        api::asset_dataset_range(&self.fetcher, dataset, tickers).await
    }

    /// A single bulk request. No splitting or clamping; the window must fit
    /// the dataset's maximum request width.
    pub async fn asset_dataset(
        &self,
        dataset: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
        tickers: Option<&[String]>,
        columns: Option<&[String]>,
    ) -> Result<Chunk> {
        api::asset_dataset(&self.fetcher, dataset, start, end, tickers, columns).await
    }

    /// A chunked reader for `query`, wired to the configured progress observer.
    pub fn reader(&self, dataset: &str, query: Query) -> ChunkedDatasetReader<'_, T> {
        let reader = ChunkedDatasetReader::new(&self.fetcher, dataset, query);
        match &self.progress {
            Some(factory) => reader.with_progress(factory(dataset)),
            None => reader,
        }
    }

    /// Stream the events of a chunked read: the column list, then one
    /// `Values` event per non-empty sub-range.
    pub fn iter_dataset(&self, dataset: &str, query: Query) -> impl Stream<Item = Result<ReadEvent>> + '_ {
        self.reader(dataset, query).into_stream()
    }

    /// Read the whole query into memory.
    pub async fn get_dataset(&self, dataset: &str, query: Query) -> Result<DatasetTable> {
        tracing::debug!(dataset, "getting dataset");
        let mut sink = TableSink::new();
        drain(self.iter_dataset(dataset, query), &mut sink).await?;
        Ok(sink.into_table())
    }

    /// Write the query to a new CSV file at `path`, chunk by chunk. Returns
    /// the number of rows written.
    ///
    /// Fails with [`QsetError::DestinationExists`](crate::QsetError::DestinationExists)
    /// before any request if `path` exists. A read that fails before any row
    /// was written removes the file again; a later failure leaves the rows
    /// written so far on disk.
    pub async fn download_dataset(&self, dataset: &str, path: impl AsRef<Path>, query: Query) -> Result<u64> {
        let path = path.as_ref();
        tracing::debug!(dataset, path = %path.display(), "downloading dataset");
        let mut sink = CsvSink::create(path)?;
        if let Err(e) = drain(self.iter_dataset(dataset, query), &mut sink).await {
            let rows = sink.rows_written();
            drop(sink);
            if rows == 0 {
                if let Err(io) = std::fs::remove_file(path) {
                    tracing::warn!(path = %path.display(), error = %io, "could not remove empty download");
                }
            }
            return Err(e);
        }
        tracing::info!(dataset, path = %path.display(), rows = sink.rows_written(), "download finished");
        Ok(sink.rows_written())
    }
}
