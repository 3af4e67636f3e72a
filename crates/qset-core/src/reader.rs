//! Chunked dataset reader.
//!
//! A read walks through four phases:
//!
//! 1. describe the dataset (`/dataset_overview`) and reject non-asset kinds,
//! 2. clamp the query to the available window (`/asset_dataset_range`),
//! 3. emit the column list exactly once,
//! 4. fetch every sub-range in order, handing out non-empty chunks.
//!
//! Nothing is requested until the first event is pulled, and sub-range
//! `k + 1` is only fetched after the event for sub-range `k` was consumed.
//! The first error ends the read.

use futures::Stream;

use crate::api;
use crate::error::{QsetError, Result};
use crate::fetcher::RetryingFetcher;
use crate::progress::{NoProgress, Progress};
use crate::range::{split, SubRanges};
use crate::transport::Transport;
use crate::types::{Query, ReadEvent};

enum State {
    Describe,
    Chunks {
        ranges: SubRanges,
        columns: Vec<String>,
    },
    Done,
}

/// Pull-based reader over one dataset query.
pub struct ChunkedDatasetReader<'a, T> {
    fetcher: &'a RetryingFetcher<T>,
    dataset: String,
    query: Query,
    progress: Box<dyn Progress + 'a>,
    state: State,
    rows: u64,
}

impl<'a, T: Transport> ChunkedDatasetReader<'a, T> {
    pub fn new(fetcher: &'a RetryingFetcher<T>, dataset: impl Into<String>, query: Query) -> Self {
        Self {
            fetcher,
            dataset: dataset.into(),
            query,
            progress: Box::new(NoProgress),
            state: State::Describe,
            rows: 0,
        }
    }

    pub fn with_progress(mut self, progress: Box<dyn Progress + 'a>) -> Self {
        self.progress = progress;
        self
    }

    pub fn dataset(&self) -> &str {
        &self.dataset
    }

    /// Rows handed out so far.
    pub fn rows_read(&self) -> u64 {
        self.rows
    }

    /// Advance the read by one event. Returns `None` once the read is over.
    pub async fn next_event(&mut self) -> Option<Result<ReadEvent>> {
        let outcome = match std::mem::replace(&mut self.state, State::Done) {
            State::Describe => self.describe().await.map(Some),
            State::Chunks { mut ranges, columns } => {
                let next = self.next_chunk(&mut ranges, &columns).await;
                if let Ok(Some(_)) = next {
                    self.state = State::Chunks { ranges, columns };
                }
                next
            }
            State::Done => return None,
        };

        match outcome {
            Ok(Some(event)) => Some(Ok(event)),
            Ok(None) => {
                self.progress.finish();
                tracing::info!(dataset = %self.dataset, rows = self.rows, "read complete");
                None
            }
            Err(e) => {
                self.progress.finish();
                tracing::error!(dataset = %self.dataset, error = %e, "read failed");
                Some(Err(e))
            }
        }
    }

    /// Turn the reader into a lazy stream of events.
    pub fn into_stream(self) -> impl Stream<Item = Result<ReadEvent>> + 'a
    where
        T: 'a,
    {
        futures::stream::unfold(self, |mut reader| async move {
            reader.next_event().await.map(|event| (event, reader))
        })
    }

    async fn describe(&mut self) -> Result<ReadEvent> {
        let overview = api::dataset_overview(self.fetcher, &self.dataset).await?;
        if !overview.is_asset() {
            return Err(QsetError::UnsupportedDatasetKind {
                dataset: self.dataset.clone(),
                kind: overview.kind,
            });
        }
        let width = overview.request_width()?;
        let columns = self.query.resolve_columns(&overview);

        let available =
            api::asset_dataset_range(self.fetcher, &self.dataset, self.query.tickers.as_deref()).await?;
        let (start, end) = available.clamp(self.query.start, self.query.end);

        let ranges = split(start, end, &width);
        tracing::info!(
            dataset = %self.dataset,
            %start,
            %end,
            width = %width,
            chunks = ranges.len(),
            "starting chunked read"
        );
        self.progress.start(&self.dataset, ranges.len());

        self.state = State::Chunks {
            ranges,
            columns: columns.clone(),
        };
        Ok(ReadEvent::Columns(columns))
    }

    async fn next_chunk(&mut self, ranges: &mut SubRanges, columns: &[String]) -> Result<Option<ReadEvent>> {
        for sub in ranges.by_ref() {
            tracing::debug!(dataset = %self.dataset, start = %sub.start, end = %sub.end, "fetching chunk");
            let chunk = api::asset_dataset(
                self.fetcher,
                &self.dataset,
                sub.start,
                sub.end,
                self.query.tickers.as_deref(),
                Some(columns),
            )
            .await?;
            self.progress.advance(&sub);

            if chunk.is_empty() {
                tracing::debug!(dataset = %self.dataset, range = %sub, "empty chunk skipped");
                continue;
            }
            self.rows += chunk.values.len() as u64;
            return Ok(Some(ReadEvent::Values(chunk.values)));
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryTransport;
    use crate::policy::RetryConfig;
    use bytes::Bytes;
    use futures::StreamExt;
    use std::sync::Arc;

    fn fetcher(t: &Arc<MemoryTransport>) -> RetryingFetcher<Arc<MemoryTransport>> {
        RetryingFetcher::new(Arc::clone(t), RetryConfig::immediate(2))
    }

    #[tokio::test]
    async fn nothing_is_requested_until_polled() {
        let t = Arc::new(MemoryTransport::new());
        let f = fetcher(&t);
        let query = Query::parse("2020-01-01", "2020-02-01").unwrap();
        let stream = ChunkedDatasetReader::new(&f, "prices", query).into_stream();
        assert!(t.calls().is_empty());
        drop(stream);
        assert!(t.calls().is_empty());
    }

    #[tokio::test]
    async fn non_asset_dataset_is_rejected() {
        let t = Arc::new(MemoryTransport::new());
        t.route(api::DATASET_OVERVIEW, |_| {
            Ok(Bytes::from_static(
                br#"{"type": "field", "columns": [], "max_request_range": "1d"}"#,
            ))
        });
        let f = fetcher(&t);
        let query = Query::parse("2020-01-01", "2020-02-01").unwrap();
        let events: Vec<_> = ChunkedDatasetReader::new(&f, "weather", query)
            .into_stream()
            .collect()
            .await;

        assert_eq!(events.len(), 1);
        match &events[0] {
            Err(QsetError::UnsupportedDatasetKind { dataset, kind }) => {
                assert_eq!(dataset, "weather");
                assert_eq!(kind, "field");
            }
            other => panic!("expected unsupported kind, got {other:?}"),
        }
        assert_eq!(t.call_count(api::ASSET_DATASET_RANGE), 0);
    }

    #[tokio::test]
    async fn empty_window_emits_columns_only() {
        let t = Arc::new(MemoryTransport::new());
        t.route(api::DATASET_OVERVIEW, |_| {
            Ok(Bytes::from_static(
                br#"{"type": "asset", "columns": [["ticker", "str"]], "max_request_range": "31d"}"#,
            ))
        });
        t.route(api::ASSET_DATASET_RANGE, |_| {
            Ok(Bytes::from_static(
                br#"{"minStartRange": "2022-01-01", "maxStartRange": "2023-01-01"}"#,
            ))
        });
        let f = fetcher(&t);
        let query = Query::parse("2020-01-01", "2020-02-01").unwrap();
        let mut reader = ChunkedDatasetReader::new(&f, "prices", query);

        let first = reader.next_event().await.unwrap().unwrap();
        assert_eq!(first, ReadEvent::Columns(vec!["ticker".into()]));
        assert!(reader.next_event().await.is_none());
        assert!(reader.next_event().await.is_none());
        assert_eq!(t.call_count(api::ASSET_DATASET), 0);
    }
}
