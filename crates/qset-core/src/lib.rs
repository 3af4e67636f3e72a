//! qset-core — chunked retrieval of time-series datasets from the qset service.
//!
//! # Overview
//!
//! A dataset query names a time window that is usually far larger than the
//! service accepts in one request. This crate splits the window into
//! request-sized pieces, fetches them one after another with bounded retry and
//! hands the decoded rows out as a lazy stream.
//!
//! - [`Transport`] — one GET against the service, no retries
//! - [`RetryingFetcher`] — bounded exponential backoff plus response decoding
//! - [`range`] module — calendar-month or fixed-width splitting
//! - [`ChunkedDatasetReader`] — describe, clamp, emit columns, iterate chunks
//! - [`QsetClient`] — one method per service operation, plus table and CSV reads
//! - [`MemoryTransport`] — scripted transport for tests and offline use

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod memory;
pub mod policy;
pub mod progress;
pub mod range;
pub mod reader;
pub mod sink;
pub mod timestamp;
pub mod transport;
pub mod types;

pub use client::{ProgressFactory, QsetClient};
pub use config::ClientConfig;
pub use error::{DecodeCause, QsetError, Result, TransportError};
pub use fetcher::RetryingFetcher;
pub use memory::{MemoryTransport, RecordedCall};
pub use policy::{RetryConfig, RetryPolicy};
pub use progress::{NoProgress, Progress};
pub use range::{count, split, MaxRequestRange, SubRange, SubRanges};
pub use reader::ChunkedDatasetReader;
pub use sink::{drain, CsvSink, ReadSink, TableSink};
pub use transport::{Params, Transport};
pub use types::{AssetRange, Chunk, ColumnSpec, DatasetOverview, DatasetTable, Query, ReadEvent, Row};

pub use qset_codec::{ExactDecimal, Value};
