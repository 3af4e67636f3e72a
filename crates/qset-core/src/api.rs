//! One function per service endpoint.
//!
//! Metadata endpoints answer JSON; `/asset_dataset` answers the binary
//! envelope `{"total": n, "values": [[...], ...]}`.

use chrono::NaiveDateTime;
use qset_codec::Value;

use crate::error::{DecodeCause, Result};
use crate::fetcher::RetryingFetcher;
use crate::timestamp::format_timestamp;
use crate::transport::{Params, Transport};
use crate::types::{AssetRange, Chunk, DatasetOverview};

pub const AVAILABLE_DATASETS: &str = "/available_datasets";
pub const DATASET_OVERVIEW: &str = "/dataset_overview";
pub const ASSET_DATASET_RANGE: &str = "/asset_dataset_range";
pub const ASSET_DATASET: &str = "/asset_dataset";

/// Bulk responses are always requested in the binary envelope format.
pub const BULK_FORMAT: &str = "msgpack";

pub async fn available_datasets<T: Transport>(fetcher: &RetryingFetcher<T>) -> Result<Vec<serde_json::Value>> {
    fetcher.fetch_json(AVAILABLE_DATASETS, &Params::new()).await
}

pub async fn dataset_overview<T: Transport>(
    fetcher: &RetryingFetcher<T>,
    dataset: &str,
) -> Result<DatasetOverview> {
    let mut params = Params::new();
    params.push("dataset", dataset);
    fetcher.fetch_json(DATASET_OVERVIEW, &params).await
}

pub async fn asset_dataset_range<T: Transport>(
    fetcher: &RetryingFetcher<T>,
    dataset: &str,
    tickers: Option<&[String]>,
) -> Result<AssetRange> {
    let mut params = Params::new();
    params.push("dataset", dataset);
    if let Some(tickers) = tickers {
        params.push_all("tickers", tickers);
    }
    fetcher.fetch_json(ASSET_DATASET_RANGE, &params).await
}

/// Fetch one sub-range of an asset dataset.
///
/// With `columns` set, every returned row must have exactly that many cells;
/// a mismatch is a decode failure.
pub async fn asset_dataset<T: Transport>(
    fetcher: &RetryingFetcher<T>,
    dataset: &str,
    start: NaiveDateTime,
    end: NaiveDateTime,
    tickers: Option<&[String]>,
    columns: Option<&[String]>,
) -> Result<Chunk> {
    let mut params = Params::new();
    params.push("dataset", dataset);
    if let Some(tickers) = tickers {
        params.push_all("tickers", tickers);
    }
    params
        .push("start", format_timestamp(&start))
        .push("end", format_timestamp(&end));
    if let Some(columns) = columns {
        params.push_all("columns", columns);
    }
    params.push("format", BULK_FORMAT);

    let width = columns.map(<[String]>::len);
    fetcher
        .fetch_with(ASSET_DATASET, &params, |body| {
            let envelope: Value = qset_codec::decode(body)?;
            let chunk = Chunk::from_envelope(envelope).map_err(DecodeCause::Protocol)?;
            if let Some(width) = width {
                check_row_width(&chunk, width).map_err(DecodeCause::Protocol)?;
            }
            Ok(chunk)
        })
        .await
}

fn check_row_width(chunk: &Chunk, width: usize) -> std::result::Result<(), String> {
    match chunk.values.iter().position(|row| row.len() != width) {
        Some(i) => Err(format!(
            "row {i} has {} values but {width} columns were requested",
            chunk.values[i].len()
        )),
        None => Ok(()),
    }
}
