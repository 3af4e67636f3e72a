//! `datasets`, `overview` and `range` commands.

use anyhow::{Context, Result};
use qset_core::{QsetClient, Transport};
use serde_json::json;

pub async fn datasets<T: Transport>(client: &QsetClient<T>) -> Result<()> {
    let datasets = client
        .available_datasets()
        .await
        .context("listing available datasets")?;
    println!("{}", serde_json::to_string_pretty(&datasets)?);
    Ok(())
}

pub async fn overview<T: Transport>(client: &QsetClient<T>, dataset: &str) -> Result<()> {
    let overview = client
        .dataset_overview(dataset)
        .await
        .with_context(|| format!("describing dataset '{dataset}'"))?;
    println!("{}", serde_json::to_string_pretty(&overview)?);
    Ok(())
}

pub async fn range<T: Transport>(client: &QsetClient<T>, dataset: &str, tickers: &[String]) -> Result<()> {
    let tickers = (!tickers.is_empty()).then_some(tickers);
    let range = client
        .asset_dataset_range(dataset, tickers)
        .await
        .with_context(|| format!("fetching available range of '{dataset}'"))?;
    println!(
        "{}",
        serde_json::to_string_pretty(&json!({
            "dataset": dataset,
            "range": range,
        }))?
    );
    Ok(())
}
