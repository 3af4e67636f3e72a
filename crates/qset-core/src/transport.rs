//! The `Transport` trait — one GET against the service, no retries.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::TransportError;

/// Ordered query parameters. Keys may repeat (`tickers=A&tickers=B`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params(Vec<(String, String)>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.0.push((key.into(), value.into()));
        self
    }

    /// Append one entry per value under the same key.
    pub fn push_all<I, S>(&mut self, key: &str, values: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for v in values {
            self.0.push((key.to_string(), v.into()));
        }
        self
    }

    /// First value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Every value stored under `key`, in insertion order.
    pub fn get_all(&self, key: &str) -> Vec<&str> {
        self.0
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    pub fn as_slice(&self) -> &[(String, String)] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// The async trait every qset transport implements.
///
/// A transport performs exactly one attempt; retrying is the job of
/// [`RetryingFetcher`](crate::fetcher::RetryingFetcher). Implementations
/// attach credentials themselves.
#[async_trait]
pub trait Transport: Send + Sync {
    /// GET `path` (relative to the API root) and return the raw body.
    async fn get(&self, path: &str, params: &Params) -> Result<Bytes, TransportError>;

    /// Return the API root this transport talks to.
    fn base_url(&self) -> &str;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn get(&self, path: &str, params: &Params) -> Result<Bytes, TransportError> {
        (**self).get(path, params).await
    }

    fn base_url(&self) -> &str {
        (**self).base_url()
    }
}
