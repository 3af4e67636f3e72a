//! In-memory transport that replays canned responses.
//!
//! Useful for tests and offline demos: register a handler per path, or queue
//! one-shot responses that take priority over the handler. Every call is
//! recorded so tests can assert on what was (or was not) requested.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::TransportError;
use crate::transport::{Params, Transport};

type Handler = Box<dyn Fn(&Params) -> Result<Bytes, TransportError> + Send + Sync>;

/// A request observed by [`MemoryTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub path: String,
    pub params: Params,
}

#[derive(Default)]
pub struct MemoryTransport {
    queued: Mutex<HashMap<String, VecDeque<Result<Bytes, TransportError>>>>,
    handlers: Mutex<HashMap<String, Handler>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a one-shot response for `path`.
    pub fn enqueue(&self, path: &str, response: Result<Bytes, TransportError>) {
        self.queued
            .lock()
            .unwrap()
            .entry(path.to_string())
            .or_default()
            .push_back(response);
    }

    /// Answer every request to `path` (once its queue is empty) with `handler`.
    pub fn route<F>(&self, path: &str, handler: F)
    where
        F: Fn(&Params) -> Result<Bytes, TransportError> + Send + Sync + 'static,
    {
        self.handlers
            .lock()
            .unwrap()
            .insert(path.to_string(), Box::new(handler));
    }

    /// All calls made so far, in order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of calls made to `path`.
    pub fn call_count(&self, path: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.path == path)
            .count()
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn get(&self, path: &str, params: &Params) -> Result<Bytes, TransportError> {
        self.calls.lock().unwrap().push(RecordedCall {
            path: path.to_string(),
            params: params.clone(),
        });

        if let Some(resp) = self
            .queued
            .lock()
            .unwrap()
            .get_mut(path)
            .and_then(VecDeque::pop_front)
        {
            return resp;
        }

        match self.handlers.lock().unwrap().get(path) {
            Some(handler) => handler(params),
            None => Err(TransportError::Status {
                status: 404,
                body: format!("no route for {path}"),
            }),
        }
    }

    fn base_url(&self) -> &str {
        "memory://"
    }
}
