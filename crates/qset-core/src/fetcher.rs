//! One logical request with bounded retry, plus response decoding.

use bytes::Bytes;
use qset_codec::Value;
use serde::de::DeserializeOwned;

use crate::error::{DecodeCause, QsetError, Result, TransportError};
use crate::policy::{RetryConfig, RetryPolicy};
use crate::transport::{Params, Transport};

/// Wraps a [`Transport`] with the retry policy and the two response decoders.
pub struct RetryingFetcher<T> {
    transport: T,
    retry: RetryPolicy,
}

impl<T: Transport> RetryingFetcher<T> {
    pub fn new(transport: T, retry: RetryConfig) -> Self {
        Self {
            transport,
            retry: RetryPolicy::new(retry),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// GET `path`, retrying transient failures with exponential backoff.
    ///
    /// Refused requests (non-retryable statuses) return
    /// [`QsetError::Rejected`] immediately; an exhausted budget returns
    /// [`QsetError::Transport`] with the last failure.
    pub async fn fetch(&self, path: &str, params: &Params) -> Result<Bytes> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            tracing::debug!(path, attempt, params = ?params.as_slice(), "API call");

            match self.transport.get(path, params).await {
                Ok(body) => return Ok(body),
                Err(e) if e.is_retryable() => match self.retry.next_delay(attempt) {
                    Some(delay) => {
                        tracing::warn!(
                            path,
                            attempt,
                            delay_ms = delay.as_millis() as u64,
                            error = %e,
                            "retrying request"
                        );
                        tokio::time::sleep(delay).await;
                    }
                    None => {
                        tracing::error!(path, attempt, error = %e, "max attempts exceeded");
                        return Err(QsetError::Transport {
                            path: path.to_string(),
                            attempts: attempt,
                            source: e,
                        });
                    }
                },
                Err(e) => {
                    if e.is_unauthorized() {
                        tracing::error!(path, error = %e, "credentials rejected");
                    }
                    return Err(match e {
                        TransportError::Status { status, body } => QsetError::Rejected {
                            path: path.to_string(),
                            status,
                            body,
                        },
                        other => QsetError::Transport {
                            path: path.to_string(),
                            attempts: attempt,
                            source: other,
                        },
                    });
                }
            }
        }
    }

    /// Fetch and run `decode` over the body. A decoder failure becomes
    /// [`QsetError::Decode`] carrying the raw payload; it is never retried.
    pub async fn fetch_with<R, F>(&self, path: &str, params: &Params, decode: F) -> Result<R>
    where
        F: FnOnce(&[u8]) -> std::result::Result<R, DecodeCause>,
    {
        let body = self.fetch(path, params).await?;
        decode(&body).map_err(|cause| decode_failure(path, cause, body))
    }

    /// Fetch and decode a JSON metadata response.
    pub async fn fetch_json<R: DeserializeOwned>(&self, path: &str, params: &Params) -> Result<R> {
        self.fetch_with(path, params, |body| {
            serde_json::from_slice(body).map_err(DecodeCause::from)
        })
        .await
    }

    /// Fetch and decode a binary envelope response.
    pub async fn fetch_envelope(&self, path: &str, params: &Params) -> Result<Value> {
        self.fetch_with(path, params, |body| {
            qset_codec::decode(body).map_err(DecodeCause::from)
        })
        .await
    }
}

fn decode_failure(path: &str, cause: DecodeCause, payload: Bytes) -> QsetError {
    tracing::error!(path, error = %cause, bytes = payload.len(), "failed to decode message");
    QsetError::Decode {
        path: path.to_string(),
        cause,
        payload,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryTransport;
    use qset_codec::{CodecError, Map};
    use std::sync::Arc;

    fn fetcher(t: &Arc<MemoryTransport>, attempts: u32) -> RetryingFetcher<Arc<MemoryTransport>> {
        RetryingFetcher::new(Arc::clone(t), RetryConfig::immediate(attempts))
    }

    #[tokio::test]
    async fn retry_then_succeed() {
        let t = Arc::new(MemoryTransport::new());
        t.enqueue("/x", Err(TransportError::Http("reset".into())));
        t.enqueue("/x", Err(TransportError::Status { status: 503, body: "busy".into() }));
        t.enqueue("/x", Ok(Bytes::from_static(b"ok")));

        let body = fetcher(&t, 5).fetch("/x", &Params::new()).await.unwrap();
        assert_eq!(&body[..], b"ok");
        assert_eq!(t.call_count("/x"), 3);
    }

    #[tokio::test]
    async fn exhausted_budget_surfaces_last_failure() {
        let t = Arc::new(MemoryTransport::new());
        t.route("/x", |_| Err(TransportError::Timeout { ms: 10 }));

        let err = fetcher(&t, 4).fetch("/x", &Params::new()).await.unwrap_err();
        match err {
            QsetError::Transport { attempts, source, .. } => {
                assert_eq!(attempts, 4);
                assert!(matches!(source, TransportError::Timeout { ms: 10 }));
            }
            other => panic!("expected transport error, got {other:?}"),
        }
        assert_eq!(t.call_count("/x"), 4);
    }

    #[tokio::test]
    async fn rejection_short_circuits() {
        let t = Arc::new(MemoryTransport::new());
        t.route("/x", |_| {
            Err(TransportError::Status {
                status: 401,
                body: "bad key".into(),
            })
        });

        let err = fetcher(&t, 10).fetch("/x", &Params::new()).await.unwrap_err();
        assert!(matches!(err, QsetError::Rejected { status: 401, .. }));
        assert_eq!(t.call_count("/x"), 1);
    }

    #[tokio::test]
    async fn json_decode_failure_keeps_payload() {
        let t = Arc::new(MemoryTransport::new());
        t.route("/meta", |_| Ok(Bytes::from_static(b"<html>oops</html>")));

        let err = fetcher(&t, 3)
            .fetch_json::<serde_json::Value>("/meta", &Params::new())
            .await
            .unwrap_err();
        match err {
            QsetError::Decode { payload, path, cause } => {
                assert!(matches!(cause, DecodeCause::Json(_)));
                assert_eq!(path, "/meta");
                assert_eq!(&payload[..], b"<html>oops</html>");
            }
            other => panic!("expected decode error, got {other:?}"),
        }
        // decode failures are not retried
        assert_eq!(t.call_count("/meta"), 1);
    }

    #[tokio::test]
    async fn envelope_decoding() {
        let t = Arc::new(MemoryTransport::new());
        let mut m = Map::new();
        m.insert("total".into(), Value::from(0i64));
        let bytes = qset_codec::encode(&Value::Map(m.clone())).unwrap();
        t.route("/bulk", move |_| Ok(Bytes::from(bytes.clone())));
        t.enqueue("/bulk", Ok(Bytes::from_static(&[0xd4, 0x63, 0x00])));

        let err = fetcher(&t, 3).fetch_envelope("/bulk", &Params::new()).await.unwrap_err();
        match err {
            QsetError::Decode { cause, payload, .. } => {
                assert!(matches!(cause, DecodeCause::Codec(CodecError::UnknownExtension { tag: 99 })));
                assert_eq!(payload.len(), 3);
            }
            other => panic!("expected decode error, got {other:?}"),
        }

        let value = fetcher(&t, 3).fetch_envelope("/bulk", &Params::new()).await.unwrap();
        assert_eq!(value, Value::Map(m));
    }
}
