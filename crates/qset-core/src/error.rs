//! Error types for the qset client.

use std::path::PathBuf;

use bytes::Bytes;
use qset_codec::CodecError;
use thiserror::Error;

/// A single failed attempt at the transport layer.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// Connection refused, reset, DNS failure and the like.
    #[error("HTTP error: {0}")]
    Http(String),

    /// The request did not complete within the configured timeout.
    #[error("Request timed out after {ms}ms")]
    Timeout { ms: u64 },

    /// The server answered with a non-success status.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },
}

impl TransportError {
    /// Returns `true` if this error is transient and worth retrying.
    ///
    /// Server-side failures (5xx), request timeouts (408) and rate limiting
    /// (429) are transient; every other status means the request itself was
    /// refused.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(_) | Self::Timeout { .. } => true,
            Self::Status { status, .. } => *status >= 500 || matches!(status, 408 | 429),
        }
    }

    /// Returns `true` if the server refused the credentials.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Status { status: 401 | 403, .. })
    }
}

/// Why a response body could not be decoded.
#[derive(Debug, Error)]
pub enum DecodeCause {
    /// The binary envelope itself is malformed or uses an unknown extension.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// A metadata response is not the expected JSON document.
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// The body decoded but does not have the expected shape.
    #[error("{0}")]
    Protocol(String),
}

/// Errors surfaced by the qset client.
#[derive(Debug, Error)]
pub enum QsetError {
    /// No API key configured; raised before any request is sent.
    #[error("API key not set (configure one or export QSET_API_KEY)")]
    MissingCredentials,

    /// Transient transport failures exhausted the retry budget.
    #[error("request to {path} failed after {attempts} attempt(s): {source}")]
    Transport {
        path: String,
        attempts: u32,
        #[source]
        source: TransportError,
    },

    /// The server refused the request; retrying would not help.
    #[error("request to {path} rejected with HTTP {status}: {body}")]
    Rejected {
        path: String,
        status: u16,
        body: String,
    },

    /// A response arrived but could not be decoded. The raw payload is kept
    /// for diagnosis.
    #[error("failed to decode response from {path} ({} bytes): {cause}", .payload.len())]
    Decode {
        path: String,
        #[source]
        cause: DecodeCause,
        payload: Bytes,
    },

    /// The dataset exists but is not an asset dataset.
    #[error("dataset '{dataset}' has kind '{kind}'; only asset datasets are supported")]
    UnsupportedDatasetKind { dataset: String, kind: String },

    /// Output file already exists; nothing was fetched.
    #[error("destination {} already exists", .path.display())]
    DestinationExists { path: PathBuf },

    /// The query or dataset metadata could not be interpreted.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// The client could not be set up from its configuration.
    #[error("invalid client configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl QsetError {
    /// Returns `true` if the failure is caused by the request or local
    /// configuration rather than by service availability.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::MissingCredentials
                | Self::Config(_)
                | Self::Rejected { .. }
                | Self::InvalidQuery(_)
                | Self::UnsupportedDatasetKind { .. }
                | Self::DestinationExists { .. }
        )
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, QsetError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_classification() {
        assert!(TransportError::Http("connection reset".into()).is_retryable());
        assert!(TransportError::Timeout { ms: 30_000 }.is_retryable());
        for status in [500, 502, 503, 408, 429] {
            let e = TransportError::Status { status, body: String::new() };
            assert!(e.is_retryable(), "{status} should be retryable");
        }
        for status in [400, 401, 403, 404, 422] {
            let e = TransportError::Status { status, body: String::new() };
            assert!(!e.is_retryable(), "{status} should not be retryable");
        }
    }

    #[test]
    fn unauthorized_statuses() {
        let e = TransportError::Status { status: 403, body: "Forbidden".into() };
        assert!(e.is_unauthorized());
        assert!(!TransportError::Http("x".into()).is_unauthorized());
    }

    #[test]
    fn decode_error_reports_payload_size() {
        let err = QsetError::Decode {
            path: "/asset_dataset".into(),
            cause: DecodeCause::Protocol("unexpected end".into()),
            payload: Bytes::from_static(b"\x82\xa5"),
        };
        let msg = err.to_string();
        assert!(msg.contains("/asset_dataset"));
        assert!(msg.contains("2 bytes"));
        assert!(msg.contains("unexpected end"));
    }

    #[test]
    fn decode_error_keeps_codec_source() {
        use std::error::Error as _;
        let err = QsetError::Decode {
            path: "/asset_dataset".into(),
            cause: CodecError::UnknownExtension { tag: 9 }.into(),
            payload: Bytes::from_static(&[0xd4, 0x09, 0x00]),
        };
        let source = err.source().unwrap();
        assert!(source.to_string().contains("unknown extension type 9"));
        assert!(matches!(
            err,
            QsetError::Decode { cause: DecodeCause::Codec(CodecError::UnknownExtension { tag: 9 }), .. }
        ));
    }

    #[test]
    fn client_errors() {
        assert!(QsetError::MissingCredentials.is_client_error());
        let transient = QsetError::Transport {
            path: "/x".into(),
            attempts: 3,
            source: TransportError::Timeout { ms: 1 },
        };
        assert!(!transient.is_client_error());
    }
}
