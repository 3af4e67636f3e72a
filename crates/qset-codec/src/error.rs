//! Error types for the envelope codec.

use thiserror::Error;

/// Errors raised while encoding or decoding an envelope.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The value has no representation in the envelope format.
    #[error("Cannot encode value of type {type_name}: {detail}")]
    UnsupportedType {
        type_name: &'static str,
        detail: String,
    },

    /// The payload carries an extension tag this codec does not know.
    #[error("Cannot decode unknown extension type {tag}")]
    UnknownExtension { tag: i8 },

    /// A known extension tag whose payload does not follow its layout.
    #[error("Invalid payload for extension type {tag}: {reason}")]
    InvalidExtensionPayload { tag: i8, reason: String },

    /// The bytes are not a well-formed envelope.
    #[error("Malformed envelope: {0}")]
    Malformed(String),

    /// The encoder failed to write the output buffer.
    #[error("Envelope write failed: {0}")]
    Write(String),
}

/// Error returned when parsing an [`ExactDecimal`](crate::ExactDecimal) from text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid decimal literal {input:?}: {reason}")]
pub struct ParseDecimalError {
    pub input: String,
    pub reason: &'static str,
}

impl ParseDecimalError {
    pub(crate) fn new(input: &str, reason: &'static str) -> Self {
        Self {
            input: input.to_string(),
            reason,
        }
    }
}
