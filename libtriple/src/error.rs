//! Triple client error types.
//!
//! Every fallible step of response reconciliation reports a [`TripleError`].
//! None of these reach the caller directly: the completion handler absorbs
//! them into either an `INTERNAL` status or a skipped reconstruction tier.

use thiserror::Error;

use crate::{codec::DecodeError, response::RequestId};

/// Unified error type for the triple client layer.
#[derive(Debug, Error)]
pub enum TripleError {
    /// The response body could not be decoded by the body codec.
    #[error("body decode error: {0}")]
    Decode(#[from] DecodeError),

    /// A `-bin` metadata value was not valid base64.
    #[error("invalid binary metadata: {0}")]
    Base64(#[from] base64::DecodeError),

    /// A wire record (status detail, exception envelope) failed to unpack.
    #[error("protobuf decode error: {0}")]
    Protobuf(#[from] prost::DecodeError),

    /// The serialized exception payload could not be read.
    #[error("exception payload error: {0}")]
    Payload(String),

    /// The exception envelope named a type the registry does not know.
    #[error("unknown exception type {0}")]
    UnknownType(String),

    /// A call was started with an id that is still pending.
    #[error("request {0} is already pending")]
    DuplicateRequest(RequestId),

    /// An unclassified internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl TripleError {
    /// Create a [`TripleError::Payload`] from anything that implements
    /// [`std::fmt::Display`].
    pub fn payload<E: std::fmt::Display>(e: E) -> Self {
        Self::Payload(e.to_string())
    }

    /// Create a [`TripleError::Internal`] from anything that implements
    /// [`std::fmt::Display`].
    pub fn internal<E: std::fmt::Display>(e: E) -> Self {
        Self::Internal(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = TripleError::UnknownType("com.example.Missing".into());
        assert_eq!(err.to_string(), "unknown exception type com.example.Missing");

        let err = TripleError::payload("expected value at line 1");
        assert_eq!(
            err.to_string(),
            "exception payload error: expected value at line 1"
        );
    }

    #[test]
    fn from_decode_error() {
        let err: TripleError = DecodeError::InvalidFormat.into();
        assert!(matches!(err, TripleError::Decode(DecodeError::InvalidFormat)));
    }
}
