//! Body codec trait and implementations for unary responses

use std::marker::PhantomData;

use bytes::Bytes;
use prost::Message;

/// Errors that can occur while decoding a response body
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// Invalid binary format
    #[error("Invalid binary format")]
    InvalidFormat,
    /// Protobuf decoding error
    #[error("Protobuf decode error: {0}")]
    ProtobufError(#[from] prost::DecodeError),
}

/// Codec that turns a fully received response body into the declared
/// response type.
///
/// The codec is negotiated per call by the layer that issues the request; the
/// completion handler only ever calls [`BodyCodec::decode`].
pub trait BodyCodec: Send + Sync + 'static {
    /// The application value produced by a successful decode
    type Output: Send + 'static;

    /// Decode body bytes into the response value
    ///
    /// # Errors
    /// Returns error if the bytes are not a valid encoding of `Output`
    fn decode(&self, bytes: &[u8]) -> Result<Self::Output, DecodeError>;
}

/// Protobuf body codec for a single message type.
#[derive(Debug)]
pub struct ProstCodec<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> ProstCodec<T> {
    /// Create a new protobuf codec
    #[must_use]
    #[inline]
    pub const fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for ProstCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for ProstCodec<T> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T> BodyCodec for ProstCodec<T>
where
    T: Message + Default + Send + 'static,
{
    type Output = T;

    fn decode(&self, bytes: &[u8]) -> Result<T, DecodeError> {
        Ok(T::decode(bytes)?)
    }
}

/// Pass-through codec that hands the body bytes to the caller untouched.
///
/// An empty body is rejected: a unary call always carries exactly one message.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawCodec;

impl BodyCodec for RawCodec {
    type Output = Bytes;

    fn decode(&self, bytes: &[u8]) -> Result<Bytes, DecodeError> {
        if bytes.is_empty() {
            return Err(DecodeError::InvalidFormat);
        }
        Ok(Bytes::copy_from_slice(bytes))
    }
}
