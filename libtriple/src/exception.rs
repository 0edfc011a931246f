//! Exception reconstruction from trailing metadata.
//!
//! A failed call may carry the server's exception in one of two reserved
//! trailers. The typed exception envelope (`tri-exception-tw-bin`) is tried
//! first; the structured status detail (`grpc-status-details-bin`) second.
//! A tier that fails to decode is logged and skipped.

use std::{error::Error, fmt, sync::Arc};

use bytes::Bytes;
use dashmap::DashSet;
use prost::Message;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::{
    error::TripleError,
    metadata::{EXCEPTION_TW_BIN, Metadata, STATUS_DETAIL_KEY, decode_binary},
    proto::{ExceptionEnvelope, RpcStatus},
    status::Code,
};

/// Exception raised by the remote service and resolved from its envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppException {
    /// Type descriptor the registry resolved
    pub type_name: String,
    /// Exception message
    pub message: String,
    /// Serialized exception state as received
    pub payload: Bytes,
}

impl fmt::Display for AppException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.type_name, self.message)
    }
}

impl Error for AppException {}

/// Protocol-level exception built from a structured status record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolException {
    code: Code,
    message: String,
    metadata: Metadata,
}

impl ProtocolException {
    /// Create a protocol exception
    #[must_use]
    pub fn new(code: Code, message: impl Into<String>, metadata: Metadata) -> Self {
        Self {
            code,
            message: message.into(),
            metadata,
        }
    }

    /// Status code from the record
    #[must_use]
    pub const fn code(&self) -> Code {
        self.code
    }

    /// Message, with stack frames rendered when the server sent them
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Trailers the exception was reconstructed from
    #[must_use]
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }
}

impl fmt::Display for ProtocolException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl Error for ProtocolException {}

/// Exception reconstructed from trailing metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RpcException {
    /// Resolved from a typed exception envelope
    Typed(AppException),
    /// Built from a structured status-detail record
    Protocol(ProtocolException),
}

impl RpcException {
    /// Exception message
    #[must_use]
    pub fn message(&self) -> &str {
        match *self {
            Self::Typed(ref e) => &e.message,
            Self::Protocol(ref e) => e.message(),
        }
    }
}

impl fmt::Display for RpcException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Typed(ref e) => e.fmt(f),
            Self::Protocol(ref e) => e.fmt(f),
        }
    }
}

impl Error for RpcException {}

/// Context handed to the registry while an exception is resolved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolutionHints {
    /// Serialization scheme negotiated for the call
    pub serialization: String,
    /// Service key of the call, for registries that resolve per service
    pub service: String,
}

/// Resolves typed exception envelopes into application exceptions.
///
/// `scope_entered`/`scope_exited` bracket every decode the reconstructor
/// performs; `scope_exited` runs on every exit path, including failures.
pub trait ExceptionRegistry: Send + Sync {
    /// Resolve an envelope. `Ok(None)` means the payload decoded to no
    /// exception.
    ///
    /// # Errors
    /// Returns error if the type is unknown or the payload is malformed
    fn resolve(
        &self,
        envelope: &ExceptionEnvelope,
        hints: &ResolutionHints,
    ) -> Result<Option<AppException>, TripleError>;

    /// Called before a decode starts
    fn scope_entered(&self, _hints: &ResolutionHints) {}

    /// Called after a decode ends, whatever its outcome
    fn scope_exited(&self, _hints: &ResolutionHints) {}
}

/// Serialization scheme understood by [`JsonExceptionRegistry`].
pub const JSON_SERIALIZATION: &str = "json";

/// Exception state as written by the JSON scheme.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum JsonPayload {
    Object {
        #[serde(default, alias = "detailMessage")]
        message: String,
    },
    Message(String),
}

/// Registry resolving envelopes whose payload is JSON, restricted to a set
/// of registered type names.
#[derive(Debug, Default)]
pub struct JsonExceptionRegistry {
    known: DashSet<String>,
}

impl JsonExceptionRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allow `type_name` to be resolved
    pub fn register(&self, type_name: impl Into<String>) {
        let _ = self.known.insert(type_name.into());
    }

    /// Whether `type_name` has been registered
    #[must_use]
    pub fn is_registered(&self, type_name: &str) -> bool {
        self.known.contains(type_name)
    }
}

impl ExceptionRegistry for JsonExceptionRegistry {
    fn resolve(
        &self,
        envelope: &ExceptionEnvelope,
        hints: &ResolutionHints,
    ) -> Result<Option<AppException>, TripleError> {
        let serialization = if envelope.serialization.is_empty() {
            hints.serialization.as_str()
        } else {
            envelope.serialization.as_str()
        };
        if serialization != JSON_SERIALIZATION {
            return Err(TripleError::Payload(format!(
                "unsupported serialization {serialization}"
            )));
        }
        if !self.is_registered(&envelope.class_name) {
            return Err(TripleError::UnknownType(envelope.class_name.clone()));
        }

        let payload: Option<JsonPayload> =
            serde_json::from_slice(&envelope.data).map_err(TripleError::payload)?;
        Ok(payload.map(|payload| {
            let message = match payload {
                JsonPayload::Object { message } | JsonPayload::Message(message) => message,
            };
            AppException {
                type_name: envelope.class_name.clone(),
                message,
                payload: Bytes::copy_from_slice(&envelope.data),
            }
        }))
    }
}

/// Render stack frames into a multi-line message, one frame per line.
#[must_use]
pub fn render_stack_frames(frames: &[String]) -> String {
    frames.iter().fold(String::new(), |mut out, frame| {
        out.push_str(frame);
        out.push('\n');
        out
    })
}

/// Rebuilds application exceptions from the reserved trailers of a call.
#[derive(Clone)]
pub struct ExceptionReconstructor {
    registry: Arc<dyn ExceptionRegistry>,
    hints: ResolutionHints,
}

impl fmt::Debug for ExceptionReconstructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExceptionReconstructor")
            .field("hints", &self.hints)
            .finish_non_exhaustive()
    }
}

impl ExceptionReconstructor {
    /// Create a reconstructor resolving through `registry`
    #[must_use]
    pub fn new(registry: Arc<dyn ExceptionRegistry>, hints: ResolutionHints) -> Self {
        Self { registry, hints }
    }

    /// Hints passed to the registry
    #[must_use]
    pub fn hints(&self) -> &ResolutionHints {
        &self.hints
    }

    /// Try both tiers in priority order.
    ///
    /// The exception envelope key is always removed from `metadata`, so a
    /// second call on the same instance only sees the status-detail tier.
    pub fn reconstruct(&self, metadata: &mut Metadata) -> Option<RpcException> {
        if let Some(exception) = self.from_envelope(metadata) {
            return Some(exception);
        }
        self.from_status_detail(metadata)
    }

    /// Run `f` inside a resolution scope.
    fn scoped<R>(&self, f: impl FnOnce() -> R) -> R {
        self.registry.scope_entered(&self.hints);
        let _restore = scopeguard::guard(&self.hints, |hints| {
            self.registry.scope_exited(hints);
        });
        f()
    }

    fn from_envelope(&self, metadata: &mut Metadata) -> Option<RpcException> {
        let raw = metadata.take(EXCEPTION_TW_BIN)?;
        match self.scoped(|| self.decode_envelope(&raw)) {
            Ok(Some(exception)) => Some(RpcException::Typed(exception)),
            Ok(None) => {
                debug!("exception envelope resolved to no exception");
                None
            }
            Err(e) => {
                warn!(error = %e, "failed to decode exception instance from triple trailers");
                None
            }
        }
    }

    fn decode_envelope(&self, raw: &str) -> Result<Option<AppException>, TripleError> {
        let bytes = decode_binary(raw)?;
        let envelope = ExceptionEnvelope::decode(bytes.as_slice())?;
        self.registry.resolve(&envelope, &self.hints)
    }

    fn from_status_detail(&self, metadata: &Metadata) -> Option<RpcException> {
        let raw = metadata.get(STATUS_DETAIL_KEY)?;
        match self.scoped(|| Self::decode_status_detail(raw)) {
            Ok((code, message)) => Some(RpcException::Protocol(ProtocolException::new(
                code,
                message,
                metadata.clone(),
            ))),
            Err(e) => {
                warn!(error = %e, "failed to decode status detail from triple trailers");
                None
            }
        }
    }

    fn decode_status_detail(raw: &str) -> Result<(Code, String), TripleError> {
        let bytes = decode_binary(raw)?;
        let status = RpcStatus::decode(bytes.as_slice())?;
        let message = match status.debug_info()? {
            Some(info) if !info.stack_entries.is_empty() => {
                render_stack_frames(&info.stack_entries)
            }
            _ => status.message,
        };
        Ok((Code::from_i32(status.code), message))
    }
}
