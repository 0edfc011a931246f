//! Wire records carried in reserved trailers.
//!
//! These mirror `google.rpc.Status`, `google.rpc.DebugInfo` and the triple
//! exception wrapper. They are declared by hand with `prost` derives so the
//! crate needs no build script.

use prost::Message;
use prost_types::Any;

/// Prefix of every type URL produced by [`pack`].
pub const TYPE_URL_PREFIX: &str = "type.googleapis.com/";

/// Fully qualified name of the debug-info facet.
pub const DEBUG_INFO_TYPE: &str = "google.rpc.DebugInfo";

/// Structured status record (`google.rpc.Status`).
#[derive(Clone, PartialEq, Message)]
pub struct RpcStatus {
    /// Status code, one of the gRPC codes
    #[prost(int32, tag = "1")]
    pub code: i32,
    /// Developer-facing error message
    #[prost(string, tag = "2")]
    pub message: String,
    /// Typed detail facets
    #[prost(message, repeated, tag = "3")]
    pub details: Vec<Any>,
}

/// Debug-info facet (`google.rpc.DebugInfo`).
#[derive(Clone, PartialEq, Message)]
pub struct DebugInfo {
    /// Stack frame descriptions, innermost first
    #[prost(string, repeated, tag = "1")]
    pub stack_entries: Vec<String>,
    /// Additional debugging information
    #[prost(string, tag = "2")]
    pub detail: String,
}

/// Typed exception envelope: a type descriptor plus the exception state
/// serialized with the negotiated scheme.
#[derive(Clone, PartialEq, Message)]
pub struct ExceptionEnvelope {
    /// Language of the service that raised the exception
    #[prost(string, tag = "1")]
    pub language: String,
    /// Serialization scheme used for `data`
    #[prost(string, tag = "2")]
    pub serialization: String,
    /// Type descriptor of the exception
    #[prost(string, tag = "3")]
    pub class_name: String,
    /// Serialized exception state
    #[prost(bytes = "vec", tag = "4")]
    pub data: Vec<u8>,
}

/// Strip the authority part of a type URL, leaving the fully qualified name.
#[must_use]
pub fn type_name(type_url: &str) -> &str {
    type_url.rsplit('/').next().unwrap_or(type_url)
}

/// Pack a message into an [`Any`] under `full_name`.
#[must_use]
pub fn pack<M: Message>(full_name: &str, msg: &M) -> Any {
    Any {
        type_url: format!("{TYPE_URL_PREFIX}{full_name}"),
        value: msg.encode_to_vec(),
    }
}

impl RpcStatus {
    /// Find the first detail facet whose type is `full_name`.
    #[must_use]
    pub fn detail(&self, full_name: &str) -> Option<&Any> {
        self.details
            .iter()
            .find(|any| type_name(&any.type_url) == full_name)
    }

    /// Decode the debug-info facet, if one is present.
    ///
    /// # Errors
    /// Returns error if the facet is present but malformed
    pub fn debug_info(&self) -> Result<Option<DebugInfo>, prost::DecodeError> {
        self.detail(DEBUG_INFO_TYPE)
            .map(|any| DebugInfo::decode(any.value.as_slice()))
            .transpose()
    }
}
