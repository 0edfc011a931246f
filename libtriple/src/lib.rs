//! # libtriple — unary client response reconciliation for the triple protocol
//!
//! `libtriple` turns the completion of a unary triple call (a received body
//! plus trailing metadata, or a transport failure) into exactly one
//! application-visible response, delivered to the caller waiting on its
//! request id. It follows the RK8s conventions (Tokio for scheduling,
//! `tracing` for observability, `thiserror` for structured errors).
//!
//! ## Module overview
//!
//! | Module | Purpose |
//! |---|---|
//! | [`stream`] | [`UnaryClientStream`], the completion state machine. |
//! | [`exception`] | Two-tier exception reconstruction from trailers. |
//! | [`legacy`] | Structured status code → legacy status byte table. |
//! | [`metadata`] | Trailing metadata and the attachment mapping. |
//! | [`status`] | Structured [`Status`] and [`Code`]. |
//! | [`response`] | [`Request`], [`Response`], [`AppResult`]. |
//! | [`correlator`] | Delivery to waiting callers by request id. |
//! | [`executor`] | Worker pool the completion work runs on. |
//! | [`codec`] | Body codecs. |
//! | [`proto`] | Wire records carried in reserved trailers. |
//! | [`client`] | [`UnaryClient`], per-call stream construction. |
//! | [`config`] | [`ClientConfig`]. |
//! | [`error`] | [`TripleError`]. |

pub mod client;
pub mod codec;
pub mod config;
pub mod correlator;
pub mod error;
pub mod exception;
pub mod executor;
pub mod legacy;
pub mod metadata;
pub mod proto;
pub mod response;
pub mod status;
pub mod stream;

// Re-export the most commonly used items at crate root for convenience.
pub use client::UnaryClient;
pub use codec::{BodyCodec, DecodeError, ProstCodec, RawCodec};
pub use config::ClientConfig;
pub use correlator::{PendingCalls, ResponseCorrelator};
pub use error::TripleError;
pub use exception::{
    AppException, ExceptionReconstructor, ExceptionRegistry, JsonExceptionRegistry,
    ProtocolException, ResolutionHints, RpcException,
};
pub use executor::{Executor, TokioExecutor};
pub use legacy::LegacyStatus;
pub use metadata::{AttachmentValue, Attachments, Metadata};
pub use response::{AppResult, Outcome, Request, RequestId, Response};
pub use status::{Code, Status};
pub use stream::UnaryClientStream;
