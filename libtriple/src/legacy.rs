//! Legacy single-byte response status and the table that produces it.
//!
//! Callers written against the older RPC transport inspect a one-byte status
//! on the response object. When a triple call fails without a reconstructable
//! exception, [`translate`] maps the structured [`Code`] onto that byte.

use std::fmt;

use crate::status::Code;

/// Single-byte status understood by the older RPC transport.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LegacyStatus(u8);

impl LegacyStatus {
    /// Call succeeded.
    pub const OK: Self = Self(20);
    /// Client side timed out waiting for the response.
    pub const CLIENT_TIMEOUT: Self = Self(30);
    /// Server side timed out executing the call.
    pub const SERVER_TIMEOUT: Self = Self(31);
    /// Channel to the provider is no longer usable.
    pub const CHANNEL_INACTIVE: Self = Self(35);
    /// Request was malformed.
    pub const BAD_REQUEST: Self = Self(40);
    /// Response was malformed.
    pub const BAD_RESPONSE: Self = Self(50);
    /// Target service or method does not exist.
    pub const SERVICE_NOT_FOUND: Self = Self(60);
    /// Generic business error raised by the service.
    pub const SERVICE_ERROR: Self = Self(70);
    /// Provider failed outside of the service code.
    pub const SERVER_ERROR: Self = Self(80);
    /// Consumer failed before or while sending.
    pub const CLIENT_ERROR: Self = Self(90);
    /// Provider worker pool rejected the call.
    pub const SERVER_THREADPOOL_EXHAUSTED_ERROR: Self = Self(100);

    /// Raw byte value.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self.0
    }
}

impl fmt::Display for LegacyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match *self {
            Self::OK => "OK",
            Self::CLIENT_TIMEOUT => "CLIENT_TIMEOUT",
            Self::SERVER_TIMEOUT => "SERVER_TIMEOUT",
            Self::CHANNEL_INACTIVE => "CHANNEL_INACTIVE",
            Self::BAD_REQUEST => "BAD_REQUEST",
            Self::BAD_RESPONSE => "BAD_RESPONSE",
            Self::SERVICE_NOT_FOUND => "SERVICE_NOT_FOUND",
            Self::SERVICE_ERROR => "SERVICE_ERROR",
            Self::SERVER_ERROR => "SERVER_ERROR",
            Self::CLIENT_ERROR => "CLIENT_ERROR",
            Self::SERVER_THREADPOOL_EXHAUSTED_ERROR => "SERVER_THREADPOOL_EXHAUSTED_ERROR",
            _ => return write!(f, "{}", self.0),
        };
        f.write_str(name)
    }
}

/// Map a structured status code to the legacy status byte.
///
/// Every defined code has an explicit entry; codes outside the defined range
/// are reported as a generic service error.
#[must_use]
pub const fn translate(code: Code) -> LegacyStatus {
    match code {
        Code::Ok => LegacyStatus::OK,
        Code::Cancelled => LegacyStatus::CLIENT_ERROR,
        Code::Unknown => LegacyStatus::SERVICE_ERROR,
        Code::InvalidArgument => LegacyStatus::BAD_REQUEST,
        Code::DeadlineExceeded => LegacyStatus::CLIENT_TIMEOUT,
        Code::NotFound => LegacyStatus::SERVICE_ERROR,
        Code::AlreadyExists => LegacyStatus::SERVICE_ERROR,
        Code::PermissionDenied => LegacyStatus::SERVICE_ERROR,
        Code::ResourceExhausted => LegacyStatus::SERVER_THREADPOOL_EXHAUSTED_ERROR,
        Code::FailedPrecondition => LegacyStatus::SERVICE_ERROR,
        Code::Aborted => LegacyStatus::SERVICE_ERROR,
        Code::OutOfRange => LegacyStatus::BAD_REQUEST,
        Code::Unimplemented => LegacyStatus::SERVICE_NOT_FOUND,
        Code::Internal => LegacyStatus::SERVER_ERROR,
        Code::Unavailable => LegacyStatus::CHANNEL_INACTIVE,
        Code::DataLoss => LegacyStatus::BAD_RESPONSE,
        Code::Unauthenticated => LegacyStatus::SERVICE_ERROR,
        Code::Other(_) => LegacyStatus::SERVICE_ERROR,
    }
}

impl From<Code> for LegacyStatus {
    fn from(code: Code) -> Self {
        translate(code)
    }
}
