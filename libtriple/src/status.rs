//! Structured status carried by a failed triple call
//!
//! Mirrors the gRPC status model: an integer code, a description and an
//! optional cause describing the local error that produced the status.

use std::{error::Error, fmt, sync::Arc};

/// gRPC status codes
///
/// These match the [gRPC status codes specification](https://github.com/grpc/grpc/blob/master/doc/statuscodes.md).
/// Integers outside the specified range are kept verbatim in [`Code::Other`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Code {
    /// The operation completed successfully.
    Ok,
    /// The operation was cancelled.
    Cancelled,
    /// Unknown error.
    Unknown,
    /// Client specified an invalid argument.
    InvalidArgument,
    /// Deadline expired before operation could complete.
    DeadlineExceeded,
    /// Some requested entity was not found.
    NotFound,
    /// Some entity that we attempted to create already exists.
    AlreadyExists,
    /// The caller does not have permission to execute the specified operation.
    PermissionDenied,
    /// Some resource has been exhausted.
    ResourceExhausted,
    /// The system is not in a state required for the operation's execution.
    FailedPrecondition,
    /// The operation was aborted.
    Aborted,
    /// Operation was attempted past the valid range.
    OutOfRange,
    /// Operation is not implemented or not supported.
    Unimplemented,
    /// Internal error.
    Internal,
    /// The service is currently unavailable.
    Unavailable,
    /// Unrecoverable data loss or corruption.
    DataLoss,
    /// The request does not have valid authentication credentials
    Unauthenticated,
    /// A code outside the range defined by the protocol.
    Other(i32),
}

impl Code {
    /// Get human-readable description of this code
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Code::Ok => "The operation completed successfully",
            Code::Cancelled => "The operation was cancelled",
            Code::Unknown => "Unknown error",
            Code::InvalidArgument => "Client specified an invalid argument",
            Code::DeadlineExceeded => "Deadline expired before operation could complete",
            Code::NotFound => "Some requested entity was not found",
            Code::AlreadyExists => "Some entity that we attempted to create already exists",
            Code::PermissionDenied => {
                "The caller does not have permission to execute the specified operation"
            }
            Code::ResourceExhausted => "Some resource has been exhausted",
            Code::FailedPrecondition => {
                "The system is not in a state required for the operation's execution"
            }
            Code::Aborted => "The operation was aborted",
            Code::OutOfRange => "Operation was attempted past the valid range",
            Code::Unimplemented => "Operation is not implemented or not supported",
            Code::Internal => "Internal error",
            Code::Unavailable => "The service is currently unavailable",
            Code::DataLoss => "Unrecoverable data loss or corruption",
            Code::Unauthenticated => "The request does not have valid authentication credentials",
            Code::Other(_) => "Unrecognized status code",
        }
    }

    /// Convert integer to Code
    #[must_use]
    pub const fn from_i32(i: i32) -> Code {
        match i {
            0 => Code::Ok,
            1 => Code::Cancelled,
            2 => Code::Unknown,
            3 => Code::InvalidArgument,
            4 => Code::DeadlineExceeded,
            5 => Code::NotFound,
            6 => Code::AlreadyExists,
            7 => Code::PermissionDenied,
            8 => Code::ResourceExhausted,
            9 => Code::FailedPrecondition,
            10 => Code::Aborted,
            11 => Code::OutOfRange,
            12 => Code::Unimplemented,
            13 => Code::Internal,
            14 => Code::Unavailable,
            15 => Code::DataLoss,
            16 => Code::Unauthenticated,
            other => Code::Other(other),
        }
    }

    /// The integer value of this code on the wire
    #[must_use]
    pub const fn value(&self) -> i32 {
        match *self {
            Code::Ok => 0,
            Code::Cancelled => 1,
            Code::Unknown => 2,
            Code::InvalidArgument => 3,
            Code::DeadlineExceeded => 4,
            Code::NotFound => 5,
            Code::AlreadyExists => 6,
            Code::PermissionDenied => 7,
            Code::ResourceExhausted => 8,
            Code::FailedPrecondition => 9,
            Code::Aborted => 10,
            Code::OutOfRange => 11,
            Code::Unimplemented => 12,
            Code::Internal => 13,
            Code::Unavailable => 14,
            Code::DataLoss => 15,
            Code::Unauthenticated => 16,
            Code::Other(raw) => raw,
        }
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Code::Other(raw) => write!(f, "{} ({raw})", self.description()),
            _ => write!(f, "{}", self.description()),
        }
    }
}

impl From<i32> for Code {
    fn from(i: i32) -> Self {
        Code::from_i32(i)
    }
}

impl From<Code> for i32 {
    fn from(code: Code) -> i32 {
        code.value()
    }
}

/// Structured status describing why a call failed.
#[derive(Clone, Debug)]
pub struct Status {
    /// The gRPC status code
    code: Code,
    /// Human-readable description, carried to the caller as the error message
    description: String,
    /// Local error that caused this status, if any
    cause: Option<Arc<dyn Error + Send + Sync>>,
}

impl Status {
    /// Create a new `Status` with the associated code and description
    #[must_use]
    pub fn new(code: Code, description: impl Into<String>) -> Status {
        Status {
            code,
            description: description.into(),
            cause: None,
        }
    }

    /// Create a `Status` carrying only a code, with an empty description
    #[must_use]
    pub fn from_code(code: Code) -> Status {
        Status::new(code, "")
    }

    /// Replace the description
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Status {
        self.description = description.into();
        self
    }

    /// Attach the error that caused this status
    #[must_use]
    pub fn with_cause<E>(mut self, cause: E) -> Status
    where
        E: Error + Send + Sync + 'static,
    {
        self.cause = Some(Arc::new(cause));
        self
    }

    /// Get the gRPC `Code` of this `Status`
    #[must_use]
    pub const fn code(&self) -> Code {
        self.code
    }

    /// Get the description of this `Status`
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Get the cause of this `Status`, if one was attached
    #[must_use]
    pub fn cause(&self) -> Option<&(dyn Error + Send + Sync + 'static)> {
        self.cause.as_deref()
    }

    // === Commonly-used constructor methods ===

    /// The operation was cancelled (typically by the caller).
    #[must_use]
    pub fn cancelled(description: impl Into<String>) -> Status {
        Status::new(Code::Cancelled, description)
    }

    /// Unknown error.
    #[must_use]
    pub fn unknown(description: impl Into<String>) -> Status {
        Status::new(Code::Unknown, description)
    }

    /// Deadline expired before operation could complete.
    #[must_use]
    pub fn deadline_exceeded(description: impl Into<String>) -> Status {
        Status::new(Code::DeadlineExceeded, description)
    }

    /// Some requested entity (e.g., file or directory) was not found.
    #[must_use]
    pub fn not_found(description: impl Into<String>) -> Status {
        Status::new(Code::NotFound, description)
    }

    /// Operation is not implemented or not supported/enabled in this service.
    #[must_use]
    pub fn unimplemented(description: impl Into<String>) -> Status {
        Status::new(Code::Unimplemented, description)
    }

    /// Internal errors. Something is very broken.
    #[must_use]
    pub fn internal(description: impl Into<String>) -> Status {
        Status::new(Code::Internal, description)
    }

    /// The service is currently unavailable. This is likely a transient condition.
    #[must_use]
    pub fn unavailable(description: impl Into<String>) -> Status {
        Status::new(Code::Unavailable, description)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "status: {}, message: {}", self.code, self.description)
    }
}

impl Error for Status {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.cause
            .as_deref()
            .map(|e| e as &(dyn Error + 'static))
    }
}
