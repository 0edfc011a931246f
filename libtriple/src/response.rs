//! Request identity and the response object handed to the correlator

use std::fmt;

use crate::{exception::RpcException, legacy::LegacyStatus, metadata::Attachments};

/// Opaque identifier of an outstanding call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for RequestId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// The call a stream is completing. Issued by the calling layer and never
/// modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    id: RequestId,
    version: String,
}

impl Request {
    /// Create a request handle
    #[must_use]
    #[inline]
    pub fn new(id: RequestId, version: impl Into<String>) -> Self {
        Self {
            id,
            version: version.into(),
        }
    }

    /// Identifier of the call
    #[must_use]
    #[inline]
    pub const fn id(&self) -> RequestId {
        self.id
    }

    /// Protocol version tag
    #[must_use]
    #[inline]
    pub fn version(&self) -> &str {
        &self.version
    }
}

/// What a call produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    /// The decoded response value
    Value(T),
    /// An exception reconstructed from the trailers
    Exception(RpcException),
    /// Failure with no reconstructable exception; see the legacy status
    Empty,
}

/// Application-visible result of a call: its outcome plus attachments.
#[derive(Debug, Clone, PartialEq)]
pub struct AppResult<T> {
    outcome: Outcome<T>,
    attachments: Attachments,
}

impl<T> AppResult<T> {
    /// A successful result
    #[must_use]
    pub fn value(value: T, attachments: Attachments) -> Self {
        Self {
            outcome: Outcome::Value(value),
            attachments,
        }
    }

    /// A failed result, with or without an exception
    #[must_use]
    pub fn failure(exception: Option<RpcException>, attachments: Attachments) -> Self {
        let outcome = match exception {
            Some(e) => Outcome::Exception(e),
            None => Outcome::Empty,
        };
        Self {
            outcome,
            attachments,
        }
    }

    /// The outcome
    #[must_use]
    pub fn outcome(&self) -> &Outcome<T> {
        &self.outcome
    }

    /// The decoded value, if the call succeeded
    #[must_use]
    pub fn get_value(&self) -> Option<&T> {
        match self.outcome {
            Outcome::Value(ref v) => Some(v),
            Outcome::Exception(_) | Outcome::Empty => None,
        }
    }

    /// The reconstructed exception, if any
    #[must_use]
    pub fn exception(&self) -> Option<&RpcException> {
        match self.outcome {
            Outcome::Exception(ref e) => Some(e),
            Outcome::Value(_) | Outcome::Empty => None,
        }
    }

    /// Whether an exception is present
    #[must_use]
    pub fn has_exception(&self) -> bool {
        self.exception().is_some()
    }

    /// Attachments derived from the trailers
    #[must_use]
    pub fn attachments(&self) -> &Attachments {
        &self.attachments
    }

    /// Decompose into outcome and attachments
    #[must_use]
    pub fn into_parts(self) -> (Outcome<T>, Attachments) {
        (self.outcome, self.attachments)
    }
}

/// Response delivered to the correlator, once per request id.
#[derive(Debug, Clone, PartialEq)]
pub struct Response<T> {
    id: RequestId,
    version: String,
    error_message: Option<String>,
    status: Option<LegacyStatus>,
    result: AppResult<T>,
}

impl<T> Response<T> {
    /// Successful response for `request`
    #[must_use]
    pub fn success(request: &Request, result: AppResult<T>) -> Self {
        Self {
            id: request.id(),
            version: request.version().to_owned(),
            error_message: None,
            status: None,
            result,
        }
    }

    /// Failed response for `request`.
    ///
    /// The legacy status is only kept when the result carries no exception.
    #[must_use]
    pub fn failure(
        request: &Request,
        error_message: impl Into<String>,
        status: Option<LegacyStatus>,
        result: AppResult<T>,
    ) -> Self {
        let status = status.filter(|_| !result.has_exception());
        Self {
            id: request.id(),
            version: request.version().to_owned(),
            error_message: Some(error_message.into()),
            status,
            result,
        }
    }

    /// Identifier of the originating request
    #[must_use]
    pub const fn id(&self) -> RequestId {
        self.id
    }

    /// Protocol version tag
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Error message taken from the failure status description
    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    /// Legacy status, set only for failures without an exception
    #[must_use]
    pub const fn status(&self) -> Option<LegacyStatus> {
        self.status
    }

    /// The application result
    #[must_use]
    pub fn result(&self) -> &AppResult<T> {
        &self.result
    }

    /// Take the application result
    #[must_use]
    pub fn into_result(self) -> AppResult<T> {
        self.result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        exception::{ProtocolException, RpcException},
        metadata::{AttachmentValue, Metadata},
        status::Code,
    };

    #[test]
    fn test_success_response() {
        let request = Request::new(RequestId(7), "3.0.0");
        let mut attachments = Attachments::new();
        attachments.insert("k", AttachmentValue::Text("v".into()));

        let response = Response::success(&request, AppResult::value("hello", attachments));

        assert_eq!(response.id(), RequestId(7));
        assert_eq!(response.version(), "3.0.0");
        assert_eq!(response.error_message(), None);
        assert_eq!(response.status(), None);
        assert_eq!(response.result().get_value(), Some(&"hello"));
        assert!(response.result().attachments().contains_key("k"));
    }

    #[test]
    fn test_failure_without_exception_keeps_status() {
        let request = Request::new(RequestId(1), "3.0.0");
        let response: Response<()> = Response::failure(
            &request,
            "no such item",
            Some(LegacyStatus::SERVICE_ERROR),
            AppResult::failure(None, Attachments::new()),
        );

        assert_eq!(response.status(), Some(LegacyStatus::SERVICE_ERROR));
        assert_eq!(response.error_message(), Some("no such item"));
        assert_eq!(response.result().outcome(), &Outcome::Empty);
    }

    #[test]
    fn test_failure_with_exception_drops_status() {
        let request = Request::new(RequestId(2), "3.0.0");
        let exception = RpcException::Protocol(ProtocolException::new(
            Code::Internal,
            "boom",
            Metadata::new(),
        ));
        let response: Response<()> = Response::failure(
            &request,
            "boom",
            Some(LegacyStatus::SERVER_ERROR),
            AppResult::failure(Some(exception), Attachments::new()),
        );

        assert_eq!(response.status(), None);
        assert!(response.result().has_exception());
        assert!(response.into_result().get_value().is_none());
    }
}
