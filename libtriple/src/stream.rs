//! Unary client stream: turns a transport completion into one response.
//!
//! The transport reports exactly one of two events per call: the body and
//! trailers were fully received ([`UnaryClientStream::on_complete`]) or the
//! call failed with a status ([`UnaryClientStream::on_error`]). Both are
//! moved onto the [`Executor`] and end with a single delivery to the
//! [`ResponseCorrelator`].

use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use bytes::Bytes;
use tracing::{debug, instrument, warn};

use crate::{
    codec::BodyCodec,
    correlator::ResponseCorrelator,
    exception::ExceptionReconstructor,
    executor::Executor,
    legacy,
    metadata::Metadata,
    response::{AppResult, Request, Response},
    status::Status,
};

/// Description of the status synthesized when the body fails to decode.
pub const DESERIALIZE_FAILED: &str = "Failed to deserialize response";

/// Completion handler for one unary call.
pub struct UnaryClientStream<C: BodyCodec> {
    request: Request,
    codec: Arc<C>,
    reconstructor: ExceptionReconstructor,
    correlator: Arc<dyn ResponseCorrelator<C::Output>>,
    executor: Arc<dyn Executor>,
    /// Set by the first completion event; later events are ignored
    completed: AtomicBool,
}

impl<C: BodyCodec> fmt::Debug for UnaryClientStream<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnaryClientStream")
            .field("request", &self.request)
            .field("completed", &self.completed)
            .finish_non_exhaustive()
    }
}

impl<C: BodyCodec> UnaryClientStream<C> {
    /// Create the handler for `request`
    #[must_use]
    pub fn new(
        request: Request,
        codec: Arc<C>,
        reconstructor: ExceptionReconstructor,
        correlator: Arc<dyn ResponseCorrelator<C::Output>>,
        executor: Arc<dyn Executor>,
    ) -> Arc<Self> {
        Arc::new(Self {
            request,
            codec,
            reconstructor,
            correlator,
            executor,
            completed: AtomicBool::new(false),
        })
    }

    /// The call this stream completes
    #[must_use]
    pub fn request(&self) -> &Request {
        &self.request
    }

    /// Whether a completion event has been accepted
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.completed.load(Ordering::Acquire)
    }

    /// The body and trailers were fully received.
    pub fn on_complete(self: &Arc<Self>, body: Bytes, trailers: Metadata) {
        if !self.claim("complete") {
            return;
        }
        let this = Arc::clone(self);
        self.executor
            .execute(Box::new(move || this.complete(&body, trailers)));
    }

    /// The call failed at the transport level with `status`.
    pub fn on_error(self: &Arc<Self>, status: Status, trailers: Metadata) {
        if !self.claim("error") {
            return;
        }
        let this = Arc::clone(self);
        self.executor
            .execute(Box::new(move || this.fail(&status, trailers)));
    }

    /// Accept the first completion event only.
    fn claim(&self, event: &'static str) -> bool {
        if self
            .completed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!(request_id = %self.request.id(), event, "stream already completed, ignoring event");
            return false;
        }
        true
    }

    #[instrument(level = "debug", skip_all, fields(request_id = %self.request.id()))]
    fn complete(&self, body: &[u8], trailers: Metadata) {
        match self.codec.decode(body) {
            Ok(value) => {
                debug!(len = body.len(), "response body decoded");
                let result = AppResult::value(value, trailers.to_attachments());
                self.deliver(Response::success(&self.request, result));
            }
            Err(e) => {
                debug!(error = %e, "response body decode failed");
                let status = Status::internal(DESERIALIZE_FAILED).with_cause(e);
                self.fail(&status, trailers);
            }
        }
    }

    #[instrument(level = "debug", skip_all, fields(request_id = %self.request.id(), code = status.code().value()))]
    fn fail(&self, status: &Status, mut trailers: Metadata) {
        let exception = self.reconstructor.reconstruct(&mut trailers);
        // An exception is the authoritative failure signal; the legacy byte
        // only describes failures without one.
        let legacy = exception
            .is_none()
            .then(|| legacy::translate(status.code()));
        debug!(
            exception = exception.is_some(),
            legacy = ?legacy,
            "call failed"
        );
        let result = AppResult::failure(exception, trailers.to_attachments());
        self.deliver(Response::failure(
            &self.request,
            status.description(),
            legacy,
            result,
        ));
    }

    fn deliver(&self, response: Response<C::Output>) {
        self.correlator.deliver(self.request.id(), response);
    }
}
