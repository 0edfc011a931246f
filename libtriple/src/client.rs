//! Wiring: one shared client that creates a completion stream per call.

use std::{fmt, sync::Arc};

use tokio::sync::oneshot;
use tracing::debug;

use crate::{
    codec::BodyCodec,
    config::ClientConfig,
    correlator::{PendingCalls, ResponseCorrelator},
    error::TripleError,
    exception::{ExceptionReconstructor, ExceptionRegistry},
    executor::Executor,
    response::{Request, RequestId, Response},
    stream::UnaryClientStream,
};

/// Shared state for unary calls of one response type.
///
/// The transport calls [`UnaryClient::start`] when it issues a request, keeps
/// the returned stream to report completion on, and the caller awaits the
/// receiver.
pub struct UnaryClient<C: BodyCodec> {
    config: ClientConfig,
    codec: Arc<C>,
    reconstructor: ExceptionReconstructor,
    pending: Arc<PendingCalls<C::Output>>,
    executor: Arc<dyn Executor>,
}

impl<C: BodyCodec> fmt::Debug for UnaryClient<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnaryClient")
            .field("config", &self.config)
            .field("pending", &self.pending)
            .finish_non_exhaustive()
    }
}

impl<C: BodyCodec> UnaryClient<C> {
    /// Create a client
    #[must_use]
    pub fn new(
        config: ClientConfig,
        codec: C,
        registry: Arc<dyn ExceptionRegistry>,
        executor: Arc<dyn Executor>,
    ) -> Self {
        let reconstructor = ExceptionReconstructor::new(registry, config.hints());
        Self {
            config,
            codec: Arc::new(codec),
            reconstructor,
            pending: Arc::new(PendingCalls::new()),
            executor,
        }
    }

    /// Client configuration
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Outstanding calls
    #[must_use]
    pub fn pending(&self) -> &PendingCalls<C::Output> {
        &self.pending
    }

    /// Register call `id` and build the stream that will complete it.
    ///
    /// # Errors
    /// Returns error if `id` is still pending from an earlier call
    pub fn start(
        &self,
        id: RequestId,
    ) -> Result<
        (
            Arc<UnaryClientStream<C>>,
            oneshot::Receiver<Response<C::Output>>,
        ),
        TripleError,
    > {
        let rx = self.pending.register(id)?;
        let correlator = Arc::clone(&self.pending) as Arc<dyn ResponseCorrelator<C::Output>>;
        let stream = UnaryClientStream::new(
            Request::new(id, self.config.version.as_str()),
            Arc::clone(&self.codec),
            self.reconstructor.clone(),
            correlator,
            Arc::clone(&self.executor),
        );
        debug!(request_id = %id, "unary call started");
        Ok((stream, rx))
    }

    /// Forget call `id`; a response arriving later is dropped.
    pub fn cancel(&self, id: RequestId) -> bool {
        self.pending.cancel(id)
    }
}
