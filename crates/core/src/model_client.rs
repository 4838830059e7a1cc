use std::future::poll_fn;
use std::pin::{Pin, pin};
use std::sync::Arc;
use std::time::Duration;

use backoff::ExponentialBackoffBuilder;
use backoff::backoff::Backoff;
use react_agent_model::{
    ErrorKind, ModelFinishReason, ModelProvider, ModelProviderError,
    ModelRequest, ModelResponse, ModelResponseEvent,
};
use tracing::Instrument;

type SendRequestResult = Result<String, Box<dyn ModelProviderError>>;
type BoxedSendRequestFuture =
    Pin<Box<dyn Future<Output = SendRequestResult> + Send>>;
#[rustfmt::skip]
type HandlerFn = Arc<
    dyn Fn(ModelRequest) -> BoxedSendRequestFuture + Send + Sync
>;

/// How failed completion requests are retried.
///
/// Only transient failures (rate limiting, timeouts) are retried, with an
/// exponential backoff. Other failures are returned right away.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    enabled: bool,
    initial_interval: Duration,
    max_interval: Duration,
    max_elapsed_time: Option<Duration>,
}

impl RetryPolicy {
    /// Never retries.
    #[inline]
    pub fn none() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Retries with delays growing from `initial_interval` up to
    /// `max_interval`.
    #[inline]
    pub fn exponential(
        initial_interval: Duration,
        max_interval: Duration,
    ) -> Self {
        Self {
            initial_interval,
            max_interval,
            ..Self::default()
        }
    }

    /// Gives up once `limit` has passed since the first attempt. `None`
    /// retries for as long as the failures stay transient.
    #[inline]
    pub fn with_max_elapsed_time(mut self, limit: Option<Duration>) -> Self {
        self.max_elapsed_time = limit;
        self
    }

    /// Returns `true` unless this is [`RetryPolicy::none`].
    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn to_backoff(self) -> impl Backoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(self.initial_interval)
            .with_max_interval(self.max_interval)
            .with_max_elapsed_time(self.max_elapsed_time)
            .build()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            initial_interval: Duration::from_millis(500),
            max_interval: Duration::from_secs(8),
            max_elapsed_time: Some(Duration::from_secs(30)),
        }
    }
}

/// Returned when the provider doesn't finish a response in time.
#[derive(Debug, thiserror::Error)]
#[error("no complete response within {0:?}")]
pub(crate) struct RequestTimeout(Duration);

impl ModelProviderError for RequestTimeout {
    #[inline]
    fn kind(&self) -> ErrorKind {
        ErrorKind::Timeout
    }
}

/// A wrapper around a model provider that turns a transcript into the
/// complete text of one assistant turn.
///
/// The provider type is erased so the agent doesn't need a generic
/// parameter for it.
#[derive(Clone)]
pub(crate) struct ModelClient {
    handler_fn: HandlerFn,
    retry_policy: RetryPolicy,
    timeout: Option<Duration>,
}

impl ModelClient {
    #[inline]
    pub fn new<P: ModelProvider + 'static>(provider: P) -> Self {
        let handler_fn: HandlerFn = Arc::new(move |req| {
            let fut = provider.send_request(&req);
            Box::pin(
                async move {
                    let len = req.messages.len();
                    trace!("got a request with {len} messages");
                    let resp_or_err = fut.await;
                    handle_response::<P>(resp_or_err).await
                }
                .instrument(trace_span!("model client req")),
            )
        });
        Self {
            handler_fn,
            retry_policy: RetryPolicy::default(),
            timeout: None,
        }
    }

    #[inline]
    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    #[inline]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sends the request and waits for the whole response text.
    ///
    /// Transient failures are retried according to the retry policy, each
    /// attempt sending the same request again.
    pub async fn complete(&self, req: &ModelRequest) -> SendRequestResult {
        if !self.retry_policy.is_enabled() {
            return self.complete_once(req.clone()).await;
        }

        let operation = || {
            let fut = self.complete_once(req.clone());
            async move {
                fut.await.map_err(|err| {
                    if err.kind().is_transient() {
                        warn!("completion failed, will retry: {err}");
                        backoff::Error::transient(err)
                    } else {
                        backoff::Error::permanent(err)
                    }
                })
            }
        };
        backoff::future::retry(self.retry_policy.to_backoff(), operation).await
    }

    fn complete_once(&self, req: ModelRequest) -> BoxedSendRequestFuture {
        let fut = (self.handler_fn)(req);
        let Some(timeout) = self.timeout else {
            return fut;
        };
        Box::pin(async move {
            match tokio::time::timeout(timeout, fut).await {
                Ok(result) => result,
                Err(_) => {
                    warn!("completion timed out after {timeout:?}");
                    Err(Box::new(RequestTimeout(timeout))
                        as Box<dyn ModelProviderError>)
                }
            }
        })
    }
}

async fn handle_response<P: ModelProvider + 'static>(
    resp_or_err: Result<P::Response, P::Error>,
) -> SendRequestResult {
    let resp = match resp_or_err {
        Ok(resp) => resp,
        Err(err) => {
            error!("got an error: {err:?}");
            return Err(Box::new(err));
        }
    };

    let mut text = String::new();

    trace!("start receiving events");

    let mut pinned_resp = pin!(resp);
    loop {
        let event_or_err =
            poll_fn(|cx| pinned_resp.as_mut().poll_next_event(cx)).await;
        let event = match event_or_err {
            Ok(Some(event)) => event,
            Ok(None) => break,
            Err(err) => {
                error!("got an error: {err:?}");
                return Err(Box::new(err));
            }
        };

        match event {
            ModelResponseEvent::MessageDelta(delta) => {
                text.push_str(&delta);
            }
            ModelResponseEvent::Completed(ModelFinishReason::Length) => {
                warn!("response was cut off by the length limit");
            }
            ModelResponseEvent::Completed(ModelFinishReason::Stop) => {}
        }
    }

    trace!("finished a request: {text:?}");
    Ok(text)
}
