//! A local fake model for testing purpose.

mod preset;

use std::error::Error as StdError;
use std::fmt::{self, Debug, Display, Formatter};
use std::future::ready;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};
use std::task::{Context, Poll, ready};
use std::time::Duration;

use react_agent_model::{
    ErrorKind, ModelFinishReason, ModelProvider, ModelProviderError,
    ModelRequest, ModelResponse, ModelResponseEvent,
};
use tokio::time::{Sleep, sleep};

pub use preset::*;

#[derive(Debug)]
pub struct Error {
    message: String,
    kind: ErrorKind,
}

impl Error {
    fn new(message: impl Into<String>, kind: ErrorKind) -> Self {
        Self {
            message: message.into(),
            kind,
        }
    }

    /// Returns the error message.
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.kind)
    }
}

impl StdError for Error {}

impl ModelProviderError for Error {
    #[inline]
    fn kind(&self) -> ErrorKind {
        self.kind
    }
}

pub struct TestModelResponse {
    events: Vec<PresetEvent>,
    event_idx: usize,
    delay: Duration,
    sleep: Option<Pin<Box<Sleep>>>,
}

impl ModelResponse for TestModelResponse {
    type Error = crate::Error;

    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>> {
        // SAFETY: This type does not require to be pinned.
        let this = unsafe { self.get_unchecked_mut() };

        if let Some(sleep) = &mut this.sleep {
            ready!(sleep.as_mut().poll(cx));
            this.sleep = None;

            let idx = this.event_idx;
            this.event_idx += 1;
            return match this.events.get(idx) {
                Some(PresetEvent::MessageDelta(msg)) => {
                    Poll::Ready(Ok(Some(ModelResponseEvent::MessageDelta(
                        msg.clone(),
                    ))))
                }
                Some(PresetEvent::Error(msg)) => {
                    Poll::Ready(Err(Error::new(msg.clone(), ErrorKind::Other)))
                }
                None if idx == this.events.len() => Poll::Ready(Ok(Some(
                    ModelResponseEvent::Completed(ModelFinishReason::Stop),
                ))),
                // In case this method is called after completion.
                None => Poll::Ready(Ok(None)),
            };
        }
        this.sleep = Some(Box::pin(sleep(this.delay)));
        Pin::new(this).poll_next_event(cx)
    }
}

#[derive(Default)]
struct ScriptState {
    next_step: usize,
    attempts: usize,
    requests: Vec<ModelRequest>,
}

/// A local fake model for testing purpose.
///
/// Before sending requests, you need to setup the script, which is how the
/// model should respond to each request. Steps are consumed in order, one
/// per successful request. Once the script is exhausted, the default
/// response is replayed if there is one, otherwise an error is returned.
///
/// Clones share the same script position and request log, so a test can
/// keep a clone around to inspect what the agent sent.
///
/// # Note
///
/// This type is not optimized for production use, there are heavy memory
/// copies involved. You should only use it for testing.
#[derive(Clone, Default)]
pub struct TestModelProvider {
    script: Vec<PresetResponse>,
    default_response: Option<PresetResponse>,
    delay: Option<Duration>,
    state: Arc<Mutex<ScriptState>>,
}

impl TestModelProvider {
    #[inline]
    pub fn add_response_step(&mut self, preset: PresetResponse) {
        self.script.push(preset);
    }

    /// Adds a step that streams `text` back.
    #[inline]
    pub fn add_text_step(&mut self, text: &str) {
        self.add_response_step(PresetResponse::with_text(text));
    }

    /// Sets the response replayed after the script is exhausted.
    #[inline]
    pub fn set_default_response(&mut self, preset: PresetResponse) {
        self.default_response = Some(preset);
    }

    #[inline]
    pub fn set_delay(&mut self, duration: Duration) {
        self.delay = Some(duration);
    }

    /// Returns how many requests have been received, failed ones included.
    #[inline]
    pub fn request_count(&self) -> usize {
        self.lock_state().requests.len()
    }

    /// Returns every request received so far, oldest first.
    #[inline]
    pub fn requests(&self) -> Vec<ModelRequest> {
        self.lock_state().requests.clone()
    }

    fn lock_state(&self) -> MutexGuard<'_, ScriptState> {
        // A panicking test thread may poison the lock; the state is still
        // usable for inspection.
        self.state.lock().unwrap_or_else(|err| err.into_inner())
    }

    fn next_preset(&self, req: &ModelRequest) -> Result<PresetResponse, Error> {
        let mut state = self.lock_state();
        state.requests.push(req.clone());

        let preset = match self.script.get(state.next_step) {
            Some(preset) => preset,
            None => match &self.default_response {
                Some(preset) => preset,
                None => {
                    return Err(Error::new("no enough steps", ErrorKind::Other));
                }
            },
        };

        match preset.failures {
            Some(0) => {
                return Err(Error::new(
                    "preset failure",
                    ErrorKind::RateLimitExceeded,
                ));
            }
            Some(failures) if (state.attempts as u64) < failures => {
                state.attempts += 1;
                return Err(Error::new(
                    "preset failure",
                    ErrorKind::RateLimitExceeded,
                ));
            }
            _ => {}
        }

        let preset = preset.clone();
        state.attempts = 0;
        state.next_step += 1;
        Ok(preset)
    }
}

impl ModelProvider for TestModelProvider {
    type Error = crate::Error;
    type Response = TestModelResponse;

    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static
    {
        let resp = self.next_preset(req).map(|preset| TestModelResponse {
            events: preset.events,
            event_idx: 0,
            delay: self.delay.unwrap_or(Duration::from_millis(1)),
            sleep: None,
        });
        ready(resp)
    }
}
