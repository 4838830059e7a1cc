use std::pin::Pin;
use std::task::{self, Poll};

use serde::{Deserialize, Serialize};

use crate::provider::ModelProviderError;

/// A completion being streamed back by a provider.
///
/// The text arrives as a sequence of [`ModelResponseEvent::MessageDelta`]
/// events, followed by a [`ModelResponseEvent::Completed`] event once the
/// model stops generating.
pub trait ModelResponse: Sized + Send + 'static {
    /// The error type of the owning provider.
    type Error: ModelProviderError;

    /// Polls for the next piece of the completion.
    ///
    /// Returns `Poll::Ready(Ok(Some(_)))` for every event,
    /// `Poll::Ready(Ok(None))` once the stream is exhausted, and
    /// `Poll::Ready(Err(_))` if the stream broke. While no event is
    /// available yet, `Poll::Pending` is returned and the waker in `cx` is
    /// registered.
    ///
    /// Polling an exhausted stream keeps returning `Ok(None)`.
    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut task::Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>>;
}

/// Why the model stopped generating.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelFinishReason {
    /// The model reached a natural stop.
    Stop,
    /// The output was cut off by the provider's token limit.
    Length,
}

/// One item of a streamed completion.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelResponseEvent {
    /// No more text will follow.
    Completed(ModelFinishReason),
    /// The next chunk of completion text.
    MessageDelta(String),
}
