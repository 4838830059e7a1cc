use std::error::Error;

use crate::error::ErrorKind;
use crate::request::ModelRequest;
use crate::response::ModelResponse;

/// An error reported by a completion gateway.
pub trait ModelProviderError: Error + Send + Sync + 'static {
    /// Classifies the error, which decides whether it is worth retrying.
    fn kind(&self) -> ErrorKind;
}

/// A completion gateway: takes the transcript so far and streams back the
/// next assistant message.
///
/// Providers are shared by concurrent sessions and must not rely on being
/// called in any particular order. Keeping connection pools or caches
/// inside is fine.
pub trait ModelProvider: Send + Sync {
    /// The error type of this provider.
    type Error: ModelProviderError;

    /// The streamed completion type.
    type Response: ModelResponse<Error = Self::Error>;

    /// Starts a completion for `req`.
    ///
    /// The returned future must not borrow `self`, so the caller is free
    /// to retry or time it out independently.
    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static;
}
