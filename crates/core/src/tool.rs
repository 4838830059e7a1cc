//! Tool call supports.

mod call;
mod error;
mod object;
mod registry;
mod signature;
mod validate;

use serde::de::DeserializeOwned;

pub use call::{MalformedCall, ToolCallRequest};
pub use error::{Error, ErrorKind};
pub(crate) use object::{ToolObject, ToolObjectImpl};
pub use registry::Registry;
pub use signature::{ParamType, ParameterSpec, ToolSignature};
pub use validate::validate_arguments;

/// The result of a tool call.
pub type ToolResult = Result<String, Error>;

/// A tool that can be called by the model.
///
/// Implementations of this trait should be stateless, and may not maintain any
/// internal state.
///
/// Arguments proposed by the model are checked against [`Tool::signature`]
/// before they are deserialized into [`Tool::Input`], so the signature must
/// describe the input type faithfully. [`ToolSignature::from_input`] derives
/// one from the input's JSON schema.
pub trait Tool: Send + Sync + 'static {
    /// The type of input that the tool accepts.
    type Input: DeserializeOwned;

    /// Returns the declared signature of the tool.
    fn signature(&self) -> &ToolSignature;

    /// Returns the name of the tool.
    #[inline]
    fn name(&self) -> &str {
        &self.signature().name
    }

    /// Executes the tool with the given input.
    ///
    /// This method must return a future that is fully independent of `self`.
    /// Failures should be reported as `Err`, they are turned into
    /// observations for the model.
    fn execute(
        &self,
        input: Self::Input,
    ) -> impl Future<Output = ToolResult> + Send + 'static;
}
