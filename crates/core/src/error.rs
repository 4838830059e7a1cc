use react_agent_model::{ErrorKind, ModelProviderError};

/// Errors that end a session or prevent an agent from being built.
///
/// Problems with individual tool calls are not in here: they are reported
/// to the model as observations instead.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// The completion gateway failed and retrying didn't help.
    #[error("completion request failed: {0}")]
    Model(Box<dyn ModelProviderError>),
    /// Two registered tools share a name.
    #[error("tool `{0}` is registered more than once")]
    DuplicateTool(String),
}

impl AgentError {
    /// Returns the gateway error kind, if this is a gateway failure.
    #[inline]
    pub fn model_error_kind(&self) -> Option<ErrorKind> {
        match self {
            AgentError::Model(err) => Some(err.kind()),
            AgentError::DuplicateTool(_) => None,
        }
    }
}

impl From<Box<dyn ModelProviderError>> for AgentError {
    #[inline]
    fn from(err: Box<dyn ModelProviderError>) -> Self {
        AgentError::Model(err)
    }
}
