use std::borrow::Cow;
use std::error::Error as StdError;
use std::fmt::{self, Display};

/// The kind of error that occurred.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The tool call itself could not be read from the model output.
    Parse,
    /// The model asked for a tool that is not registered.
    UnknownTool,
    /// The arguments don't match the tool's signature.
    ArgumentValidation,
    /// Error occurred while executing the tool.
    Execution,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Parse => write!(f, "Malformed tool call"),
            ErrorKind::UnknownTool => write!(f, "Unknown tool"),
            ErrorKind::ArgumentValidation => write!(f, "Invalid arguments"),
            ErrorKind::Execution => write!(f, "Execution error"),
        }
    }
}

/// Describes a tool call error.
///
/// Every tool call error is recoverable: it ends up in the observations
/// sent back to the model, which can then correct itself.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Error {
    kind: ErrorKind,
    reason: Option<String>,
    parameter: Option<String>,
}

impl Error {
    #[inline]
    fn with_kind(kind: ErrorKind) -> Self {
        Self {
            kind,
            reason: None,
            parameter: None,
        }
    }

    /// Creates a new error with the `Parse` kind.
    #[inline]
    pub fn parse_error() -> Self {
        Self::with_kind(ErrorKind::Parse)
    }

    /// Creates a new error with the `UnknownTool` kind.
    #[inline]
    pub fn unknown_tool(name: &str) -> Self {
        Self::with_kind(ErrorKind::UnknownTool)
            .with_reason(format!("no tool named `{name}`"))
    }

    /// Creates a new error with the `ArgumentValidation` kind, without
    /// blaming a particular parameter.
    #[inline]
    pub fn invalid_input() -> Self {
        Self::with_kind(ErrorKind::ArgumentValidation)
    }

    /// Creates a new error with the `ArgumentValidation` kind, blaming
    /// `parameter`.
    #[inline]
    pub fn invalid_argument<S: Into<String>>(parameter: S) -> Self {
        Self {
            parameter: Some(parameter.into()),
            ..Self::with_kind(ErrorKind::ArgumentValidation)
        }
    }

    /// Creates a new error with the `Execution` kind.
    #[inline]
    pub fn execution_error() -> Self {
        Self::with_kind(ErrorKind::Execution)
    }

    /// Attaches a reason to the error.
    #[inline]
    pub fn with_reason<S: Into<String>>(self, reason: S) -> Self {
        Self {
            reason: Some(reason.into()),
            ..self
        }
    }

    /// Returns the kind of this error.
    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the offending parameter of an argument validation error.
    #[inline]
    pub fn parameter(&self) -> Option<&str> {
        self.parameter.as_deref()
    }

    /// Returns the reason for the error.
    #[inline]
    pub fn reason(&self) -> Cow<'_, str> {
        match self.reason.as_deref() {
            Some(reason) => Cow::Borrowed(reason),
            None => Cow::Owned(format!("{}", self.kind)),
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(parameter) = &self.parameter {
            write!(f, " (`{parameter}`)")?;
        }
        if let Some(reason) = &self.reason {
            write!(f, ": {reason}")?;
        }
        Ok(())
    }
}

impl StdError for Error {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = Error::invalid_argument("coin").with_reason("missing");
        assert_eq!(err.to_string(), "Invalid arguments (`coin`): missing");
        assert_eq!(err.parameter(), Some("coin"));

        let err = Error::unknown_tool("weather");
        assert_eq!(err.kind(), ErrorKind::UnknownTool);
        assert_eq!(err.to_string(), "Unknown tool: no tool named `weather`");

        let err = Error::execution_error();
        assert_eq!(err.reason(), "Execution error");
        assert_eq!(err.to_string(), "Execution error");
    }
}
