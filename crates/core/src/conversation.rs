//! Conversation-related types.

use react_agent_model::{ModelMessage, ModelRequest, Role};

/// The ordered message history sent to the model.
///
/// A transcript belongs to exactly one session. Messages can only be
/// appended, and the order is the order the model sees them in.
#[derive(Clone, Default, Debug, PartialEq, Eq)]
pub struct Transcript {
    messages: Vec<ModelMessage>,
}

impl Transcript {
    /// Creates a transcript holding the system instructions and the first
    /// user message.
    pub fn new<S1: Into<String>, S2: Into<String>>(
        system_prompt: S1,
        user_input: S2,
    ) -> Self {
        Self {
            messages: vec![
                ModelMessage::system(system_prompt),
                ModelMessage::user(user_input),
            ],
        }
    }

    /// Appends a message.
    #[inline]
    pub fn push(&mut self, message: ModelMessage) {
        trace!("appending {:?} message", message.role);
        self.messages.push(message);
    }

    /// Appends a message written by the model.
    #[inline]
    pub fn push_assistant<S: Into<String>>(&mut self, content: S) {
        self.push(ModelMessage::assistant(content));
    }

    /// Appends a message on the user side, e.g. observations.
    #[inline]
    pub fn push_user<S: Into<String>>(&mut self, content: S) {
        self.push(ModelMessage::user(content));
    }

    /// Returns all messages, oldest first.
    #[inline]
    pub fn messages(&self) -> &[ModelMessage] {
        &self.messages
    }

    /// Returns the number of messages.
    #[inline]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Returns `true` if there are no messages.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Returns the most recent message written by `role`.
    pub fn last_from(&self, role: Role) -> Option<&ModelMessage> {
        self.messages.iter().rev().find(|msg| msg.role == role)
    }

    pub(crate) fn to_request(&self, model: Option<&str>) -> ModelRequest {
        ModelRequest {
            model: model.map(ToOwned::to_owned),
            messages: self.messages.clone(),
        }
    }
}

/// Wraps `content` in `<tag>...</tag>`.
#[inline]
pub fn wrap_in_tag(content: &str, tag: &str) -> String {
    format!("<{tag}>{content}</{tag}>")
}
