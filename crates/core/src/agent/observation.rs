use std::collections::BTreeMap;
use std::fmt::{self, Display};

use serde_json::{Map, Value};

use crate::conversation::wrap_in_tag;
use crate::tool::{Error, ToolResult};

/// Identifies an entry in the observations of a round.
///
/// Calls are ordered by id and come before spans that never yielded an id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) enum ObservationKey {
    Call(i64),
    /// Ordinal of the `<tool_call>` span within the round.
    Malformed(usize),
}

impl Display for ObservationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObservationKey::Call(id) => write!(f, "{id}"),
            ObservationKey::Malformed(ordinal) => {
                write!(f, "malformed-{ordinal}")
            }
        }
    }
}

/// The outcome of every tool call in one round.
#[derive(Clone, Debug, Default)]
pub(crate) struct Observations {
    entries: BTreeMap<ObservationKey, Value>,
}

impl Observations {
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Records the result of the call with `id`. A later call reusing the
    /// id replaces the earlier result.
    pub fn insert(&mut self, id: i64, result: &ToolResult) {
        let value = match result {
            Ok(text) => result_value(text),
            Err(err) => error_value(err),
        };
        self.put(ObservationKey::Call(id), value);
    }

    /// Records a span that could not be turned into a call.
    pub fn insert_malformed(
        &mut self,
        id: Option<i64>,
        ordinal: usize,
        err: &Error,
    ) {
        let key = match id {
            Some(id) => ObservationKey::Call(id),
            None => ObservationKey::Malformed(ordinal),
        };
        self.put(key, error_value(err));
    }

    fn put(&mut self, key: ObservationKey, value: Value) {
        if self.entries.insert(key, value).is_some() {
            warn!("tool call id {key} reused, keeping the last result");
        }
    }

    #[cfg(test)]
    pub fn get(&self, key: ObservationKey) -> Option<&Value> {
        self.entries.get(&key)
    }

    /// Serializes the observations into the message sent back to the model.
    pub fn to_message(&self) -> String {
        let object = self
            .entries
            .iter()
            .map(|(key, value)| (key.to_string(), value.clone()))
            .collect::<Map<_, _>>();
        wrap_in_tag(&Value::Object(object).to_string(), "observation")
    }
}

/// Structured results are embedded as JSON, anything else as a string.
fn result_value(text: &str) -> Value {
    match serde_json::from_str::<Value>(text) {
        Ok(value @ (Value::Object(_) | Value::Array(_))) => value,
        _ => Value::String(text.to_owned()),
    }
}

fn error_value(err: &Error) -> Value {
    Value::String(format!("error: {err}"))
}
