use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::Error;

/// A tool call proposed by the model inside a `<tool_call>` span.
///
/// The `id` is chosen by the model. It is expected to increase within a
/// round but nothing checks that.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// Correlates the call with its observation.
    pub id: i64,
    /// Name of the requested tool.
    pub name: String,
    /// Arguments keyed by parameter name.
    pub arguments: Map<String, Value>,
}

/// A `<tool_call>` span that could not be turned into a request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MalformedCall {
    /// The id, if the span got far enough to carry one.
    pub id: Option<i64>,
    /// Why the span was rejected.
    pub error: Error,
}

impl ToolCallRequest {
    /// Parses the JSON body of a `<tool_call>` span.
    ///
    /// Models are sloppy with this format, so a few deviations are
    /// accepted: the id may be a string of digits, the arguments may be
    /// missing or be a JSON-encoded string of an object.
    pub fn parse(span: &str) -> Result<Self, MalformedCall> {
        let value = serde_json::from_str::<Value>(span).map_err(|err| {
            MalformedCall {
                id: None,
                error: Error::parse_error().with_reason(format!("{err}")),
            }
        })?;
        let Value::Object(mut object) = value else {
            return Err(MalformedCall {
                id: None,
                error: Error::parse_error()
                    .with_reason("expected a JSON object"),
            });
        };

        let id = object.get("id").and_then(parse_id);
        let malformed = |reason: &str| MalformedCall {
            id,
            error: Error::parse_error().with_reason(reason),
        };

        let Some(id) = id else {
            return Err(malformed("missing or non-integer `id`"));
        };
        let Some(name) = object.get("name").and_then(Value::as_str) else {
            return Err(malformed("missing `name`"));
        };
        let name = name.to_owned();

        let arguments = match object.remove("arguments") {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(arguments)) => arguments,
            Some(Value::String(encoded)) => {
                match serde_json::from_str::<Value>(&encoded) {
                    Ok(Value::Object(arguments)) => arguments,
                    _ => return Err(malformed("`arguments` is not an object")),
                }
            }
            Some(_) => return Err(malformed("`arguments` is not an object")),
        };

        Ok(Self {
            id,
            name,
            arguments,
        })
    }
}

fn parse_id(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
