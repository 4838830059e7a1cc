use std::pin::Pin;

use serde_json::{Map, Value};

use super::{Error, Tool, ToolResult, ToolSignature};

pub(crate) trait ToolObject: Send + Sync + 'static {
    fn signature(&self) -> &ToolSignature;

    /// Deserializes already validated arguments and starts the tool.
    fn execute(
        &self,
        arguments: Map<String, Value>,
    ) -> Pin<Box<dyn Future<Output = ToolResult> + Send>>;
}

pub(crate) struct ToolObjectImpl<T: Tool>(pub T);

impl<T: Tool> ToolObject for ToolObjectImpl<T> {
    #[inline]
    fn signature(&self) -> &ToolSignature {
        self.0.signature()
    }

    #[inline]
    fn execute(
        &self,
        arguments: Map<String, Value>,
    ) -> Pin<Box<dyn Future<Output = ToolResult> + Send>> {
        let arguments = Value::Object(arguments);
        let input = match serde_json::from_value::<T::Input>(arguments) {
            Ok(input) => input,
            Err(err) => {
                // The signature let through something the input type can't
                // hold, e.g. an enum value out of range.
                let reason = format!("{err}");
                return Box::pin(std::future::ready(ToolResult::Err(
                    Error::invalid_input().with_reason(reason),
                )));
            }
        };
        Box::pin(self.0.execute(input))
    }
}
