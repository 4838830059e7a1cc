use std::collections::HashMap;
use std::sync::Arc;

use tracing::Instrument;

use super::object::ToolObject;
use super::{
    Error, ToolCallRequest, ToolResult, ToolSignature, validate_arguments,
};
use crate::AgentError;

/// Maps tool names to their signatures and implementations.
///
/// The registry is fixed once built. Signatures are kept in registration
/// order so the prompt listing them is stable.
pub struct Registry {
    tools: Vec<Arc<dyn ToolObject>>,
    by_name: HashMap<String, usize>,
}

impl Registry {
    pub(crate) fn with_tools(
        tools: Vec<Box<dyn ToolObject>>,
    ) -> Result<Self, AgentError> {
        let mut by_name = HashMap::with_capacity(tools.len());
        let mut registered: Vec<Arc<dyn ToolObject>> =
            Vec::with_capacity(tools.len());
        for tool in tools {
            let name = tool.signature().name.clone();
            if by_name.contains_key(&name) {
                return Err(AgentError::DuplicateTool(name));
            }
            by_name.insert(name, registered.len());
            registered.push(Arc::from(tool));
        }
        Ok(Self {
            tools: registered,
            by_name,
        })
    }

    /// Returns `true` if no tool is registered.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Returns the number of registered tools.
    #[inline]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Returns the signature of every tool, in registration order.
    pub fn signatures(&self) -> impl Iterator<Item = &ToolSignature> {
        self.tools.iter().map(|tool| tool.signature())
    }

    /// Looks up the signature of a tool.
    pub fn signature(&self, name: &str) -> Result<&ToolSignature, Error> {
        self.get(name).map(|tool| tool.signature())
    }

    fn get(&self, name: &str) -> Result<&Arc<dyn ToolObject>, Error> {
        self.by_name
            .get(name)
            .map(|&idx| &self.tools[idx])
            .ok_or_else(|| Error::unknown_tool(name))
    }

    /// Validates and runs one tool call.
    ///
    /// Nothing that goes wrong here is fatal: an unknown tool, bad
    /// arguments, an error returned by the tool, or a tool panicking all
    /// end up as `Err`.
    pub async fn invoke(&self, call: ToolCallRequest) -> ToolResult {
        let tool = self.get(&call.name).inspect_err(|_| {
            warn!("tool not found: {}", call.name);
        })?;
        let call = validate_arguments(call, tool.signature())
            .inspect_err(|err| warn!("rejected tool call: {err}"))?;

        let ToolCallRequest {
            id,
            name,
            arguments,
        } = call;
        trace!("running tool `{name}` ({id}) with args: {arguments:?}");

        // Run it as a task of its own so a panic only takes down this call,
        // including one raised before the tool hands out its future.
        let tool = Arc::clone(tool);
        let span = debug_span!("tool execute", tool = %name, id);
        let task = async move { tool.execute(arguments).await };
        match tokio::spawn(task.instrument(span)).await {
            Ok(result) => result,
            Err(err) if err.is_panic() => {
                error!("tool `{name}` panicked");
                Err(Error::execution_error().with_reason("the tool panicked"))
            }
            Err(err) => {
                Err(Error::execution_error().with_reason(format!("{err}")))
            }
        }
    }
}
