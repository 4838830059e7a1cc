use std::time::Duration;

use react_agent_model::ModelProvider;

use super::{Agent, OnStepFn, Step, prompt};
use crate::AgentError;
use crate::model_client::{ModelClient, RetryPolicy};
use crate::tool::{Registry, Tool, ToolObject, ToolObjectImpl};

const DEFAULT_MAX_ROUNDS: usize = 10;

/// [`Agent`] builder.
pub struct AgentBuilder {
    model_client: ModelClient,
    model: Option<String>,
    system_prompt: Option<String>,
    max_rounds: usize,
    request_timeout: Option<Duration>,
    retry_policy: RetryPolicy,
    tools: Vec<Box<dyn ToolObject>>,
    on_step: Option<OnStepFn>,
}

impl AgentBuilder {
    /// Creates a new builder with the specified model provider.
    #[inline]
    pub fn with_model_provider<P: ModelProvider + 'static>(
        provider: P,
    ) -> Self {
        Self {
            model_client: ModelClient::new(provider),
            model: None,
            system_prompt: None,
            max_rounds: DEFAULT_MAX_ROUNDS,
            request_timeout: None,
            retry_policy: RetryPolicy::default(),
            tools: vec![],
            on_step: None,
        }
    }

    /// Sets the model identifier forwarded with every request.
    #[inline]
    pub fn with_model<S: Into<String>>(mut self, model: S) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sets the instructions placed before the tool-use instructions in
    /// the system message.
    #[inline]
    pub fn with_system_prompt<S: Into<String>>(mut self, prompt: S) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Sets the round budget used by [`Agent::run`]. Defaults to 10.
    #[inline]
    pub fn with_max_rounds(mut self, max_rounds: usize) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    /// Limits how long a single completion request may take, streaming
    /// included. A request that runs out of time fails with a transient
    /// error and is retried like one.
    #[inline]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Sets how failed completion requests are retried.
    #[inline]
    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    /// Attaches a callback invoked as the agent makes progress.
    #[inline]
    pub fn on_step(
        mut self,
        on_step: impl Fn(&Step<'_>) + Send + Sync + 'static,
    ) -> Self {
        self.on_step = Some(Box::new(on_step));
        self
    }

    /// Registers a tool.
    #[inline]
    pub fn with_tool<T: Tool>(mut self, tool: T) -> Self {
        self.tools.push(Box::new(ToolObjectImpl(tool)));
        self
    }

    /// Builds the agent.
    ///
    /// Fails if two tools share a name.
    pub fn build(self) -> Result<Agent, AgentError> {
        let AgentBuilder {
            model_client,
            model,
            system_prompt,
            max_rounds,
            request_timeout,
            retry_policy,
            tools,
            on_step,
        } = self;

        let registry = Registry::with_tools(tools)?;
        let system_prompt = prompt::system_prompt(
            system_prompt.as_deref(),
            registry.signatures(),
        );
        debug!(
            "built an agent with {} tools, up to {max_rounds} rounds",
            registry.len()
        );

        Ok(Agent {
            model_client: model_client
                .with_retry_policy(retry_policy)
                .with_timeout(request_timeout),
            model,
            registry,
            system_prompt,
            max_rounds,
            on_step,
        })
    }
}
