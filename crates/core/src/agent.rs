mod builder;
mod observation;
mod prompt;
#[cfg(test)]
mod tests;

use tracing::Instrument;

use crate::AgentError;
use crate::conversation::{Transcript, wrap_in_tag};
use crate::extract::extract_tag_content;
use crate::model_client::ModelClient;
use crate::tool::{MalformedCall, Registry, ToolCallRequest, ToolResult};
pub use builder::AgentBuilder;
use observation::Observations;

type OnStepFn = Box<dyn Fn(&Step<'_>) + Send + Sync>;

/// A ReAct agent: a model provider, a fixed set of tools, and the loop
/// that lets the model think, call tools and observe the results until it
/// comes up with a response.
///
/// An agent doesn't keep any state between sessions. Every call to
/// [`Agent::run`] starts a new transcript, so one agent can serve several
/// sessions at once.
pub struct Agent {
    model_client: ModelClient,
    model: Option<String>,
    registry: Registry,
    system_prompt: String,
    max_rounds: usize,
    on_step: Option<OnStepFn>,
}

/// How a [`Reply`] was produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ReplyKind {
    /// The model wrapped its answer in a `<response>` tag.
    Final,
    /// The round budget ran out. The text is the raw output of one last
    /// completion and may contain anything, tags included.
    Fallback,
    /// No tool is registered, so the raw output of a single completion is
    /// returned without running the loop.
    Direct,
}

/// The answer of a session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reply {
    text: String,
    kind: ReplyKind,
    rounds: usize,
}

impl Reply {
    /// Returns the answer text.
    #[inline]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Consumes the reply and returns the answer text.
    #[inline]
    pub fn into_text(self) -> String {
        self.text
    }

    /// Returns how the reply was produced.
    #[inline]
    pub fn kind(&self) -> ReplyKind {
        self.kind
    }

    /// Returns `true` if the model gave a proper `<response>`.
    #[inline]
    pub fn is_final(&self) -> bool {
        self.kind == ReplyKind::Final
    }

    /// Returns the number of loop rounds the session took.
    #[inline]
    pub fn rounds(&self) -> usize {
        self.rounds
    }
}

/// Progress reported to the callback set with [`AgentBuilder::on_step`].
#[derive(Debug)]
pub enum Step<'a> {
    /// The content of a `<thought>` span.
    Thought(&'a str),
    /// A parsed tool call, about to be validated and run.
    ToolCall(&'a ToolCallRequest),
    /// The outcome of a tool call.
    ToolResult {
        /// Id of the call.
        id: i64,
        /// What the tool returned, or why the call failed.
        result: &'a ToolResult,
    },
    /// The observation message appended to the transcript.
    Observations(&'a str),
    /// The text returned to the caller.
    Response(&'a str),
}

enum RoundOutcome {
    Terminal(String),
    ToolCalls,
    Neither,
}

impl Agent {
    /// Runs a session with the default round budget.
    #[inline]
    pub async fn run(&self, user_msg: &str) -> Result<Reply, AgentError> {
        self.run_with_max_rounds(user_msg, self.max_rounds).await
    }

    /// Runs a session that gives up after `max_rounds` rounds.
    ///
    /// A round is one completion plus the tool calls it asked for. When no
    /// round produced a response, one more completion is requested and
    /// returned as a [`ReplyKind::Fallback`] reply, so the model is asked
    /// at most `max_rounds + 1` times.
    ///
    /// Only a failing model provider makes this return an error. Anything
    /// that goes wrong with a tool call is reported to the model instead.
    pub async fn run_with_max_rounds(
        &self,
        user_msg: &str,
        max_rounds: usize,
    ) -> Result<Reply, AgentError> {
        let mut transcript = Transcript::new(
            self.system_prompt.as_str(),
            wrap_in_tag(user_msg, "question"),
        );

        if self.registry.is_empty() {
            debug!("no tools registered, skipping the loop");
            let text = self.complete(&transcript).await?;
            self.emit(Step::Response(&text));
            return Ok(Reply {
                text,
                kind: ReplyKind::Direct,
                rounds: 0,
            });
        }

        for round in 1..=max_rounds {
            let outcome = self
                .run_round(&mut transcript)
                .instrument(debug_span!("react round", round))
                .await?;
            match outcome {
                RoundOutcome::Terminal(text) => {
                    return Ok(Reply {
                        text,
                        kind: ReplyKind::Final,
                        rounds: round,
                    });
                }
                RoundOutcome::ToolCalls => {}
                RoundOutcome::Neither => {
                    debug!("round {round} had no response or tool calls");
                }
            }
        }

        warn!("no response after {max_rounds} rounds, falling back");
        let text = self.complete(&transcript).await?;
        self.emit(Step::Response(&text));
        Ok(Reply {
            text,
            kind: ReplyKind::Fallback,
            rounds: max_rounds,
        })
    }

    /// Returns the registered tools.
    #[inline]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Returns the system message every session starts with.
    #[inline]
    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    async fn run_round(
        &self,
        transcript: &mut Transcript,
    ) -> Result<RoundOutcome, AgentError> {
        let completion = self.complete(transcript).await?;

        let response = extract_tag_content(&completion, "response");
        if let Some(text) = response.first().filter(|text| !text.is_empty()) {
            debug!("got a response");
            self.emit(Step::Response(text));
            return Ok(RoundOutcome::Terminal(text.to_owned()));
        }

        for thought in extract_tag_content(&completion, "thought").content {
            debug!("thought: {thought}");
            self.emit(Step::Thought(&thought));
        }
        let tool_calls = extract_tag_content(&completion, "tool_call");
        transcript.push_assistant(completion);

        if !tool_calls.found {
            return Ok(RoundOutcome::Neither);
        }

        let observations = self.run_tool_calls(&tool_calls.content).await;
        let message = observations.to_message();
        debug!("{} observations: {message}", observations.len());
        self.emit(Step::Observations(&message));
        transcript.push_user(message);
        Ok(RoundOutcome::ToolCalls)
    }

    async fn run_tool_calls(&self, spans: &[String]) -> Observations {
        let mut observations = Observations::default();
        for (ordinal, span) in spans.iter().enumerate() {
            let call = match ToolCallRequest::parse(span) {
                Ok(call) => call,
                Err(MalformedCall { id, error }) => {
                    warn!("malformed tool call: {error}");
                    observations.insert_malformed(id, ordinal, &error);
                    continue;
                }
            };

            debug!("tool call: {call:?}");
            self.emit(Step::ToolCall(&call));
            let id = call.id;
            let result = self.registry.invoke(call).await;
            debug!("tool result ({id}): {result:?}");
            self.emit(Step::ToolResult {
                id,
                result: &result,
            });
            observations.insert(id, &result);
        }
        observations
    }

    async fn complete(
        &self,
        transcript: &Transcript,
    ) -> Result<String, AgentError> {
        let req = transcript.to_request(self.model.as_deref());
        let text = self.model_client.complete(&req).await?;
        trace!("completion: {text:?}");
        Ok(text)
    }

    #[inline]
    fn emit(&self, step: Step<'_>) {
        if let Some(on_step) = &self.on_step {
            on_step(&step);
        }
    }
}
