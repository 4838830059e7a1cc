use std::future::ready;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use react_agent_model::{ErrorKind, Role};
use react_agent_test_model::{PresetResponse, TestModelProvider};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::extract::extract_tag_content;
use crate::tool::{Error, Tool, ToolResult, ToolSignature};
use crate::{AgentBuilder, AgentError, ReplyKind, RetryPolicy, Step};

#[derive(Deserialize, JsonSchema)]
struct PriceInput {
    /// Coin identifier, e.g. `bitcoin`.
    coin: String,
}

struct PriceTool {
    signature: ToolSignature,
}

impl PriceTool {
    fn new() -> Self {
        Self {
            signature: ToolSignature::from_input::<PriceInput>(
                "price",
                "Returns the current price of a coin",
            ),
        }
    }
}

impl Tool for PriceTool {
    type Input = PriceInput;

    fn signature(&self) -> &ToolSignature {
        &self.signature
    }

    fn execute(
        &self,
        input: Self::Input,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let result = match input.coin.as_str() {
            "bitcoin" => Ok(r#"{"price": "$96,065.33"}"#.to_owned()),
            "ethereum" => Ok(r#"{"price": "$3,310.20"}"#.to_owned()),
            coin => Err(Error::execution_error()
                .with_reason(format!("no quote for {coin}"))),
        };
        ready(result)
    }
}

struct PanicTool {
    signature: ToolSignature,
}

impl Tool for PanicTool {
    type Input = Value;

    fn signature(&self) -> &ToolSignature {
        &self.signature
    }

    fn execute(
        &self,
        _input: Self::Input,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        async { explode() }
    }
}

fn explode() -> ToolResult {
    panic!("the tool blew up")
}

/// Panics in `execute` itself, before any future exists.
struct EagerPanicTool {
    signature: ToolSignature,
}

impl Tool for EagerPanicTool {
    type Input = Value;

    fn signature(&self) -> &ToolSignature {
        &self.signature
    }

    fn execute(
        &self,
        _input: Self::Input,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let result = explode();
        ready(result)
    }
}

fn builder(provider: &TestModelProvider) -> AgentBuilder {
    AgentBuilder::with_model_provider(provider.clone())
        .with_retry_policy(RetryPolicy::none())
        .with_tool(PriceTool::new())
}

/// Parses the observation message of the `nth` request's last message.
fn observation_in_request(provider: &TestModelProvider, nth: usize) -> Value {
    let requests = provider.requests();
    let last = requests[nth].messages.last().unwrap();
    assert_eq!(last.role, Role::User);
    let extraction = extract_tag_content(&last.content, "observation");
    serde_json::from_str(extraction.first().unwrap()).unwrap()
}

#[tokio::test]
async fn test_response_in_first_round() {
    let mut provider = TestModelProvider::default();
    provider.add_text_step(
        "<thought>I already know this.</thought>\n\
         <response>Bitcoin is a coin.</response>",
    );

    let agent = builder(&provider).build().unwrap();
    let reply = agent.run("What is Bitcoin?").await.unwrap();

    assert_eq!(reply.text(), "Bitcoin is a coin.");
    assert_eq!(reply.kind(), ReplyKind::Final);
    assert!(reply.is_final());
    assert_eq!(reply.rounds(), 1);
    assert_eq!(provider.request_count(), 1);
}

#[tokio::test]
async fn test_initial_messages() {
    let mut provider = TestModelProvider::default();
    provider.add_text_step("<response>ok</response>");

    let agent = builder(&provider)
        .with_system_prompt("You are a crypto analyst.")
        .with_model("llama3-70b")
        .build()
        .unwrap();
    agent.run("What is the price of Solana?").await.unwrap();

    let requests = provider.requests();
    let request = &requests[0];
    assert_eq!(request.model.as_deref(), Some("llama3-70b"));
    assert_eq!(request.messages.len(), 2);

    let system = &request.messages[0];
    assert_eq!(system.role, Role::System);
    assert_eq!(system.content, agent.system_prompt());
    assert!(system.content.starts_with("You are a crypto analyst."));
    let tools = extract_tag_content(&system.content, "tools");
    let listed: Value = serde_json::from_str(tools.first().unwrap()).unwrap();
    assert_eq!(listed, PriceTool::new().signature().to_json());
    assert_eq!(listed["parameters"]["required"], json!(["coin"]));

    let user = &request.messages[1];
    assert_eq!(user.role, Role::User);
    assert_eq!(
        user.content,
        "<question>What is the price of Solana?</question>"
    );
}

#[tokio::test]
async fn test_fallback_after_budget() {
    let mut provider = TestModelProvider::default();
    provider.set_default_response(PresetResponse::with_text(
        "<thought>Still thinking.</thought>",
    ));

    let agent = builder(&provider).build().unwrap();
    let reply = agent.run_with_max_rounds("Hmm?", 3).await.unwrap();

    assert_eq!(provider.request_count(), 4);
    assert_eq!(reply.kind(), ReplyKind::Fallback);
    assert_eq!(reply.text(), "<thought>Still thinking.</thought>");
    assert_eq!(reply.rounds(), 3);

    // A round without a response or tool calls only adds the completion.
    let lengths = provider
        .requests()
        .iter()
        .map(|req| req.messages.len())
        .collect::<Vec<_>>();
    assert_eq!(lengths, vec![2, 3, 4, 5]);
}

#[tokio::test]
async fn test_default_budget() {
    let mut provider = TestModelProvider::default();
    provider.set_default_response(PresetResponse::with_text("no tags at all"));

    let agent = builder(&provider).build().unwrap();
    let reply = agent.run("Hello?").await.unwrap();
    assert_eq!(provider.request_count(), 11);
    assert_eq!(reply.kind(), ReplyKind::Fallback);

    let agent = builder(&provider).with_max_rounds(0).build().unwrap();
    let reply = agent.run("Hello?").await.unwrap();
    assert_eq!(provider.request_count(), 12);
    assert_eq!(reply.rounds(), 0);
}

#[tokio::test]
async fn test_empty_response_is_not_terminal() {
    let mut provider = TestModelProvider::default();
    provider.add_text_step("<response> </response>");
    provider.add_text_step("<response>Done.</response>");

    let agent = builder(&provider).build().unwrap();
    let reply = agent.run("Anything?").await.unwrap();

    assert_eq!(reply.text(), "Done.");
    assert_eq!(reply.rounds(), 2);
    let requests = provider.requests();
    assert_eq!(requests[1].messages.len(), 3);
    assert_eq!(requests[1].messages[2].content, "<response> </response>");
}

#[tokio::test]
async fn test_tool_calls_in_order() {
    let mut provider = TestModelProvider::default();
    provider.add_text_step(
        r#"<thought>I need two prices.</thought>
<tool_call>{"name": "price", "arguments": {"coin": "bitcoin"}, "id": 0}</tool_call>
<tool_call>{"name": "price", "arguments": {"coin": "dogecoin"}, "id": 1}</tool_call>"#,
    );
    provider.add_text_step("<response>Bitcoin is at $96,065.33.</response>");

    let agent = builder(&provider).build().unwrap();
    let reply = agent.run("Prices of BTC and DOGE?").await.unwrap();
    assert_eq!(reply.text(), "Bitcoin is at $96,065.33.");
    assert_eq!(reply.rounds(), 2);

    let requests = provider.requests();
    let messages = &requests[1].messages;
    assert_eq!(messages.len(), 4);
    assert_eq!(messages[2].role, Role::Assistant);
    assert!(messages[2].content.starts_with("<thought>I need two prices."));

    let content = &messages[3].content;
    assert!(content.find("\"0\"").unwrap() < content.find("\"1\"").unwrap());

    let observation = observation_in_request(&provider, 1);
    let entries = observation.as_object().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries["0"], json!({ "price": "$96,065.33" }));
    assert_eq!(
        entries["1"],
        json!("error: Execution error: no quote for dogecoin")
    );
}

#[tokio::test]
async fn test_bad_calls_become_observations() {
    let mut provider = TestModelProvider::default();
    provider.add_text_step(
        r#"<tool_call>{"name": "weather", "arguments": {"city": "Madrid"}, "id": 0}</tool_call>
<tool_call>{"name": "price", "arguments": {"coin": </tool_call>
<tool_call>{"name": "price", "arguments": {}, "id": 2}</tool_call>"#,
    );
    provider.add_text_step("<response>Sorry.</response>");

    let agent = builder(&provider).build().unwrap();
    let reply = agent.run("Weather?").await.unwrap();
    assert_eq!(reply.text(), "Sorry.");

    let observation = observation_in_request(&provider, 1);
    assert_eq!(
        observation["0"],
        json!("error: Unknown tool: no tool named `weather`")
    );
    assert!(
        observation["malformed-1"]
            .as_str()
            .unwrap()
            .starts_with("error: Malformed tool call")
    );
    let missing = observation["2"].as_str().unwrap();
    assert!(missing.starts_with("error: Invalid arguments (`coin`)"));
}

#[tokio::test]
async fn test_duplicate_ids_last_write_wins() {
    let mut provider = TestModelProvider::default();
    provider.add_text_step(
        r#"<tool_call>{"name": "price", "arguments": {"coin": "bitcoin"}, "id": 0}</tool_call>
<tool_call>{"name": "price", "arguments": {"coin": "ethereum"}, "id": 0}</tool_call>"#,
    );
    provider.add_text_step("<response>ok</response>");

    let agent = builder(&provider).build().unwrap();
    agent.run("ETH?").await.unwrap();

    let observation = observation_in_request(&provider, 1);
    assert_eq!(observation, json!({ "0": { "price": "$3,310.20" } }));
}

#[tokio::test]
async fn test_panicking_tool() {
    let mut provider = TestModelProvider::default();
    provider.add_text_step(
        r#"<tool_call>{"name": "explode", "arguments": {}, "id": 0}</tool_call>
<tool_call>{"name": "price", "arguments": {"coin": "bitcoin"}, "id": 1}</tool_call>"#,
    );
    provider.add_text_step("<response>ok</response>");

    let agent = builder(&provider)
        .with_tool(PanicTool {
            signature: ToolSignature::new("explode", "Always panics"),
        })
        .build()
        .unwrap();
    let reply = agent.run("Go").await.unwrap();
    assert!(reply.is_final());

    let observation = observation_in_request(&provider, 1);
    assert_eq!(
        observation["0"],
        json!("error: Execution error: the tool panicked")
    );
    assert_eq!(observation["1"], json!({ "price": "$96,065.33" }));
}

#[tokio::test]
async fn test_eagerly_panicking_tool() {
    let mut provider = TestModelProvider::default();
    provider.add_text_step(
        r#"<tool_call>{"name": "explode_now", "arguments": {}, "id": 0}</tool_call>
<tool_call>{"name": "price", "arguments": {"coin": "bitcoin"}, "id": 1}</tool_call>"#,
    );
    provider.add_text_step("<response>ok</response>");

    let agent = builder(&provider)
        .with_tool(EagerPanicTool {
            signature: ToolSignature::new("explode_now", "Panics right away"),
        })
        .build()
        .unwrap();
    let reply = agent.run("Go").await.unwrap();
    assert!(reply.is_final());
    assert_eq!(provider.request_count(), 2);

    let observation = observation_in_request(&provider, 1);
    assert_eq!(
        observation["0"],
        json!("error: Execution error: the tool panicked")
    );
    assert_eq!(observation["1"], json!({ "price": "$96,065.33" }));
}

#[tokio::test]
async fn test_no_tools() {
    let mut provider = TestModelProvider::default();
    provider.add_text_step("Just an answer, <thought>no loop</thought>.");

    let agent = AgentBuilder::with_model_provider(provider.clone())
        .with_system_prompt("Be brief.")
        .build()
        .unwrap();
    assert!(agent.registry().is_empty());

    let reply = agent.run("Hi").await.unwrap();
    assert_eq!(reply.kind(), ReplyKind::Direct);
    assert_eq!(reply.text(), "Just an answer, <thought>no loop</thought>.");
    assert_eq!(provider.request_count(), 1);
    assert_eq!(provider.requests()[0].messages[0].content, "Be brief.");
}

#[tokio::test]
async fn test_duplicate_tool_names() {
    let provider = TestModelProvider::default();
    let result = builder(&provider).with_tool(PriceTool::new()).build();
    assert!(matches!(
        result,
        Err(AgentError::DuplicateTool(name)) if name == "price"
    ));
}

#[tokio::test]
async fn test_model_error() {
    let provider = TestModelProvider::default();
    let agent = builder(&provider).build().unwrap();

    let err = agent.run("Hi").await.err().unwrap();
    assert!(matches!(err, AgentError::Model(_)));
    assert_eq!(err.model_error_kind(), Some(ErrorKind::Other));
    assert_eq!(provider.request_count(), 1);
}

#[tokio::test]
async fn test_transient_errors_are_retried() {
    let mut provider = TestModelProvider::default();
    provider.add_response_step(
        PresetResponse::with_text("<response>Made it.</response>")
            .with_failures(2),
    );

    let agent = builder(&provider)
        .with_retry_policy(RetryPolicy::exponential(
            Duration::from_millis(1),
            Duration::from_millis(5),
        ))
        .build()
        .unwrap();
    let reply = agent.run("Hi").await.unwrap();
    assert_eq!(reply.text(), "Made it.");
    assert_eq!(provider.request_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_request_timeout() {
    let mut provider = TestModelProvider::default();
    provider.add_text_step("<response>Too late.</response>");
    provider.set_delay(Duration::from_secs(30));

    let agent = builder(&provider)
        .with_request_timeout(Duration::from_secs(5))
        .build()
        .unwrap();
    let err = agent.run("Hi").await.err().unwrap();
    assert_eq!(err.model_error_kind(), Some(ErrorKind::Timeout));
}

#[tokio::test]
async fn test_on_step() {
    let mut provider = TestModelProvider::default();
    provider.add_text_step(
        r#"<thought>Look it up.</thought>
<tool_call>{"name": "price", "arguments": {"coin": "bitcoin"}, "id": 0}</tool_call>"#,
    );
    provider.add_text_step("<response>$96,065.33</response>");

    let steps = Arc::new(Mutex::new(Vec::new()));
    let agent = builder(&provider)
        .on_step({
            let steps = Arc::clone(&steps);
            move |step: &Step<'_>| {
                let label = match step {
                    Step::Thought(thought) => format!("thought: {thought}"),
                    Step::ToolCall(call) => format!("call: {}", call.name),
                    Step::ToolResult { id, result } => {
                        format!("result {id}: {}", result.is_ok())
                    }
                    Step::Observations(_) => "observations".to_owned(),
                    Step::Response(text) => format!("response: {text}"),
                };
                steps.lock().unwrap().push(label);
            }
        })
        .build()
        .unwrap();
    agent.run("BTC?").await.unwrap();

    assert_eq!(
        *steps.lock().unwrap(),
        vec![
            "thought: Look it up.",
            "call: price",
            "result 0: true",
            "observations",
            "response: $96,065.33",
        ]
    );
}
