use crate::tool::ToolSignature;

const REACT_INSTRUCTIONS: &str = r#"You work in a loop of Thought, Action and Observation.

Start each turn by reasoning about the question inside <thought></thought>
tags. When you need information you don't have, call one or more of the
tools listed at the end of this message. Call a tool by writing a
JSON object inside <tool_call></tool_call> tags, one object per call:

<tool_call>{"name": "<tool name>", "arguments": {<argument object>}, "id": <integer id>}</tool_call>

Give every call in a turn its own id, counting up from 0. Only use the
parameters a tool declares, and provide every required one.

The results come back in the next message as
<observation>{"<id>": <result>}</observation>. A result starting with
"error:" means the call failed; fix the call and try again if it matters.

Once you can answer, write the final answer inside <response></response>
tags and stop calling tools.

Example:

<question>How much is 2 BTC in dollars?</question>
<thought>I need the current price of bitcoin.</thought>
<tool_call>{"name": "price", "arguments": {"coin": "bitcoin"}, "id": 0}</tool_call>

<observation>{"0": "$96,065.33"}</observation>
<thought>2 times 96,065.33 is 192,130.66.</thought>
<response>2 BTC are worth about $192,130.66.</response>

Available tools:
"#;

/// Builds the system message for a session.
///
/// The loop instructions and the tool listing are only added when there is
/// at least one tool, otherwise the base prompt is used as is.
pub(crate) fn system_prompt<'a>(
    base: Option<&str>,
    tools: impl Iterator<Item = &'a ToolSignature>,
) -> String {
    let listing = tools
        .map(|signature| signature.to_json().to_string())
        .collect::<Vec<_>>();

    let mut prompt = base.unwrap_or_default().trim_end().to_owned();
    if listing.is_empty() {
        return prompt;
    }
    if !prompt.is_empty() {
        prompt.push_str("\n\n");
    }
    prompt.push_str(REACT_INSTRUCTIONS);
    prompt.push_str("<tools>\n");
    for tool in &listing {
        prompt.push_str(tool);
        prompt.push('\n');
    }
    prompt.push_str("</tools>");
    prompt
}
