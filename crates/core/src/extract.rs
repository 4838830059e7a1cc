//! Extraction of tagged regions from model output.
//!
//! Models are asked to wrap the parts of their answer in XML-like tags
//! (`<thought>`, `<tool_call>`, `<response>`). The output is still free
//! text, so extraction is lenient: anything that doesn't form a complete
//! `<tag>...</tag>` pair is ignored rather than reported.

/// The spans found for one tag name.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Extraction {
    /// Whether at least one complete span was found.
    pub found: bool,
    /// Trimmed span contents, in order of appearance.
    pub content: Vec<String>,
}

impl Extraction {
    /// Returns the first span, if any.
    #[inline]
    pub fn first(&self) -> Option<&str> {
        self.content.first().map(String::as_str)
    }
}

/// Collects every `<tag>...</tag>` span in `text`.
///
/// Each opening tag pairs with the nearest closing tag after it, and spans
/// may cross lines. The captured content is not interpreted in any way.
pub fn extract_tag_content(text: &str, tag: &str) -> Extraction {
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");

    let mut content = Vec::new();
    let mut rest = text;
    while let Some(start) = rest.find(&open) {
        let inner = &rest[start + open.len()..];
        // An unclosed tag can't be followed by a closed one either.
        let Some(end) = inner.find(&close) else {
            break;
        };
        content.push(inner[..end].trim().to_owned());
        rest = &inner[end + close.len()..];
    }

    Extraction {
        found: !content.is_empty(),
        content,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_tag() {
        let result = extract_tag_content("just chatting", "response");
        assert!(!result.found);
        assert!(result.content.is_empty());
        assert_eq!(result.first(), None);
    }

    #[test]
    fn test_single_span() {
        let text = "<thought>I know this</thought>\n<response> 42 </response>";
        let result = extract_tag_content(text, "response");
        assert!(result.found);
        assert_eq!(result.content, vec!["42"]);

        let thought = extract_tag_content(text, "thought");
        assert_eq!(thought.first(), Some("I know this"));
    }

    #[test]
    fn test_multiple_spans_across_lines() {
        let text = r#"<thought>Two prices needed</thought>
<tool_call>
{"name": "price", "arguments": {"coin": "btc"}, "id": 0}
</tool_call>
<tool_call>{"name": "price", "arguments": {"coin": "eth"}, "id": 1}</tool_call>"#;
        let result = extract_tag_content(text, "tool_call");
        assert!(result.found);
        assert_eq!(
            result.content,
            vec![
                r#"{"name": "price", "arguments": {"coin": "btc"}, "id": 0}"#,
                r#"{"name": "price", "arguments": {"coin": "eth"}, "id": 1}"#,
            ]
        );
    }

    #[test]
    fn test_unclosed_and_mismatched_tags() {
        let result = extract_tag_content("<response>never closed", "response");
        assert!(!result.found);

        let result =
            extract_tag_content("</response>backwards<response>", "response");
        assert!(!result.found);

        let result = extract_tag_content(
            "<response>a</response><response>b",
            "response",
        );
        assert_eq!(result.content, vec!["a"]);
    }

    #[test]
    fn test_empty_span_is_found() {
        let result = extract_tag_content("<response></response>", "response");
        assert!(result.found);
        assert_eq!(result.first(), Some(""));
    }

    #[test]
    fn test_nested_open_tag_pairs_with_nearest_close() {
        let result = extract_tag_content(
            "<response>outer <response>inner</response> tail</response>",
            "response",
        );
        assert_eq!(result.content, vec!["outer <response>inner"]);
    }

    #[test]
    fn test_other_tags_do_not_match() {
        let result = extract_tag_content(
            "<responses>no</responses><response_x>no</response_x>",
            "response",
        );
        assert!(!result.found);
    }
}
