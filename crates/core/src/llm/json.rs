use crate::domain::draft::GeneratedDraft;
use crate::llm::error::GenerationError;

const SOURCES_HEADING: &str = "### Market Sources & References";

/// A web citation attached to a generated response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    pub title: String,
    pub uri: String,
}

/// Trims the text and drops a surrounding Markdown code fence
/// (```` ```json ... ``` ```` or ```` ``` ... ``` ````) if present.
pub fn strip_code_fence(text: &str) -> &str {
    let mut inner = text.trim();

    if let Some(rest) = inner.strip_prefix("```") {
        inner = match rest.get(..4) {
            Some(lang) if lang.eq_ignore_ascii_case("json") => &rest[4..],
            _ => rest,
        };
        inner = inner.trim_start();
    }

    if let Some(rest) = inner.strip_suffix("```") {
        inner = rest.trim_end();
    }

    inner
}

/// Parses model text into a draft. The text must be a single JSON object,
/// optionally fenced; anything else is rejected.
pub fn parse_draft(text: &str) -> Result<GeneratedDraft, GenerationError> {
    if text.trim().is_empty() {
        return Err(GenerationError::EmptyResponse);
    }

    let json_str = strip_code_fence(text);
    let invalid = |detail: String| GenerationError::InvalidResponse {
        detail,
        raw_output: text.to_string(),
    };

    let value = serde_json::from_str::<serde_json::Value>(json_str)
        .map_err(|e| invalid(format!("not JSON: {e}")))?;
    if !value.is_object() {
        return Err(invalid("expected a JSON object".to_string()));
    }

    serde_json::from_value::<GeneratedDraft>(value)
        .map_err(|e| invalid(format!("unexpected field shape: {e}")))
}

pub fn format_source(source: &Source) -> String {
    format!("[{}]({})", source.title, source.uri)
}

/// Appends a "sources" section listing each citation as a Markdown link.
/// Leaves the body untouched when there are no sources; a blank body becomes
/// just the section, without the leading rule.
pub fn append_sources(content: &str, sources: &[Source]) -> String {
    if sources.is_empty() {
        return content.to_string();
    }

    let list = sources
        .iter()
        .map(|s| format!("- {}", format_source(s)))
        .collect::<Vec<_>>()
        .join("\n");
    if content.trim().is_empty() {
        return format!("{SOURCES_HEADING}\n{list}");
    }
    format!("{content}\n\n---\n{SOURCES_HEADING}\n{list}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_json_fence() {
        let fenced = "```json\n{\"a\":1}\n```\n";
        assert_eq!(strip_code_fence(fenced), "{\"a\":1}");
    }

    #[test]
    fn strips_bare_and_uppercase_fences() {
        assert_eq!(strip_code_fence("```\n{}\n```"), "{}");
        assert_eq!(strip_code_fence("```JSON {} ```"), "{}");
    }

    #[test]
    fn unfenced_text_is_only_trimmed() {
        assert_eq!(strip_code_fence("  {\"a\":1}\n"), "{\"a\":1}");
    }

    #[test]
    fn parses_fenced_draft_without_fence_markers() {
        let text = r##"```json
{
  "title": "Gold Price Analysis: Bulls Eye $2,400",
  "excerpt": "Gold extends gains. Watch the $2,350 pivot.",
  "content": "# Gold Outlook\n\n## Key Levels\n* Support: 2,350\n\nMore on the Trade Maven YouTube channel.",
  "tags": ["Gold", "XAUUSD", "Commodities", "Technical Analysis", "Fed"],
  "category": "Technical Analysis"
}
```"##;
        let draft = parse_draft(text).unwrap();
        assert_eq!(draft.title.as_deref(), Some("Gold Price Analysis: Bulls Eye $2,400"));
        assert_eq!(draft.category.as_deref(), Some("Technical Analysis"));
        assert_eq!(draft.tags.as_ref().map(Vec::len), Some(5));
        let content = draft.content.unwrap();
        assert!(content.starts_with("# Gold Outlook"));
        assert!(!content.contains("```"));
    }

    #[test]
    fn missing_fields_stay_absent() {
        let draft = parse_draft("{\"title\":\"Only title\"}").unwrap();
        assert_eq!(draft.title.as_deref(), Some("Only title"));
        assert!(draft.excerpt.is_none());
        assert!(draft.content.is_none());
        assert!(draft.tags.is_none());
        assert!(draft.category.is_none());
    }

    #[test]
    fn rejects_plain_text() {
        let err = parse_draft("not json").unwrap_err();
        assert!(matches!(err, GenerationError::InvalidResponse { .. }));
        assert_eq!(err.raw_output(), Some("not json"));
    }

    #[test]
    fn rejects_non_object_json() {
        assert!(matches!(
            parse_draft("[\"title\", \"excerpt\"]"),
            Err(GenerationError::InvalidResponse { .. })
        ));
    }

    #[test]
    fn rejects_wrong_field_types() {
        assert!(matches!(
            parse_draft("{\"tags\": \"Gold\"}"),
            Err(GenerationError::InvalidResponse { .. })
        ));
    }

    #[test]
    fn does_not_dig_json_out_of_prose() {
        assert!(parse_draft("Here you go: {\"title\":\"x\"}").is_err());
    }

    #[test]
    fn blank_text_is_empty_response() {
        assert!(matches!(parse_draft("  \n"), Err(GenerationError::EmptyResponse)));
    }

    #[test]
    fn appends_sources_section() {
        let sources = vec![
            Source {
                title: "reuters.com".into(),
                uri: "https://example.com/a".into(),
            },
            Source {
                title: "kitco.com".into(),
                uri: "https://example.com/b".into(),
            },
        ];
        let out = append_sources("# Body", &sources);
        assert_eq!(
            out,
            "# Body\n\n---\n### Market Sources & References\n- [reuters.com](https://example.com/a)\n- [kitco.com](https://example.com/b)"
        );
    }

    #[test]
    fn blank_body_gets_sources_section_only() {
        let sources = [Source {
            title: "kitco.com".into(),
            uri: "https://example.com/b".into(),
        }];
        assert_eq!(
            append_sources("", &sources),
            "### Market Sources & References\n- [kitco.com](https://example.com/b)"
        );
        assert!(append_sources("  \n", &sources).starts_with("### Market Sources"));
    }

    #[test]
    fn no_sources_keeps_body() {
        assert_eq!(append_sources("# Body", &[]), "# Body");
    }
}
