//! Parsing of model responses into decisions

use sdk::Decision;
use serde_json::Value;

/// Strip a surrounding ```` ``` ```` / ```` ```json ```` fence, if present
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(body) = rest.strip_suffix("```") else {
        return trimmed;
    };
    let body = body.strip_prefix("json").unwrap_or(body);
    body.trim()
}

/// Parse a response into a [`Decision`]
///
/// Returns `None` for anything that is not a single JSON object with
/// correctly typed `thought`, `action` and `reply` fields.
pub fn parse_decision(text: &str) -> Option<Decision> {
    let value: Value = serde_json::from_str(strip_code_fence(text)).ok()?;
    if !value.is_object() {
        return None;
    }
    serde_json::from_value(value).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_object() {
        let d = parse_decision(r#"{"thought":"t","reply":"Task completed."}"#).unwrap();
        assert_eq!(d.thought.as_deref(), Some("t"));
        assert_eq!(d.reply.as_deref(), Some("Task completed."));
    }

    #[test]
    fn test_fenced_object() {
        let text = "```json\n{\"action\":{\"tool\":\"list_files\",\"args\":[]}}\n```";
        let d = parse_decision(text).unwrap();
        assert_eq!(d.action.unwrap().tool, "list_files");

        let bare = "```\n{\"reply\":\"hi\"}\n```";
        assert_eq!(parse_decision(bare).unwrap().reply.as_deref(), Some("hi"));
    }

    #[test]
    fn test_rejects_non_objects() {
        assert!(parse_decision("not json").is_none());
        assert!(parse_decision("[1,2]").is_none());
        assert!(parse_decision("\"reply\"").is_none());
        assert!(parse_decision("").is_none());
    }

    #[test]
    fn test_rejects_wrong_field_types() {
        assert!(parse_decision(r#"{"reply": 5}"#).is_none());
        assert!(parse_decision(r#"{"action": {"tool": "x", "args": "ls"}}"#).is_none());
    }

    #[test]
    fn test_unterminated_fence_is_not_stripped() {
        assert_eq!(strip_code_fence("```json\n{}"), "```json\n{}");
    }
}
