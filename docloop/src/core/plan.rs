//! Plan extraction from free-form oracle output.
//!
//! Oracle replies usually wrap the plan in prose or code fences. The extractor
//! slices from the earliest opening bracket to the last matching closing
//! bracket, decodes that block, and accepts either `{"steps": [...]}` or a bare
//! array of steps. Steps without a non-empty `action` are dropped.

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

/// Why a reply could not be turned into a plan.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("no structured block found in oracle reply")]
    NoStructuredBlock,
    #[error("structured block is not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("unsupported plan shape: {0}")]
    UnsupportedShape(&'static str),
}

/// One validated plan entry, before the action name is resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanStep {
    pub action: String,
    pub args: Map<String, Value>,
    pub follow_up: Option<Box<PlanStep>>,
    pub result_key: Option<String>,
}

/// Extract the ordered plan steps embedded in `reply`.
pub fn extract_plan(reply: &str) -> Result<Vec<PlanStep>, PlanError> {
    let block = locate_block(reply).ok_or(PlanError::NoStructuredBlock)?;
    debug!(bytes = block.len(), "located structured block");
    let value: Value = serde_json::from_str(block)?;

    let entries = match value {
        Value::Array(entries) => entries,
        Value::Object(mut object) => match object.remove("steps") {
            Some(Value::Array(entries)) => entries,
            Some(_) => return Err(PlanError::UnsupportedShape("`steps` is not an array")),
            None => return Err(PlanError::UnsupportedShape("object without `steps`")),
        },
        _ => return Err(PlanError::UnsupportedShape("top level is not an object or array")),
    };

    let total = entries.len();
    let steps: Vec<PlanStep> = entries.into_iter().filter_map(parse_step).collect();
    if steps.len() < total {
        debug!(dropped = total - steps.len(), "dropped steps without an action");
    }
    Ok(steps)
}

/// Slice from the earliest `{` or `[` to the last closing bracket of the same kind.
fn locate_block(reply: &str) -> Option<&str> {
    let start = reply.find(['{', '['])?;
    let close = if reply[start..].starts_with('{') {
        '}'
    } else {
        ']'
    };
    let end = reply.rfind(close)?;
    (end > start).then(|| &reply[start..=end])
}

fn parse_step(entry: Value) -> Option<PlanStep> {
    let Value::Object(mut object) = entry else {
        return None;
    };
    let action = match object.remove("action") {
        Some(Value::String(action)) if !action.trim().is_empty() => action.trim().to_string(),
        _ => return None,
    };
    let args = match object.remove("args").or_else(|| object.remove("arguments")) {
        Some(Value::Object(args)) => args,
        _ => Map::new(),
    };
    let follow_up = object
        .remove("follow_up")
        .and_then(parse_step)
        .map(Box::new);
    let result_key = match object.remove("result_key") {
        Some(Value::String(key)) if !key.is_empty() => Some(key),
        _ => None,
    };
    Some(PlanStep {
        action,
        args,
        follow_up,
        result_key,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const PLAN: &str = r#"{"steps":[{"action":"analyze_project","args":{}},{"action":"evaluate_state","args":{}}]}"#;

    fn actions(steps: &[PlanStep]) -> Vec<&str> {
        steps.iter().map(|s| s.action.as_str()).collect()
    }

    #[test]
    fn parses_object_with_steps() {
        let steps = extract_plan(PLAN).expect("plan");
        assert_eq!(actions(&steps), vec!["analyze_project", "evaluate_state"]);
    }

    #[test]
    fn parses_bare_array() {
        let steps = extract_plan(r#"[{"action":"get_raw_code","args":{"file_name":"a.py"}}]"#)
            .expect("plan");
        assert_eq!(actions(&steps), vec!["get_raw_code"]);
        assert_eq!(steps[0].args["file_name"], json!("a.py"));
    }

    #[test]
    fn extraction_is_idempotent() {
        let first = extract_plan(PLAN).expect("first");
        let second = extract_plan(PLAN).expect("second");
        assert_eq!(first, second);
    }

    /// Prose before and after the block is ignored as long as brackets balance.
    #[test]
    fn recovers_block_wrapped_in_prose() {
        let reply = format!("Sure, here is the plan:\n{PLAN}\nLet me know if you need changes.");
        let steps = extract_plan(&reply).expect("plan");
        assert_eq!(actions(&steps), vec!["analyze_project", "evaluate_state"]);
    }

    #[test]
    fn recovers_block_inside_code_fence() {
        let reply = format!("```json\n{PLAN}\n```");
        assert_eq!(extract_plan(&reply).expect("plan").len(), 2);
    }

    #[test]
    fn nested_brackets_inside_args_survive() {
        let reply = r#"Plan: {"steps":[{"action":"identify_gaps","args":{"file_name":"x.py","areas_of_interest":["docs",{"k":[1]}]}}]} done"#;
        let steps = extract_plan(reply).expect("plan");
        assert_eq!(steps[0].args["areas_of_interest"][1]["k"], json!([1]));
    }

    #[test]
    fn drops_entries_without_action() {
        let reply = r#"[{"args":{}},{"action":"","args":{}},{"action":"evaluate_state"},"text",{"action":7}]"#;
        let steps = extract_plan(reply).expect("plan");
        assert_eq!(actions(&steps), vec!["evaluate_state"]);
        assert!(steps[0].args.is_empty());
    }

    #[test]
    fn accepts_arguments_alias_and_follow_up() {
        let reply = r#"[{"action":"get_raw_code","arguments":{"file_name":"a.py"},"result_key":"code","follow_up":{"action":"evaluate_state"}}]"#;
        let steps = extract_plan(reply).expect("plan");
        assert_eq!(steps[0].args["file_name"], json!("a.py"));
        assert_eq!(steps[0].result_key.as_deref(), Some("code"));
        assert_eq!(
            steps[0].follow_up.as_ref().map(|s| s.action.as_str()),
            Some("evaluate_state")
        );
    }

    #[test]
    fn reply_without_brackets_is_an_error() {
        let err = extract_plan("I could not come up with a plan.").unwrap_err();
        assert!(matches!(err, PlanError::NoStructuredBlock));
    }

    #[test]
    fn malformed_block_is_a_decode_error() {
        let err = extract_plan(r#"{"steps": [{"action": "analyze_project",]}"#).unwrap_err();
        assert!(matches!(err, PlanError::Decode(_)));
    }

    #[test]
    fn unbalanced_block_is_an_error() {
        let err = extract_plan("} then {").unwrap_err();
        assert!(matches!(err, PlanError::NoStructuredBlock));
    }

    #[test]
    fn object_without_steps_is_unsupported() {
        let err = extract_plan(r#"{"plan": []}"#).unwrap_err();
        assert!(matches!(err, PlanError::UnsupportedShape(_)));
    }
}
