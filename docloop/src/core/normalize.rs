//! Argument normalization against an action's declared contract.
//!
//! Oracle plans are not trusted to match the catalog exactly. Normalization
//! keeps only declared argument names (mapping aliases onto them), drops the
//! rest, and fills any declared-but-missing argument: optional ones with their
//! default, required ones with a visible placeholder.

use serde_json::Value;

use crate::core::action::ActionKind;
use crate::core::types::Args;

const PLACEHOLDER_PREFIX: &str = "[missing ";

/// Placeholder stored for a required argument the plan omitted.
pub fn placeholder(name: &str) -> String {
    format!("{PLACEHOLDER_PREFIX}{name}]")
}

/// `true` if `value` is a placeholder produced by [`normalize_args`].
pub fn is_placeholder(value: &Value) -> bool {
    value.as_str().is_some_and(is_placeholder_text)
}

pub fn is_placeholder_text(text: &str) -> bool {
    text.starts_with(PLACEHOLDER_PREFIX) && text.ends_with(']')
}

/// Project `args` onto the declared contract of `action`.
///
/// The result contains exactly the declared argument names.
pub fn normalize_args(action: ActionKind, args: &Args) -> Args {
    let mut normalized = Args::new();
    for spec in action.args() {
        let supplied = args.get(spec.name).or_else(|| {
            spec.aliases
                .iter()
                .find_map(|alias| args.get(*alias))
        });
        let value = match supplied {
            Some(value) if !value.is_null() => value.clone(),
            _ => spec
                .default_value()
                .unwrap_or_else(|| Value::String(placeholder(spec.name))),
        };
        normalized.insert(spec.name.to_string(), value);
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(value: Value) -> Args {
        value.as_object().cloned().expect("object")
    }

    #[test]
    fn drops_undeclared_arguments() {
        let normalized = normalize_args(
            ActionKind::GetRawCode,
            &args(json!({"file_name": "a.py", "description": "look at it", "focus": "all"})),
        );
        assert_eq!(normalized, args(json!({"file_name": "a.py"})));
    }

    #[test]
    fn fills_missing_required_with_placeholder() {
        let normalized = normalize_args(ActionKind::GenerateNewContent, &Args::new());
        assert_eq!(
            normalized["existing_content"],
            json!("[missing existing_content]")
        );
        assert!(is_placeholder(&normalized["change_description"]));
    }

    #[test]
    fn fills_missing_optional_with_default() {
        let normalized = normalize_args(
            ActionKind::IdentifyGaps,
            &args(json!({"file_name": "lib.rs"})),
        );
        assert_eq!(
            normalized["areas_of_interest"],
            json!(["functionality", "performance", "documentation"])
        );
        let modify = normalize_args(ActionKind::ModifyFile, &args(json!({"file_name": "a"})));
        assert_eq!(modify["action_type"], json!("modify"));
    }

    #[test]
    fn maps_aliases_onto_canonical_names() {
        let normalized = normalize_args(
            ActionKind::AnalyzeFile,
            &args(json!({"file_path": "src/main.rs"})),
        );
        assert_eq!(normalized, args(json!({"file_name": "src/main.rs"})));
    }

    #[test]
    fn canonical_name_wins_over_alias() {
        let normalized = normalize_args(
            ActionKind::AnalyzeFile,
            &args(json!({"file_path": "alias.rs", "file_name": "canonical.rs"})),
        );
        assert_eq!(normalized["file_name"], json!("canonical.rs"));
    }

    #[test]
    fn null_counts_as_missing() {
        let normalized = normalize_args(ActionKind::GetUserInput, &args(json!({"prompt": null})));
        assert!(is_placeholder(&normalized["prompt"]));
    }

    /// Normalized keys are exactly the declared keys, for every action and
    /// for a spread of supplied argument sets.
    #[test]
    fn keys_always_match_contract() {
        let samples = [
            json!({}),
            json!({"file_name": "x", "unexpected": 1}),
            json!({"objective": "o", "content": "c", "prompt": "p", "noise": [1, 2]}),
            json!({"file_path": "y", "action_type": "delete", "areas_of_interest": []}),
        ];
        for kind in ActionKind::ALL {
            for sample in &samples {
                let normalized = normalize_args(kind, &args(sample.clone()));
                let mut got: Vec<&str> = normalized.keys().map(String::as_str).collect();
                let mut want: Vec<&str> = kind.args().iter().map(|a| a.name).collect();
                got.sort_unstable();
                want.sort_unstable();
                assert_eq!(got, want, "action {kind}");
            }
        }
    }

    #[test]
    fn ordinary_text_is_not_a_placeholder() {
        assert!(!is_placeholder(&json!("[draft] notes")));
        assert!(!is_placeholder(&json!(3)));
    }
}
