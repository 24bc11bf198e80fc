//! Interpretation of `evaluate_state` replies and replanning objectives.

use crate::core::types::Verdict;

/// Classify an oracle reply to the evaluation prompt.
///
/// The evaluation prompt asks for a leading `VERDICT: yes|no` token, so the
/// first word (after an optional `verdict` label) decides when it is one of
/// `yes`, `complete`, `no` or `incomplete`. Free-form replies fall back to
/// whole-word matching: complete only when `yes` appears and `no` does not.
pub fn interpret_verdict(reply: &str) -> Verdict {
    let words: Vec<String> = reply
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect();

    let mut leading = words.iter().map(String::as_str);
    let first = match leading.next() {
        Some("verdict") => leading.next(),
        other => other,
    };
    match first {
        Some("yes" | "complete") => return Verdict::Complete,
        Some("no" | "incomplete") => return incomplete(reply),
        _ => {}
    }

    let has = |needle: &str| words.iter().any(|w| w == needle);
    if has("yes") && !has("no") {
        Verdict::Complete
    } else {
        incomplete(reply)
    }
}

fn incomplete(reply: &str) -> Verdict {
    Verdict::Incomplete {
        rationale: reply.trim().to_string(),
    }
}

/// Objective for the `generate_plan` task queued after an incomplete verdict.
///
/// Always embeds the original objective verbatim.
pub fn replan_objective(objective: &str, rationale: &str) -> String {
    format!(
        "Replanning required to achieve objective: {objective}\n\
         Current state: {rationale}\n\n\
         Thoroughly inspect the context to review previous actions taken and \
         analysis done before proposing further actions."
    )
}
