//! Shared deterministic types for the planning loop.
//!
//! These types define stable contracts between core components. They should not
//! depend on external state or I/O and must remain deterministic across runs.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::core::action::{ActionKind, UnknownAction};
use crate::core::plan::PlanStep;

/// Argument mapping supplied to an action.
pub type Args = Map<String, Value>;

/// A unit of work on the orchestrator queue. Consumed exactly once.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Task {
    pub action: ActionKind,
    pub args: Args,
    /// Appended to the tail of the queue once this task succeeds.
    pub follow_up: Option<Box<Task>>,
    /// Dynamic context key for the result; defaults to [`result_key`].
    pub result_key: Option<String>,
}

impl Task {
    pub fn new(action: ActionKind, args: Args) -> Self {
        Self {
            action,
            args,
            follow_up: None,
            result_key: None,
        }
    }

    /// Task without arguments.
    pub fn bare(action: ActionKind) -> Self {
        Self::new(action, Args::new())
    }

    pub fn generate_plan(objective: impl Into<String>) -> Self {
        let mut args = Args::new();
        args.insert("objective".to_string(), Value::String(objective.into()));
        Self::new(ActionKind::GeneratePlan, args)
    }

    pub fn with_follow_up(mut self, follow_up: Task) -> Self {
        self.follow_up = Some(Box::new(follow_up));
        self
    }

    pub fn with_result_key(mut self, key: impl Into<String>) -> Self {
        self.result_key = Some(key.into());
        self
    }
}

impl TryFrom<PlanStep> for Task {
    type Error = UnknownAction;

    fn try_from(step: PlanStep) -> Result<Self, Self::Error> {
        let action = step.action.parse::<ActionKind>()?;
        let follow_up = match step.follow_up {
            Some(next) => Some(Box::new(Task::try_from(*next)?)),
            None => None,
        };
        Ok(Task {
            action,
            args: step.args,
            follow_up,
            result_key: step.result_key,
        })
    }
}

/// Outcome of `evaluate_state`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "verdict", rename_all = "lowercase")]
pub enum Verdict {
    /// The oracle confirmed the objective is satisfied.
    Complete,
    /// More work is needed; carries the oracle's rationale verbatim.
    Incomplete { rationale: String },
    /// The oracle could not be consulted.
    Error { message: String },
}

impl Verdict {
    pub fn label(&self) -> &'static str {
        match self {
            Verdict::Complete => "complete",
            Verdict::Incomplete { .. } => "incomplete",
            Verdict::Error { .. } => "error",
        }
    }

    /// Value recorded as the action result: `"complete"` or the rationale.
    pub fn result_value(&self) -> Value {
        match self {
            Verdict::Complete => Value::String("complete".to_string()),
            Verdict::Incomplete { rationale } => Value::String(rationale.clone()),
            Verdict::Error { message } => Value::String(format!("error: {message}")),
        }
    }
}

/// Deterministic context key for a result when the task names none.
///
/// Combines the action name with the serialized arguments so that the same
/// action called with different arguments never overwrites itself.
pub fn result_key(action: ActionKind, args: &Args) -> String {
    format!("{}{}", action.as_str(), Value::Object(args.clone()))
}

/// `true` for results that carry nothing worth storing.
pub fn is_empty_result(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}
