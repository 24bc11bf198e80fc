//! Fixed action catalog.
//!
//! Every action the orchestrator can dispatch is a variant of [`ActionKind`].
//! Each variant declares its argument contract as a static slice of
//! [`ArgSpec`]; normalization and prompt rendering both read from it, so the
//! catalog shown to the oracle and the arguments handlers receive never drift.

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};
use serde_json::{Map, Value, json};
use thiserror::Error;

/// Default dimensions for `identify_gaps` when the plan names none.
pub const DEFAULT_AREAS_OF_INTEREST: &[&str] = &["functionality", "performance", "documentation"];

/// Action identifier that is not part of the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown action: {0}")]
pub struct UnknownAction(pub String);

/// Closed set of dispatchable actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    AnalyzeProject,
    AnalyzeFile,
    GetRawCode,
    ModifyFile,
    IdentifyGaps,
    GeneratePlan,
    GenerateNewContent,
    EvaluateState,
    GetUserInput,
}

/// How a declared argument is filled when the caller omits it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgDefault {
    /// Required: filled with a visible placeholder string.
    Placeholder,
    /// Optional text argument.
    Text(&'static str),
    /// Optional list-of-text argument.
    List(&'static [&'static str]),
}

/// Declared argument of an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArgSpec {
    pub name: &'static str,
    /// Alternate names accepted from plans and mapped onto `name`.
    pub aliases: &'static [&'static str],
    pub default: ArgDefault,
    /// Type hint shown to the oracle.
    pub hint: &'static str,
}

impl ArgSpec {
    const fn required(name: &'static str, hint: &'static str) -> Self {
        Self {
            name,
            aliases: &[],
            default: ArgDefault::Placeholder,
            hint,
        }
    }

    pub fn is_required(&self) -> bool {
        self.default == ArgDefault::Placeholder
    }

    /// Value used when the argument is optional and absent.
    pub fn default_value(&self) -> Option<Value> {
        match self.default {
            ArgDefault::Placeholder => None,
            ArgDefault::Text(text) => Some(Value::String(text.to_string())),
            ArgDefault::List(items) => Some(json!(items)),
        }
    }
}

const NO_ARGS: &[ArgSpec] = &[];

const FILE_NAME_ARGS: &[ArgSpec] = &[ArgSpec {
    name: "file_name",
    aliases: &["file_path"],
    default: ArgDefault::Placeholder,
    hint: "str",
}];

const MODIFY_FILE_ARGS: &[ArgSpec] = &[
    ArgSpec {
        name: "file_name",
        aliases: &["file_path"],
        default: ArgDefault::Placeholder,
        hint: "str",
    },
    ArgSpec::required("content", "str (content written directly to disk)"),
    ArgSpec {
        name: "action_type",
        aliases: &[],
        default: ArgDefault::Text("modify"),
        hint: "\"modify\" | \"create\" | \"delete\"",
    },
];

const IDENTIFY_GAPS_ARGS: &[ArgSpec] = &[
    ArgSpec {
        name: "file_name",
        aliases: &["file_path"],
        default: ArgDefault::Placeholder,
        hint: "str",
    },
    ArgSpec {
        name: "areas_of_interest",
        aliases: &[],
        default: ArgDefault::List(DEFAULT_AREAS_OF_INTEREST),
        hint: "list[str]",
    },
];

const GENERATE_PLAN_ARGS: &[ArgSpec] = &[
    ArgSpec::required("objective", "str"),
    ArgSpec {
        name: "dependencies",
        aliases: &[],
        default: ArgDefault::List(&[]),
        hint: "list[str]",
    },
];

const GENERATE_NEW_CONTENT_ARGS: &[ArgSpec] = &[
    ArgSpec::required(
        "existing_content",
        "str (file name to base changes on, or text to modify directly)",
    ),
    ArgSpec::required(
        "change_description",
        "str (detailed description of the changes needed)",
    ),
];

const GET_USER_INPUT_ARGS: &[ArgSpec] = &[ArgSpec::required("prompt", "str")];

impl ActionKind {
    pub const ALL: [ActionKind; 9] = [
        ActionKind::AnalyzeProject,
        ActionKind::AnalyzeFile,
        ActionKind::GetRawCode,
        ActionKind::ModifyFile,
        ActionKind::IdentifyGaps,
        ActionKind::GeneratePlan,
        ActionKind::GenerateNewContent,
        ActionKind::EvaluateState,
        ActionKind::GetUserInput,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ActionKind::AnalyzeProject => "analyze_project",
            ActionKind::AnalyzeFile => "analyze_file",
            ActionKind::GetRawCode => "get_raw_code",
            ActionKind::ModifyFile => "modify_file",
            ActionKind::IdentifyGaps => "identify_gaps",
            ActionKind::GeneratePlan => "generate_plan",
            ActionKind::GenerateNewContent => "generate_new_content",
            ActionKind::EvaluateState => "evaluate_state",
            ActionKind::GetUserInput => "get_user_input",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            ActionKind::AnalyzeProject => {
                "Analyze the entire project directory to understand the structure and identify key components."
            }
            ActionKind::AnalyzeFile => {
                "Analyze a specific file (or directory) to understand its contents and identify relevant parts for enhancement."
            }
            ActionKind::GetRawCode => {
                "Retrieve the raw code of a file to gain insight into its implementation."
            }
            ActionKind::ModifyFile => {
                "Create, modify or delete a file. Do not add this action in the same plan in which the content is generated."
            }
            ActionKind::IdentifyGaps => {
                "Identify missing elements or areas for improvement within a file."
            }
            ActionKind::GeneratePlan => {
                "Generate a plan of further actions to achieve the stated objective."
            }
            ActionKind::GenerateNewContent => {
                "Generate new code or content based on existing content and a description of requested changes."
            }
            ActionKind::EvaluateState => {
                "Determine if the current objective has been met or if additional planning is needed."
            }
            ActionKind::GetUserInput => {
                "Request product-level input or strategic guidance from the operator."
            }
        }
    }

    /// Declared argument contract, in canonical order.
    pub fn args(self) -> &'static [ArgSpec] {
        match self {
            ActionKind::AnalyzeProject | ActionKind::EvaluateState => NO_ARGS,
            ActionKind::AnalyzeFile | ActionKind::GetRawCode => FILE_NAME_ARGS,
            ActionKind::ModifyFile => MODIFY_FILE_ARGS,
            ActionKind::IdentifyGaps => IDENTIFY_GAPS_ARGS,
            ActionKind::GeneratePlan => GENERATE_PLAN_ARGS,
            ActionKind::GenerateNewContent => GENERATE_NEW_CONTENT_ARGS,
            ActionKind::GetUserInput => GET_USER_INPUT_ARGS,
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionKind {
    type Err = UnknownAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        ActionKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == name)
            .ok_or_else(|| UnknownAction(name.to_string()))
    }
}

impl Serialize for ActionKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Catalog entries as stored in the static context layer.
pub fn catalog_value() -> Value {
    Value::Array(
        ActionKind::ALL
            .iter()
            .map(|kind| {
                let mut entry = Map::new();
                entry.insert("name".to_string(), json!(kind.as_str()));
                entry.insert("description".to_string(), json!(kind.description()));
                Value::Object(entry)
            })
            .collect(),
    )
}
