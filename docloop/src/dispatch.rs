//! Action dispatch table.
//!
//! [`Dispatcher::dispatch`] is a total match over [`ActionKind`]; every handler
//! receives normalized arguments and the context store, and either returns a
//! result for the orchestrator to record, new tasks to enqueue, or a verdict.
//! Handler errors are local to the task; the orchestrator logs them and moves on.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::core::action::{ActionKind, DEFAULT_AREAS_OF_INTEREST};
use crate::core::context::ContextStore;
use crate::core::normalize::{is_placeholder, is_placeholder_text};
use crate::core::plan::extract_plan;
use crate::core::types::{Args, Task, Verdict};
use crate::core::verdict::interpret_verdict;
use crate::io::features::FeatureAnalyzer;
use crate::io::files::{FileStore, resolve_in_root};
use crate::io::operator::Operator;
use crate::io::oracle::Oracle;
use crate::io::prompt::PromptEngine;

const RAW_FILE_INSIGHT: &str = "Raw content only; use identify_gaps for a critique of this file.";

/// External collaborators the handlers delegate to.
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    pub oracle: &'a dyn Oracle,
    pub files: &'a dyn FileStore,
    pub analyzer: &'a dyn FeatureAnalyzer,
    pub operator: &'a dyn Operator,
}

/// What a handler produced.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionOutcome {
    /// Result to record in the dynamic context layer.
    Value(Value),
    /// Tasks to append to the queue (`generate_plan`).
    Plan(Vec<Task>),
    /// Verdict of `evaluate_state`.
    Verdict(Verdict),
}

/// How `modify_file` treats its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ModifyKind {
    Modify,
    Create,
    Delete,
}

impl ModifyKind {
    fn parse(value: &Value) -> Result<Self> {
        match value.as_str().map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("modify") => Ok(Self::Modify),
            Some("create") => Ok(Self::Create),
            Some("delete") => Ok(Self::Delete),
            _ => bail!("unsupported action_type {value}"),
        }
    }
}

pub struct Dispatcher<'a> {
    root: PathBuf,
    collaborators: Collaborators<'a>,
    prompts: PromptEngine,
}

impl<'a> Dispatcher<'a> {
    pub fn new(root: impl Into<PathBuf>, collaborators: Collaborators<'a>) -> Self {
        Self {
            root: root.into(),
            collaborators,
            prompts: PromptEngine::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Run one action with already-normalized arguments.
    pub fn dispatch(
        &self,
        action: ActionKind,
        args: &Args,
        context: &mut ContextStore,
    ) -> Result<ActionOutcome> {
        debug!(%action, "dispatching");
        match action {
            ActionKind::AnalyzeProject => self.analyze_project(context),
            ActionKind::AnalyzeFile => self.analyze_file(args, context),
            ActionKind::GetRawCode => self.get_raw_code(args),
            ActionKind::ModifyFile => self.modify_file(args),
            ActionKind::IdentifyGaps => self.identify_gaps(args, context),
            ActionKind::GeneratePlan => self.generate_plan(args, context),
            ActionKind::GenerateNewContent => self.generate_new_content(args, context),
            ActionKind::EvaluateState => Ok(ActionOutcome::Verdict(self.evaluate_state(context)?)),
            ActionKind::GetUserInput => self.get_user_input(args, context),
        }
    }

    fn analyze_project(&self, context: &mut ContextStore) -> Result<ActionOutcome> {
        let files = self.collaborators.files.list_files(&self.root)?;
        info!(count = files.len(), "analyzed project");
        context.refresh_files(files.clone());
        let mut partial = Args::new();
        partial.insert("analyzed_files".to_string(), json!(files));
        context.update_execution_state(partial);
        Ok(ActionOutcome::Value(json!({ "files": files })))
    }

    fn analyze_file(&self, args: &Args, context: &mut ContextStore) -> Result<ActionOutcome> {
        let file_name = required_text(args, "file_name")?;
        let path = resolve_in_root(&self.root, file_name)?;

        let result = if path.is_dir() {
            let analysis = self
                .collaborators
                .analyzer
                .analyze(&path, &context.snapshot())
                .with_context(|| format!("analyze directory {file_name}"))?;
            serde_json::to_value(analysis).context("serialize feature analysis")?
        } else if path.is_file() {
            let lines = self.collaborators.files.read(&path)?;
            json!({
                "file_name": file_name,
                "content": lines.join("\n"),
                "insights": RAW_FILE_INSIGHT,
            })
        } else {
            bail!("file or directory not found: {file_name}");
        };

        context.update("analysis_result", result.clone());
        Ok(ActionOutcome::Value(json!({ "result": result })))
    }

    fn get_raw_code(&self, args: &Args) -> Result<ActionOutcome> {
        let file_name = required_text(args, "file_name")?;
        let lines = self.read_project_file(file_name)?;
        Ok(ActionOutcome::Value(json!(lines)))
    }

    fn modify_file(&self, args: &Args) -> Result<ActionOutcome> {
        let file_name = required_text(args, "file_name")?;
        let path = resolve_in_root(&self.root, file_name)?;
        let kind = ModifyKind::parse(args.get("action_type").unwrap_or(&Value::Null))?;

        if kind == ModifyKind::Delete {
            let deleted = self.collaborators.files.delete(&path)?;
            let status = if deleted {
                "File deleted"
            } else {
                "File not deleted"
            };
            return Ok(ActionOutcome::Value(json!({ "status": status })));
        }

        let content = match args.get("content") {
            Some(Value::String(text)) if !is_placeholder_text(text) => text,
            other => {
                warn!(file = file_name, content = ?other, "invalid content format");
                return Ok(ActionOutcome::Value(
                    json!({ "status": "Invalid content format" }),
                ));
            }
        };
        if kind == ModifyKind::Create && path.exists() {
            debug!(file = file_name, "create targets an existing file; treating as modify");
        }

        let lines: Vec<String> = content.lines().map(str::to_string).collect();
        let written = self.collaborators.files.write(&path, &lines)?;
        let status = if written {
            "File written"
        } else {
            "Changes rejected"
        };
        Ok(ActionOutcome::Value(json!({ "status": status })))
    }

    fn identify_gaps(&self, args: &Args, context: &mut ContextStore) -> Result<ActionOutcome> {
        let file_name = required_text(args, "file_name")?;
        let content = self.read_project_file(file_name)?.join("\n");
        let areas = text_list(args.get("areas_of_interest"));
        let areas = if areas.is_empty() {
            DEFAULT_AREAS_OF_INTEREST
                .iter()
                .map(|area| area.to_string())
                .collect()
        } else {
            areas
        };

        let prompt = self.prompts.render_gaps(file_name, &content, &areas)?;
        let response = self.converse(&prompt, context)?;
        context.update(format!("gaps_{file_name}"), Value::String(response.clone()));
        Ok(ActionOutcome::Value(json!({
            "status": "Gaps identified",
            "file": file_name,
            "response": response,
        })))
    }

    fn generate_plan(&self, args: &Args, context: &mut ContextStore) -> Result<ActionOutcome> {
        let objective = required_text(args, "objective")?;
        let dependencies = text_list(args.get("dependencies"));
        let prompt = self.prompts.render_plan(objective, &dependencies)?;
        let reply = self.converse(&prompt, context)?;
        let steps = extract_plan(&reply).context("extract plan from oracle reply")?;

        let mut tasks = Vec::with_capacity(steps.len());
        for step in steps {
            match Task::try_from(step) {
                Ok(task) => tasks.push(task),
                Err(err) => warn!(err = %err, "skipping plan step"),
            }
        }
        if tasks.is_empty() {
            warn!("plan contained no runnable steps");
        } else {
            info!(count = tasks.len(), "plan generated");
        }
        Ok(ActionOutcome::Plan(tasks))
    }

    fn generate_new_content(
        &self,
        args: &Args,
        context: &mut ContextStore,
    ) -> Result<ActionOutcome> {
        let existing = required_text(args, "existing_content")?;
        let change_description = required_text(args, "change_description")?;

        let source = match resolve_in_root(&self.root, existing) {
            Ok(path) if path.is_file() => self.collaborators.files.read(&path)?.join("\n"),
            _ => existing.to_string(),
        };
        let prompt = self.prompts.render_new_content(&source, change_description)?;
        let generated = self.converse(&prompt, context)?;
        context.save_generated_content(existing, Value::String(generated.clone()));
        Ok(ActionOutcome::Value(Value::String(generated)))
    }

    /// Ask the oracle whether the objective is met. Oracle failures become
    /// [`Verdict::Error`] rather than an error.
    fn evaluate_state(&self, context: &ContextStore) -> Result<Verdict> {
        let objective = context.objective().unwrap_or_default();
        let prompt = self.prompts.render_evaluate(objective)?;
        let verdict = match self.collaborators.oracle.converse(&prompt, &context.snapshot()) {
            Ok(reply) => interpret_verdict(&reply),
            Err(err) => Verdict::Error {
                message: err.to_string(),
            },
        };
        info!(verdict = verdict.label(), "state evaluated");
        Ok(verdict)
    }

    fn get_user_input(&self, args: &Args, context: &ContextStore) -> Result<ActionOutcome> {
        let prompt = required_text(args, "prompt")?;
        let operator = self.collaborators.operator;
        operator.show(&format!(
            "Current context:\n{}",
            context.snapshot().to_json_pretty()
        ));
        let answer = operator.ask(prompt)?;
        Ok(ActionOutcome::Value(Value::String(answer)))
    }

    fn converse(&self, prompt: &str, context: &ContextStore) -> Result<String> {
        self.collaborators
            .oracle
            .converse(prompt, &context.snapshot())
            .map_err(|err| anyhow!(err))
    }

    fn read_project_file(&self, file_name: &str) -> Result<Vec<String>> {
        let path = resolve_in_root(&self.root, file_name)?;
        if !path.is_file() {
            bail!("file not found: {file_name}");
        }
        self.collaborators.files.read(&path)
    }
}

/// Text argument that must have been supplied by the plan.
fn required_text<'v>(args: &'v Args, name: &str) -> Result<&'v str> {
    match args.get(name) {
        Some(value) if is_placeholder(value) => bail!("missing argument `{name}`"),
        Some(Value::String(text)) if !text.trim().is_empty() => Ok(text.as_str()),
        Some(Value::String(_)) => bail!("empty argument `{name}`"),
        Some(other) => bail!("argument `{name}` must be text, got {other}"),
        None => bail!("missing argument `{name}`"),
    }
}

/// List-of-text argument; a single string counts as a one-element list.
fn text_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        Some(Value::String(text)) if !is_placeholder_text(text) => vec![text.clone()],
        _ => Vec::new(),
    }
}
