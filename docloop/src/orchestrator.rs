//! Task queue orchestrator.
//!
//! A run seeds the queue with `analyze_project` and a `generate_plan` for the
//! objective, then pops one task per iteration: normalize its arguments,
//! dispatch it, fold the result into the context store, and append any plan,
//! follow-up or replanning task to the tail. The loop is plain iteration, so
//! plan length never grows the stack.
//!
//! A single task failing is logged and skipped. A run ends when the queue
//! drains, when `evaluate_state` cannot reach the oracle, or when the
//! iteration bound is hit.

use std::collections::VecDeque;
use std::path::Path;
use std::time::Instant;

use serde::Serialize;
use serde_json::{Value, json};
use tracing::{error, info, warn};

use crate::core::action::ActionKind;
use crate::core::context::{ContextStore, Layer};
use crate::core::normalize::normalize_args;
use crate::core::types::{Args, Task, Verdict, is_empty_result, result_key};
use crate::core::verdict::replan_objective;
use crate::dispatch::{ActionOutcome, Collaborators, Dispatcher};
use crate::io::run_log::{RunLog, TaskRecord};

/// Reason why a run stopped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "stop", rename_all = "snake_case")]
pub enum RunStop {
    /// The queue drained.
    Idle,
    /// `evaluate_state` could not consult the oracle.
    OracleFailure { message: String },
    /// The run executed `max_iterations` tasks with work still queued.
    MaxIterationsExceeded { max_iterations: u32 },
}

/// Summary of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunOutcome {
    pub tasks_executed: u32,
    pub stop: RunStop,
    /// Most recent `evaluate_state` verdict, if any ran.
    pub last_verdict: Option<Verdict>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TaskStatus {
    Succeeded,
    Failed { error: String },
}

impl TaskStatus {
    fn label(&self) -> &'static str {
        match self {
            TaskStatus::Succeeded => "succeeded",
            TaskStatus::Failed { .. } => "failed",
        }
    }
}

/// Progress report passed to the `on_task` callback after every task.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskReport {
    /// 1-based position within the run.
    pub index: u32,
    pub action: ActionKind,
    /// Normalized arguments the handler received.
    pub args: Args,
    pub status: TaskStatus,
    pub verdict: Option<Verdict>,
    /// Tasks still queued after this one.
    pub queued: usize,
}

pub struct Orchestrator<'a> {
    dispatcher: Dispatcher<'a>,
    context: ContextStore,
    queue: VecDeque<Task>,
    max_iterations: u32,
    run_log: Option<RunLog>,
}

impl<'a> Orchestrator<'a> {
    pub fn new(root: &Path, collaborators: Collaborators<'a>, max_iterations: u32) -> Self {
        Self {
            dispatcher: Dispatcher::new(root, collaborators),
            context: ContextStore::new(),
            queue: VecDeque::new(),
            max_iterations,
            run_log: None,
        }
    }

    /// Record every task and the final context under `.docloop/runs/`.
    pub fn with_run_log(mut self, run_log: RunLog) -> Self {
        self.run_log = Some(run_log);
        self
    }

    pub fn context(&self) -> &ContextStore {
        &self.context
    }

    /// Run until the queue drains or a terminal condition is reached.
    pub fn run<F: FnMut(&TaskReport)>(&mut self, objective: &str, mut on_task: F) -> RunOutcome {
        let root = self.dispatcher.root().to_path_buf();
        self.context.set_objective(objective);
        self.context.set_project(&root, Vec::new());
        self.context.reset_execution_state();
        self.queue.clear();
        self.queue.push_back(Task::bare(ActionKind::AnalyzeProject));
        self.queue.push_back(Task::generate_plan(objective));
        info!(objective, max_iterations = self.max_iterations, "run started");

        let mut tasks_executed = 0u32;
        let mut last_verdict = None;
        let stop = loop {
            if self.queue.is_empty() {
                info!(tasks_executed, "queue drained");
                break RunStop::Idle;
            }
            if tasks_executed >= self.max_iterations {
                warn!(
                    max_iterations = self.max_iterations,
                    queued = self.queue.len(),
                    "iteration bound reached"
                );
                break RunStop::MaxIterationsExceeded {
                    max_iterations: self.max_iterations,
                };
            }
            let Some(task) = self.queue.pop_front() else {
                break RunStop::Idle;
            };
            tasks_executed += 1;

            let report = self.execute(tasks_executed, task, objective);
            on_task(&report);

            if let Some(verdict) = &report.verdict {
                last_verdict = Some(verdict.clone());
                if let Verdict::Error { message } = verdict {
                    error!(message = %message, "oracle failure during evaluation; stopping run");
                    break RunStop::OracleFailure {
                        message: message.clone(),
                    };
                }
            }
        };

        if let Some(log) = &self.run_log
            && let Err(err) = log.write_context(&self.context.snapshot())
        {
            warn!(err = %format!("{err:#}"), "failed to write run context");
        }
        RunOutcome {
            tasks_executed,
            stop,
            last_verdict,
        }
    }

    fn execute(&mut self, index: u32, task: Task, objective: &str) -> TaskReport {
        let action = task.action;
        let args = normalize_args(action, &task.args);
        let mut state = Layer::new();
        state.insert("last_action".to_string(), json!(action.as_str()));
        self.context.update_execution_state(state);
        info!(index, %action, "executing task");

        let started = Instant::now();
        let outcome = self.dispatcher.dispatch(action, &args, &mut self.context);
        let elapsed = started.elapsed();

        let mut verdict = None;
        let status = match outcome {
            Ok(ActionOutcome::Value(value)) => {
                self.store_result(&task, &args, value);
                TaskStatus::Succeeded
            }
            Ok(ActionOutcome::Plan(tasks)) => {
                self.queue.extend(tasks);
                TaskStatus::Succeeded
            }
            Ok(ActionOutcome::Verdict(v)) => {
                self.apply_verdict(&task, &args, &v, objective);
                verdict = Some(v);
                TaskStatus::Succeeded
            }
            Err(err) => {
                let message = format!("{err:#}");
                let args_json = Value::Object(args.clone());
                warn!(
                    %action,
                    args = %args_json,
                    err = %message,
                    "task failed"
                );
                TaskStatus::Failed { error: message }
            }
        };

        if status == TaskStatus::Succeeded
            && let Some(follow_up) = task.follow_up
        {
            info!(follow_up = %follow_up.action, "queueing follow-up");
            self.queue.push_back(*follow_up);
        }

        if let Some(log) = self.run_log.as_mut() {
            let record = TaskRecord {
                index,
                action: action.as_str().to_string(),
                args: args.clone(),
                status: status.label().to_string(),
                error: match &status {
                    TaskStatus::Failed { error } => Some(error.clone()),
                    TaskStatus::Succeeded => None,
                },
                duration_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            };
            if let Err(err) = log.append_task(&record) {
                warn!(err = %format!("{err:#}"), "failed to append task record");
            }
        }

        TaskReport {
            index,
            action,
            args,
            status,
            verdict,
            queued: self.queue.len(),
        }
    }

    fn store_result(&mut self, task: &Task, args: &Args, value: Value) {
        if is_empty_result(&value) {
            return;
        }
        let key = task
            .result_key
            .clone()
            .unwrap_or_else(|| result_key(task.action, args));
        self.context.update(key, value);
    }

    fn apply_verdict(&mut self, task: &Task, args: &Args, verdict: &Verdict, objective: &str) {
        let mut state = Layer::new();
        state.insert("evaluation_result".to_string(), verdict.result_value());
        self.context.update_execution_state(state);
        self.store_result(task, args, verdict.result_value());

        match verdict {
            Verdict::Complete => info!("objective complete"),
            Verdict::Incomplete { rationale } => {
                info!("objective incomplete; replanning");
                self.queue
                    .push_back(Task::generate_plan(replan_objective(objective, rationale)));
            }
            Verdict::Error { .. } => {}
        }
    }
}
