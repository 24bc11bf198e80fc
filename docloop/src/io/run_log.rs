//! Run artifacts under `.docloop/runs/<run-id>/`.
//!
//! `tasks.jsonl` gets one record per dispatched task, `context.json` the final
//! context snapshot. Writers return errors; the orchestrator logs and moves on.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;

use crate::core::context::ContextSnapshot;
use crate::core::types::Args;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskRecord {
    pub index: u32,
    pub action: String,
    pub args: Args,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub duration_ms: u64,
}

#[derive(Debug, Clone)]
pub struct RunPaths {
    pub dir: PathBuf,
    pub tasks_path: PathBuf,
    pub context_path: PathBuf,
}

impl RunPaths {
    pub fn new(root: &Path, run_id: &str) -> Self {
        let dir = root.join(".docloop").join("runs").join(run_id);
        Self {
            tasks_path: dir.join("tasks.jsonl"),
            context_path: dir.join("context.json"),
            dir,
        }
    }
}

/// Run id derived from the current UTC time, e.g. `20260101T120000.123Z`.
pub fn new_run_id() -> String {
    Utc::now().format("%Y%m%dT%H%M%S%.3fZ").to_string()
}

/// Append-only writer for one run's artifacts.
#[derive(Debug)]
pub struct RunLog {
    paths: RunPaths,
    tasks: File,
}

impl RunLog {
    pub fn create(root: &Path, run_id: &str) -> Result<Self> {
        let paths = RunPaths::new(root, run_id);
        fs::create_dir_all(&paths.dir)
            .with_context(|| format!("create run dir {}", paths.dir.display()))?;
        let tasks = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&paths.tasks_path)
            .with_context(|| format!("open {}", paths.tasks_path.display()))?;
        Ok(Self { paths, tasks })
    }

    pub fn paths(&self) -> &RunPaths {
        &self.paths
    }

    pub fn append_task(&mut self, record: &TaskRecord) -> Result<()> {
        let mut line = serde_json::to_string(record).context("serialize task record")?;
        line.push('\n');
        self.tasks
            .write_all(line.as_bytes())
            .with_context(|| format!("append {}", self.paths.tasks_path.display()))
    }

    pub fn write_context(&self, snapshot: &ContextSnapshot) -> Result<()> {
        let mut buf = serde_json::to_string_pretty(snapshot).context("serialize context")?;
        buf.push('\n');
        fs::write(&self.paths.context_path, buf)
            .with_context(|| format!("write {}", self.paths.context_path.display()))
    }
}
