//! Scripted collaborators and fixtures for tests.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use tempfile::TempDir;

use crate::core::context::ContextSnapshot;
use crate::io::features::{FeatureAnalysis, FeatureAnalyzer};
use crate::io::files::ConfirmingFileStore;
use crate::io::operator::Operator;
use crate::io::oracle::{Oracle, OracleError};

/// Oracle that replays a fixed script of replies and records every prompt.
///
/// Once the script runs out every call fails with a communication error.
#[derive(Debug, Default)]
pub struct ScriptedOracle {
    replies: RefCell<VecDeque<Result<String, OracleError>>>,
    prompts: RefCell<Vec<String>>,
    snapshots: RefCell<Vec<ContextSnapshot>>,
}

impl ScriptedOracle {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::from_results(replies.into_iter().map(|reply| Ok(reply.into())))
    }

    pub fn from_results<I>(replies: I) -> Self
    where
        I: IntoIterator<Item = Result<String, OracleError>>,
    {
        Self {
            replies: RefCell::new(replies.into_iter().collect()),
            ..Self::default()
        }
    }

    /// Prompts received so far, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.borrow().clone()
    }

    /// Context snapshots received so far, in call order.
    pub fn snapshots(&self) -> Vec<ContextSnapshot> {
        self.snapshots.borrow().clone()
    }

    pub fn remaining(&self) -> usize {
        self.replies.borrow().len()
    }
}

impl Oracle for ScriptedOracle {
    fn converse(&self, prompt: &str, context: &ContextSnapshot) -> Result<String, OracleError> {
        self.prompts.borrow_mut().push(prompt.to_string());
        self.snapshots.borrow_mut().push(context.clone());
        self.replies.borrow_mut().pop_front().unwrap_or_else(|| {
            Err(OracleError::Communication(
                "scripted oracle has no replies left".to_string(),
            ))
        })
    }
}

/// Operator with scripted answers; captures everything shown and asked.
#[derive(Debug, Default)]
pub struct ScriptedOperator {
    answers: RefCell<VecDeque<String>>,
    shown: RefCell<Vec<String>>,
    asked: RefCell<Vec<String>>,
}

impl ScriptedOperator {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: RefCell::new(answers.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }

    pub fn shown(&self) -> Vec<String> {
        self.shown.borrow().clone()
    }

    pub fn asked(&self) -> Vec<String> {
        self.asked.borrow().clone()
    }
}

impl Operator for ScriptedOperator {
    fn show(&self, text: &str) {
        self.shown.borrow_mut().push(text.to_string());
    }

    fn ask(&self, prompt: &str) -> Result<String> {
        self.asked.borrow_mut().push(prompt.to_string());
        match self.answers.borrow_mut().pop_front() {
            Some(answer) => Ok(answer),
            None => bail!("scripted operator has no answers left"),
        }
    }
}

/// Feature analyzer returning a fixed overall insight.
#[derive(Debug, Default)]
pub struct StubFeatureAnalyzer {
    overall_insight: String,
    calls: RefCell<Vec<PathBuf>>,
    snapshots: RefCell<Vec<ContextSnapshot>>,
}

impl StubFeatureAnalyzer {
    pub fn new(overall_insight: impl Into<String>) -> Self {
        Self {
            overall_insight: overall_insight.into(),
            calls: RefCell::new(Vec::new()),
            snapshots: RefCell::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<PathBuf> {
        self.calls.borrow().clone()
    }

    /// Context snapshots received so far, in call order.
    pub fn snapshots(&self) -> Vec<ContextSnapshot> {
        self.snapshots.borrow().clone()
    }
}

impl FeatureAnalyzer for StubFeatureAnalyzer {
    fn analyze(&self, dir: &Path, context: &ContextSnapshot) -> Result<FeatureAnalysis> {
        self.calls.borrow_mut().push(dir.to_path_buf());
        self.snapshots.borrow_mut().push(context.clone());
        Ok(FeatureAnalysis {
            file_summaries: Vec::new(),
            overall_insight: self.overall_insight.clone(),
        })
    }
}

/// Temporary project directory.
#[derive(Debug)]
pub struct ProjectFixture {
    dir: TempDir,
}

impl Default for ProjectFixture {
    fn default() -> Self {
        Self::new()
    }
}

impl ProjectFixture {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("create temp project"),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Write `contents` to `rel`, creating parent directories.
    pub fn write(&self, rel: &str, contents: &str) -> PathBuf {
        let path = self.dir.path().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create fixture dir");
        }
        fs::write(&path, contents).expect("write fixture file");
        path
    }

    /// File store over this project that lists `.py` and `.md` files.
    pub fn file_store<O: Operator>(&self, operator: O) -> ConfirmingFileStore<O> {
        ConfirmingFileStore::new(operator, vec!["py".to_string(), "md".to_string()], 8)
    }
}
