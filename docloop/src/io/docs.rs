//! Documentation written back from a feature analysis.
//!
//! The README receives the overall insight and every analyzed file gets a
//! regenerated summary header. All writes go through the [`FileStore`], so
//! the operator sees a diff and confirms each one.

use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};
use tracing::{info, instrument, warn};

use crate::core::context::ContextSnapshot;
use crate::core::header::{
    HeaderStyle, render_summary_header, strip_code_fence, strip_summary_header,
};
use crate::io::features::{FeatureAnalysis, README_FILE};
use crate::io::files::FileStore;
use crate::io::oracle::Oracle;
use crate::io::prompt::PromptEngine;

/// What happened to the README.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadmeUpdate {
    Created,
    Updated,
    /// The README already contains the overall insight.
    UpToDate,
    Declined,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommentStatus {
    Written,
    Declined,
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentUpdate {
    pub file: String,
    pub status: CommentStatus,
}

pub struct DocWriter<O: Oracle, F: FileStore> {
    oracle: O,
    files: F,
    prompts: PromptEngine,
}

impl<O: Oracle, F: FileStore> DocWriter<O, F> {
    pub fn new(oracle: O, files: F) -> Self {
        Self {
            oracle,
            files,
            prompts: PromptEngine::new(),
        }
    }

    /// Write the overall insight to `dir/README.md` unless it is already there.
    #[instrument(skip_all, fields(dir = %dir.display()))]
    pub fn update_readme(&self, dir: &Path, analysis: &FeatureAnalysis) -> Result<ReadmeUpdate> {
        let insight = analysis.overall_insight.trim();
        if insight.is_empty() {
            bail!("analysis has no overall insight");
        }
        let path = dir.join(README_FILE);
        let existed = path.is_file();
        if existed && self.files.read(&path)?.join("\n").contains(insight) {
            info!("README is up to date");
            return Ok(ReadmeUpdate::UpToDate);
        }

        let lines: Vec<String> = insight.lines().map(str::to_string).collect();
        if !self.files.write(&path, &lines)? {
            return Ok(ReadmeUpdate::Declined);
        }
        Ok(if existed {
            ReadmeUpdate::Updated
        } else {
            ReadmeUpdate::Created
        })
    }

    /// Regenerate the summary header of every analyzed file under `dir`.
    ///
    /// A failure on one file is reported in its [`CommentUpdate`] and does not
    /// stop the others.
    pub fn maintain_comments(
        &self,
        dir: &Path,
        analysis: &FeatureAnalysis,
        context: &ContextSnapshot,
    ) -> Vec<CommentUpdate> {
        analysis
            .file_summaries
            .iter()
            .map(|summary| {
                let status = match self.update_file_comment(
                    &dir.join(&summary.file),
                    &summary.summary,
                    context,
                ) {
                    Ok(true) => CommentStatus::Written,
                    Ok(false) => CommentStatus::Declined,
                    Err(err) => {
                        let error = format!("{err:#}");
                        warn!(file = %summary.file, err = %error, "comment update failed");
                        CommentStatus::Failed { error }
                    }
                };
                CommentUpdate {
                    file: summary.file.clone(),
                    status,
                }
            })
            .collect()
    }

    /// Replace the summary header of `path` with one generated from `summary`.
    ///
    /// Returns `false` when the operator declined the change.
    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn update_file_comment(
        &self,
        path: &Path,
        summary: &str,
        context: &ContextSnapshot,
    ) -> Result<bool> {
        let style = path
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(HeaderStyle::for_extension)
            .with_context(|| format!("no summary header style for {}", path.display()))?;
        let current = self.files.read(path)?;

        let file = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |name| name.to_string_lossy().into_owned());
        let prompt = self.prompts.render_file_overview(&file, summary)?;
        let reply = self
            .oracle
            .converse(&prompt, context)
            .map_err(|err| anyhow!(err))
            .with_context(|| format!("overview for {file}"))?;

        let mut body = current.as_slice();
        let mut updated = Vec::with_capacity(current.len() + 8);
        if style == HeaderStyle::Docstring
            && let Some((first, rest)) = body.split_first()
            && first.starts_with("#!")
        {
            updated.push(first.clone());
            body = rest;
        }
        updated.extend(render_summary_header(style, strip_code_fence(&reply)));
        updated.push(String::new());
        updated.extend(strip_summary_header(body));

        if updated == current {
            info!("summary header unchanged");
            return Ok(true);
        }
        self.files.write(path, &updated)
    }
}
