//! Feature analysis of a source directory.
//!
//! Declarations and doc comments are pulled out of each source file with a
//! regex, then the oracle is asked for an insight per feature, a summary per
//! file and one overall insight for the application.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use anyhow::{Context, Result, anyhow, bail};
use regex::Regex;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::core::context::ContextSnapshot;
use crate::io::oracle::Oracle;
use crate::io::prompt::{PromptEngine, SummaryInput};

pub(crate) const README_FILE: &str = "README.md";
const MAX_FEATURES_PER_FILE: usize = 20;
const SOURCE_EXTENSIONS: &[&str] = &["py", "rs"];

static FEATURE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?m)^[ \t]*(?:(?:pub(?:\([^)]*\))?|async|unsafe|const)[ \t]+)*(?:def|fn|class|struct|enum|trait)[ \t]+\w+(?:\([^)\n]*\))?|^[ \t]*///[^\n]*|"""[^"\n]+"""|^[ \t]*#[ \t][^\n]*"#,
    )
    .expect("feature pattern is valid")
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileSummary {
    pub file: String,
    pub summary: String,
}

/// Result of analyzing a directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeatureAnalysis {
    pub file_summaries: Vec<FileSummary>,
    pub overall_insight: String,
}

pub trait FeatureAnalyzer {
    /// Analyze the source files directly inside `dir`. Every oracle call made
    /// along the way receives `context`.
    fn analyze(&self, dir: &Path, context: &ContextSnapshot) -> Result<FeatureAnalysis>;
}

impl<T: FeatureAnalyzer + ?Sized> FeatureAnalyzer for &T {
    fn analyze(&self, dir: &Path, context: &ContextSnapshot) -> Result<FeatureAnalysis> {
        (**self).analyze(dir, context)
    }
}

/// Analyzer that extracts features with a regex and consults the oracle.
pub struct RegexFeatureAnalyzer<O: Oracle> {
    oracle: O,
    prompts: PromptEngine,
}

impl<O: Oracle> RegexFeatureAnalyzer<O> {
    pub fn new(oracle: O) -> Self {
        Self {
            oracle,
            prompts: PromptEngine::new(),
        }
    }

    fn ask(&self, prompt: &str, context: &ContextSnapshot) -> Result<String> {
        self.oracle
            .converse(prompt, context)
            .map_err(|err| anyhow!(err))
    }
}

impl<O: Oracle> FeatureAnalyzer for RegexFeatureAnalyzer<O> {
    fn analyze(&self, dir: &Path, context: &ContextSnapshot) -> Result<FeatureAnalysis> {
        if !dir.is_dir() {
            bail!("directory not found: {}", dir.display());
        }
        info!(dir = %dir.display(), "analyzing features");

        let overview = fs::read_to_string(dir.join(README_FILE)).unwrap_or_default();

        let features = extract_directory_features(dir)?;
        let mut summaries = Vec::with_capacity(features.len());
        for (file, file_features) in &features {
            let mut insights = Vec::with_capacity(file_features.len());
            for feature in file_features {
                let prompt = self.prompts.render_feature_insight(&overview, file, feature)?;
                insights.push(
                    self.ask(&prompt, context)
                        .with_context(|| format!("insight for {feature} in {file}"))?,
                );
            }
            let prompt = self
                .prompts
                .render_file_summary(file, file_features, &insights)?;
            let summary = self
                .ask(&prompt, context)
                .with_context(|| format!("summary for {file}"))?;
            summaries.push(FileSummary {
                file: file.clone(),
                summary,
            });
        }

        let inputs: Vec<SummaryInput<'_>> = summaries
            .iter()
            .map(|s| SummaryInput {
                file: &s.file,
                summary: &s.summary,
            })
            .collect();
        let prompt = self.prompts.render_overall_insight(&overview, &inputs)?;
        let overall_insight = self.ask(&prompt, context).context("overall insight")?;

        Ok(FeatureAnalysis {
            file_summaries: summaries,
            overall_insight,
        })
    }
}

/// Features of each source file directly inside `dir`, keyed by file name.
///
/// Files without any recognizable feature are left out. Unreadable files are
/// logged and skipped.
pub fn extract_directory_features(dir: &Path) -> Result<BTreeMap<String, Vec<String>>> {
    let mut out = BTreeMap::new();
    let entries = fs::read_dir(dir).with_context(|| format!("read directory {}", dir.display()))?;
    for entry in entries {
        let entry = entry.with_context(|| format!("read directory {}", dir.display()))?;
        let path = entry.path();
        let is_source = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| SOURCE_EXTENSIONS.contains(&ext));
        if !path.is_file() || !is_source {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) => {
                warn!(file = %path.display(), err = %err, "skipping unreadable file");
                continue;
            }
        };
        let features = extract_features(&content);
        debug!(file = %name, count = features.len(), "extracted features");
        if !features.is_empty() {
            out.insert(name, features);
        }
    }
    Ok(out)
}

/// Declarations and doc comments found in `content`, in source order.
pub fn extract_features(content: &str) -> Vec<String> {
    FEATURE_PATTERN
        .find_iter(content)
        .map(|m| m.as_str().trim().to_string())
        .filter(|feature| !feature.is_empty())
        .take(MAX_FEATURES_PER_FILE)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::context::ContextStore;
    use crate::test_support::ScriptedOracle;

    #[test]
    fn extracts_python_declarations_and_docstrings() {
        let src = "import os\n\nclass Loader:\n    \"\"\"Loads files.\"\"\"\n    def load(self, path):\n        # read it\n        return path\n";
        assert_eq!(
            extract_features(src),
            vec![
                "class Loader",
                "\"\"\"Loads files.\"\"\"",
                "def load(self, path)",
                "# read it",
            ]
        );
    }

    #[test]
    fn extracts_rust_items_and_doc_comments() {
        let src = "/// Entry point.\npub fn main() {}\n#[derive(Debug)]\npub(crate) struct Store;\nenum Mode { A }\nconst X: u8 = 1;\n";
        assert_eq!(
            extract_features(src),
            vec![
                "/// Entry point.",
                "pub fn main()",
                "pub(crate) struct Store",
                "enum Mode"
            ]
        );
    }

    #[test]
    fn caps_features_per_file() {
        let src: String = (0..50).map(|i| format!("def f{i}():\n    pass\n")).collect();
        assert_eq!(extract_features(&src).len(), MAX_FEATURES_PER_FILE);
    }

    #[test]
    fn directory_features_skip_non_source_files() {
        let temp = tempfile::tempdir().expect("tempdir");
        fs::write(temp.path().join("a.py"), "def a():\n    pass\n").expect("write");
        fs::write(temp.path().join("notes.txt"), "def nope():\n").expect("write");
        fs::write(temp.path().join("empty.py"), "x = 1\n").expect("write");

        let features = extract_directory_features(temp.path()).expect("extract");
        assert_eq!(features.len(), 1);
        assert_eq!(features["a.py"], vec!["def a()"]);
    }

    /// Verifies the analyzer asks for one insight per feature, one summary per
    /// file and one overall insight, in that order.
    #[test]
    fn analyze_consults_oracle_per_feature_file_and_overall() {
        let temp = tempfile::tempdir().expect("tempdir");
        fs::write(temp.path().join("README.md"), "A tiny tool.").expect("write");
        fs::write(temp.path().join("a.py"), "def run():\n    pass\n").expect("write");

        let oracle = ScriptedOracle::new(["runs things", "entry module", "tiny tool overall"]);
        let analysis = RegexFeatureAnalyzer::new(&oracle)
            .analyze(temp.path(), &ContextStore::new().snapshot())
            .expect("analyze");

        assert_eq!(
            analysis.file_summaries,
            vec![FileSummary {
                file: "a.py".to_string(),
                summary: "entry module".to_string(),
            }]
        );
        assert_eq!(analysis.overall_insight, "tiny tool overall");

        let prompts = oracle.prompts();
        assert_eq!(prompts.len(), 3);
        assert!(prompts[0].contains("A tiny tool."));
        assert!(prompts[0].contains("def run()"));
        assert!(prompts[1].contains("runs things"));
        assert!(prompts[2].contains("a.py: entry module"));
    }

    #[test]
    fn analyze_missing_directory_fails() {
        let temp = tempfile::tempdir().expect("tempdir");
        let oracle = ScriptedOracle::new(Vec::<&str>::new());
        let err = RegexFeatureAnalyzer::new(&oracle)
            .analyze(&temp.path().join("missing"), &ContextStore::new().snapshot())
            .unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn analyze_hands_the_callers_context_to_every_oracle_call() {
        let temp = tempfile::tempdir().expect("tempdir");
        fs::write(temp.path().join("a.py"), "def run():\n    pass\n").expect("write");
        let mut context = ContextStore::new();
        context.set_objective("document the loader");
        context.update("gaps_a.py", serde_json::json!("missing docstrings"));
        let snapshot = context.snapshot();

        let oracle = ScriptedOracle::new(["insight", "summary", "overall"]);
        RegexFeatureAnalyzer::new(&oracle)
            .analyze(temp.path(), &snapshot)
            .expect("analyze");

        let seen = oracle.snapshots();
        assert_eq!(seen.len(), 3);
        assert!(seen.iter().all(|s| s == &snapshot));
    }
}
