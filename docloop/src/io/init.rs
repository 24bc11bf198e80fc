//! Initialization helpers for `.docloop/` scaffolding.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};

use super::config::{DocloopConfig, write_config};

/// Canonical paths within `.docloop/` for a project root.
#[derive(Debug, Clone)]
pub struct DocloopPaths {
    pub root: PathBuf,
    pub docloop_dir: PathBuf,
    pub config_path: PathBuf,
    pub runs_dir: PathBuf,
    pub gitignore_path: PathBuf,
}

impl DocloopPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let docloop_dir = root.join(".docloop");
        Self {
            root,
            config_path: docloop_dir.join("config.toml"),
            runs_dir: docloop_dir.join("runs"),
            gitignore_path: docloop_dir.join(".gitignore"),
            docloop_dir,
        }
    }
}

/// Options for `init_docloop`.
#[derive(Debug, Clone)]
pub struct InitOptions {
    /// If true, overwrite existing docloop-owned files.
    pub force: bool,
}

/// Create `.docloop/` scaffolding in `root` with a default config.
///
/// Fails if `.docloop/` already exists unless `options.force` is set.
pub fn init_docloop(root: &Path, options: &InitOptions) -> Result<DocloopPaths> {
    let paths = DocloopPaths::new(root);
    if paths.docloop_dir.exists() && !paths.docloop_dir.is_dir() {
        return Err(anyhow!(
            "docloop init: .docloop exists but is not a directory"
        ));
    }
    if paths.docloop_dir.exists() && !options.force {
        return Err(anyhow!(
            "docloop init: .docloop already exists (use --force to overwrite)"
        ));
    }

    fs::create_dir_all(&paths.runs_dir)
        .with_context(|| format!("create directory {}", paths.runs_dir.display()))?;
    fs::write(&paths.gitignore_path, DOCLOOP_GITIGNORE)
        .with_context(|| format!("write file {}", paths.gitignore_path.display()))?;
    write_config(&paths.config_path, &DocloopConfig::default())?;

    Ok(paths)
}

const DOCLOOP_GITIGNORE: &str = "runs/\n";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::config::load_config;

    /// Verifies init creates the directory layout and a loadable default config.
    #[test]
    fn init_creates_expected_layout() {
        let temp = tempfile::tempdir().expect("tempdir");

        let paths = init_docloop(temp.path(), &InitOptions { force: false }).expect("init");

        assert!(paths.docloop_dir.is_dir());
        assert!(paths.runs_dir.is_dir());
        assert_eq!(
            fs::read_to_string(&paths.gitignore_path).expect("read"),
            DOCLOOP_GITIGNORE
        );
        assert_eq!(
            load_config(&paths.config_path).expect("load"),
            DocloopConfig::default()
        );
    }

    #[test]
    fn init_without_force_refuses_existing_dir() {
        let temp = tempfile::tempdir().expect("tempdir");
        init_docloop(temp.path(), &InitOptions { force: false }).expect("init");
        let err = init_docloop(temp.path(), &InitOptions { force: false }).unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }

    /// Verifies --force restores the default config over a customized one.
    #[test]
    fn init_with_force_rewrites_config() {
        let temp = tempfile::tempdir().expect("tempdir");
        let paths = init_docloop(temp.path(), &InitOptions { force: false }).expect("init");
        fs::write(&paths.config_path, "max_iterations = 3\n").expect("customize");

        init_docloop(temp.path(), &InitOptions { force: true }).expect("re-init");

        let cfg = load_config(&paths.config_path).expect("load");
        assert_eq!(cfg.max_iterations, DocloopConfig::default().max_iterations);
    }
}
