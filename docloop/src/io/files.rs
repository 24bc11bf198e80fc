//! Project file access for actions.
//!
//! Writes and deletions go through the operator: a line diff is shown and the
//! change is committed only after explicit confirmation.

use std::fs;
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result, bail};
use tracing::{debug, info};
use walkdir::{DirEntry, WalkDir};

use crate::io::operator::Operator;

/// Unchanged lines shown around each change in a diff.
const DIFF_CONTEXT_LINES: usize = 2;
/// Above this many LCS cells the diff degrades to remove-all/add-all.
const DIFF_CELL_LIMIT: usize = 4_000_000;
const SKIPPED_DIRS: &[&str] = &["target", "node_modules", "__pycache__", "venv"];

/// File system collaborator used by the dispatch table.
pub trait FileStore {
    /// Read a file as an ordered sequence of lines.
    fn read(&self, path: &Path) -> Result<Vec<String>>;

    /// Replace a file's content. Returns `false` when the change was declined.
    fn write(&self, path: &Path, lines: &[String]) -> Result<bool>;

    /// Delete a file. Returns `false` when nothing was deleted.
    fn delete(&self, path: &Path) -> Result<bool>;

    /// Project files under `root`, relative and sorted.
    fn list_files(&self, root: &Path) -> Result<Vec<String>>;
}

impl<T: FileStore + ?Sized> FileStore for &T {
    fn read(&self, path: &Path) -> Result<Vec<String>> {
        (**self).read(path)
    }

    fn write(&self, path: &Path, lines: &[String]) -> Result<bool> {
        (**self).write(path, lines)
    }

    fn delete(&self, path: &Path) -> Result<bool> {
        (**self).delete(path)
    }

    fn list_files(&self, root: &Path) -> Result<Vec<String>> {
        (**self).list_files(root)
    }
}

/// File store that asks the operator before every write or deletion.
#[derive(Debug, Clone)]
pub struct ConfirmingFileStore<O: Operator> {
    operator: O,
    extensions: Vec<String>,
    max_depth: usize,
}

impl<O: Operator> ConfirmingFileStore<O> {
    pub fn new(operator: O, extensions: Vec<String>, max_depth: usize) -> Self {
        Self {
            operator,
            extensions,
            max_depth,
        }
    }

    fn wants(&self, path: &Path) -> bool {
        if self.extensions.is_empty() {
            return true;
        }
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|want| want == ext))
    }
}

impl<O: Operator> FileStore for ConfirmingFileStore<O> {
    fn read(&self, path: &Path) -> Result<Vec<String>> {
        read_lines(path)
    }

    fn write(&self, path: &Path, lines: &[String]) -> Result<bool> {
        let current = if path.is_file() {
            read_lines(path)?
        } else {
            Vec::new()
        };
        self.operator
            .show(&render_diff(&path.display().to_string(), &current, lines));
        if !self
            .operator
            .confirm(&format!("Apply these changes to {}?", path.display()))?
        {
            info!(path = %path.display(), "changes rejected by operator");
            return Ok(false);
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create directory {}", parent.display()))?;
        }
        let mut contents = lines.join("\n");
        if !lines.is_empty() {
            contents.push('\n');
        }
        fs::write(path, contents).with_context(|| format!("write {}", path.display()))?;
        info!(path = %path.display(), lines = lines.len(), "file written");
        Ok(true)
    }

    fn delete(&self, path: &Path) -> Result<bool> {
        if !path.is_file() {
            return Ok(false);
        }
        self.operator
            .show(&format!("Deleting file {}", path.display()));
        if !self
            .operator
            .confirm(&format!("Delete {}?", path.display()))?
        {
            info!(path = %path.display(), "deletion rejected by operator");
            return Ok(false);
        }
        fs::remove_file(path).with_context(|| format!("delete {}", path.display()))?;
        info!(path = %path.display(), "file deleted");
        Ok(true)
    }

    fn list_files(&self, root: &Path) -> Result<Vec<String>> {
        if !root.is_dir() {
            bail!("project directory not found: {}", root.display());
        }
        let mut files = Vec::new();
        let walker = WalkDir::new(root)
            .max_depth(self.max_depth)
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !is_skipped(entry));
        for entry in walker {
            let entry = entry.with_context(|| format!("walk {}", root.display()))?;
            if !entry.file_type().is_file() || !self.wants(entry.path()) {
                continue;
            }
            let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
            files.push(to_slash(relative));
        }
        files.sort();
        debug!(root = %root.display(), count = files.len(), "listed project files");
        Ok(files)
    }
}

fn is_skipped(entry: &DirEntry) -> bool {
    let name = entry.file_name().to_string_lossy();
    name.starts_with('.') || (entry.file_type().is_dir() && SKIPPED_DIRS.contains(&name.as_ref()))
}

fn to_slash(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn read_lines(path: &Path) -> Result<Vec<String>> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    Ok(contents.lines().map(str::to_string).collect())
}

/// Resolve a plan-supplied file name against the project root.
///
/// Rejects absolute paths and parent-directory components so actions stay
/// inside the project.
pub fn resolve_in_root(root: &Path, name: &str) -> Result<PathBuf> {
    let relative = Path::new(name.trim());
    if relative.as_os_str().is_empty() {
        bail!("empty file name");
    }
    for component in relative.components() {
        match component {
            Component::Normal(_) | Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                bail!("path escapes the project root: {name}");
            }
        }
    }
    Ok(root.join(relative))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DiffLine<'a> {
    Same(&'a str),
    Removed(&'a str),
    Added(&'a str),
}

/// Render a line diff of `old` against `new` with a few lines of context.
pub fn render_diff(label: &str, old: &[String], new: &[String]) -> String {
    let ops = diff_lines(old, new);
    let mut out = format!("--- {label} (current)\n+++ {label} (proposed)\n");
    if ops.iter().all(|op| matches!(op, DiffLine::Same(_))) {
        out.push_str("(no changes)\n");
        return out;
    }

    let changed: Vec<bool> = ops
        .iter()
        .map(|op| !matches!(op, DiffLine::Same(_)))
        .collect();
    let visible = |idx: usize| {
        let lo = idx.saturating_sub(DIFF_CONTEXT_LINES);
        let hi = (idx + DIFF_CONTEXT_LINES).min(ops.len() - 1);
        changed[lo..=hi].iter().any(|c| *c)
    };

    let mut last_shown: Option<usize> = None;
    for (idx, op) in ops.iter().enumerate() {
        if !visible(idx) {
            continue;
        }
        if last_shown.is_some_and(|prev| prev + 1 != idx) || (last_shown.is_none() && idx > 0) {
            out.push_str("@@\n");
        }
        let (marker, line) = match op {
            DiffLine::Same(line) => (' ', line),
            DiffLine::Removed(line) => ('-', line),
            DiffLine::Added(line) => ('+', line),
        };
        out.push(marker);
        out.push_str(line);
        out.push('\n');
        last_shown = Some(idx);
    }
    out
}

fn diff_lines<'a>(old: &'a [String], new: &'a [String]) -> Vec<DiffLine<'a>> {
    let prefix = old
        .iter()
        .zip(new)
        .take_while(|(a, b)| a == b)
        .count();
    let suffix = old[prefix..]
        .iter()
        .rev()
        .zip(new[prefix..].iter().rev())
        .take_while(|(a, b)| a == b)
        .count();
    let old_mid = &old[prefix..old.len() - suffix];
    let new_mid = &new[prefix..new.len() - suffix];

    let mut ops: Vec<DiffLine<'a>> = old[..prefix].iter().map(|l| DiffLine::Same(l.as_str())).collect();
    if old_mid.len().saturating_mul(new_mid.len()) > DIFF_CELL_LIMIT {
        ops.extend(old_mid.iter().map(|l| DiffLine::Removed(l.as_str())));
        ops.extend(new_mid.iter().map(|l| DiffLine::Added(l.as_str())));
    } else {
        ops.extend(lcs_diff(old_mid, new_mid));
    }
    ops.extend(old[old.len() - suffix..].iter().map(|l| DiffLine::Same(l.as_str())));
    ops
}

fn lcs_diff<'a>(old: &'a [String], new: &'a [String]) -> Vec<DiffLine<'a>> {
    let (n, m) = (old.len(), new.len());
    // lengths[i][j] = LCS length of old[i..] and new[j..]
    let mut lengths = vec![vec![0usize; m + 1]; n + 1];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            lengths[i][j] = if old[i] == new[j] {
                lengths[i + 1][j + 1] + 1
            } else {
                lengths[i + 1][j].max(lengths[i][j + 1])
            };
        }
    }

    let mut ops = Vec::with_capacity(n + m);
    let (mut i, mut j) = (0, 0);
    while i < n && j < m {
        if old[i] == new[j] {
            ops.push(DiffLine::Same(old[i].as_str()));
            i += 1;
            j += 1;
        } else if lengths[i + 1][j] >= lengths[i][j + 1] {
            ops.push(DiffLine::Removed(old[i].as_str()));
            i += 1;
        } else {
            ops.push(DiffLine::Added(new[j].as_str()));
            j += 1;
        }
    }
    ops.extend(old[i..].iter().map(|l| DiffLine::Removed(l.as_str())));
    ops.extend(new[j..].iter().map(|l| DiffLine::Added(l.as_str())));
    ops
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedOperator;

    fn lines(text: &str) -> Vec<String> {
        text.lines().map(str::to_string).collect()
    }

    fn store(operator: &ScriptedOperator) -> ConfirmingFileStore<&ScriptedOperator> {
        ConfirmingFileStore::new(operator, vec!["py".to_string(), "md".to_string()], 8)
    }

    #[test]
    fn write_commits_after_confirmation() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("pkg").join("a.py");
        let operator = ScriptedOperator::new(["y"]);

        let written = store(&operator)
            .write(&path, &lines("def f():\n    pass"))
            .expect("write");

        assert!(written);
        assert_eq!(
            fs::read_to_string(&path).expect("read"),
            "def f():\n    pass\n"
        );
        let shown = operator.shown().join("\n");
        assert!(shown.contains("+def f():"));
    }

    #[test]
    fn write_declined_leaves_file_untouched() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("a.py");
        fs::write(&path, "old\n").expect("seed");
        let operator = ScriptedOperator::new(["n"]);

        let written = store(&operator).write(&path, &lines("new")).expect("write");

        assert!(!written);
        assert_eq!(fs::read_to_string(&path).expect("read"), "old\n");
        assert!(operator.shown().join("\n").contains("-old\n+new"));
    }

    #[test]
    fn delete_missing_file_reports_false_without_asking() {
        let temp = tempfile::tempdir().expect("tempdir");
        let operator = ScriptedOperator::new(Vec::<&str>::new());
        let deleted = store(&operator)
            .delete(&temp.path().join("ghost.py"))
            .expect("delete");
        assert!(!deleted);
        assert!(operator.asked().is_empty());
    }

    #[test]
    fn delete_requires_confirmation() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("a.py");
        fs::write(&path, "x\n").expect("seed");

        let declined = ScriptedOperator::new(["no"]);
        assert!(!store(&declined).delete(&path).expect("delete"));
        assert!(path.exists());

        let accepted = ScriptedOperator::new(["yes"]);
        assert!(store(&accepted).delete(&path).expect("delete"));
        assert!(!path.exists());
    }

    #[test]
    fn list_files_filters_and_skips_hidden_dirs() {
        let temp = tempfile::tempdir().expect("tempdir");
        let root = temp.path();
        for rel in [
            "main.py",
            "README.md",
            "notes.txt",
            "pkg/util.py",
            ".git/config.py",
            ".docloop/runs/x.md",
            "target/gen.py",
        ] {
            let path = root.join(rel);
            fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
            fs::write(&path, "").expect("write");
        }

        let operator = ScriptedOperator::new(Vec::<&str>::new());
        let files = store(&operator).list_files(root).expect("list");
        assert_eq!(files, vec!["README.md", "main.py", "pkg/util.py"]);
    }

    #[test]
    fn list_files_on_missing_root_errors() {
        let temp = tempfile::tempdir().expect("tempdir");
        let operator = ScriptedOperator::new(Vec::<&str>::new());
        let err = store(&operator)
            .list_files(&temp.path().join("nope"))
            .unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn resolve_rejects_escaping_paths() {
        let root = Path::new("/proj");
        assert_eq!(
            resolve_in_root(root, "src/lib.rs").expect("ok"),
            PathBuf::from("/proj/src/lib.rs")
        );
        assert!(resolve_in_root(root, "../etc/passwd").is_err());
        assert!(resolve_in_root(root, "/etc/passwd").is_err());
        assert!(resolve_in_root(root, "  ").is_err());
    }

    #[test]
    fn diff_shows_context_around_changes() {
        let old = lines("a\nb\nc\nd\ne\nf\ng\nh");
        let new = lines("a\nb\nc\nd\ne\nf\nG\nh");
        let diff = render_diff("x", &old, &new);
        assert!(diff.contains("@@\n e\n f\n-g\n+G\n h\n"));
        assert!(!diff.contains(" a\n"));
    }

    #[test]
    fn diff_of_identical_content_says_so() {
        let same = lines("a\nb");
        assert!(render_diff("x", &same, &same).contains("(no changes)"));
    }

    #[test]
    fn diff_handles_insertions_in_the_middle() {
        let old = lines("one\nthree");
        let new = lines("one\ntwo\nthree");
        let diff = render_diff("x", &old, &new);
        assert!(diff.contains(" one\n+two\n three\n"));
    }
}
