//! Objective-driven documentation loop.
//!
//! `docloop run` asks the configured oracle to plan and evaluate work on a
//! project, executing one action at a time and confirming every file change
//! with the operator.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing::warn;

use docloop::core::context::ContextStore;
use docloop::dispatch::Collaborators;
use docloop::exit_codes;
use docloop::io::config::{DocloopConfig, load_config};
use docloop::io::docs::{CommentStatus, DocWriter, ReadmeUpdate};
use docloop::io::features::{FeatureAnalysis, FeatureAnalyzer, RegexFeatureAnalyzer};
use docloop::io::files::ConfirmingFileStore;
use docloop::io::init::{DocloopPaths, InitOptions, init_docloop};
use docloop::io::operator::{Operator, TerminalOperator};
use docloop::io::oracle::CommandOracle;
use docloop::io::run_log::{RunLog, new_run_id};
use docloop::logging;
use docloop::orchestrator::{Orchestrator, RunOutcome, RunStop, TaskReport, TaskStatus};

#[derive(Parser)]
#[command(
    name = "docloop",
    version,
    about = "Plan and execute documentation tasks for a project through an external oracle"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create `.docloop/` with a default config.
    Init {
        /// Overwrite existing files.
        #[arg(short, long)]
        force: bool,
        /// Project root.
        #[arg(long, default_value = ".")]
        root: PathBuf,
    },
    /// Run the planning loop for an objective until the oracle judges it complete.
    Run {
        /// Project root.
        #[arg(long, default_value = ".")]
        root: PathBuf,
        /// Objective; asked interactively when omitted.
        #[arg(long)]
        objective: Option<String>,
        /// Override `max_iterations` from the config.
        #[arg(long)]
        max_iterations: Option<u32>,
    },
    /// Summarize the features of a source directory.
    Analyze {
        /// Project root.
        #[arg(long, default_value = ".")]
        root: PathBuf,
        /// Directory to analyze, relative to the root.
        dir: Option<PathBuf>,
    },
    /// Analyze a source directory and write its overall insight to README.md.
    Readme {
        /// Project root.
        #[arg(long, default_value = ".")]
        root: PathBuf,
        /// Directory to document, relative to the root.
        dir: Option<PathBuf>,
    },
    /// Analyze a source directory and regenerate each file's summary header.
    Comments {
        /// Project root.
        #[arg(long, default_value = ".")]
        root: PathBuf,
        /// Directory to document, relative to the root.
        dir: Option<PathBuf>,
    },
}

fn main() {
    logging::init(logging::DEFAULT_FILTER);
    let code = match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{err:#}");
            exit_codes::INVALID
        }
    };
    std::process::exit(code);
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Init { force, root } => cmd_init(&root, force),
        Command::Run {
            root,
            objective,
            max_iterations,
        } => cmd_run(&root, objective, max_iterations),
        Command::Analyze { root, dir } => cmd_analyze(&root, dir.as_deref()),
        Command::Readme { root, dir } => cmd_readme(&root, dir.as_deref()),
        Command::Comments { root, dir } => cmd_comments(&root, dir.as_deref()),
    }
}

fn cmd_init(root: &Path, force: bool) -> Result<i32> {
    let paths = init_docloop(root, &InitOptions { force })?;
    println!("initialized {}", paths.docloop_dir.display());
    Ok(exit_codes::OK)
}

fn cmd_run(root: &Path, objective: Option<String>, max_iterations: Option<u32>) -> Result<i32> {
    let root = project_root(root)?;
    let paths = DocloopPaths::new(&root);
    let mut cfg = load_config(&paths.config_path)?;
    if let Some(max) = max_iterations {
        cfg.max_iterations = max;
        cfg.validate()?;
    }

    let operator = TerminalOperator;
    let objective = match objective {
        Some(objective) => objective,
        None => operator.ask("Please enter your objective:")?,
    };
    let objective = objective.trim();
    if objective.is_empty() {
        bail!("objective must not be empty");
    }

    let oracle = CommandOracle::from_config(&cfg.oracle, cfg.prompt_budget_bytes);
    let files = ConfirmingFileStore::new(operator, cfg.file_extensions.clone(), cfg.max_depth);
    let analyzer = RegexFeatureAnalyzer::new(&oracle);
    let mut orchestrator = Orchestrator::new(
        &root,
        Collaborators {
            oracle: &oracle,
            files: &files,
            analyzer: &analyzer,
            operator: &operator,
        },
        cfg.max_iterations,
    );
    match RunLog::create(&root, &new_run_id()) {
        Ok(log) => {
            println!("run log: {}", log.paths().dir.display());
            orchestrator = orchestrator.with_run_log(log);
        }
        Err(err) => warn!(err = %format!("{err:#}"), "run log disabled"),
    }

    let outcome = orchestrator.run(objective, print_report);
    Ok(report_outcome(&outcome))
}

fn print_report(report: &TaskReport) {
    match &report.status {
        TaskStatus::Succeeded => println!(
            "[{}] {} ok ({} queued)",
            report.index, report.action, report.queued
        ),
        TaskStatus::Failed { error } => println!(
            "[{}] {} failed: {error} ({} queued)",
            report.index, report.action, report.queued
        ),
    }
    if let Some(verdict) = &report.verdict {
        println!("    verdict: {}", verdict.label());
    }
}

fn report_outcome(outcome: &RunOutcome) -> i32 {
    match &outcome.stop {
        RunStop::Idle => {
            let verdict = outcome
                .last_verdict
                .as_ref()
                .map_or("none", |verdict| verdict.label());
            println!(
                "run finished after {} tasks (last verdict: {verdict})",
                outcome.tasks_executed
            );
            exit_codes::OK
        }
        RunStop::OracleFailure { message } => {
            eprintln!("run stopped: oracle failure: {message}");
            exit_codes::ORACLE_FAILURE
        }
        RunStop::MaxIterationsExceeded { max_iterations } => {
            eprintln!("run stopped: reached max_iterations ({max_iterations})");
            exit_codes::MAX_ITERATIONS
        }
    }
}

/// Project root, target directory and config shared by the analysis commands.
struct AnalysisTarget {
    dir: PathBuf,
    cfg: DocloopConfig,
    context: ContextStore,
}

impl AnalysisTarget {
    fn load(root: &Path, dir: Option<&Path>) -> Result<Self> {
        let root = project_root(root)?;
        let cfg = load_config(&DocloopPaths::new(&root).config_path)?;
        let dir = dir.map_or_else(|| root.clone(), |dir| root.join(dir));
        let mut context = ContextStore::new();
        context.set_project(&root, Vec::new());
        Ok(Self { dir, cfg, context })
    }

    fn oracle(&self) -> CommandOracle {
        CommandOracle::from_config(&self.cfg.oracle, self.cfg.prompt_budget_bytes)
    }

    fn analyze(&self, oracle: &CommandOracle) -> Result<FeatureAnalysis> {
        RegexFeatureAnalyzer::new(oracle).analyze(&self.dir, &self.context.snapshot())
    }

    fn file_store(&self) -> ConfirmingFileStore<TerminalOperator> {
        ConfirmingFileStore::new(
            TerminalOperator,
            self.cfg.file_extensions.clone(),
            self.cfg.max_depth,
        )
    }
}

fn cmd_analyze(root: &Path, dir: Option<&Path>) -> Result<i32> {
    let target = AnalysisTarget::load(root, dir)?;
    let analysis = target.analyze(&target.oracle())?;
    for summary in &analysis.file_summaries {
        println!("## {}\n\n{}\n", summary.file, summary.summary);
    }
    println!("## Overall\n\n{}", analysis.overall_insight);
    Ok(exit_codes::OK)
}

fn cmd_readme(root: &Path, dir: Option<&Path>) -> Result<i32> {
    let target = AnalysisTarget::load(root, dir)?;
    let oracle = target.oracle();
    let analysis = target.analyze(&oracle)?;
    let writer = DocWriter::new(&oracle, target.file_store());
    let message = match writer.update_readme(&target.dir, &analysis)? {
        ReadmeUpdate::Created => "README.md created",
        ReadmeUpdate::Updated => "README.md updated",
        ReadmeUpdate::UpToDate => "README.md is already up to date",
        ReadmeUpdate::Declined => "README.md update skipped",
    };
    println!("{message}");
    Ok(exit_codes::OK)
}

fn cmd_comments(root: &Path, dir: Option<&Path>) -> Result<i32> {
    let target = AnalysisTarget::load(root, dir)?;
    let oracle = target.oracle();
    let analysis = target.analyze(&oracle)?;
    let writer = DocWriter::new(&oracle, target.file_store());
    let updates = writer.maintain_comments(&target.dir, &analysis, &target.context.snapshot());

    let mut failed = 0;
    for update in &updates {
        match &update.status {
            CommentStatus::Written => println!("{}: header updated", update.file),
            CommentStatus::Declined => println!("{}: changes not written", update.file),
            CommentStatus::Failed { error } => {
                failed += 1;
                eprintln!("{}: {error}", update.file);
            }
        }
    }
    Ok(if failed == 0 {
        exit_codes::OK
    } else {
        exit_codes::INVALID
    })
}

fn project_root(root: &Path) -> Result<PathBuf> {
    fs::canonicalize(root).with_context(|| format!("project root {}", root.display()))
}
