//! Side-effecting collaborators: config, oracle, files, operator, documentation, run artifacts.

pub mod config;
pub mod docs;
pub mod features;
pub mod files;
pub mod init;
pub mod operator;
pub mod oracle;
pub mod process;
pub mod prompt;
pub mod run_log;
