//! Decision oracle abstraction.
//!
//! The [`Oracle`] trait decouples the planning loop from the reasoning backend.
//! [`CommandOracle`] pipes each request into an external command (by default
//! `codex exec -`) and reads the answer from stdout. Tests use scripted oracles
//! that return predetermined replies without spawning processes.

use std::process::Command;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::core::context::ContextSnapshot;
use crate::io::config::OracleConfig;
use crate::io::process::run_command_with_timeout;

const SYSTEM_PREAMBLE: &str = "You are assisting with planning and executing documentation and \
maintenance tasks for a software project. Answer the request below using the bundled context.";

/// Failure to obtain an answer, as opposed to an answer of "no".
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OracleError {
    #[error("oracle communication failed: {0}")]
    Communication(String),
    #[error("oracle did not answer within {secs}s")]
    Timeout { secs: u64 },
}

/// Abstraction over reasoning backends.
pub trait Oracle {
    /// Send `prompt` together with the full context snapshot and return the reply text.
    fn converse(&self, prompt: &str, context: &ContextSnapshot) -> Result<String, OracleError>;
}

impl<T: Oracle + ?Sized> Oracle for &T {
    fn converse(&self, prompt: &str, context: &ContextSnapshot) -> Result<String, OracleError> {
        (**self).converse(prompt, context)
    }
}

/// Oracle that spawns a configured command per request.
#[derive(Debug, Clone)]
pub struct CommandOracle {
    command: Vec<String>,
    timeout: Duration,
    output_limit_bytes: usize,
    context_budget_bytes: usize,
}

impl CommandOracle {
    pub fn new(
        command: Vec<String>,
        timeout: Duration,
        output_limit_bytes: usize,
        context_budget_bytes: usize,
    ) -> Self {
        Self {
            command,
            timeout,
            output_limit_bytes,
            context_budget_bytes,
        }
    }

    pub fn from_config(cfg: &OracleConfig, context_budget_bytes: usize) -> Self {
        Self::new(
            cfg.command.clone(),
            cfg.timeout(),
            cfg.output_limit_bytes,
            context_budget_bytes,
        )
    }
}

impl Oracle for CommandOracle {
    #[instrument(skip_all, fields(program = ?self.command.first(), prompt_bytes = prompt.len()))]
    fn converse(&self, prompt: &str, context: &ContextSnapshot) -> Result<String, OracleError> {
        let (program, args) = self
            .command
            .split_first()
            .ok_or_else(|| OracleError::Communication("empty oracle command".to_string()))?;
        let request = render_request(prompt, context, self.context_budget_bytes);

        let mut cmd = Command::new(program);
        cmd.args(args);
        info!(request_bytes = request.len(), "consulting oracle");

        let output = run_command_with_timeout(
            cmd,
            Some(request.as_bytes()),
            self.timeout,
            self.output_limit_bytes,
        )
        .map_err(|err| OracleError::Communication(format!("{err:#}")))?;

        if output.timed_out {
            return Err(OracleError::Timeout {
                secs: self.timeout.as_secs(),
            });
        }
        if !output.status.success() {
            warn!(exit_code = ?output.status.code(), "oracle command failed");
            let detail = output
                .stderr_tail()
                .map(|tail| format!(": {tail}"))
                .unwrap_or_default();
            return Err(OracleError::Communication(format!(
                "oracle exited with status {:?}{detail}",
                output.status.code()
            )));
        }

        let reply = output.stdout_text().trim().to_string();
        if reply.is_empty() {
            return Err(OracleError::Communication(
                "oracle returned an empty reply".to_string(),
            ));
        }
        debug!(reply_bytes = reply.len(), "oracle replied");
        Ok(reply)
    }
}

/// Build the request text: preamble, serialized context, then the prompt.
///
/// Context beyond `budget_bytes` is cut at a character boundary and marked.
pub fn render_request(prompt: &str, context: &ContextSnapshot, budget_bytes: usize) -> String {
    let mut serialized = context.to_json_pretty();
    if serialized.len() > budget_bytes {
        let mut cut = budget_bytes;
        while !serialized.is_char_boundary(cut) {
            cut -= 1;
        }
        let dropped = serialized.len() - cut;
        debug!(dropped, "truncated context for oracle request");
        serialized.truncate(cut);
        serialized.push_str(&format!("\n[truncated {dropped} bytes]"));
    }
    format!("{SYSTEM_PREAMBLE}\n\n<context>\n{serialized}\n</context>\n\n<request>\n{prompt}\n</request>\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::context::ContextStore;

    fn snapshot() -> ContextSnapshot {
        let mut store = ContextStore::new();
        store.set_objective("document all functions");
        store.snapshot()
    }

    #[test]
    fn request_contains_context_and_prompt() {
        let request = render_request("Is it done?", &snapshot(), 100_000);
        assert!(request.contains("document all functions"));
        assert!(request.contains("<request>\nIs it done?\n</request>"));
        assert!(request.find("<context>") < request.find("<request>"));
    }

    #[test]
    fn request_truncates_context_over_budget() {
        let request = render_request("prompt", &snapshot(), 40);
        assert!(request.contains("[truncated"));
        assert!(request.contains("prompt"));
    }

    #[cfg(unix)]
    fn sh_oracle(script: &str, timeout: Duration) -> CommandOracle {
        CommandOracle::new(
            vec!["sh".to_string(), "-c".to_string(), script.to_string()],
            timeout,
            10_000,
            100_000,
        )
    }

    #[cfg(unix)]
    #[test]
    fn command_oracle_returns_trimmed_stdout() {
        let oracle = sh_oracle("cat >/dev/null; echo '  VERDICT: yes  '", Duration::from_secs(10));
        let reply = oracle.converse("prompt", &snapshot()).expect("reply");
        assert_eq!(reply, "VERDICT: yes");
    }

    #[cfg(unix)]
    #[test]
    fn command_oracle_receives_request_on_stdin() {
        let oracle = sh_oracle("grep -c 'document all functions'", Duration::from_secs(10));
        let reply = oracle.converse("prompt", &snapshot()).expect("reply");
        assert_eq!(reply, "1");
    }

    #[cfg(unix)]
    #[test]
    fn nonzero_exit_is_communication_failure() {
        let oracle = sh_oracle("cat >/dev/null; echo 'quota exceeded' >&2; exit 2", Duration::from_secs(10));
        let err = oracle.converse("prompt", &snapshot()).unwrap_err();
        match err {
            OracleError::Communication(message) => assert!(message.contains("quota exceeded")),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn empty_reply_is_communication_failure() {
        let oracle = sh_oracle("cat >/dev/null", Duration::from_secs(10));
        let err = oracle.converse("prompt", &snapshot()).unwrap_err();
        assert!(matches!(err, OracleError::Communication(_)));
    }

    #[cfg(unix)]
    #[test]
    fn slow_oracle_times_out() {
        let oracle = sh_oracle("cat >/dev/null; exec sleep 5", Duration::from_millis(200));
        let err = oracle.converse("prompt", &snapshot()).unwrap_err();
        assert!(matches!(err, OracleError::Timeout { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn oracle_that_never_reads_a_large_request_times_out() {
        let oracle = sh_oracle("sleep 20", Duration::from_secs(1));
        let started = std::time::Instant::now();
        let err = oracle
            .converse(&"x".repeat(200_000), &snapshot())
            .unwrap_err();
        assert!(matches!(err, OracleError::Timeout { secs: 1 }));
        assert!(started.elapsed() < Duration::from_secs(5), "took {:?}", started.elapsed());
    }

    #[test]
    fn missing_program_is_communication_failure() {
        let oracle = CommandOracle::new(
            vec!["docloop-no-such-oracle-binary".to_string()],
            Duration::from_secs(1),
            1_000,
            1_000,
        );
        let err = oracle.converse("prompt", &snapshot()).unwrap_err();
        assert!(matches!(err, OracleError::Communication(_)));
    }
}
