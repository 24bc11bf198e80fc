//! Human operator interaction.

use std::io::{BufRead, Write};

use anyhow::{Context, Result, bail};

/// Blocking prompt/response channel to the human operator.
pub trait Operator {
    /// Show informational text.
    fn show(&self, text: &str);

    /// Ask a free-form question and wait for the answer.
    fn ask(&self, prompt: &str) -> Result<String>;

    /// Ask a yes/no question; only an explicit yes confirms.
    fn confirm(&self, question: &str) -> Result<bool> {
        let answer = self.ask(&format!("{question} (y/n)"))?;
        Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
    }
}

impl<T: Operator + ?Sized> Operator for &T {
    fn show(&self, text: &str) {
        (**self).show(text);
    }

    fn ask(&self, prompt: &str) -> Result<String> {
        (**self).ask(prompt)
    }

    fn confirm(&self, question: &str) -> Result<bool> {
        (**self).confirm(question)
    }
}

/// Operator on the controlling terminal (stdout + stdin).
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalOperator;

impl Operator for TerminalOperator {
    fn show(&self, text: &str) {
        println!("{text}");
    }

    fn ask(&self, prompt: &str) -> Result<String> {
        let mut stdout = std::io::stdout().lock();
        write!(stdout, "{prompt}\n> ").context("write prompt")?;
        stdout.flush().context("flush prompt")?;
        drop(stdout);

        let mut line = String::new();
        let read = std::io::stdin()
            .lock()
            .read_line(&mut line)
            .context("read operator input")?;
        if read == 0 {
            bail!("operator input closed");
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }
}
