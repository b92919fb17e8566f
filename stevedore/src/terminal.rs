//! Interactive terminal access.

use std::io::{self, BufRead, Write};

/// Prompts that need a human at the keyboard.
pub trait Terminal {
    /// Shows `prompt` and reads one line, without the trailing newline.
    fn read_line(&mut self, prompt: &str) -> io::Result<String>;

    /// Shows `prompt` and reads a line without echoing it.
    fn read_secret(&mut self, prompt: &str) -> io::Result<String>;

    /// Asks a yes/no question. An empty answer counts as yes.
    fn confirm(&mut self, prompt: &str) -> bool;
}

/// Terminal backed by stdin, stdout and `rpassword`.
#[derive(Debug, Default)]
pub struct StdTerminal;

impl Terminal for StdTerminal {
    fn read_line(&mut self, prompt: &str) -> io::Result<String> {
        print!("{}", prompt);
        io::stdout().flush()?;

        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    fn read_secret(&mut self, prompt: &str) -> io::Result<String> {
        rpassword::prompt_password(prompt)
    }

    fn confirm(&mut self, prompt: &str) -> bool {
        match self.read_line(prompt) {
            Ok(answer) => is_affirmative(&answer),
            Err(_) => false,
        }
    }
}

/// Whether an answer to a yes/no prompt means yes.
pub fn is_affirmative(answer: &str) -> bool {
    matches!(
        answer.trim().to_lowercase().as_str(),
        "" | "y" | "yes"
    )
}
