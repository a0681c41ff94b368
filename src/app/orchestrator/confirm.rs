//! Confirmation gate consulted before network fetches

use std::io::{self, BufRead, Write};

use tokio::runtime::{Handle, RuntimeFlavor};
use tracing::warn;

/// Asks whether one network fetch may proceed
pub trait Confirmation: Send + Sync {
    fn confirm(&self, prompt: &str) -> bool;
}

/// Approves everything
#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysConfirm;

impl Confirmation for AlwaysConfirm {
    fn confirm(&self, _prompt: &str) -> bool {
        true
    }
}

/// Prompts on the terminal; declines when stdin is not interactive
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalConfirmation;

impl Confirmation for TerminalConfirmation {
    fn confirm(&self, prompt: &str) -> bool {
        if !atty::is(atty::Stream::Stdin) {
            warn!("stdin is not a terminal, declining: {}", prompt);
            return false;
        }

        let answer = blocking(|| ask(prompt, &mut io::stdin().lock(), &mut io::stdout()));
        answer.unwrap_or_else(|e| {
            warn!("Could not read an answer, declining: {}", e);
            false
        })
    }
}

/// Write `prompt` and read one line of answer
fn ask(prompt: &str, input: &mut impl BufRead, output: &mut impl Write) -> io::Result<bool> {
    write!(output, "{} [y/N]: ", prompt)?;
    output.flush()?;

    let mut response = String::new();
    input.read_line(&mut response)?;
    Ok(is_yes(&response))
}

/// Run a blocking terminal read, moving other tasks off a multi-thread worker
fn blocking<T>(read: impl FnOnce() -> T) -> T {
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(read)
        }
        _ => read(),
    }
}

fn is_yes(response: &str) -> bool {
    matches!(response.trim().to_lowercase().as_str(), "y" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_yes() {
        assert!(is_yes("y\n"));
        assert!(is_yes(" YES "));
        assert!(!is_yes(""));
        assert!(!is_yes("no"));
        assert!(!is_yes("yep"));
    }

    #[test]
    fn test_always_confirm() {
        assert!(AlwaysConfirm.confirm("Download Malta?"));
    }

    #[test]
    fn test_ask_writes_prompt_and_reads_answer() {
        let mut output = Vec::new();
        let answer = ask("Download Malta?", &mut io::Cursor::new("yes\n"), &mut output).unwrap();
        assert!(answer);
        assert_eq!(String::from_utf8(output).unwrap(), "Download Malta? [y/N]: ");

        let declined = ask("Download Malta?", &mut io::Cursor::new(""), &mut Vec::new()).unwrap();
        assert!(!declined);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_blocking_read_on_multi_thread_runtime() {
        let answer = blocking(|| ask("Go?", &mut io::Cursor::new("y\n"), &mut io::sink()));
        assert!(answer.unwrap());
    }

    #[tokio::test]
    async fn test_blocking_read_on_current_thread_runtime() {
        let answer = blocking(|| ask("Go?", &mut io::Cursor::new("n\n"), &mut io::sink()));
        assert!(!answer.unwrap());
    }
}
