use async_trait::async_trait;
use std::io::{BufRead, Write};

/// Gate in front of every batch of writes
#[async_trait]
pub trait Confirm: Send + Sync {
    /// Return true to proceed with the writes described by `summary`
    async fn confirm(&self, summary: &str) -> bool;
}

/// Operator reply to a confirmation prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Answer {
    Proceed,
    Decline,
    Unexpected,
}

impl Answer {
    /// Only an exact `Y` proceeds and only an exact `N` declines
    pub fn parse(input: &str) -> Self {
        match input.trim_end_matches(['\r', '\n']) {
            "Y" => Self::Proceed,
            "N" => Self::Decline,
            _ => Self::Unexpected,
        }
    }
}

/// Non-interactive mode: every write batch proceeds
pub struct AutoApprove;

#[async_trait]
impl Confirm for AutoApprove {
    async fn confirm(&self, _summary: &str) -> bool {
        true
    }
}

/// Interactive mode: print the summary and ask on stdin
pub struct ConsolePrompt;

#[async_trait]
impl Confirm for ConsolePrompt {
    async fn confirm(&self, summary: &str) -> bool {
        println!("{}", summary);

        let read = tokio::task::spawn_blocking(|| {
            print!("Do you wish to proceed? (Y/N):");
            std::io::stdout().flush()?;
            let mut line = String::new();
            std::io::stdin().lock().read_line(&mut line)?;
            Ok::<_, std::io::Error>(line)
        })
        .await;

        let line = match read {
            Ok(Ok(line)) => line,
            Ok(Err(e)) => {
                tracing::warn!("Failed to read confirmation: {}", e);
                return false;
            }
            Err(e) => {
                tracing::warn!("Confirmation prompt task failed: {}", e);
                return false;
            }
        };

        match Answer::parse(&line) {
            Answer::Proceed => true,
            Answer::Decline => false,
            Answer::Unexpected => {
                tracing::warn!("Unexpected input {:?}, treating as N", line.trim());
                false
            }
        }
    }
}

/// Build the confirmation gate for the configured supervision mode
pub fn for_mode(supervised: bool) -> Box<dyn Confirm> {
    if supervised {
        Box::new(ConsolePrompt)
    } else {
        Box::new(AutoApprove)
    }
}
