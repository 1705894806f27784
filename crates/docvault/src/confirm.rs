//! Confirmation gate for destructive operations.

use async_trait::async_trait;

/// Yes/no gate consulted before a delete, bulk operation, or rollback runs.
///
/// The session awaits the answer before sending anything; a `false` answer
/// leaves both server and local state untouched.
#[async_trait]
pub trait Confirmation: Send + Sync {
    async fn confirm(&self, prompt: &str) -> bool;
}

/// Gate that approves everything. Used for `--yes` and in tests.
pub struct AssumeYes;

#[async_trait]
impl Confirmation for AssumeYes {
    async fn confirm(&self, _prompt: &str) -> bool {
        true
    }
}

/// Interactive gate that prompts on stdout and reads one line from stdin.
/// Only `y` and `yes` (case-insensitive) count as approval.
pub struct StdinConfirmation;

#[async_trait]
impl Confirmation for StdinConfirmation {
    async fn confirm(&self, prompt: &str) -> bool {
        let prompt = prompt.to_string();
        tokio::task::spawn_blocking(move || {
            use std::io::Write;
            print!("{} [y/N] ", prompt);
            let _ = std::io::stdout().flush();
            let mut answer = String::new();
            if std::io::stdin().read_line(&mut answer).is_err() {
                return false;
            }
            matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
        })
        .await
        .unwrap_or(false)
    }
}
