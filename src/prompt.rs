use inquire::{Confirm, InquireError};
use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum PromptError {
    #[error("unable to read confirmation")]
    #[diagnostic(
        code(gabarit::prompt::confirm),
        help("Run in an interactive terminal, or pass --yes to skip the confirmation")
    )]
    Confirm(#[from] InquireError),
}

/// Asks whether the previewed changes should be written to disk.
pub fn apply_changes() -> Result<bool, PromptError> {
    let answer = Confirm::new("Write these files?")
        .with_default(false)
        .with_help_message("Press [y] to confirm or [n] to cancel")
        .prompt()?;

    Ok(answer)
}
