use inquire::{InquireError, Password, PasswordDisplayMode};
use miette::Diagnostic;

/// Ask for a secret without echoing it.
pub(crate) fn get_input(prompt: &str) -> Result<String, Error> {
    Password::new(prompt)
        .with_display_mode(PasswordDisplayMode::Masked)
        .with_display_toggle_enabled()
        .without_confirmation()
        .prompt()
        .map_err(Error)
}

#[derive(Debug, Diagnostic, thiserror::Error)]
#[error("Failed to get user input")]
#[diagnostic(
    code(prompt),
    help("A password is required but none was entered. Pass one with --password or run again in an interactive terminal."),
)]
pub(crate) struct Error(#[from] InquireError);
