//! CLI argument parsing with clap derive macros.

use clap::Parser;
use ttyclip_core::session::SessionConfig;

/// Read or write the terminal clipboard.
///
/// To set the clipboard, pipe the new contents on stdin. Pass
/// --get-clipboard to print the current contents to stdout instead. Note
/// that the hosting terminal may prompt before granting clipboard access.
#[derive(Debug, Parser)]
#[command(name = "ttyclip", version)]
pub struct Cli {
    /// Print the current clipboard contents to stdout
    #[arg(long)]
    pub get_clipboard: bool,

    /// Use the primary selection instead of the clipboard, on systems that
    /// support it (such as X11)
    #[arg(long)]
    pub use_primary: bool,

    /// Wait until the terminal has processed the copy before exiting.
    /// Useful when running in a dedicated, short-lived window
    #[arg(long)]
    pub wait_for_completion: bool,
}

/// A problem with how the tool was invoked, detected after flag parsing.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum UsageError {
    #[error("--get-clipboard cannot be combined with piped input")]
    ReadWithPipedInput,
    #[error("nothing to do: pipe data on stdin to copy, or pass --get-clipboard to paste")]
    NoInput,
}

/// Combine the parsed flags with the piped payload into a session config.
///
/// Enforces that each invocation either writes or reads, never both and
/// never neither; the session relies on this.
pub fn build_config(cli: &Cli, payload: Option<Vec<u8>>) -> Result<SessionConfig, UsageError> {
    match (&payload, cli.get_clipboard) {
        (Some(_), true) => Err(UsageError::ReadWithPipedInput),
        (None, false) => Err(UsageError::NoInput),
        _ => Ok(SessionConfig {
            payload,
            get_clipboard: cli.get_clipboard,
            use_primary: cli.use_primary,
            wait_for_completion: cli.wait_for_completion,
        }),
    }
}
