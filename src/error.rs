//! Error types shared by handlers, the dispatcher and startup.

use crate::tree::ParseError;
use thiserror::Error;

/// Failure of a single command invocation.
///
/// Every variant is turned into a chat reply by the bot; none of them is
/// fatal to the process.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Sub-command tokens did not match the command tree.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// An external process could not be launched or exited unsuccessfully.
    ///
    /// `summary` is the short outcome shown first (e.g. `FAILURE`), `detail`
    /// carries the captured output or the underlying error.
    #[error("{summary}: {detail}")]
    Execution { summary: String, detail: String },
}

impl CommandError {
    pub fn execution(summary: impl Into<String>, detail: impl std::fmt::Display) -> Self {
        CommandError::Execution {
            summary: summary.into(),
            detail: detail.to_string(),
        }
    }
}

/// Errors that stop the bot before it starts listening.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("environment variable {0} is not set")]
    MissingVar(&'static str),

    #[error("invalid value {value:?} for {key}: expected a boolean")]
    InvalidBool { key: &'static str, value: String },

    #[error("no channel to listen on: pass --channel or set TUXBOT_CHANNEL")]
    MissingChannel,

    #[error("failed to authenticate with Slack: {0}")]
    Auth(String),
}
