use crate::build::BuildConfig;
use crate::env::Environment;
use crate::error::StartupError;
use std::path::PathBuf;
use std::time::Duration;

pub const TOKEN_VAR: &str = "SLACK_TOKEN";
pub const CHANNEL_VAR: &str = "TUXBOT_CHANNEL";
pub const DRY_RUN_VAR: &str = "TUXBOT_DRY_RUN";
pub const PAUSED_VAR: &str = "TUXBOT_PAUSED";
pub const SCRIPT_VAR: &str = "TUXBOT_SCRIPT";
pub const JOURNAL_UNIT_VAR: &str = "TUXBOT_JOURNAL_UNIT";

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Everything the bot needs to know at startup, read from the environment.
///
/// Command line options are applied on top by the binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub token: Option<String>,
    pub channel: Option<String>,
    pub dry_run: bool,
    pub paused: bool,
    pub build: BuildConfig,
    pub poll_interval: Duration,
}

impl Settings {
    pub fn from_env(env: &Environment) -> Result<Self, StartupError> {
        let mut build = BuildConfig::default();
        if let Some(script) = non_empty(env, SCRIPT_VAR) {
            build.script = PathBuf::from(script);
        }
        if let Some(unit) = non_empty(env, JOURNAL_UNIT_VAR) {
            build.journal_unit = unit;
        }

        Ok(Self {
            token: non_empty(env, TOKEN_VAR),
            channel: non_empty(env, CHANNEL_VAR),
            dry_run: bool_var(env, DRY_RUN_VAR)?.unwrap_or(false),
            paused: bool_var(env, PAUSED_VAR)?.unwrap_or(false),
            build,
            poll_interval: DEFAULT_POLL_INTERVAL,
        })
    }

    /// The Slack token, which must be present to talk to Slack.
    pub fn require_token(&self) -> Result<&str, StartupError> {
        self.token
            .as_deref()
            .ok_or(StartupError::MissingVar(TOKEN_VAR))
    }

    pub fn require_channel(&self) -> Result<&str, StartupError> {
        self.channel.as_deref().ok_or(StartupError::MissingChannel)
    }
}

fn non_empty(env: &Environment, key: &str) -> Option<String> {
    env.get_var(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn bool_var(env: &Environment, key: &'static str) -> Result<Option<bool>, StartupError> {
    let Some(value) = non_empty(env, key) else {
        return Ok(None);
    };
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(Some(true)),
        "0" | "false" | "no" | "off" => Ok(Some(false)),
        _ => Err(StartupError::InvalidBool { key, value }),
    }
}
