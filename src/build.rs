//! The gated release build behind `build linux`.

use crate::command::{Handler, Reply};
use crate::env::Environment;
use crate::error::CommandError;
use crate::exec::ProcessRunner;
use crate::flags::SharedFlags;
use crate::messenger::Messenger;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Script run by the build, relative to the invoking user's home directory.
pub const DEFAULT_SCRIPT: &str = "slackbot/systemd/prerelease.sh";

/// Service unit whose journal is attached when a build fails.
pub const DEFAULT_JOURNAL_UNIT: &str = "keybase.keybot.service";

const JOURNALCTL: &str = "journalctl";
const UPLOAD_TITLE: &str = "failed build output";

/// Where the build script lives and which journal to collect on failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildConfig {
    pub script: PathBuf,
    pub journal_unit: String,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            script: PathBuf::from(DEFAULT_SCRIPT),
            journal_unit: DEFAULT_JOURNAL_UNIT.to_string(),
        }
    }
}

/// Runs the release script unless the bot is in dry-run mode or paused.
///
/// Both flags are read before anything is launched. On failure the day's
/// journal for the build service is uploaded to the channel the command came
/// from; a failed upload is logged and otherwise ignored.
pub struct BuildHandler {
    config: BuildConfig,
    env: Environment,
    flags: SharedFlags,
    runner: Arc<dyn ProcessRunner>,
    messenger: Arc<dyn Messenger>,
}

impl BuildHandler {
    pub fn new(
        config: BuildConfig,
        env: Environment,
        flags: SharedFlags,
        runner: Arc<dyn ProcessRunner>,
        messenger: Arc<dyn Messenger>,
    ) -> Self {
        Self {
            config,
            env,
            flags,
            runner,
            messenger,
        }
    }

    fn script_name(&self) -> String {
        self.config
            .script
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.config.script.display().to_string())
    }

    fn script_path(&self) -> Result<PathBuf, CommandError> {
        if self.config.script.is_absolute() {
            return Ok(self.config.script.clone());
        }
        let home = self
            .env
            .home_dir()
            .ok_or_else(|| CommandError::execution("FAILURE", "HOME is not set"))?;
        Ok(home.join(&self.config.script))
    }

    fn run_script(&self, script: &Path) -> Result<(), String> {
        match self.runner.run_streaming(script, &[]) {
            Ok(0) => Ok(()),
            Ok(code) => Err(format!("{} exited with status {code}", script.display())),
            Err(e) => Err(format!("{e:#}")),
        }
    }

    /// Collects today's journal for the build service and uploads it. Never
    /// fails: problems are logged and dropped.
    fn upload_diagnostics(&self, channel: &str) {
        let args: Vec<OsString> = vec![
            "--since=today".into(),
            "--user-unit".into(),
            self.config.journal_unit.clone().into(),
        ];
        let journal = match self.runner.capture(Path::new(JOURNALCTL), &args) {
            Ok(captured) => captured.output,
            Err(e) => {
                warn!(error = %format!("{e:#}"), "could not read the journal");
                format!("could not read the journal: {e:#}")
            }
        };
        if let Err(e) = self.messenger.upload_file(channel, UPLOAD_TITLE, &journal) {
            warn!(channel, error = %format!("{e:#}"), "failed to upload build output");
        }
    }
}

impl Handler for BuildHandler {
    fn run(&self, channel: &str, _args: &[&str]) -> Result<Reply, CommandError> {
        let script_name = self.script_name();
        if self.flags.dry_run() {
            return Ok(format!("Dry Run: Doing that would run `{script_name}`"));
        }
        if self.flags.paused() {
            return Ok(format!(
                "I'm paused so I can't do that, but I would have run `{script_name}`"
            ));
        }

        let script = self.script_path()?;
        info!(channel, script = %script.display(), "starting build");
        match self.run_script(&script) {
            Ok(()) => {
                info!(channel, "build succeeded");
                Ok("SUCCESS".to_string())
            }
            Err(detail) => {
                error!(channel, %detail, "build failed");
                self.upload_diagnostics(channel);
                Err(CommandError::execution("FAILURE", detail))
            }
        }
    }

    fn description(&self) -> &str {
        "Perform a linux build"
    }
}
