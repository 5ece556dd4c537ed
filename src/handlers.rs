//! Handlers that only read or write the process-wide [`Flags`].
//!
//! None of them can fail.

use crate::command::{Handler, Reply};
use crate::error::CommandError;
use crate::flags::SharedFlags;
use tracing::info;

/// Stop gated handlers from doing real work.
pub struct Pause {
    flags: SharedFlags,
}

impl Pause {
    pub const NAME: &'static str = "pause";

    pub fn new(flags: SharedFlags) -> Self {
        Self { flags }
    }
}

impl Handler for Pause {
    fn run(&self, channel: &str, _args: &[&str]) -> Result<Reply, CommandError> {
        self.flags.set_paused(true);
        info!(channel, "paused");
        Ok("I'm paused.".to_string())
    }

    fn description(&self) -> &str {
        "Pause (builds are skipped until resumed)"
    }
}

/// Undo [`Pause`].
pub struct Resume {
    flags: SharedFlags,
}

impl Resume {
    pub const NAME: &'static str = "resume";

    pub fn new(flags: SharedFlags) -> Self {
        Self { flags }
    }
}

impl Handler for Resume {
    fn run(&self, channel: &str, _args: &[&str]) -> Result<Reply, CommandError> {
        self.flags.set_paused(false);
        info!(channel, "resumed");
        Ok("I'm resumed.".to_string())
    }

    fn description(&self) -> &str {
        "Resume"
    }
}

/// Print the current flag values.
pub struct ListConfig {
    flags: SharedFlags,
}

impl ListConfig {
    pub const NAME: &'static str = "config";

    pub fn new(flags: SharedFlags) -> Self {
        Self { flags }
    }
}

impl Handler for ListConfig {
    fn run(&self, _channel: &str, _args: &[&str]) -> Result<Reply, CommandError> {
        Ok(self.flags.listing())
    }

    fn description(&self) -> &str {
        "List current config"
    }
}

/// Flip the dry-run flag.
pub struct ToggleDryRun {
    flags: SharedFlags,
}

impl ToggleDryRun {
    pub const NAME: &'static str = "toggle-dryrun";

    pub fn new(flags: SharedFlags) -> Self {
        Self { flags }
    }
}

impl Handler for ToggleDryRun {
    fn run(&self, channel: &str, _args: &[&str]) -> Result<Reply, CommandError> {
        let dry_run = self.flags.toggle_dry_run();
        info!(channel, dry_run, "toggled dry run");
        Ok(format!("Dry Run: {dry_run}"))
    }

    fn description(&self) -> &str {
        "Toggle dry run (commands only report what they would do)"
    }
}
