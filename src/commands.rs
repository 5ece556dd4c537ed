//! The command set tuxbot registers at startup.

use crate::build::{BuildConfig, BuildHandler};
use crate::env::Environment;
use crate::exec::{ExecHandler, ProcessRunner};
use crate::flags::SharedFlags;
use crate::handlers::{ListConfig, Pause, Resume, ToggleDryRun};
use crate::messenger::Messenger;
use crate::registry::Registry;
use crate::tree::{CommandTree, Subcommands};
use std::sync::Arc;

pub const BUILD_COMMAND: &str = "build";
pub const BUILD_LINUX: &str = "build/linux";

/// Collaborators shared by the registered handlers.
pub struct Deps {
    pub env: Environment,
    pub flags: SharedFlags,
    pub runner: Arc<dyn ProcessRunner>,
    pub messenger: Arc<dyn Messenger>,
    pub build: BuildConfig,
}

/// Grammar of the `build` command.
pub fn tuxbot_tree() -> CommandTree {
    let mut app = CommandTree::new("tuxbot", "Command parser for tuxbot");
    app.command(BUILD_COMMAND, "Build things")
        .command("linux", "Start a linux build");
    app
}

/// Registers `date`, `pause`, `resume`, `config`, `toggle-dryrun` and `build`.
pub fn add_commands(registry: &mut Registry, deps: &Deps) {
    registry.register(
        "date",
        Arc::new(ExecHandler::new(
            &deps.env,
            deps.runner.clone(),
            "/bin/date",
            Vec::<String>::new(),
            true,
            "Show the current date",
        )),
    );
    registry.register(Pause::NAME, Arc::new(Pause::new(deps.flags.clone())));
    registry.register(Resume::NAME, Arc::new(Resume::new(deps.flags.clone())));
    registry.register(ListConfig::NAME, Arc::new(ListConfig::new(deps.flags.clone())));
    registry.register(
        ToggleDryRun::NAME,
        Arc::new(ToggleDryRun::new(deps.flags.clone())),
    );

    let mut build = Subcommands::new(BUILD_COMMAND, "Build all the things!", tuxbot_tree());
    build.route(
        BUILD_LINUX,
        Arc::new(BuildHandler::new(
            deps.build.clone(),
            deps.env.clone(),
            deps.flags.clone(),
            deps.runner.clone(),
            deps.messenger.clone(),
        )),
    );
    registry.register(BUILD_COMMAND, Arc::new(build));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::Bot;
    use crate::exec::{Captured, ExitCode};
    use crate::flags::Flags;
    use std::ffi::OsString;
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingRunner {
        exit_code: ExitCode,
        streamed: Mutex<Vec<PathBuf>>,
        captured: Mutex<Vec<PathBuf>>,
    }

    impl ProcessRunner for RecordingRunner {
        fn run_streaming(&self, program: &Path, _args: &[OsString]) -> anyhow::Result<ExitCode> {
            self.streamed.lock().unwrap().push(program.to_path_buf());
            Ok(self.exit_code)
        }

        fn capture(&self, program: &Path, _args: &[OsString]) -> anyhow::Result<Captured> {
            self.captured.lock().unwrap().push(program.to_path_buf());
            Ok(Captured {
                code: 0,
                output: format!("ran {}\n", program.display()),
            })
        }
    }

    #[derive(Default)]
    struct RecordingMessenger {
        uploads: Mutex<Vec<String>>,
    }

    impl Messenger for RecordingMessenger {
        fn send_message(&self, _channel: &str, _text: &str) -> anyhow::Result<()> {
            Ok(())
        }

        fn upload_file(&self, channel: &str, _title: &str, _content: &str) -> anyhow::Result<()> {
            self.uploads.lock().unwrap().push(channel.to_string());
            anyhow::bail!("uploads are disabled")
        }
    }

    fn tuxbot(exit_code: ExitCode) -> (Bot, SharedFlags, Arc<RecordingRunner>, Arc<RecordingMessenger>) {
        let flags = Flags::shared(false, false);
        let runner = Arc::new(RecordingRunner {
            exit_code,
            ..Default::default()
        });
        let messenger = Arc::new(RecordingMessenger::default());
        let deps = Deps {
            env: Environment::from_vars([("HOME", "/home/keybase"), ("PATH", "/bin")]),
            flags: flags.clone(),
            runner: runner.clone(),
            messenger: messenger.clone(),
            build: BuildConfig::default(),
        };
        let mut registry = Registry::new();
        add_commands(&mut registry, &deps);
        (Bot::new(registry), flags, runner, messenger)
    }

    #[test]
    fn test_registers_the_command_set() {
        let (bot, _, _, _) = tuxbot(0);
        let names: Vec<&str> = bot.registry().iter().map(|c| c.name()).collect();
        assert_eq!(
            names,
            vec!["build", "config", "date", "pause", "resume", "toggle-dryrun"]
        );
    }

    #[test]
    fn test_build_session() {
        let (bot, flags, runner, _) = tuxbot(0);

        assert!(bot.handle_message("C1", "build").unwrap().starts_with("usage:"));
        assert!(bot.handle_message("C1", "build windows").unwrap().starts_with("unknown command"));
        assert!(runner.streamed.lock().unwrap().is_empty());

        assert_eq!(bot.handle_message("C1", "pause").as_deref(), Some("I'm paused."));
        assert_eq!(
            bot.handle_message("C1", "build linux").as_deref(),
            Some("I'm paused so I can't do that, but I would have run `prerelease.sh`")
        );
        assert_eq!(bot.handle_message("C1", "resume").as_deref(), Some("I'm resumed."));
        assert!(!flags.paused());

        assert_eq!(bot.handle_message("C1", "toggle-dryrun").as_deref(), Some("Dry Run: true"));
        assert_eq!(
            bot.handle_message("C1", "config").as_deref(),
            Some("Dry Run: true\nPaused: false")
        );
        assert_eq!(
            bot.handle_message("C1", "build linux").as_deref(),
            Some("Dry Run: Doing that would run `prerelease.sh`")
        );
        assert!(runner.streamed.lock().unwrap().is_empty());

        bot.handle_message("C1", "toggle-dryrun");
        assert_eq!(bot.handle_message("C1", "build linux").as_deref(), Some("SUCCESS"));
        assert_eq!(runner.streamed.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_failed_build_reports_failure_despite_upload_error() {
        let (bot, _, runner, messenger) = tuxbot(1);

        let reply = bot.handle_message("C9", "build linux").unwrap();
        assert!(reply.starts_with("FAILURE: "), "{reply}");
        assert_eq!(*messenger.uploads.lock().unwrap(), vec!["C9".to_string()]);
        assert_eq!(
            *runner.captured.lock().unwrap(),
            vec![PathBuf::from("journalctl")]
        );
    }

    #[test]
    #[cfg(unix)]
    fn test_date_runs_fixed_program() {
        let (bot, _, runner, _) = tuxbot(0);
        let reply = bot.handle_message("C1", "date --utc").unwrap();
        assert_eq!(reply, "ran /bin/date\n");
        assert_eq!(*runner.captured.lock().unwrap(), vec![PathBuf::from("/bin/date")]);
    }
}
