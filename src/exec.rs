//! Running external programs.
//!
//! [`ProcessRunner`] is the seam between handlers and the operating system;
//! [`SystemRunner`] is the real implementation. [`ExecHandler`] runs a program
//! fixed at registration time and replies with its output.

use crate::command::{Handler, Reply};
use crate::env::Environment;
use crate::error::CommandError;
use anyhow::{Context, Result};
use std::borrow::Cow;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use tracing::{debug, warn};

/// Conventional process exit code: 0 is success, anything else a failure.
pub type ExitCode = i32;

/// Exit code and combined output of a finished process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Captured {
    pub code: ExitCode,
    /// Standard output followed by standard error.
    pub output: String,
}

/// Launches processes on behalf of handlers.
pub trait ProcessRunner: Send + Sync {
    /// Runs `program` to completion with its standard streams connected to
    /// this process's own.
    fn run_streaming(&self, program: &Path, args: &[OsString]) -> Result<ExitCode>;

    /// Runs `program` to completion and captures what it prints.
    fn capture(&self, program: &Path, args: &[OsString]) -> Result<Captured>;
}

/// Runs real processes inside a snapshot of the bot's environment.
pub struct SystemRunner {
    env: Environment,
}

impl SystemRunner {
    pub fn new(env: Environment) -> Self {
        Self { env }
    }

    fn command(&self, program: &Path, args: &[OsString]) -> std::process::Command {
        let mut cmd = std::process::Command::new(program);
        cmd.args(args)
            .env_clear()
            .envs(self.env.vars.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .current_dir(&self.env.current_dir)
            .stdin(Stdio::null());
        cmd
    }
}

impl ProcessRunner for SystemRunner {
    fn run_streaming(&self, program: &Path, args: &[OsString]) -> Result<ExitCode> {
        debug!(program = %program.display(), "spawning");
        let status = self
            .command(program, args)
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .with_context(|| format!("failed to launch {}", program.display()))?;
        Ok(exit_code(status))
    }

    fn capture(&self, program: &Path, args: &[OsString]) -> Result<Captured> {
        debug!(program = %program.display(), "spawning with captured output");
        let out = self
            .command(program, args)
            .output()
            .with_context(|| format!("failed to launch {}", program.display()))?;
        let mut output = String::from_utf8_lossy(&out.stdout).into_owned();
        output.push_str(&String::from_utf8_lossy(&out.stderr));
        Ok(Captured {
            code: exit_code(out.status),
            output,
        })
    }
}

fn exit_code(status: ExitStatus) -> ExitCode {
    match status.code() {
        Some(x) => x,
        None => terminated_by_signal(status),
    }
}

#[cfg(unix)]
fn terminated_by_signal(exit_status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    if let Some(signal) = ExitStatusExt::signal(&exit_status) {
        128 + signal
    } else if ExitStatusExt::core_dumped(&exit_status) {
        255
    } else {
        -1
    }
}

#[cfg(not(unix))]
fn terminated_by_signal(_exit_status: ExitStatus) -> i32 {
    -1
}

/// Resolve a program path the way a typical shell would.
///
/// - Absolute path: returned if it exists.
/// - `./foo`: returned if it exists in the current directory.
/// - Single component (no separators): searched in each directory of
///   `search_paths` (PATH), first match wins.
/// - Relative path with several components: returned if it exists.
/// - Empty path: `None`.
pub fn find_command_path<'a>(search_paths: &OsStr, path: &'a Path) -> Option<Cow<'a, Path>> {
    if path.is_absolute() {
        return find_by_path(path).map(Cow::Borrowed);
    }

    let search_in_current_dir = cfg!(not(unix)) || path.starts_with("./");
    if search_in_current_dir && path.exists() {
        return Some(Cow::Borrowed(path));
    }

    let mut components = path.components();
    match (components.next(), components.next()) {
        (None, None) => None,
        (Some(x), None) => find_in_path(search_paths, x.as_os_str()).map(Cow::Owned),
        _ => find_by_path(path).map(Cow::Borrowed),
    }
}

fn find_in_path(search_paths: &OsStr, cmd: &OsStr) -> Option<PathBuf> {
    std::env::split_paths(search_paths).find_map(|dir| {
        let path = dir.join(cmd);
        find_by_path(&path).map(Path::to_path_buf)
    })
}

fn find_by_path(path: &Path) -> Option<&Path> {
    if path.exists() { Some(path) } else { None }
}

/// Runs a fixed program with fixed arguments and replies with its output.
///
/// Arguments typed by the user are ignored: nothing from the chat message ever
/// reaches the command line.
pub struct ExecHandler {
    program: PathBuf,
    args: Vec<OsString>,
    show_result: bool,
    description: String,
    runner: Arc<dyn ProcessRunner>,
}

impl ExecHandler {
    /// Creates the handler, resolving a bare program name through `PATH`.
    ///
    /// A program that cannot be found is kept as given; launching it will
    /// fail and be reported at invocation time.
    pub fn new<I, S>(
        env: &Environment,
        runner: Arc<dyn ProcessRunner>,
        program: impl AsRef<Path>,
        args: I,
        show_result: bool,
        description: impl Into<String>,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        let program = program.as_ref();
        let search_paths = env.get_var("PATH").unwrap_or_default();
        let program = match find_command_path(OsStr::new(&search_paths), program) {
            Some(found) => found.into_owned(),
            None => {
                warn!(program = %program.display(), "program not found, keeping it as given");
                program.to_path_buf()
            }
        };
        Self {
            program,
            args: args.into_iter().map(Into::into).collect(),
            show_result,
            description: description.into(),
            runner,
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }
}

impl Handler for ExecHandler {
    fn run(&self, _channel: &str, args: &[&str]) -> Result<Reply, CommandError> {
        if !args.is_empty() {
            debug!(program = %self.program.display(), ignored = args.len(), "ignoring user arguments");
        }
        let captured = self
            .runner
            .capture(&self.program, &self.args)
            .map_err(|e| CommandError::execution(e.to_string(), e.root_cause()))?;
        if captured.code != 0 {
            return Err(CommandError::execution(
                format!("{} exited with status {}", self.program.display(), captured.code),
                captured.output,
            ));
        }
        Ok(captured.output)
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn show_result(&self) -> bool {
        self.show_result
    }
}
