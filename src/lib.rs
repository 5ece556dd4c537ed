//! A chat-operated build bot.
//!
//! Messages posted in a Slack channel are split into tokens; the first token
//! names a command in the [`Registry`] and the rest are passed to its
//! [`Handler`]. The handler's reply is posted back to the channel.
//!
//! The commands tuxbot ships with are registered by
//! [`commands::add_commands`]: a fixed `date` program, `pause`/`resume`,
//! `config`, `toggle-dryrun` and `build linux`, which runs the release script
//! unless the bot is paused or in dry-run mode.

pub mod bot;
pub mod build;
pub mod command;
pub mod commands;
pub mod console;
pub mod env;
pub mod error;
pub mod exec;
pub mod flags;
pub mod handlers;
pub mod lexer;
pub mod messenger;
pub mod registry;
pub mod settings;
pub mod slack;
pub mod tree;

pub use bot::Bot;
pub use command::{Command, FuncHandler, Handler, Reply};
pub use error::{CommandError, StartupError};
pub use flags::{Flags, SharedFlags};
pub use handlers::{ListConfig, Pause, Resume, ToggleDryRun};
pub use messenger::Messenger;
pub use registry::Registry;
pub use tree::{CommandPath, CommandTree, ParseError, Parsed, Subcommands};
