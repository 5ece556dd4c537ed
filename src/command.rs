use crate::error::CommandError;
use std::fmt;
use std::sync::Arc;

/// Textual reply sent back to the channel a command came from.
pub type Reply = String;

/// Object-safe trait for anything the bot can run in response to a message.
///
/// `channel` identifies where the message came from, `args` are the message
/// tokens following the command name, passed verbatim.
pub trait Handler: Send + Sync {
    /// Runs the command and produces the reply text.
    fn run(&self, channel: &str, args: &[&str]) -> Result<Reply, CommandError>;

    /// One-line description shown by `help`.
    fn description(&self) -> &str;

    /// Whether a successful reply should be posted back to the channel.
    fn show_result(&self) -> bool {
        true
    }
}

/// A named entry of the command registry.
#[derive(Clone)]
pub struct Command {
    name: String,
    handler: Arc<dyn Handler>,
}

impl Command {
    pub fn new(name: impl Into<String>, handler: Arc<dyn Handler>) -> Self {
        Self {
            name: name.into(),
            handler,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        self.handler.description()
    }

    pub fn handler(&self) -> &Arc<dyn Handler> {
        &self.handler
    }

    pub fn run(&self, channel: &str, args: &[&str]) -> Result<Reply, CommandError> {
        self.handler.run(channel, args)
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("description", &self.description())
            .finish()
    }
}

/// Handler backed by a plain function or closure.
pub struct FuncHandler<F> {
    description: String,
    func: F,
}

impl<F> FuncHandler<F>
where
    F: Fn(&str, &[&str]) -> Result<Reply, CommandError> + Send + Sync,
{
    pub fn new(description: impl Into<String>, func: F) -> Self {
        Self {
            description: description.into(),
            func,
        }
    }
}

impl<F> Handler for FuncHandler<F>
where
    F: Fn(&str, &[&str]) -> Result<Reply, CommandError> + Send + Sync,
{
    fn run(&self, channel: &str, args: &[&str]) -> Result<Reply, CommandError> {
        (self.func)(channel, args)
    }

    fn description(&self) -> &str {
        &self.description
    }
}
