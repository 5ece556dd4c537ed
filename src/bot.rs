use crate::command::Reply;
use crate::error::CommandError;
use crate::lexer;
use crate::registry::Registry;
use regex::Regex;
use tracing::{debug, info, warn};

/// Name of the built-in command listing every registered command.
pub const HELP_COMMAND: &str = "help";

/// Turns inbound chat messages into replies.
///
/// The first token of a message names the command; the remaining tokens are
/// handed to its handler. When a trigger is configured, only messages that
/// start with it are treated as commands and the trigger itself is stripped.
///
/// ```
/// use std::sync::Arc;
/// use tuxbot::{Bot, Flags, ListConfig, Registry};
///
/// let mut registry = Registry::new();
/// registry.register("config", Arc::new(ListConfig::new(Flags::shared(false, false))));
/// let bot = Bot::new(registry);
/// let reply = bot.handle_message("C1", "config").unwrap();
/// assert_eq!(reply, "Dry Run: false\nPaused: false");
/// ```
pub struct Bot {
    registry: Registry,
    trigger: Option<Regex>,
}

impl Bot {
    pub fn new(registry: Registry) -> Self {
        Self {
            registry,
            trigger: None,
        }
    }

    /// Only react to messages matching `trigger` at their very start.
    pub fn with_trigger(mut self, trigger: Regex) -> Self {
        self.trigger = Some(trigger);
        self
    }

    /// Trigger accepting `!cmd`, and `<@ID> cmd` / `<@ID>: cmd` when the bot's
    /// own user id is known.
    pub fn default_trigger(bot_user_id: Option<&str>) -> Result<Regex, regex::Error> {
        match bot_user_id {
            Some(id) => Regex::new(&format!(r"^\s*(?:!|<@{}>:?\s+)", regex::escape(id))),
            None => Regex::new(r"^\s*!"),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Handles one message from `channel`.
    ///
    /// Returns the text to post back, or `None` when the message is not for
    /// the bot or the command's result is not meant to be shown.
    pub fn handle_message(&self, channel: &str, text: &str) -> Option<Reply> {
        let body = match &self.trigger {
            Some(trigger) => &text[trigger.find(text)?.end()..],
            None => text,
        };

        let tokens = match lexer::split_into_tokens(body) {
            Ok(tokens) => tokens,
            Err(e) => return Some(format!("Error: {e}")),
        };
        let (name, args) = tokens.split_first()?;
        let args: Vec<&str> = args.iter().map(String::as_str).collect();

        let Some(command) = self.registry.lookup(name) else {
            if name == HELP_COMMAND {
                return Some(self.registry.help_text());
            }
            info!(channel, command = %name, "unrecognized command");
            return Some(format!(
                "Unrecognized command: {name}\nType `{HELP_COMMAND}` for a list of commands."
            ));
        };

        info!(channel, command = %name, args = args.len(), "running command");
        match command.run(channel, &args) {
            Ok(reply) => {
                debug!(channel, command = %name, "command succeeded");
                if command.handler().show_result() && !reply.is_empty() {
                    Some(reply)
                } else {
                    None
                }
            }
            Err(e @ CommandError::Parse(_)) => {
                debug!(channel, command = %name, error = %e, "could not parse command");
                Some(e.to_string())
            }
            Err(e) => {
                warn!(channel, command = %name, error = %e, "command failed");
                Some(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{FuncHandler, Handler};
    use crate::env::Environment;
    use crate::exec::{ExecHandler, SystemRunner};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn echo_handler(calls: Arc<AtomicUsize>) -> Arc<dyn Handler> {
        Arc::new(FuncHandler::new("Echo", move |channel: &str, args: &[&str]| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(format!("{channel}:{}", args.join("|")))
        }))
    }

    fn bot_with_echo() -> (Bot, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut registry = Registry::new();
        registry.register("echo", echo_handler(calls.clone()));
        (Bot::new(registry), calls)
    }

    #[test]
    fn test_dispatches_first_token() {
        let (bot, calls) = bot_with_echo();
        let reply = bot.handle_message("C1", "echo a \"b c\"");
        assert_eq!(reply.as_deref(), Some("C1:a|b c"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_lookup_is_case_sensitive() {
        let (bot, calls) = bot_with_echo();
        let reply = bot.handle_message("C1", "Echo hi").unwrap();
        assert!(reply.starts_with("Unrecognized command: Echo"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_empty_message_is_ignored() {
        let (bot, _) = bot_with_echo();
        assert_eq!(bot.handle_message("C1", "   "), None);
    }

    #[test]
    fn test_unterminated_quote_is_reported() {
        let (bot, calls) = bot_with_echo();
        let reply = bot.handle_message("C1", "echo \"oops").unwrap();
        assert_eq!(reply, "Error: unterminated quote in message");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_builtin_help_lists_commands() {
        let (bot, _) = bot_with_echo();
        assert_eq!(
            bot.handle_message("C1", "help").as_deref(),
            Some("Commands:\n  echo - Echo\n")
        );
    }

    #[test]
    fn test_trigger_is_required_and_stripped() {
        let (bot, calls) = bot_with_echo();
        let bot = bot.with_trigger(Bot::default_trigger(Some("U42")).unwrap());

        assert_eq!(bot.handle_message("C1", "echo hi"), None);
        assert_eq!(bot.handle_message("C1", "<@U7> echo hi"), None);
        assert_eq!(bot.handle_message("C1", "!echo hi").as_deref(), Some("C1:hi"));
        assert_eq!(bot.handle_message("C1", "<@U42> echo hi").as_deref(), Some("C1:hi"));
        assert_eq!(bot.handle_message("C1", "<@U42>: echo hi").as_deref(), Some("C1:hi"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_errors_become_replies() {
        let mut registry = Registry::new();
        registry.register(
            "fail",
            Arc::new(FuncHandler::new("Fail", |_: &str, _: &[&str]| {
                Err(CommandError::execution("FAILURE", "exit status 1"))
            })),
        );
        let bot = Bot::new(registry);
        assert_eq!(
            bot.handle_message("C1", "fail").as_deref(),
            Some("FAILURE: exit status 1")
        );
    }

    #[test]
    #[cfg(unix)]
    fn test_hidden_results_are_not_posted() {
        let env = Environment::new();
        let mut registry = Registry::new();
        registry.register(
            "quiet",
            Arc::new(ExecHandler::new(
                &env,
                Arc::new(SystemRunner::new(env.clone())),
                "/bin/echo",
                ["shh"],
                false,
                "Quiet",
            )),
        );
        let bot = Bot::new(registry);
        assert_eq!(bot.handle_message("C1", "quiet"), None);
    }
}
