use crate::command::{Command, Handler};
use std::collections::BTreeMap;
use std::fmt::Write;
use std::sync::Arc;
use tracing::warn;

/// Startup-time mapping from command name to [`Command`].
///
/// Lookup is exact and case-sensitive. The registry is filled before the
/// event loop starts and only read afterwards.
#[derive(Debug, Default)]
pub struct Registry {
    commands: BTreeMap<String, Command>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` under `name`, replacing any previous entry.
    ///
    /// Returns the replaced command, if there was one.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        handler: Arc<dyn Handler>,
    ) -> Option<Command> {
        let name = name.into();
        let previous = self
            .commands
            .insert(name.clone(), Command::new(name.clone(), handler));
        if previous.is_some() {
            warn!(command = %name, "command registered twice, keeping the latest");
        }
        previous
    }

    pub fn lookup(&self, name: &str) -> Option<&Command> {
        self.commands.get(name)
    }

    /// Commands in name order.
    pub fn iter(&self) -> impl Iterator<Item = &Command> {
        self.commands.values()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// One `name - description` line per registered command.
    pub fn help_text(&self) -> String {
        let mut out = String::from("Commands:\n");
        for command in self.iter() {
            let _ = writeln!(out, "  {} - {}", command.name(), command.description());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::FuncHandler;

    fn reply_with(text: &'static str) -> Arc<dyn Handler> {
        Arc::new(FuncHandler::new(text, move |_: &str, _: &[&str]| {
            Ok(text.to_string())
        }))
    }

    #[test]
    fn test_lookup_is_exact_and_case_sensitive() {
        let mut registry = Registry::new();
        registry.register("date", reply_with("today"));

        assert!(registry.lookup("date").is_some());
        assert!(registry.lookup("Date").is_none());
        assert!(registry.lookup("dat").is_none());
        assert!(registry.lookup("date ").is_none());
    }

    #[test]
    fn test_register_overwrites() {
        let mut registry = Registry::new();
        assert!(registry.register("date", reply_with("first")).is_none());
        let previous = registry.register("date", reply_with("second"));

        assert_eq!(previous.unwrap().description(), "first");
        assert_eq!(registry.len(), 1);
        let reply = registry.lookup("date").unwrap().run("C1", &[]).unwrap();
        assert_eq!(reply, "second");
    }

    #[test]
    fn test_help_text_lists_commands_in_order() {
        let mut registry = Registry::new();
        registry.register("resume", reply_with("Resume"));
        registry.register("pause", reply_with("Pause"));

        assert_eq!(
            registry.help_text(),
            "Commands:\n  pause - Pause\n  resume - Resume\n"
        );
    }
}
