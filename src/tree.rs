//! Sub-command parsing for commands such as `build linux`.
//!
//! A [`CommandTree`] describes a static grammar of nested sub-commands. Parsing
//! a token list against it ends in exactly one of three states: a resolved
//! leaf ([`Parsed::Resolved`]), usage text ([`Parsed::Usage`]) when help was
//! asked for or the tokens stop short of a leaf, or a [`ParseError`].
//!
//! [`Subcommands`] wraps a tree into a [`Handler`] that routes resolved leaves
//! to their own handlers.

use crate::command::{Handler, Reply};
use crate::error::CommandError;
use std::collections::HashMap;
use std::fmt;
use std::fmt::Write;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Tokens that ask for usage text instead of running anything.
const HELP_TOKENS: &[&str] = &["help", "--help", "-h"];

/// Fully-qualified name of a node in a [`CommandTree`], e.g. `build/linux`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct CommandPath(Vec<String>);

impl CommandPath {
    pub fn new<S: Into<String>>(parts: impl IntoIterator<Item = S>) -> Self {
        Self(parts.into_iter().map(Into::into).collect())
    }

    pub fn parts(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The path the way a user types it, e.g. `build linux`.
    pub fn spoken(&self) -> String {
        self.0.join(" ")
    }

    fn push(&mut self, part: &str) {
        self.0.push(part.to_string());
    }
}

impl From<&str> for CommandPath {
    fn from(path: &str) -> Self {
        Self::new(path.split('/').filter(|part| !part.is_empty()))
    }
}

impl fmt::Display for CommandPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("/"))
    }
}

/// Outcome of a successful parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Parsed {
    /// A leaf command was reached and every token was consumed.
    Resolved(CommandPath),
    /// Help was requested or more tokens are needed; carries the usage text.
    Usage(String),
}

/// Tokens that do not fit the command tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unknown command {token:?}{}, try `help`", after(.path))]
    UnknownCommand { path: CommandPath, token: String },

    #[error("unexpected argument {:?}{}", .args.join(" "), after(.path))]
    UnexpectedArguments { path: CommandPath, args: Vec<String> },
}

fn after(path: &CommandPath) -> String {
    if path.is_empty() {
        String::new()
    } else {
        format!(" after `{}`", path.spoken())
    }
}

/// A node of the sub-command grammar. The root node names the whole
/// application and is never typed by users.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTree {
    name: String,
    description: String,
    children: Vec<CommandTree>,
}

impl CommandTree {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            children: Vec::new(),
        }
    }

    /// Adds a child command and returns it so grandchildren can be chained.
    ///
    /// Adding a name that already exists returns the existing child with its
    /// description updated.
    pub fn command(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> &mut CommandTree {
        let name = name.into();
        let description = description.into();
        let index = match self.children.iter().position(|c| c.name == name) {
            Some(index) => {
                self.children[index].description = description;
                index
            }
            None => {
                self.children.push(CommandTree::new(name, description));
                self.children.len() - 1
            }
        };
        &mut self.children[index]
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn children(&self) -> &[CommandTree] {
        &self.children
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    fn child(&self, name: &str) -> Option<&CommandTree> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Looks up the node at `path` below this one.
    pub fn find(&self, path: &CommandPath) -> Option<&CommandTree> {
        path.parts()
            .iter()
            .try_fold(self, |node, part| node.child(part))
    }

    /// Parses user tokens, starting below the root.
    pub fn parse(&self, tokens: &[&str]) -> Result<Parsed, ParseError> {
        let mut node = self;
        let mut path = CommandPath::default();

        for (pos, &token) in tokens.iter().enumerate() {
            if HELP_TOKENS.contains(&token) && node.child(token).is_none() {
                return self.help(path, &tokens[pos + 1..]);
            }
            if node.is_leaf() {
                return Err(ParseError::UnexpectedArguments {
                    path,
                    args: tokens[pos..].iter().map(|t| t.to_string()).collect(),
                });
            }
            match node.child(token) {
                Some(child) => {
                    path.push(&child.name);
                    node = child;
                }
                None => {
                    return Err(ParseError::UnknownCommand {
                        path,
                        token: token.to_string(),
                    });
                }
            }
        }

        if node.is_leaf() && !path.is_empty() {
            Ok(Parsed::Resolved(path))
        } else {
            Ok(Parsed::Usage(node.usage(&self.name, &path)))
        }
    }

    /// Usage for `help [<command>...]`: the tokens after the help request
    /// narrow down which node to describe.
    fn help(&self, mut path: CommandPath, topic: &[&str]) -> Result<Parsed, ParseError> {
        let mut node = self
            .find(&path)
            .ok_or_else(|| ParseError::UnknownCommand {
                path: CommandPath::default(),
                token: path.spoken(),
            })?;
        for &token in topic {
            if HELP_TOKENS.contains(&token) {
                continue;
            }
            match node.child(token) {
                Some(child) => {
                    path.push(&child.name);
                    node = child;
                }
                None => {
                    return Err(ParseError::UnknownCommand {
                        path,
                        token: token.to_string(),
                    });
                }
            }
        }
        Ok(Parsed::Usage(node.usage(&self.name, &path)))
    }

    /// Renders usage text for this node, reached from the root named `app`
    /// through `path`.
    pub fn usage(&self, app: &str, path: &CommandPath) -> String {
        let mut out = String::new();
        let mut invocation = app.to_string();
        for part in path.parts() {
            invocation.push(' ');
            invocation.push_str(part);
        }
        if self.is_leaf() {
            let _ = writeln!(out, "usage: {invocation}");
        } else {
            let _ = writeln!(out, "usage: {invocation} <command>");
        }
        if !self.description.is_empty() {
            let _ = write!(out, "\n{}\n", self.description);
        }
        if !self.is_leaf() {
            out.push_str("\nCommands:\n");
            let labels: Vec<String> = self
                .children
                .iter()
                .map(|child| {
                    if child.is_leaf() {
                        child.name.clone()
                    } else {
                        format!("{} <command>", child.name)
                    }
                })
                .collect();
            let width = labels.iter().map(String::len).max().unwrap_or(0);
            for (label, child) in labels.iter().zip(&self.children) {
                let _ = writeln!(out, "  {label:<width$}  {}", child.description);
            }
        }
        out
    }
}

/// Handler that parses its arguments against a [`CommandTree`] and runs the
/// handler routed to the resolved leaf.
///
/// Usage text is returned as an ordinary reply and parse errors as
/// [`CommandError::Parse`]; in both cases no leaf handler runs.
pub struct Subcommands {
    entry: String,
    description: String,
    tree: CommandTree,
    routes: HashMap<CommandPath, Arc<dyn Handler>>,
}

impl Subcommands {
    /// `entry` is the registry name this handler is installed under; it is
    /// the first token fed to the tree.
    pub fn new(entry: impl Into<String>, description: impl Into<String>, tree: CommandTree) -> Self {
        Self {
            entry: entry.into(),
            description: description.into(),
            tree,
            routes: HashMap::new(),
        }
    }

    /// Routes the leaf at `path` to `handler`, replacing any earlier route.
    pub fn route(&mut self, path: impl Into<CommandPath>, handler: Arc<dyn Handler>) -> &mut Self {
        self.routes.insert(path.into(), handler);
        self
    }
}

impl Handler for Subcommands {
    fn run(&self, channel: &str, args: &[&str]) -> Result<Reply, CommandError> {
        let mut tokens = Vec::with_capacity(args.len() + 1);
        tokens.push(self.entry.as_str());
        tokens.extend_from_slice(args);

        match self.tree.parse(&tokens)? {
            Parsed::Usage(usage) => Ok(usage),
            Parsed::Resolved(path) => match self.routes.get(&path) {
                Some(handler) => {
                    debug!(%path, channel, "running sub-command");
                    handler.run(channel, &[])
                }
                None => Ok(path.to_string()),
            },
        }
    }

    fn description(&self) -> &str {
        &self.description
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::FuncHandler;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn tuxbot_tree() -> CommandTree {
        let mut app = CommandTree::new("tuxbot", "Command parser for tuxbot");
        app.command("build", "Build things")
            .command("linux", "Start a linux build");
        app
    }

    #[test]
    fn test_build_linux_resolves() {
        let parsed = tuxbot_tree().parse(&["build", "linux"]).unwrap();
        assert_eq!(parsed, Parsed::Resolved(CommandPath::from("build/linux")));
        if let Parsed::Resolved(path) = parsed {
            assert_eq!(path.to_string(), "build/linux");
            assert_eq!(path.spoken(), "build linux");
        }
    }

    #[test]
    fn test_incomplete_command_yields_usage() {
        match tuxbot_tree().parse(&["build"]).unwrap() {
            Parsed::Usage(text) => {
                assert!(text.starts_with("usage: tuxbot build <command>"));
                assert!(text.contains("Build things"));
                assert!(text.contains("linux  Start a linux build"));
            }
            other => panic!("expected usage, got {other:?}"),
        }
    }

    #[test]
    fn test_no_tokens_yields_root_usage() {
        match tuxbot_tree().parse(&[]).unwrap() {
            Parsed::Usage(text) => {
                assert!(text.contains("usage: tuxbot <command>"));
                assert!(text.contains("build <command>  Build things"));
            }
            other => panic!("expected usage, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_child_is_error() {
        let err = tuxbot_tree().parse(&["build", "windows"]).unwrap_err();
        assert_eq!(
            err,
            ParseError::UnknownCommand {
                path: CommandPath::from("build"),
                token: "windows".into(),
            }
        );
        assert_eq!(
            err.to_string(),
            "unknown command \"windows\" after `build`, try `help`"
        );
    }

    #[test]
    fn test_unknown_top_level_is_error() {
        let err = tuxbot_tree().parse(&["deploy"]).unwrap_err();
        assert_eq!(err.to_string(), "unknown command \"deploy\", try `help`");
    }

    #[test]
    fn test_extra_arguments_after_leaf_is_error() {
        let err = tuxbot_tree()
            .parse(&["build", "linux", "now", "please"])
            .unwrap_err();
        assert_eq!(
            err,
            ParseError::UnexpectedArguments {
                path: CommandPath::from("build/linux"),
                args: vec!["now".into(), "please".into()],
            }
        );
        assert_eq!(
            err.to_string(),
            "unexpected argument \"now please\" after `build linux`"
        );
    }

    #[test]
    fn test_help_requests_yield_usage() {
        let tree = tuxbot_tree();
        for tokens in [
            &["build", "--help"][..],
            &["build", "-h"][..],
            &["build", "help"][..],
            &["help", "build"][..],
        ] {
            match tree.parse(tokens).unwrap() {
                Parsed::Usage(text) => {
                    assert!(text.starts_with("usage: tuxbot build <command>"), "{tokens:?}")
                }
                other => panic!("expected usage for {tokens:?}, got {other:?}"),
            }
        }

        match tree.parse(&["build", "linux", "--help"]).unwrap() {
            Parsed::Usage(text) => {
                assert_eq!(text, "usage: tuxbot build linux\n\nStart a linux build\n")
            }
            other => panic!("expected usage, got {other:?}"),
        }
    }

    #[test]
    fn test_help_with_unknown_topic_is_error() {
        let err = tuxbot_tree().parse(&["help", "deploy"]).unwrap_err();
        assert!(matches!(err, ParseError::UnknownCommand { .. }));
    }

    #[test]
    fn test_children_can_be_added_later() {
        let mut tree = tuxbot_tree();
        tree.command("build", "Build all the things")
            .command("macos", "Start a macOS build");

        assert_eq!(tree.children().len(), 1);
        assert_eq!(tree.children()[0].description(), "Build all the things");
        assert_eq!(
            tree.parse(&["build", "macos"]).unwrap(),
            Parsed::Resolved(CommandPath::from("build/macos"))
        );
        assert!(tree.find(&CommandPath::from("build/linux")).is_some());
    }

    fn counting_handler(calls: Arc<AtomicUsize>) -> Arc<dyn Handler> {
        Arc::new(FuncHandler::new("count", move |_: &str, args: &[&str]| {
            assert!(args.is_empty());
            calls.fetch_add(1, Ordering::SeqCst);
            Ok("built".to_string())
        }))
    }

    #[test]
    fn test_subcommands_only_run_resolved_leaf() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut build = Subcommands::new("build", "Build all the things!", tuxbot_tree());
        build.route("build/linux", counting_handler(calls.clone()));

        assert!(build.run("C1", &[]).unwrap().starts_with("usage:"));
        assert!(matches!(
            build.run("C1", &["windows"]),
            Err(CommandError::Parse(ParseError::UnknownCommand { .. }))
        ));
        assert!(build.run("C1", &["linux", "--help"]).unwrap().starts_with("usage:"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        assert_eq!(build.run("C1", &["linux"]).unwrap(), "built");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unrouted_leaf_echoes_path() {
        let build = Subcommands::new("build", "Build all the things!", tuxbot_tree());
        assert_eq!(build.run("C1", &["linux"]).unwrap(), "build/linux");
    }
}
