//! Interactive console front end, for trying commands without Slack.

use crate::bot::Bot;
use crate::messenger::Messenger;
use anyhow::Result;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::io::Write;
use std::sync::Mutex;

/// Channel name reported to handlers for console input.
pub const CONSOLE_CHANNEL: &str = "console";

/// [`Messenger`] that writes messages and uploads to a local stream.
pub struct ConsoleMessenger {
    out: Mutex<Box<dyn Write + Send>>,
}

impl ConsoleMessenger {
    pub fn new(out: Box<dyn Write + Send>) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub fn stdout() -> Self {
        Self::new(Box::new(std::io::stdout()))
    }

    fn write(&self, text: &str) -> Result<()> {
        let mut out = self
            .out
            .lock()
            .map_err(|_| anyhow::anyhow!("console output lock poisoned"))?;
        out.write_all(text.as_bytes())?;
        out.flush()?;
        Ok(())
    }
}

impl Messenger for ConsoleMessenger {
    fn send_message(&self, channel: &str, text: &str) -> Result<()> {
        if channel == CONSOLE_CHANNEL {
            self.write(&format!("{text}\n"))
        } else {
            self.write(&format!("[{channel}] {text}\n"))
        }
    }

    fn upload_file(&self, channel: &str, title: &str, content: &str) -> Result<()> {
        self.write(&format!(
            "--- [{channel}] {title} ---\n{content}\n--- end of {title} ---\n"
        ))
    }
}

/// Reads commands from the terminal until `exit`, Ctrl-C or Ctrl-D.
pub fn repl(bot: &Bot, messenger: &dyn Messenger) -> Result<()> {
    let mut rl = DefaultEditor::new()?;

    loop {
        match rl.readline("tuxbot> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                rl.add_history_entry(line)?;
                if line == "exit" {
                    break;
                }
                if let Some(reply) = bot.handle_message(CONSOLE_CHANNEL, line) {
                    messenger.send_message(CONSOLE_CHANNEL, &reply)?;
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(err) => return Err(err.into()),
        }
    }

    Ok(())
}
