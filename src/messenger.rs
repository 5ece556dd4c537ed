use anyhow::Result;

/// Outbound side of a chat platform.
pub trait Messenger: Send + Sync {
    /// Posts `text` to `channel`.
    fn send_message(&self, channel: &str, text: &str) -> Result<()>;

    /// Shares `content` as a text file titled `title` in `channel`.
    fn upload_file(&self, channel: &str, title: &str, content: &str) -> Result<()>;
}
