//! Slack Web API client and the polling event loop that feeds the bot.

use crate::bot::Bot;
use crate::error::StartupError;
use crate::messenger::Messenger;
use anyhow::{Context, Result, bail};
use reqwest::blocking::Client;
use serde::Deserialize;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

const API_BASE: &str = "https://slack.com/api";
const HISTORY_LIMIT: &str = "20";

#[derive(Debug, Deserialize)]
struct SlackResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AuthTestResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    user_id: Option<String>,
}

/// A message from the `conversations.history` response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SlackMessage {
    #[serde(default)]
    pub text: String,
    /// Timestamp serving as unique message ID.
    pub ts: String,
    /// Present if the message was sent by a bot.
    #[serde(default)]
    pub bot_id: Option<String>,
    /// Message subtype (e.g., "bot_message", "channel_join").
    #[serde(default)]
    pub subtype: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseMetadata {
    #[serde(default)]
    next_cursor: String,
}

#[derive(Debug, Deserialize)]
struct HistoryResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    messages: Vec<SlackMessage>,
    #[serde(default)]
    has_more: bool,
    #[serde(default)]
    response_metadata: Option<ResponseMetadata>,
}

impl HistoryResponse {
    /// Cursor of the next (older) page, if Slack has one.
    fn next_cursor(&self) -> Option<&str> {
        if !self.has_more {
            return None;
        }
        self.response_metadata
            .as_ref()
            .map(|meta| meta.next_cursor.as_str())
            .filter(|cursor| !cursor.is_empty())
    }
}

#[derive(Debug, Deserialize)]
struct UploadUrlResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    upload_url: Option<String>,
    #[serde(default)]
    file_id: Option<String>,
}

/// Upload url and file id handed out by `files.getUploadURLExternal`.
fn upload_target(resp: UploadUrlResponse) -> Result<(String, String)> {
    ensure_ok("files.getUploadURLExternal", resp.ok, resp.error)?;
    match (resp.upload_url, resp.file_id) {
        (Some(url), Some(file_id)) => Ok((url, file_id)),
        _ => bail!("files.getUploadURLExternal returned no upload url"),
    }
}

fn complete_upload_body(channel: &str, title: &str, file_id: &str) -> serde_json::Value {
    serde_json::json!({
        "files": [{ "id": file_id, "title": title }],
        "channel_id": channel,
    })
}

/// Follows `next_cursor` until the last page and returns every message,
/// newest first.
fn collect_pages<F>(mut fetch: F) -> Result<Vec<SlackMessage>>
where
    F: FnMut(Option<&str>) -> Result<HistoryResponse>,
{
    let mut messages = Vec::new();
    let mut cursor: Option<String> = None;
    loop {
        let page = fetch(cursor.as_deref())?;
        cursor = page.next_cursor().map(str::to_string);
        messages.extend(page.messages);
        if cursor.is_none() {
            return Ok(messages);
        }
    }
}

fn ensure_ok(method: &str, ok: bool, error: Option<String>) -> Result<()> {
    if !ok {
        bail!(
            "{method} failed: {}",
            error.unwrap_or_else(|| "unknown error".into())
        );
    }
    Ok(())
}

/// Blocking client for the handful of Slack Web API methods the bot uses.
pub struct SlackClient {
    client: Client,
    token: String,
}

impl SlackClient {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            token: token.into(),
        }
    }

    /// Checks the token and returns the bot's own user id.
    pub fn auth_test(&self) -> Result<String, StartupError> {
        let parsed: AuthTestResponse = self
            .client
            .post(format!("{API_BASE}/auth.test"))
            .bearer_auth(&self.token)
            .send()
            .and_then(|resp| resp.json())
            .map_err(|e| StartupError::Auth(e.to_string()))?;
        if !parsed.ok {
            return Err(StartupError::Auth(
                parsed.error.unwrap_or_else(|| "unknown error".into()),
            ));
        }
        parsed
            .user_id
            .ok_or_else(|| StartupError::Auth("auth.test returned no user id".into()))
    }

    /// Fetches every message of `channel` newer than `oldest`, newest first.
    /// Follows pagination so that a burst larger than one page is not cut
    /// short.
    pub fn history(&self, channel: &str, oldest: Option<&str>) -> Result<Vec<SlackMessage>> {
        collect_pages(|cursor| self.history_page(channel, oldest, cursor))
    }

    /// Timestamp of the newest message in `channel`, if any.
    pub fn latest_ts(&self, channel: &str) -> Result<Option<String>> {
        let page = self.history_page(channel, None, None)?;
        Ok(page.messages.into_iter().next().map(|m| m.ts))
    }

    fn history_page(
        &self,
        channel: &str,
        oldest: Option<&str>,
        cursor: Option<&str>,
    ) -> Result<HistoryResponse> {
        let mut request = self
            .client
            .get(format!("{API_BASE}/conversations.history"))
            .bearer_auth(&self.token)
            .query(&[("channel", channel), ("limit", HISTORY_LIMIT)]);
        if let Some(ts) = oldest {
            request = request.query(&[("oldest", ts)]);
        }
        if let Some(cursor) = cursor {
            request = request.query(&[("cursor", cursor)]);
        }
        let mut parsed: HistoryResponse = request
            .send()
            .and_then(|resp| resp.json())
            .context("conversations.history request failed")?;
        ensure_ok("conversations.history", parsed.ok, parsed.error.take())?;
        Ok(parsed)
    }
}

impl Messenger for SlackClient {
    fn send_message(&self, channel: &str, text: &str) -> Result<()> {
        let body = serde_json::json!({
            "channel": channel,
            "text": text,
        });
        let parsed: SlackResponse = self
            .client
            .post(format!("{API_BASE}/chat.postMessage"))
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .and_then(|resp| resp.json())
            .context("chat.postMessage request failed")?;
        ensure_ok("chat.postMessage", parsed.ok, parsed.error)
    }

    fn upload_file(&self, channel: &str, title: &str, content: &str) -> Result<()> {
        let filename = format!("{}.txt", title.replace(' ', "_"));
        let length = content.len().to_string();
        let ticket: UploadUrlResponse = self
            .client
            .post(format!("{API_BASE}/files.getUploadURLExternal"))
            .bearer_auth(&self.token)
            .form(&[("filename", filename.as_str()), ("length", length.as_str())])
            .send()
            .and_then(|resp| resp.json())
            .context("files.getUploadURLExternal request failed")?;
        let (upload_url, file_id) = upload_target(ticket)?;

        self.client
            .post(upload_url.as_str())
            .body(content.to_string())
            .send()
            .and_then(|resp| resp.error_for_status())
            .with_context(|| format!("upload of {filename} failed"))?;

        let parsed: SlackResponse = self
            .client
            .post(format!("{API_BASE}/files.completeUploadExternal"))
            .bearer_auth(&self.token)
            .json(&complete_upload_body(channel, title, &file_id))
            .send()
            .and_then(|resp| resp.json())
            .context("files.completeUploadExternal request failed")?;
        ensure_ok("files.completeUploadExternal", parsed.ok, parsed.error)
    }
}

/// Undoes the HTML escaping Slack applies to message text.
pub fn unescape(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

/// Picks the user messages newer than `last_ts` from a newest-first batch
/// and returns them oldest first, together with the timestamp to resume
/// from.
pub fn select_new(
    messages: Vec<SlackMessage>,
    last_ts: Option<&str>,
) -> (Vec<SlackMessage>, Option<String>) {
    let newest = messages
        .first()
        .map(|m| m.ts.clone())
        .filter(|ts| last_ts.is_none_or(|last| ts.as_str() > last))
        .or_else(|| last_ts.map(str::to_string));

    let mut fresh: Vec<SlackMessage> = messages
        .into_iter()
        .filter(|m| m.bot_id.is_none() && m.subtype.is_none())
        .filter(|m| last_ts.is_none_or(|last| m.ts.as_str() > last))
        .collect();
    fresh.reverse();
    (fresh, newest)
}

/// Polls one channel and answers every new user message through the bot.
pub struct SlackListener {
    client: Arc<SlackClient>,
    channel: String,
    interval: Duration,
    last_ts: Option<String>,
}

impl SlackListener {
    pub fn new(client: Arc<SlackClient>, channel: impl Into<String>, interval: Duration) -> Self {
        Self {
            client,
            channel: channel.into(),
            interval,
            last_ts: None,
        }
    }

    /// Marks everything already in the channel as seen so that old commands
    /// are not replayed on startup.
    pub fn skip_backlog(&mut self) -> Result<()> {
        self.last_ts = self.client.latest_ts(&self.channel)?;
        debug!(last_ts = ?self.last_ts, "skipped channel backlog");
        Ok(())
    }

    /// Fetches new messages once and replies to each; returns how many
    /// messages were handled.
    pub fn poll_once(&mut self, bot: &Bot) -> Result<usize> {
        let messages = self
            .client
            .history(&self.channel, self.last_ts.as_deref())?;
        let (fresh, newest) = select_new(messages, self.last_ts.as_deref());
        self.last_ts = newest;

        for message in &fresh {
            let text = unescape(&message.text);
            debug!(ts = %message.ts, %text, "received message");
            if let Some(reply) = bot.handle_message(&self.channel, &text) {
                if let Err(e) = self.client.send_message(&self.channel, &reply) {
                    warn!(channel = %self.channel, error = %format!("{e:#}"), "failed to send reply");
                }
            }
        }
        Ok(fresh.len())
    }

    /// Polls forever. Transport errors are logged and retried on the next
    /// tick.
    pub fn listen(&mut self, bot: &Bot) -> Result<()> {
        self.skip_backlog()?;
        info!(channel = %self.channel, interval = ?self.interval, "listening");
        loop {
            if let Err(e) = self.poll_once(bot) {
                warn!(error = %format!("{e:#}"), "poll failed");
            }
            thread::sleep(self.interval);
        }
    }
}
