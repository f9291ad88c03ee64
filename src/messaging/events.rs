//! Slack Events API payloads.
//!
//! Only the envelope and event types the bot acts on are modelled. Every other
//! `type` value deserializes into an explicit `Unknown` variant so dispatch is a
//! closed match with a default branch.

use serde::Deserialize;

/// Outer Events API envelope, tagged by `type`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SlackEnvelope {
    /// Handshake sent when the request URL is configured.
    UrlVerification { challenge: String },

    /// A subscribed event.
    EventCallback {
        #[serde(default)]
        team_id: Option<String>,
        event: SlackEvent,
    },

    #[serde(other)]
    Unknown,
}

/// Inner event of an `event_callback`, tagged by `type`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SlackEvent {
    AppMention(AppMentionEvent),
    Message(MessageEvent),
    #[serde(other)]
    Unknown,
}

/// `app_mention`: a message that references the bot's user id.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct AppMentionEvent {
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub text: String,
    pub channel: String,
    pub ts: String,
    #[serde(default)]
    pub thread_ts: Option<String>,
}

/// Generic `message` event. Logged, never answered.
#[derive(Debug, Clone, Deserialize, PartialEq, Default)]
pub struct MessageEvent {
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub bot_id: Option<String>,
    #[serde(default)]
    pub subtype: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub ts: Option<String>,
    #[serde(default)]
    pub thread_ts: Option<String>,
}

impl AppMentionEvent {
    /// Thread to reply into: the mention's own thread, if it was posted in one.
    pub fn reply_thread(&self) -> Option<&str> {
        self.thread_ts.as_deref()
    }
}
