//! Slack outbound adapter using slack-morphism, plus mention text handling.

use crate::error::{MessagingError, Result};
use crate::messaging::traits::{Messaging, OutboundReply};

use slack_morphism::prelude::*;
use std::sync::Arc;

/// Longest chunk posted in a single `chat.postMessage` call.
const MAX_MESSAGE_CHARS: usize = 12_000;

/// Slack adapter.
pub struct SlackAdapter {
    /// Shared HTTP client, reused across all API calls.
    client: Arc<SlackHyperClient>,
    /// Pre-built API token wrapping the bot token.
    token: SlackApiToken,
}

impl SlackAdapter {
    pub fn new(bot_token: impl Into<String>) -> Result<Self> {
        let connector = SlackClientHyperConnector::new()
            .map_err(|error| MessagingError::Connector(error.to_string()))?;
        let client = Arc::new(SlackClient::new(connector));
        let token = SlackApiToken::new(SlackApiTokenValue(bot_token.into()));
        Ok(Self { client, token })
    }
}

impl Messaging for SlackAdapter {
    fn name(&self) -> &str {
        "slack"
    }

    async fn post_reply(&self, reply: OutboundReply) -> Result<()> {
        let session = self.client.open_session(&self.token);
        let channel_id = SlackChannelId(reply.channel.clone());
        let thread_ts = reply.thread_ts.clone().map(SlackTs);

        for chunk in split_message(&reply.text, MAX_MESSAGE_CHARS) {
            let request = SlackApiChatPostMessageRequest::new(
                channel_id.clone(),
                SlackMessageContent::new().with_text(chunk),
            )
            .opt_thread_ts(thread_ts.clone());

            session
                .chat_post_message(&request)
                .await
                .map_err(|error| MessagingError::Api(error.to_string()))?;
        }

        tracing::debug!(channel = %reply.channel, thread_ts = ?reply.thread_ts, "slack reply posted");
        Ok(())
    }
}

/// Remove every `<@bot_user_id>` token from `text` and trim surrounding whitespace.
pub fn strip_bot_mention(text: &str, bot_user_id: &str) -> String {
    let mention = format!("<@{}>", bot_user_id);
    text.replace(mention.as_str(), "").trim().to_string()
}

/// Split a message into UTF-8-safe chunks at line/word boundaries.
fn split_message(text: &str, max_len: usize) -> Vec<String> {
    if text.len() <= max_len {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut remaining = text;

    while !remaining.is_empty() {
        if remaining.len() <= max_len {
            chunks.push(remaining.to_string());
            break;
        }

        // Walk back to a valid char boundary before slicing
        let mut safe_max = max_len.min(remaining.len());
        while !remaining.is_char_boundary(safe_max) {
            safe_max -= 1;
        }

        let split_at = remaining[..safe_max]
            .rfind('\n')
            .or_else(|| remaining[..safe_max].rfind(' '))
            .filter(|&index| index > 0)
            .unwrap_or(safe_max);

        chunks.push(remaining[..split_at].to_string());
        remaining = remaining[split_at..].trim_start();
    }

    chunks
}
