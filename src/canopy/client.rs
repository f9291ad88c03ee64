//! Single-shot Canopy query: persona prompt + user text in, answer text out.

use super::types::{CanopyRequest, CanopyResponse};
use crate::config::CanopyConfig;
use crate::conversation::ChatMessage;
use crate::error::{CanopyError, Result};
use crate::logging::truncate_for_log;

use anyhow::Context as _;

/// Instruction text placed in front of every user query.
///
/// Line breaks, indentation and the trailing space are part of the prompt the
/// deployed bot has always sent.
pub const PERSONA_PROMPT: &str = concat!(
    "You are a helpful assistant for forageSF. Your job is to help anyone who has a question\n",
    "        about our data. Always respond in an upbeat and friendly way, and ensure your answers are \n",
    "        informative and supportive. When you provide an answer, also include a quote of the specific \n",
    "        content you used to arrive at your answer. ",
);

/// Model name sent in the request body. Independent of the token-counting model.
pub const CANOPY_MODEL: &str = "GPT-4";

const MAX_LOGGED_BODY_CHARS: usize = 500;

/// HTTP client for the Canopy backend.
///
/// Holds one `reqwest::Client` so the connection pool survives across queries.
#[derive(Debug, Clone)]
pub struct CanopyClient {
    http_client: reqwest::Client,
    api_url: String,
    api_key: String,
}

impl CanopyClient {
    pub fn new(config: &CanopyConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .with_context(|| "failed to build canopy HTTP client")?;

        Ok(Self {
            http_client,
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
        })
    }

    /// Build the request body for `query`.
    pub fn build_request(query: &str) -> CanopyRequest {
        CanopyRequest {
            messages: vec![ChatMessage::user(format!("{PERSONA_PROMPT} {query}"))],
            stream: false,
            model: CANOPY_MODEL.to_string(),
            temperature: 0.0,
        }
    }

    /// Ask Canopy a question. One attempt, no retry.
    pub async fn ask(&self, query: &str) -> std::result::Result<String, CanopyError> {
        let body = Self::build_request(query);

        let response = self
            .http_client
            .post(&self.api_url)
            .header("authorization", format!("Bearer {}", self.api_key))
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|error| unreachable_error(format!("request failed: {error}")))?;

        let status = response.status();
        let response_text = response
            .text()
            .await
            .map_err(|error| unreachable_error(format!("failed to read response body: {error}")))?;

        if !status.is_success() {
            let (body, _) = truncate_for_log(&response_text, MAX_LOGGED_BODY_CHARS);
            return Err(unreachable_error(format!("canopy returned {status}: {body}")));
        }

        let response_body: serde_json::Value =
            serde_json::from_str(&response_text).map_err(|error| {
                unreachable_error(format!("canopy response ({status}) is not valid JSON: {error}"))
            })?;

        let parsed: CanopyResponse = serde_json::from_value(response_body).map_err(|error| {
            tracing::warn!(%error, "canopy response has an unexpected shape");
            CanopyError::UnexpectedFormat
        })?;

        parsed.into_first_content().ok_or_else(|| {
            tracing::warn!("canopy response has no choices");
            CanopyError::UnexpectedFormat
        })
    }

    /// Ask Canopy and collapse failures into the reply text shown to the user.
    pub async fn answer(&self, query: &str) -> String {
        match self.ask(query).await {
            Ok(answer) => answer,
            Err(error) => error.user_message().to_string(),
        }
    }
}

fn unreachable_error(reason: String) -> CanopyError {
    tracing::error!(%reason, "error communicating with canopy server");
    CanopyError::Unreachable(reason)
}
