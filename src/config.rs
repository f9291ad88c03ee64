//! Configuration loading and validation.

use crate::error::{ConfigError, Result};
use std::time::Duration;

/// Port used when `PORT` is unset.
pub const DEFAULT_PORT: u16 = 3000;

/// Canopy request timeout used when `CANOPY_TIMEOUT_SECS` is unset.
pub const DEFAULT_CANOPY_TIMEOUT: Duration = Duration::from_secs(60);

/// canopybot configuration. Built once at startup and passed to constructors.
#[derive(Debug, Clone)]
pub struct Config {
    /// Slack credentials.
    pub slack: SlackConfig,

    /// Canopy backend settings.
    pub canopy: CanopyConfig,

    /// Pinecone API key. Required at startup, not used by the request path.
    pub pinecone_api_key: String,

    /// Pinecone index name. Required at startup, not used by the request path.
    pub index_name: String,

    /// Listening port.
    pub port: u16,

    /// Deployment environment (`FLASK_ENV`), if set.
    pub environment: Option<String>,
}

/// Slack app credentials.
#[derive(Debug, Clone)]
pub struct SlackConfig {
    /// Bot user OAuth token (`xoxb-...`).
    pub bot_token: String,

    /// Signing secret for verifying inbound requests.
    pub signing_secret: String,

    /// User id of the bot, used to recognize and strip mentions.
    pub bot_user_id: String,
}

/// Canopy backend configuration.
#[derive(Debug, Clone)]
pub struct CanopyConfig {
    /// Full URL of the chat completions endpoint.
    pub api_url: String,

    /// Bearer token sent with every request.
    pub api_key: String,

    /// Per-request timeout.
    pub timeout: Duration,
}

impl Config {
    /// Load configuration from the process environment.
    pub fn load() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |key: &str| -> std::result::Result<String, ConfigError> {
            lookup(key)
                .filter(|value| !value.is_empty())
                .ok_or_else(|| ConfigError::MissingKey(key.into()))
        };

        let slack = SlackConfig {
            bot_token: required("SLACK_BOT_TOKEN")?,
            signing_secret: required("SLACK_SIGNING_SECRET")?,
            bot_user_id: required("SLACK_BOT_USER_ID")?,
        };

        let timeout = match lookup("CANOPY_TIMEOUT_SECS") {
            Some(value) => value
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| ConfigError::InvalidValue {
                    key: "CANOPY_TIMEOUT_SECS".into(),
                    value,
                })?,
            None => DEFAULT_CANOPY_TIMEOUT,
        };

        let canopy = CanopyConfig {
            api_url: required("CANOPY_API_URL")?,
            api_key: required("OPENAI_API_KEY")?,
            timeout,
        };

        let pinecone_api_key = required("PINECONE_API_KEY")?;
        let index_name = required("INDEX_NAME")?;

        let port = match lookup("PORT") {
            Some(value) => value.parse().map_err(|_| ConfigError::InvalidValue {
                key: "PORT".into(),
                value,
            })?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            slack,
            canopy,
            pinecone_api_key,
            index_name,
            port,
            environment: lookup("FLASK_ENV"),
        })
    }

    /// Whether this process runs in production, where no `.env` file is read.
    pub fn is_production(&self) -> bool {
        is_production_env(self.environment.as_deref())
    }
}

/// `FLASK_ENV` gate for loading a local `.env` file.
pub fn is_production_env(environment: Option<&str>) -> bool {
    environment == Some("production")
}
