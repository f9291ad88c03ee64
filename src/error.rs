//! Top-level error types for canopybot.

/// Crate-wide result type alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error enum wrapping domain-specific errors.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Canopy(#[from] CanopyError),

    #[error(transparent)]
    Tokenizer(#[from] TokenizerError),

    #[error(transparent)]
    Messaging(#[from] MessagingError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Configuration loading errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingKey(String),

    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

/// Canopy backend errors.
///
/// Both variants are recoverable: the webhook turns them into a reply via
/// [`CanopyError::user_message`].
#[derive(Debug, thiserror::Error)]
pub enum CanopyError {
    /// Transport failure, timeout, non-2xx status or an undecodable body.
    #[error("could not reach canopy server: {0}")]
    Unreachable(String),

    /// The backend answered 2xx but without a usable `choices` entry.
    #[error("unexpected response format from canopy server")]
    UnexpectedFormat,
}

impl CanopyError {
    /// Reply text shown to the Slack user for this failure.
    pub fn user_message(&self) -> &'static str {
        match self {
            CanopyError::Unreachable(_) => "Error: Could not get a response from the Canopy server",
            CanopyError::UnexpectedFormat => "Error: Unexpected response format from Canopy server",
        }
    }
}

/// Tokenizer lookup errors.
#[derive(Debug, thiserror::Error)]
pub enum TokenizerError {
    #[error("no tokenizer for model: {0}")]
    UnknownModel(String),
}

/// Slack Web API errors.
#[derive(Debug, thiserror::Error)]
pub enum MessagingError {
    #[error("failed to create slack HTTP connector: {0}")]
    Connector(String),

    #[error("slack API call failed: {0}")]
    Api(String),
}
