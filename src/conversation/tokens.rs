//! Model-specific token counting backed by tiktoken vocabularies.

use crate::error::TokenizerError;

use moka::sync::Cache;
use std::sync::{Arc, LazyLock};
use tiktoken_rs::CoreBPE;

/// Model used for counting when the caller has no better choice.
pub const DEFAULT_TOKEN_MODEL: &str = "gpt-3.5-turbo";

/// At most a handful of models are in use at once.
const MAX_CACHED_ENCODERS: u64 = 16;

static SHARED_COUNTER: LazyLock<TokenCounter> = LazyLock::new(TokenCounter::new);

/// Count the tokens `text` occupies for `model`, using a process-wide encoder cache.
pub fn count_tokens(text: &str, model: &str) -> Result<usize, TokenizerError> {
    SHARED_COUNTER.count(text, model)
}

/// Token counter holding one BPE encoder per model.
///
/// Encoders are expensive to build (the vocabulary is parsed on construction),
/// so they are resolved once per model name and reused.
#[derive(Clone)]
pub struct TokenCounter {
    encoders: Cache<String, Arc<CoreBPE>>,
}

impl TokenCounter {
    pub fn new() -> Self {
        Self {
            encoders: Cache::new(MAX_CACHED_ENCODERS),
        }
    }

    /// Count tokens for `text` under `model`'s vocabulary.
    pub fn count(&self, text: &str, model: &str) -> Result<usize, TokenizerError> {
        let encoder = self.encoder(model)?;
        Ok(encoder.encode_ordinary(text).len())
    }

    fn encoder(&self, model: &str) -> Result<Arc<CoreBPE>, TokenizerError> {
        if let Some(encoder) = self.encoders.get(model) {
            return Ok(encoder);
        }

        let encoder = tiktoken_rs::get_bpe_from_model(model).map_err(|error| {
            tracing::debug!(model, %error, "tokenizer lookup failed");
            TokenizerError::UnknownModel(model.to_string())
        })?;
        let encoder = Arc::new(encoder);
        self.encoders.insert(model.to_string(), encoder.clone());
        Ok(encoder)
    }
}

impl Default for TokenCounter {
    fn default() -> Self {
        Self::new()
    }
}
