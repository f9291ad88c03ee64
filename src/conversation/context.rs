//! Context trimming: drop the oldest turns until the history fits a token budget.

use super::message::ChatMessage;
use super::tokens::count_tokens;
use crate::error::TokenizerError;

/// Budget used when the caller does not supply one.
pub const DEFAULT_MAX_CONTEXT_TOKENS: usize = 4000;

/// Remove messages from the front of `history` until its total token count is
/// at most `max_tokens`.
///
/// The last remaining message is never removed, even if it alone exceeds the
/// budget; messages are not truncated internally, so downstream limits can
/// still be exceeded by a single oversized turn.
pub fn trim_conversation_context(
    mut history: Vec<ChatMessage>,
    max_tokens: usize,
    model: &str,
) -> Result<Vec<ChatMessage>, TokenizerError> {
    let counts = history
        .iter()
        .map(|message| count_tokens(&message.content, model))
        .collect::<Result<Vec<_>, _>>()?;

    let mut total: usize = counts.iter().sum();
    let mut dropped = 0;

    while total > max_tokens && history.len() - dropped > 1 {
        total -= counts[dropped];
        dropped += 1;
    }

    if dropped > 0 {
        tracing::debug!(dropped, remaining_tokens = total, max_tokens, "trimmed conversation context");
        history.drain(..dropped);
    }

    Ok(history)
}
