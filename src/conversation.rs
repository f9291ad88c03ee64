//! Conversation history and context management.

pub mod context;
pub mod message;
pub mod tokens;

pub use context::{DEFAULT_MAX_CONTEXT_TOKENS, trim_conversation_context};
pub use message::{ChatMessage, Role};
pub use tokens::{DEFAULT_TOKEN_MODEL, TokenCounter, count_tokens};
