//! Wire types for the Canopy chat completions endpoint.

use crate::conversation::ChatMessage;

use serde::{Deserialize, Serialize};

/// Request body. Built fresh for every query.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CanopyRequest {
    pub messages: Vec<ChatMessage>,
    pub stream: bool,
    pub model: String,
    pub temperature: f32,
}

/// Response body. Only the first choice is read.
#[derive(Debug, Clone, Deserialize)]
pub struct CanopyResponse {
    #[serde(default)]
    pub choices: Vec<CanopyChoice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CanopyChoice {
    pub message: CanopyChoiceMessage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CanopyChoiceMessage {
    pub content: String,
}

impl CanopyResponse {
    /// Content of the first choice, if any.
    pub fn into_first_content(self) -> Option<String> {
        self.choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
    }
}
