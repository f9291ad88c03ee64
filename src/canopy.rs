//! Client for the Canopy question-answering backend.

pub mod client;
pub mod types;

pub use client::{CANOPY_MODEL, CanopyClient, PERSONA_PROMPT};
pub use types::{CanopyChoice, CanopyChoiceMessage, CanopyRequest, CanopyResponse};
