//! canopybot: a Slack bot that answers mentions with the Canopy question-answering backend.

pub mod api;
pub mod canopy;
pub mod config;
pub mod conversation;
pub mod error;
pub mod logging;
pub mod messaging;

pub use error::{Error, Result};
