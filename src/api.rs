//! HTTP surface: Slack Events API webhook and liveness endpoint.

mod events;
mod server;
pub mod signature;
mod state;

pub use server::{build_router, start_http_server};
pub use state::ApiState;
