//! Slack messaging: inbound event model and outbound reply adapter.

pub mod events;
pub mod slack;
pub mod traits;

pub use events::{AppMentionEvent, MessageEvent, SlackEnvelope, SlackEvent};
pub use slack::SlackAdapter;
pub use traits::{Messaging, MessagingDyn, OutboundReply};
