//! Messaging trait and dynamic dispatch companion.

use crate::error::Result;
use std::future::Future;
use std::pin::Pin;

/// A text reply addressed to a Slack conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundReply {
    pub channel: String,
    /// Parent message ts when replying inside a thread.
    pub thread_ts: Option<String>,
    pub text: String,
}

/// Static trait for messaging adapters.
/// Use this for type-safe implementations.
pub trait Messaging: Send + Sync + 'static {
    /// Unique name for this adapter.
    fn name(&self) -> &str;

    /// Post a reply to a conversation.
    fn post_reply(&self, reply: OutboundReply) -> impl Future<Output = Result<()>> + Send;
}

/// Dynamic trait for runtime polymorphism.
/// Use this when you need `Arc<dyn MessagingDyn>` in shared state.
pub trait MessagingDyn: Send + Sync + 'static {
    fn name(&self) -> &str;

    fn post_reply<'a>(
        &'a self,
        reply: OutboundReply,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;
}

/// Blanket implementation: any type implementing Messaging automatically implements MessagingDyn.
impl<T: Messaging> MessagingDyn for T {
    fn name(&self) -> &str {
        Messaging::name(self)
    }

    fn post_reply<'a>(
        &'a self,
        reply: OutboundReply,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(Messaging::post_reply(self, reply))
    }
}
