use async_trait::async_trait;

use crate::{
    domain::{InboundMessage, MessageRef, SenderId},
    messaging::types::MessagingCapabilities,
    Result,
};

/// Cross-messenger port.
///
/// Telegram is the first implementation; anything that can reply to an
/// inbound message and name a contact fits behind the same interface.
#[async_trait]
pub trait MessagingPort: Send + Sync {
    fn capabilities(&self) -> MessagingCapabilities;

    /// Send `html` as a reply to `to`, in the conversation it came from.
    async fn reply_html(&self, to: &InboundMessage, html: &str) -> Result<MessageRef>;

    /// Human-readable name for a contact, if the messenger knows one.
    async fn contact_label(&self, sender: &SenderId) -> Result<Option<String>>;
}
