//! Telegram update handlers.
//!
//! Every message is mapped into a core `InboundMessage` and handed to the
//! responder in its own task, so an error or panic while handling one message
//! is logged and never takes the dispatcher down.

use std::{future::Future, sync::Arc};

use greeter_core::domain::MessageKey;
use teloxide::{prelude::*, types::Message};
use tracing::{debug, error};

use crate::router::AppState;

pub mod inbound;

pub async fn handle_message(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let inbound = inbound::inbound_from_message(&msg, state.me);
    let message_id = inbound.id.clone();

    let responder = state.responder.clone();
    let outcome = run_isolated(&message_id, async move { responder.handle(&inbound).await }).await;
    if let Some(outcome) = outcome {
        debug!(message_id = %message_id, ?outcome, "message handled");
    }

    Ok(())
}

/// Run `fut` on its own task. Errors and panics are logged and turned into
/// `None`.
pub async fn run_isolated<T, F>(message_id: &MessageKey, fut: F) -> Option<T>
where
    T: Send + 'static,
    F: Future<Output = greeter_core::Result<T>> + Send + 'static,
{
    match tokio::spawn(fut).await {
        Ok(Ok(value)) => Some(value),
        Ok(Err(e)) => {
            error!(message_id = %message_id, error = %e, "❌ failed to process message");
            None
        }
        Err(e) if e.is_panic() => {
            error!(message_id = %message_id, "❌ message handler panicked");
            None
        }
        Err(e) => {
            error!(message_id = %message_id, error = %e, "❌ message handler aborted");
            None
        }
    }
}
