//! Auto-responder: admission gate + welcome template + messenger.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex as StdMutex, MutexGuard, PoisonError},
};

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, warn};

use crate::{
    audit::{AuditEvent, AuditLogger},
    config::Config,
    domain::{InboundMessage, SenderId},
    gate::{AdmissionGate, Decision, DropReason},
    messaging::{port::MessagingPort, types::FALLBACK_CONTACT_LABEL},
    template::{Template, TemplateValues},
    Result,
};

/// What happened to one inbound message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Dropped(DropReason),
    Replied,
    ReplyFailed(String),
}

/// One async lock per sender.
///
/// An entry lives only while some task holds or waits on it, so the map
/// tracks in-flight senders rather than every contact ever seen.
#[derive(Default)]
pub struct SenderLocks {
    inner: StdMutex<HashMap<SenderId, Arc<Mutex<()>>>>,
}

/// Held while a sender's message is being handled. Releases the lock and
/// evicts the map entry if no other task is waiting on it.
pub struct SenderGuard<'a> {
    locks: &'a SenderLocks,
    sender: SenderId,
    guard: Option<OwnedMutexGuard<()>>,
}

impl SenderLocks {
    pub async fn lock_sender(&self, sender: &SenderId) -> SenderGuard<'_> {
        let lock = {
            let mut map = self.map();
            map.entry(sender.clone())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        SenderGuard {
            locks: self,
            sender: sender.clone(),
            guard: Some(lock.lock_owned().await),
        }
    }

    /// Senders with a task currently holding or awaiting their lock.
    pub fn len(&self) -> usize {
        self.map().len()
    }

    pub fn is_empty(&self) -> bool {
        self.map().is_empty()
    }

    // Never held across an await.
    fn map(&self) -> MutexGuard<'_, HashMap<SenderId, Arc<Mutex<()>>>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for SenderGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        let mut map = self.locks.map();
        // Waiters clone the Arc under the map lock, so a count of one means
        // only the map still references it.
        if map
            .get(&self.sender)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            map.remove(&self.sender);
        }
    }
}

pub struct AutoResponder {
    gate: Mutex<AdmissionGate>,
    template: Template,
    values: TemplateValues,
    messenger: Arc<dyn MessagingPort>,
    locks: SenderLocks,
    audit: Option<AuditLogger>,
    cooldown_on_send_failure: bool,
}

impl AutoResponder {
    pub fn new(
        gate: AdmissionGate,
        template: Template,
        values: TemplateValues,
        messenger: Arc<dyn MessagingPort>,
    ) -> Self {
        Self {
            gate: Mutex::new(gate),
            template,
            values,
            messenger,
            locks: SenderLocks::default(),
            audit: None,
            cooldown_on_send_failure: false,
        }
    }

    pub fn from_config(cfg: &Config, messenger: Arc<dyn MessagingPort>) -> Result<Self> {
        let gate = AdmissionGate::new(cfg.gate())?;
        let audit = cfg
            .audit_log_path
            .as_ref()
            .map(|p| AuditLogger::new(p.clone(), cfg.audit_log_json));

        Ok(Self::new(
            gate,
            cfg.template.clone(),
            cfg.template_values.clone(),
            messenger,
        )
        .with_audit(audit)
        .with_cooldown_on_send_failure(cfg.cooldown_on_send_failure))
    }

    pub fn with_audit(mut self, audit: Option<AuditLogger>) -> Self {
        self.audit = audit;
        self
    }

    /// Start the cooldown even when the reply could not be delivered.
    pub fn with_cooldown_on_send_failure(mut self, enabled: bool) -> Self {
        self.cooldown_on_send_failure = enabled;
        self
    }

    pub fn restaurant_name(&self) -> &str {
        &self.values.restaurant_name
    }

    pub async fn handle(&self, msg: &InboundMessage) -> Result<Outcome> {
        self.handle_at(msg, Utc::now()).await
    }

    pub async fn handle_at(&self, msg: &InboundMessage, now: DateTime<Utc>) -> Result<Outcome> {
        // Held across evaluate, dispatch and record so one sender can never
        // race past its own cooldown check.
        let _guard = self.locks.lock_sender(&msg.sender).await;

        let decision = self.gate.lock().await.evaluate_at(msg, now);

        let reason = match decision {
            Decision::Drop(reason) => reason,
            Decision::Admit => return Ok(self.reply(msg, now).await),
        };

        match reason {
            // Echoes and group chatter are routine; keep them out of the journal.
            DropReason::SelfMessage | DropReason::GroupConversation => {
                debug!(sender = %msg.sender, message_id = %msg.id, %reason, "dropped");
            }
            DropReason::Duplicate => {
                debug!(sender = %msg.sender, message_id = %msg.id, "duplicate delivery dropped");
                self.write_audit(AuditEvent::dropped(msg, FALLBACK_CONTACT_LABEL, reason));
            }
            DropReason::CooldownActive { remaining_hours } => {
                let contact = self.contact_label(&msg.sender).await;
                info!(
                    sender = %msg.sender,
                    %contact,
                    remaining_hours,
                    "⏰ contact in cooldown, {remaining_hours}h until next automatic reply"
                );
                self.write_audit(AuditEvent::dropped(msg, &contact, reason));
            }
        }

        Ok(Outcome::Dropped(reason))
    }

    async fn reply(&self, msg: &InboundMessage, now: DateTime<Utc>) -> Outcome {
        let contact = self.contact_label(&msg.sender).await;
        info!(sender = %msg.sender, %contact, body = %msg.body, "📩 message received");

        let html = self.template.render(&self.values);
        match self.messenger.reply_html(msg, &html).await {
            Ok(_) => {
                self.gate.lock().await.record_reply(msg.sender.clone(), now);
                info!(sender = %msg.sender, %contact, "✅ welcome sent, cooldown started");
                self.write_audit(AuditEvent::reply_sent(msg, &contact));
                Outcome::Replied
            }
            Err(e) => {
                let err = e.to_string();
                if self.cooldown_on_send_failure {
                    self.gate.lock().await.record_reply(msg.sender.clone(), now);
                }
                warn!(
                    sender = %msg.sender,
                    %contact,
                    error = %err,
                    cooldown_started = self.cooldown_on_send_failure,
                    "❌ failed to send welcome"
                );
                self.write_audit(AuditEvent::reply_failed(msg, &contact, &err));
                Outcome::ReplyFailed(err)
            }
        }
    }

    async fn contact_label(&self, sender: &SenderId) -> String {
        match self.messenger.contact_label(sender).await {
            Ok(Some(label)) if !label.trim().is_empty() => label,
            Ok(_) => FALLBACK_CONTACT_LABEL.to_string(),
            Err(e) => {
                debug!(%sender, error = %e, "contact lookup failed");
                FALLBACK_CONTACT_LABEL.to_string()
            }
        }
    }

    fn write_audit(&self, event: AuditEvent) {
        let Some(audit) = &self.audit else {
            return;
        };
        if let Err(e) = audit.write(event) {
            warn!(path = %audit.path().display(), error = %e, "audit write failed");
        }
    }
}
