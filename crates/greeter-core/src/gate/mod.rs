//! Admission gate: decides whether an inbound message gets an automated reply.
//!
//! Rules run in a fixed order and the first match wins:
//! self-sent, group conversation, duplicate delivery, active cooldown.
//! Everything else is admitted.

use std::{fmt, time::Duration};

use chrono::{DateTime, TimeDelta, Utc};

use crate::{
    domain::{InboundMessage, SenderId},
    errors::Error,
    Result,
};

pub mod cooldown;
pub mod dedup;

use cooldown::{ceil_hours, CooldownLedger};
use dedup::DedupSet;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DropReason {
    SelfMessage,
    GroupConversation,
    Duplicate,
    CooldownActive { remaining_hours: u64 },
}

impl DropReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DropReason::SelfMessage => "self_message",
            DropReason::GroupConversation => "group_conversation",
            DropReason::Duplicate => "duplicate",
            DropReason::CooldownActive { .. } => "cooldown_active",
        }
    }
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decision {
    Drop(DropReason),
    Admit,
}

#[derive(Clone, Copy, Debug)]
pub struct GateConfig {
    pub cooldown: Duration,
    pub dedup_capacity: u64,
    pub dedup_ttl: Duration,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            cooldown: Duration::from_secs(12 * 60 * 60),
            dedup_capacity: 10_000,
            dedup_ttl: Duration::from_secs(24 * 60 * 60),
        }
    }
}

/// Owns the processed-message set and the per-sender cooldown ledger.
///
/// Not internally synchronized for the cooldown half: callers that deliver
/// messages concurrently must serialize `evaluate` and `record_reply` per
/// sender (see `responder::SenderLocks`).
pub struct AdmissionGate {
    processed: DedupSet,
    cooldowns: CooldownLedger,
}

impl AdmissionGate {
    pub fn new(cfg: GateConfig) -> Result<Self> {
        if cfg.cooldown.is_zero() {
            return Err(Error::Config("cooldown window must be positive".to_string()));
        }
        let window = TimeDelta::from_std(cfg.cooldown)
            .map_err(|e| Error::Config(format!("cooldown window out of range: {e}")))?;

        Ok(Self {
            processed: DedupSet::new(cfg.dedup_capacity, cfg.dedup_ttl),
            cooldowns: CooldownLedger::new(window),
        })
    }

    pub fn evaluate(&mut self, msg: &InboundMessage) -> Decision {
        self.evaluate_at(msg, Utc::now())
    }

    pub fn evaluate_at(&mut self, msg: &InboundMessage, now: DateTime<Utc>) -> Decision {
        if msg.from_self {
            return Decision::Drop(DropReason::SelfMessage);
        }
        if msg.is_group {
            return Decision::Drop(DropReason::GroupConversation);
        }

        // Marked before the cooldown check so a re-delivery is never admitted twice.
        if !self.processed.first_sighting(&msg.id) {
            return Decision::Drop(DropReason::Duplicate);
        }

        if let Some(remaining) = self.cooldowns.remaining(&msg.sender, now) {
            return Decision::Drop(DropReason::CooldownActive {
                remaining_hours: ceil_hours(remaining),
            });
        }

        Decision::Admit
    }

    pub fn record_reply(&mut self, sender: SenderId, at: DateTime<Utc>) {
        self.cooldowns.record(sender, at);
    }

    pub fn cooldown_window(&self) -> TimeDelta {
        self.cooldowns.window()
    }

    pub fn tracked_senders(&self) -> usize {
        self.cooldowns.len()
    }
}
