use std::collections::HashMap;

use chrono::{DateTime, TimeDelta, Utc};

use crate::domain::SenderId;

/// Ledger size above which expired entries are swept on insert.
const PRUNE_THRESHOLD: usize = 1024;

const HOUR_MS: u64 = 60 * 60 * 1000;

/// Last automated reply per sender.
#[derive(Clone, Debug)]
pub struct CooldownLedger {
    window: TimeDelta,
    last_reply: HashMap<SenderId, DateTime<Utc>>,
}

impl CooldownLedger {
    pub fn new(window: TimeDelta) -> Self {
        Self {
            window,
            last_reply: HashMap::new(),
        }
    }

    pub fn window(&self) -> TimeDelta {
        self.window
    }

    /// Time left before `sender` may be replied to again, if any.
    ///
    /// A reply timestamp in the future (clock skew) counts as a fresh reply.
    pub fn remaining(&self, sender: &SenderId, now: DateTime<Utc>) -> Option<TimeDelta> {
        let last = *self.last_reply.get(sender)?;
        let elapsed = (now - last).max(TimeDelta::zero());
        if elapsed >= self.window {
            return None;
        }
        Some(self.window - elapsed)
    }

    pub fn record(&mut self, sender: SenderId, at: DateTime<Utc>) {
        if self.last_reply.len() >= PRUNE_THRESHOLD {
            self.prune(at);
        }
        self.last_reply.insert(sender, at);
    }

    /// Drop entries whose window has fully elapsed.
    pub fn prune(&mut self, now: DateTime<Utc>) {
        let window = self.window;
        self.last_reply.retain(|_, last| now - *last < window);
    }

    pub fn len(&self) -> usize {
        self.last_reply.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_reply.is_empty()
    }
}

/// Round a remaining wait up to whole hours (1 ms left still reports 1 h).
pub fn ceil_hours(d: TimeDelta) -> u64 {
    let ms = d.num_milliseconds().max(0).unsigned_abs();
    ms.div_ceil(HOUR_MS)
}
