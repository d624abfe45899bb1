use std::time::Duration;

use moka::sync::Cache;

use crate::domain::MessageKey;

/// Bounded set of message ids already handled.
///
/// Entries expire after `ttl` and the set never holds more than roughly
/// `max_capacity` ids, so memory stays flat on long-running deployments.
#[derive(Clone)]
pub struct DedupSet {
    seen: Cache<MessageKey, ()>,
}

impl DedupSet {
    pub fn new(max_capacity: u64, ttl: Duration) -> Self {
        Self {
            seen: Cache::builder()
                .max_capacity(max_capacity)
                .time_to_live(ttl)
                .build(),
        }
    }

    /// Insert `id`, returning `true` only if it was not present.
    ///
    /// Check and insert happen as one step.
    pub fn first_sighting(&self, id: &MessageKey) -> bool {
        self.seen.entry_by_ref(id).or_insert(()).is_fresh()
    }

    pub fn contains(&self, id: &MessageKey) -> bool {
        self.seen.contains_key(id)
    }

    #[must_use]
    pub fn entry_count(&self) -> u64 {
        self.seen.run_pending_tasks();
        self.seen.entry_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> MessageKey {
        MessageKey(s.to_string())
    }

    #[test]
    fn second_sighting_is_rejected() {
        let set = DedupSet::new(100, Duration::from_secs(60));
        assert!(set.first_sighting(&key("1:1")));
        assert!(!set.first_sighting(&key("1:1")));
        assert!(set.contains(&key("1:1")));
    }

    #[test]
    fn distinct_ids_are_independent() {
        let set = DedupSet::new(100, Duration::from_secs(60));
        assert!(set.first_sighting(&key("1:1")));
        assert!(set.first_sighting(&key("1:2")));
        assert!(set.first_sighting(&key("2:1")));
        assert_eq!(set.entry_count(), 3);
    }

    #[test]
    fn entries_expire_after_ttl() {
        let set = DedupSet::new(100, Duration::from_millis(50));
        assert!(set.first_sighting(&key("1:1")));
        std::thread::sleep(Duration::from_millis(120));
        assert!(!set.contains(&key("1:1")));
    }

    #[test]
    fn set_stays_within_capacity() {
        let set = DedupSet::new(10, Duration::from_secs(60));
        for i in 0..200 {
            set.first_sighting(&key(&format!("1:{i}")));
        }
        assert!(set.entry_count() <= 10);
    }
}
