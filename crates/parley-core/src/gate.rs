//! Admission gate - per-conversation minimum-interval throttle.
//!
//! A cheap anti-flood check that runs before anything touches the backend.
//! Rejection is a normal outcome, not a fault: the caller sends a short
//! "please wait" notice and stops.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::memory::ConversationKey;

/// Per-key minimum-interval throttle.
///
/// The gate keys on the full conversation key, so one flooded thread does
/// not starve the same user's other conversations. Accepted timestamps are
/// kept forever; like the session store, the key space is unbounded.
pub struct AdmissionGate {
    cooldown: Duration,
    last_accepted: Mutex<HashMap<ConversationKey, Instant>>,
}

impl AdmissionGate {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            last_accepted: Mutex::new(HashMap::new()),
        }
    }

    /// Accept or reject a request arriving at `now`.
    ///
    /// The read-modify-write runs under one lock, so two concurrent calls
    /// for the same key closer than the cooldown can never both pass. State
    /// is only updated on acceptance.
    pub fn try_acquire(&self, key: &ConversationKey, now: Instant) -> bool {
        let mut last_accepted = self.last_accepted.lock();
        match last_accepted.get(key) {
            Some(last) if now.saturating_duration_since(*last) < self.cooldown => false,
            _ => {
                last_accepted.insert(key.clone(), now);
                true
            }
        }
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn key() -> ConversationKey {
        ConversationKey::new("chat-1", None, "user-1")
    }

    #[test]
    fn test_first_request_accepted() {
        let gate = AdmissionGate::new(Duration::from_secs(3));
        assert!(gate.try_acquire(&key(), Instant::now()));
    }

    #[test]
    fn test_second_request_within_cooldown_rejected() {
        let gate = AdmissionGate::new(Duration::from_secs(3));
        let start = Instant::now();
        assert!(gate.try_acquire(&key(), start));
        assert!(!gate.try_acquire(&key(), start + Duration::from_secs(1)));
    }

    #[test]
    fn test_request_after_cooldown_accepted() {
        let gate = AdmissionGate::new(Duration::from_secs(3));
        let start = Instant::now();
        assert!(gate.try_acquire(&key(), start));
        assert!(gate.try_acquire(&key(), start + Duration::from_secs(3)));
    }

    #[test]
    fn test_rejection_does_not_extend_cooldown() {
        let gate = AdmissionGate::new(Duration::from_secs(3));
        let start = Instant::now();
        assert!(gate.try_acquire(&key(), start));
        // A rejected burst must not push the window forward
        assert!(!gate.try_acquire(&key(), start + Duration::from_secs(2)));
        assert!(gate.try_acquire(&key(), start + Duration::from_secs(3)));
    }

    #[test]
    fn test_keys_are_independent() {
        let gate = AdmissionGate::new(Duration::from_secs(3));
        let now = Instant::now();
        let other = ConversationKey::new("chat-2", None, "user-1");
        assert!(gate.try_acquire(&key(), now));
        assert!(gate.try_acquire(&other, now));
    }

    #[test]
    fn test_same_user_different_threads_independent() {
        let gate = AdmissionGate::new(Duration::from_secs(3));
        let now = Instant::now();
        let thread_a = ConversationKey::new("chat-1", Some(1), "user-1");
        let thread_b = ConversationKey::new("chat-1", Some(2), "user-1");
        assert!(gate.try_acquire(&thread_a, now));
        assert!(gate.try_acquire(&thread_b, now));
    }

    #[test]
    fn test_concurrent_calls_admit_exactly_one() {
        let gate = Arc::new(AdmissionGate::new(Duration::from_secs(60)));
        let now = Instant::now();

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let gate = gate.clone();
                std::thread::spawn(move || gate.try_acquire(&key(), now))
            })
            .collect();

        let admitted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|accepted| *accepted)
            .count();
        assert_eq!(admitted, 1);
    }
}
