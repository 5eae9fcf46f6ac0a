//! Dedup ledger of asset identifiers already acted upon.
//!
//! Entries are never evicted; they live for the lifetime of the process.

use dashmap::DashSet;

/// Concurrent set of seen identifiers.
#[derive(Debug, Default)]
pub struct DedupLedger {
    seen: DashSet<String>,
}

impl DedupLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_seen(&self, id: &str) -> bool {
        self.seen.contains(id)
    }

    pub fn mark_seen(&self, id: &str) {
        self.seen.insert(id.to_string());
    }

    /// Atomically mark `id` as seen.
    ///
    /// Returns `true` only for the first caller; every later or concurrent
    /// caller for the same identifier gets `false`.
    pub fn check_and_mark(&self, id: &str) -> bool {
        self.seen.insert(id.to_string())
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_mark_and_check() {
        let ledger = DedupLedger::new();
        assert!(!ledger.has_seen("m1"));

        ledger.mark_seen("m1");
        assert!(ledger.has_seen("m1"));
        assert!(!ledger.check_and_mark("m1"));

        assert!(ledger.check_and_mark("m2"));
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn test_concurrent_check_and_mark_has_single_winner() {
        let ledger = DedupLedger::new();
        let winners = AtomicUsize::new(0);

        std::thread::scope(|s| {
            for _ in 0..16 {
                s.spawn(|| {
                    if ledger.check_and_mark("contested") {
                        winners.fetch_add(1, Ordering::SeqCst);
                    }
                });
            }
        });

        assert_eq!(winners.load(Ordering::SeqCst), 1);
        assert_eq!(ledger.len(), 1);
    }
}
