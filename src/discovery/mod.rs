//! Target discovery
//!
//! Builds the deduplicated target lists the coordinator works through:
//! - [`hltv`]: walks the monthly news archive
//! - [`cybersport`]: drives a tag listing in the browser
//! - [`target_list`]: CSV cache of discovered lists
//!
//! Concurrent discovery tasks share one [`SeenSet`], so every target is
//! emitted once no matter which task finds it first.

pub mod cybersport;
pub mod hltv;
pub mod target_list;

pub use cybersport::{cybersport_targets_in, discover_cybersport, CybersportDiscoveryOptions};
pub use hltv::{archive_url, discover_hltv, hltv_targets_in, HltvDiscoveryOptions};
pub use target_list::{read_target_list, target_list_path, write_target_list};

use crate::crawler::CrawlTarget;
use dashmap::DashSet;

/// Concurrent set of identity keys already emitted
#[derive(Debug, Default)]
pub struct SeenSet {
    keys: DashSet<String>,
}

impl SeenSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `key`; returns true only for the first caller
    pub fn insert(&self, key: &str) -> bool {
        self.keys.insert(key.to_string())
    }

    /// Inserts the target's identity key; returns true if it was new
    pub fn insert_target(&self, target: &CrawlTarget) -> bool {
        self.keys.insert(target.identity_key())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Filters `targets` through `seen`, keeping the first occurrence of each
pub fn dedup_targets(targets: Vec<CrawlTarget>, seen: &SeenSet) -> Vec<CrawlTarget> {
    targets
        .into_iter()
        .filter(|target| seen.insert_target(target))
        .collect()
}

/// Decides when a growing listing has stopped producing targets
#[derive(Debug, Clone)]
pub struct IdleStop {
    max_idle: u32,
    hard_cap: usize,
    idle_rounds: u32,
}

impl IdleStop {
    pub fn new(max_idle: u32, hard_cap: usize) -> Self {
        Self {
            max_idle: max_idle.max(1),
            hard_cap,
            idle_rounds: 0,
        }
    }

    /// Records a round that added `new_targets`, with `total` collected so far
    ///
    /// Returns true when collection should stop.
    pub fn observe(&mut self, new_targets: usize, total: usize) -> bool {
        if new_targets == 0 {
            self.idle_rounds += 1;
        } else {
            self.idle_rounds = 0;
        }
        self.idle_rounds >= self.max_idle || total >= self.hard_cap
    }

    pub fn idle_rounds(&self) -> u32 {
        self.idle_rounds
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_dedup_keeps_first_occurrence() {
        let seen = SeenSet::new();
        let targets = vec![
            CrawlTarget::hltv(1, "a"),
            CrawlTarget::hltv(1, "a"),
            CrawlTarget::hltv(2, "b"),
        ];

        let deduped = dedup_targets(targets, &seen);
        assert_eq!(
            deduped,
            vec![CrawlTarget::hltv(1, "a"), CrawlTarget::hltv(2, "b")]
        );
        assert_eq!(seen.len(), 2);
    }

    #[test]
    fn test_same_id_different_slug_are_distinct() {
        let seen = SeenSet::new();
        assert!(seen.insert_target(&CrawlTarget::hltv(1, "a")));
        assert!(seen.insert_target(&CrawlTarget::hltv(1, "b")));
        assert!(!seen.insert_target(&CrawlTarget::hltv(1, "a")));
    }

    #[test]
    fn test_concurrent_inserts_admit_each_key_once() {
        let seen = Arc::new(SeenSet::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let seen = Arc::clone(&seen);
                std::thread::spawn(move || {
                    (0..500)
                        .filter(|n| seen.insert(&format!("key-{}", n)))
                        .count()
                })
            })
            .collect();

        let admitted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(admitted, 500);
        assert_eq!(seen.len(), 500);
    }

    #[test]
    fn test_idle_stop_after_consecutive_empty_rounds() {
        let mut stop = IdleStop::new(3, 1000);
        assert!(!stop.observe(5, 5));
        assert!(!stop.observe(0, 5));
        assert!(!stop.observe(0, 5));
        assert!(!stop.observe(2, 7));
        assert_eq!(stop.idle_rounds(), 0);
        assert!(!stop.observe(0, 7));
        assert!(!stop.observe(0, 7));
        assert!(stop.observe(0, 7));
    }

    #[test]
    fn test_idle_stop_hard_cap() {
        let mut stop = IdleStop::new(6, 10);
        assert!(!stop.observe(9, 9));
        assert!(stop.observe(1, 10));
    }
}
