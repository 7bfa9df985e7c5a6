//! Generic cross-world progress trackers. A single tracker type,
//! parameterized by the partial-result type, replaces a separate
//! mutable global map per command kind.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

struct TrackerState<T> {
    requested: HashSet<String>,
    buffer: HashMap<String, T>,
}

impl<T> Default for TrackerState<T> {
    fn default() -> Self {
        Self {
            requested: HashSet::new(),
            buffer: HashMap::new(),
        }
    }
}

/// Accumulates partial results from N worlds for one logical cross-world
/// request (e.g. "pause these three worlds", "collect results from these
/// five worlds"). Reset at the start of a round, read and cleared once
/// every requested world has reported.
pub struct RequestTracker<T> {
    state: Mutex<TrackerState<T>>,
}

impl<T> Default for RequestTracker<T> {
    fn default() -> Self {
        Self {
            state: Mutex::new(TrackerState::default()),
        }
    }
}

impl<T: Clone> RequestTracker<T> {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, TrackerState<T>> {
        self.state.lock().expect("tracker mutex poisoned")
    }

    /// Start a new round: the set of world names expected to report.
    /// Clears any stale partial results from a previous round.
    pub fn set_requested(&self, names: impl IntoIterator<Item = String>) {
        let mut state = self.lock();
        state.requested = names.into_iter().collect();
        state.buffer.clear();
    }

    /// Clear accumulated partial results while keeping `requested` intact
    /// (used when the same world set is reused for a follow-up round).
    pub fn reset_completed(&self) {
        self.lock().buffer.clear();
    }

    /// Record (or overwrite) one world's partial result.
    pub fn add_or_update(&self, name: &str, value: T) {
        self.lock().buffer.insert(name.to_string(), value);
    }

    /// Number of worlds that have reported so far in this round.
    pub fn increment_and_get_completed(&self) -> usize {
        self.lock().buffer.len()
    }

    pub fn is_complete(&self) -> bool {
        let state = self.lock();
        !state.requested.is_empty() && state.buffer.len() >= state.requested.len()
    }

    pub fn get_buffer(&self) -> HashMap<String, T> {
        self.lock().buffer.clone()
    }

    pub fn remove(&self, name: &str) {
        self.lock().buffer.remove(name);
    }

    pub fn clear_all(&self) {
        let mut state = self.lock();
        state.requested.clear();
        state.buffer.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completes_only_once_every_requested_world_reports() {
        let tracker: RequestTracker<f64> = RequestTracker::new();
        tracker.set_requested(["A".to_string(), "B".to_string()]);
        assert!(!tracker.is_complete());
        tracker.add_or_update("A", 1.0);
        assert!(!tracker.is_complete());
        tracker.add_or_update("B", 2.0);
        assert!(tracker.is_complete());
        assert_eq!(tracker.get_buffer().len(), 2);
    }

    #[test]
    fn set_requested_clears_stale_buffer_from_a_prior_round() {
        let tracker: RequestTracker<()> = RequestTracker::new();
        tracker.set_requested(["A".to_string()]);
        tracker.add_or_update("A", ());
        assert!(tracker.is_complete());
        tracker.set_requested(["A".to_string(), "B".to_string()]);
        assert!(!tracker.is_complete());
    }

    #[test]
    fn remove_clears_a_single_world_slot() {
        let tracker: RequestTracker<i32> = RequestTracker::new();
        tracker.set_requested(["A".to_string()]);
        tracker.add_or_update("A", 42);
        tracker.remove("A");
        assert!(!tracker.is_complete());
    }
}
