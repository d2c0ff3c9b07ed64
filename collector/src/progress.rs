//! Progress accounting for a collection run.
//!
//! With a bounded listing the expected total is
//! `communities * methods * limit`. Listings often end early and whole
//! communities can be skipped, so progress is counted in slots: a finished
//! (community, method) pair always counts as its full share, which keeps the
//! reported fraction monotonic and lets it reach 1.0.

use harvest_core::{ListingLimit, ProgressEvent};

#[derive(Debug, Clone)]
pub struct ProgressTracker {
    per_slot: Option<u64>,
    total_slots: u64,
    completed_slots: u64,
    in_current_slot: u64,
    processed: u64,
    last_fraction: f64,
}

impl ProgressTracker {
    pub fn new(communities: usize, methods: usize, limit: ListingLimit) -> Self {
        let per_slot = match limit {
            ListingLimit::Bounded(n) if n > 0 => Some(n as u64),
            _ => None,
        };

        Self {
            per_slot,
            total_slots: (communities * methods) as u64,
            completed_slots: 0,
            in_current_slot: 0,
            processed: 0,
            last_fraction: 0.0,
        }
    }

    /// Total expected posts, when known.
    pub fn total_expected(&self) -> Option<u64> {
        self.per_slot.map(|per_slot| per_slot * self.total_slots)
    }

    /// Counts one processed post and returns the event to report.
    pub fn record_post(&mut self) -> ProgressEvent {
        self.processed += 1;
        self.in_current_slot += 1;
        self.current()
    }

    /// Marks the current (community, method) pair as done.
    pub fn finish_slot(&mut self) {
        self.finish_slots(1);
    }

    /// Marks `count` pairs as done, e.g. every method of a skipped community.
    pub fn finish_slots(&mut self, count: usize) {
        self.completed_slots = (self.completed_slots + count as u64).min(self.total_slots);
        self.in_current_slot = 0;
    }

    pub fn current(&mut self) -> ProgressEvent {
        match self.total_expected() {
            Some(total) if total > 0 => {
                let per_slot = self.per_slot.unwrap_or(0);
                let done = self.completed_slots * per_slot + self.in_current_slot.min(per_slot);
                let fraction = (done as f64 / total as f64).clamp(0.0, 1.0);
                self.last_fraction = self.last_fraction.max(fraction);
                ProgressEvent::Fraction(self.last_fraction)
            }
            _ => ProgressEvent::Count(self.processed),
        }
    }

    /// Final event of a run that was not cancelled.
    pub fn complete(&mut self) -> ProgressEvent {
        self.completed_slots = self.total_slots;
        self.in_current_slot = 0;
        self.current()
    }
}
