//! Destinations for collection events.
//!
//! Emitting never blocks the collection loop: sinks either store the event
//! in memory or hand it to an unbounded channel.

use harvest_core::{CollectionEvent, CommentRecord, PostRecord};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

pub trait EventSink {
    fn emit(&mut self, event: CollectionEvent);
}

impl EventSink for Vec<CollectionEvent> {
    fn emit(&mut self, event: CollectionEvent) {
        self.push(event);
    }
}

impl EventSink for UnboundedSender<CollectionEvent> {
    fn emit(&mut self, event: CollectionEvent) {
        // A closed receiver only means nobody is watching any more.
        if self.send(event).is_err() {
            debug!("Event receiver dropped, discarding event");
        }
    }
}

impl<S: EventSink + ?Sized> EventSink for &mut S {
    fn emit(&mut self, event: CollectionEvent) {
        (**self).emit(event);
    }
}

/// Fans every event out to both sinks, left first.
impl<A: EventSink, B: EventSink> EventSink for (A, B) {
    fn emit(&mut self, event: CollectionEvent) {
        self.0.emit(event.clone());
        self.1.emit(event);
    }
}

/// Caller-owned store of everything collected so far.
///
/// The engine appends to it through [`EventSink`] and never removes entries,
/// so one accumulator can be handed to several runs and keeps the rows of
/// interrupted ones. Only the owner clears it.
#[derive(Debug, Default, Clone)]
pub struct Accumulator {
    posts: Vec<PostRecord>,
    comments: Vec<CommentRecord>,
    warnings: Vec<String>,
}

impl Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn posts(&self) -> &[PostRecord] {
        &self.posts
    }

    pub fn comments(&self) -> &[CommentRecord] {
        &self.comments
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty() && self.comments.is_empty()
    }

    pub fn clear(&mut self) {
        self.posts.clear();
        self.comments.clear();
        self.warnings.clear();
    }
}

impl EventSink for Accumulator {
    fn emit(&mut self, event: CollectionEvent) {
        match event {
            CollectionEvent::PostCollected(post) => self.posts.push(post),
            CollectionEvent::CommentCollected(comment) => self.comments.push(comment),
            CollectionEvent::Warning(message) => self.warnings.push(message),
            CollectionEvent::ProgressUpdate(_) => {}
        }
    }
}

/// Cooperative stop flag checked by the engine between posts.
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    requested: Arc<AtomicBool>,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_stop(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    /// Lowers the flag so the same handle can drive a resumed run.
    pub fn reset(&self) {
        self.requested.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use harvest_core::ProgressEvent;

    #[test]
    fn test_accumulator_ignores_progress() {
        let mut accumulator = Accumulator::new();
        accumulator.emit(CollectionEvent::ProgressUpdate(ProgressEvent::Count(1)));
        accumulator.emit(CollectionEvent::Warning("skipped".to_string()));

        assert!(accumulator.is_empty());
        assert_eq!(accumulator.warnings(), ["skipped".to_string()]);

        accumulator.clear();
        assert!(accumulator.warnings().is_empty());
    }

    #[test]
    fn test_pair_sink_fans_out() {
        let mut left: Vec<CollectionEvent> = Vec::new();
        let mut right: Vec<CollectionEvent> = Vec::new();
        {
            let mut both = (&mut left, &mut right);
            both.emit(CollectionEvent::Warning("w".to_string()));
        }
        assert_eq!(left.len(), 1);
        assert_eq!(left, right);
    }

    #[tokio::test]
    async fn test_channel_sink_survives_closed_receiver() {
        let (mut tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        tx.emit(CollectionEvent::Warning("first".to_string()));
        assert_eq!(
            rx.recv().await,
            Some(CollectionEvent::Warning("first".to_string()))
        );

        drop(rx);
        tx.emit(CollectionEvent::Warning("nobody listening".to_string()));
    }

    #[test]
    fn test_stop_signal_is_shared_between_clones() {
        let signal = StopSignal::new();
        let handle = signal.clone();
        assert!(!signal.is_stop_requested());

        handle.request_stop();
        assert!(signal.is_stop_requested());

        signal.reset();
        assert!(!handle.is_stop_requested());
    }
}
