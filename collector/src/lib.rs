//! Collection engine for Reddit posts and comments.
//!
//! The engine walks communities x ranking methods x posts x comments
//! against any [`ListingProvider`](harvest_core::ListingProvider), retries
//! throttled calls through a [`RateLimitedCaller`] and streams
//! [`CollectionEvent`](harvest_core::CollectionEvent)s into an
//! [`EventSink`]. Collected records are joined into export rows by the
//! [`DatasetAssembler`] and written out with [`export`].

pub mod assembler;
pub mod engine;
pub mod export;
pub mod progress;
pub mod records;
pub mod retry;
pub mod selector;
pub mod sink;

pub use assembler::{AssemblerOptions, DatasetAssembler, JoinPolicy};
pub use engine::{
    CollectionEngine, CollectionRequest, CollectionSummary, DEFAULT_MAX_UNBOUNDED_POSTS,
};
pub use export::{default_file_name, to_csv_bytes, write_csv, COLUMNS};
pub use progress::ProgressTracker;
pub use records::{CommentRecordBuilder, PostRecordBuilder};
pub use retry::{Attempted, RateLimitedCaller, RetryConfig, RetryMetrics};
pub use selector::select;
pub use sink::{Accumulator, EventSink, StopSignal};
