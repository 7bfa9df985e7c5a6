//! File sinks: the trajectory CSV (append-only, flush-per-line) and the
//! summary TXT (truncate-on-open, write-once). Spec.md §4.A.

pub mod summary;
pub mod trajectory;

pub use summary::SummarySink;
pub use trajectory::{TrajectorySchema, TrajectorySink};
