//! Batch-level progress aggregation: lock-free completion counters, the progress value
//! derived from them, and a thread-safe observable that delivers those values to subscribers.

mod counters;
mod no_op_tracker;
mod observable;
mod progress_update;
mod update_interfaces;

pub use counters::{BatchCounters, CountSnapshot};
pub use no_op_tracker::NoOpProgressListener;
pub use observable::{ProgressObservable, ProgressSubscription};
pub use progress_update::{ProgressUpdate, status_text};
pub use update_interfaces::ProgressListener;
