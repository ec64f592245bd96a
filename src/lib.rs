//! Parallel filesystem traversal engine: an entry classifier, an NT
//! reparse-point decoder, progress accounting, a bounded-worker-pool
//! traversal scheduler with pre/post-order scheduling, and the operation
//! wrapper that ties them together — plus four thin consumers (copy,
//! delete, diff, remote upload) built entirely on the public [`scheduler`]
//! API.

pub mod classify;
pub mod cli;
pub mod consumers;
pub mod error;
pub mod progress;
pub mod reparse;
pub mod scheduler;

pub use classify::{classify, EntryKind};
pub use error::{Error, Result};
pub use progress::Stats;
pub use scheduler::{traverse, Order, TraverseOptions};
