//! Failure logging and pattern learning
//!
//! Normalized failure signatures, a durable SQLite store, pattern
//! counts, and suggestion lookup for similar future inputs.

mod logger;
mod signature;

pub use logger::{Failure, FailureLogger, FailureStats, FailureStoreError};
pub use signature::normalize_signature;
