//! Action journal and rollback
//!
//! Append-only transaction log of completed mutating steps, with
//! declarative inverse hints, and the reverse-order rollback engine
//! built on top of it.

mod rollback;
mod tracker;

pub use rollback::{RollbackEngine, RollbackError, RollbackReport};
pub use tracker::{
    ActionRecord, ActionTracker, JournalError, TransactionStatus, TransactionSummary,
};
