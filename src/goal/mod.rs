//! Goal tracking for iterative mode
//!
//! Drives the translate → execute → observe → reflect loop and decides
//! when a goal is achieved, stuck, or out of iterations.

mod reflection;
mod tracker;

pub use reflection::Reflection;
pub use tracker::{GoalError, GoalOutcome, GoalTermination, GoalTracker};
