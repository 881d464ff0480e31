//! Intent IR — the contract between translation and execution
//!
//! The LLM produces an `Intent`; everything downstream (safety policy,
//! executor, journal) consumes it. The schema is deliberately small and
//! rejects unknown keys on the wire.

mod safety;
mod schema;

pub use safety::{check_step, PolicyViolation};
pub use schema::{Intent, Step, ValidationError, RISK_CREATE, RISK_DESTROY, RISK_OVERWRITE, RISK_READ};
