//! Convergence logic - score aggregation and the routing decision.
//!
//! Everything in this module is pure: no I/O, no reasoner calls.

pub mod aggregate;
pub mod router;

pub use aggregate::{average, total};
pub use router::{ConvergencePolicy, DEFAULT_MAX_ITERATIONS, DEFAULT_SCORE_THRESHOLD, FinishReason, Verdict, route};
