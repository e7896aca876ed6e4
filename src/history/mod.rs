//! Attempt history of a run.
//!
//! - store: the IterationRecord with its append / attach_evaluation contract
//! - selection: choosing the final artifact at termination

mod selection;
mod store;

pub use selection::select_best;
pub use store::IterationRecord;
