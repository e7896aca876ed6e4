//! Runner module - drives refinement runs.
//!
//! This module provides:
//! - LoopController, the stage machine behind every run
//! - CancelSignal for stopping a run between stages

mod cancel;
mod controller;

pub use cancel::{CancelFlag, CancelSignal, NoOpCancelSignal};
pub use controller::{ControllerConfig, LoopController, Stage};
