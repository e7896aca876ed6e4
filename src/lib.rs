//! Refinr - iterative artifact refinement
//!
//! Refinr improves a text artifact toward a goal by looping through
//! strategy, generation, evaluation and reflection until the scores clear a
//! threshold or the iteration cap is reached. All text production is
//! delegated to a pluggable Reasoner.

pub mod config;
pub mod convergence;
pub mod domain;
pub mod error;
pub mod history;
pub mod id;
pub mod reasoner;
pub mod runner;

pub use error::{RefinrError, Result};
