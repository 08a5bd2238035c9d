//! Shared solver utilities.

pub mod convergence;
pub use convergence::{Convergence, ConvergenceResult, SolveStats, Status, Tracker};
