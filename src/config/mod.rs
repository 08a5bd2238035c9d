//! Solver and preconditioner configuration.

pub mod options;

pub use options::{PcOptions, SolverOptions};
