//! krylov-replay: matrix-free Krylov solvers with record-once/replay-many execution
//!
//! This crate provides preconditioned CG, BiCGSTAB and restarted GMRES over dense `faer`
//! matrices or closure-defined operators, Jacobi and identity preconditioners, and a driver
//! that runs each solver either eagerly or as a recorded kernel graph whose shape never depends
//! on runtime values.
//!
//! ```rust
//! use faer::Mat;
//! use krylov_replay::{cg, preconditioner, SolverOptions};
//!
//! let a = Mat::from_fn(3, 3, |i, j| if i == j { 4.0 } else { 1.0 });
//! let m = preconditioner(&a, "diag").unwrap();
//! let b = vec![6.0, 6.0, 6.0];
//! let mut x = vec![0.0; 3];
//! let stats = cg(&a, &b, &mut x, Some(&*m), &SolverOptions::new().tol(1e-10)).unwrap();
//! assert!(stats.converged);
//! ```

pub mod config;
pub mod context;
pub mod core;
pub mod driver;
pub mod error;
pub mod matrix;
pub mod preconditioner;
pub mod solver;
pub mod utils;

// Re-exports for convenience
pub use config::*;
pub use context::*;
pub use core::*;
pub use driver::{CapturedSolve, ExecutionMode, Monitor};
pub use error::*;
pub use matrix::*;
pub use preconditioner::*;
pub use solver::*;
pub use utils::*;
