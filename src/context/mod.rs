//! Context types for configuring and running solves.
//!
//! - [`ksp_context`]: `KspContext` and `SolverKind`, runtime selection of a Krylov method.
//! - [`pc_context`]: `PcKind`, the preconditioner kinds the builder understands.
//!
//! # References
//! - Saad, Y. (2003). Iterative Methods for Sparse Linear Systems. SIAM.
//! - PETSc documentation: https://petsc.org/release/docs/manualpages/KSP/

pub mod ksp_context;
pub mod pc_context;

pub use ksp_context::{KspContext, SolverKind};
pub use pc_context::PcKind;
