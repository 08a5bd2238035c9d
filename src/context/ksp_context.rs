//! Factory for Krylov Subspace Methods (KSP).
//!
//! `KspContext` owns an operator, an optional preconditioner built for it, the solver kind and
//! the `SolverOptions`, and dispatches `solve(b, x)` to the matching solver. It is the
//! one-stop entry point when the method is picked at runtime, e.g. from a string.
//!
//! # Example
//! ```rust
//! use faer::Mat;
//! use krylov_replay::{KspContext, PcOptions, SolverOptions};
//!
//! let a = Mat::from_fn(2, 2, |i, j| if i == j { 4.0 } else { 1.0 });
//! let mut ksp = KspContext::new("cg".parse().unwrap(), a, SolverOptions::new().tol(1e-10))
//!     .with_pc(&PcOptions::new("diag"))
//!     .unwrap();
//! let mut x = vec![0.0; 2];
//! let stats = ksp.solve(&[5.0, 5.0], &mut x).unwrap();
//! assert!(stats.converged);
//! ```

use crate::config::options::{PcOptions, SolverOptions};
use crate::core::traits::{MatVec, Scalar};
use crate::error::KError;
use crate::preconditioner::{self, Preconditioner};
use crate::solver;
use crate::utils::convergence::SolveStats;
use std::fmt;
use std::str::FromStr;

/// Available Krylov methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverKind {
    /// Conjugate Gradient (SPD systems)
    Cg,
    /// BiConjugate Gradient Stabilized
    Bicgstab,
    /// Restarted GMRES
    Gmres,
}

impl FromStr for SolverKind {
    type Err = KError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cg" => Ok(SolverKind::Cg),
            "bicgstab" => Ok(SolverKind::Bicgstab),
            "gmres" => Ok(SolverKind::Gmres),
            other => Err(KError::UnsupportedSolver(other.to_string())),
        }
    }
}

impl fmt::Display for SolverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SolverKind::Cg => "cg",
            SolverKind::Bicgstab => "bicgstab",
            SolverKind::Gmres => "gmres",
        })
    }
}

/// Context and configuration for a Krylov subspace solve.
pub struct KspContext<A, T> {
    pub kind: SolverKind,
    /// The system operator
    pub a: A,
    pub pc: Option<Box<dyn Preconditioner<T>>>,
    pub options: SolverOptions<T>,
}

impl<A, T> KspContext<A, T>
where
    A: MatVec<T>,
    T: Scalar,
{
    pub fn new(kind: SolverKind, a: A, options: SolverOptions<T>) -> Self {
        Self { kind, a, pc: None, options }
    }

    /// Builds the preconditioner named by `opts` for the context's operator.
    pub fn with_pc(mut self, opts: &PcOptions) -> Result<Self, KError> {
        self.pc = Some(preconditioner::build(&self.a, opts.kind()?)?);
        Ok(self)
    }

    /// Solve `A x = b` with the configured method, warm-starting from `x`.
    pub fn solve(&mut self, b: &[T], x: &mut [T]) -> Result<SolveStats<T>, KError> {
        let pc = self.pc.as_deref();
        match self.kind {
            SolverKind::Cg => solver::cg(&self.a, b, x, pc, &self.options),
            SolverKind::Bicgstab => solver::bicgstab(&self.a, b, x, pc, &self.options),
            SolverKind::Gmres => solver::gmres(&self.a, b, x, pc, &self.options),
        }
    }
}
