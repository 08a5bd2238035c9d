//! API options for solvers and preconditioners.
//!
//! `SolverOptions` carries everything a solve call needs besides the system itself: tolerances,
//! the iteration budget, the GMRES restart length, the preconditioning side and how the solve is
//! dispatched. `PcOptions` names the preconditioner to build.

use crate::core::traits::Scalar;
use crate::driver::ExecutionMode;
use crate::error::KError;
use crate::preconditioner::{PcKind, PcSide};
use crate::solver::gmres::DEFAULT_RESTART;
use crate::utils::convergence::Convergence;

/// Solver parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct SolverOptions<T> {
    /// Tolerance relative to ‖b‖; defaults to `atol` when unset.
    pub tol: Option<T>,
    /// Absolute tolerance; defaults to `tol` when unset.
    pub atol: Option<T>,
    /// Iteration budget, 0 for the system dimension. GMRES counts Arnoldi steps.
    pub maxiter: usize,
    /// GMRES restart length, clamped to `[1, n]`.
    pub restart: usize,
    pub side: PcSide,
    pub execution: ExecutionMode,
    /// Captured mode only: record this many iterations per graph and replay the graph until
    /// the solve finishes. 0 records the whole budget at once.
    pub check_every: usize,
}

impl<T> Default for SolverOptions<T> {
    fn default() -> Self {
        Self {
            tol: None,
            atol: None,
            maxiter: 0,
            restart: DEFAULT_RESTART,
            side: PcSide::Right,
            execution: ExecutionMode::Captured,
            check_every: 0,
        }
    }
}

impl<T: Scalar> SolverOptions<T> {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn tol(mut self, tol: T) -> Self {
        self.tol = Some(tol);
        self
    }
    pub fn atol(mut self, atol: T) -> Self {
        self.atol = Some(atol);
        self
    }
    pub fn maxiter(mut self, maxiter: usize) -> Self {
        self.maxiter = maxiter;
        self
    }
    pub fn restart(mut self, restart: usize) -> Self {
        self.restart = restart;
        self
    }
    pub fn side(mut self, side: PcSide) -> Self {
        self.side = side;
        self
    }
    pub fn left_preconditioned(self, is_left: bool) -> Self {
        self.side(PcSide::from_left_flag(is_left))
    }
    pub fn execution(mut self, execution: ExecutionMode) -> Self {
        self.execution = execution;
        self
    }
    pub fn captured(self, captured: bool) -> Self {
        self.execution(ExecutionMode::from_captured_flag(captured))
    }
    pub fn check_every(mut self, check_every: usize) -> Self {
        self.check_every = check_every;
        self
    }

    /// Stopping criteria these options describe.
    pub fn convergence(&self) -> Convergence<T> {
        Convergence { tol: self.tol, atol: self.atol, max_iters: self.maxiter }
    }
}

/// Preconditioner selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PcOptions {
    /// Kind of preconditioner (`diag`, `diag_abs`, `identity`/`id`)
    pub pc_type: String,
}

impl Default for PcOptions {
    fn default() -> Self {
        Self { pc_type: "diag".to_string() }
    }
}

impl PcOptions {
    pub fn new(pc_type: impl Into<String>) -> Self {
        Self { pc_type: pc_type.into() }
    }

    pub fn kind(&self) -> Result<PcKind, KError> {
        self.pc_type.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let opts = SolverOptions::<f64>::default();
        assert_eq!(opts.restart, 31);
        assert_eq!(opts.side, PcSide::Right);
        assert_eq!(opts.execution, ExecutionMode::Captured);
        assert_eq!(opts.convergence(), Convergence { tol: None, atol: None, max_iters: 0 });
    }

    #[test]
    fn flag_builders() {
        let opts = SolverOptions::<f32>::new()
            .tol(1e-5)
            .maxiter(40)
            .left_preconditioned(true)
            .captured(false);
        assert_eq!(opts.side, PcSide::Left);
        assert_eq!(opts.execution, ExecutionMode::Eager);
        assert_eq!(opts.convergence().max_iters_for(10), 40);
    }

    #[test]
    fn pc_options_parse() {
        assert_eq!(PcOptions::default().kind(), Ok(PcKind::Diag));
        assert_eq!(PcOptions::new("id").kind(), Ok(PcKind::Identity));
        assert!(PcOptions::new("sor").kind().is_err());
    }
}
