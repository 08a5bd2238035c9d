//! Convergence tracking & tolerance checks for iterative solvers.
//!
//! `Convergence` holds the caller's stopping criteria; `Tracker` is the running residual
//! state a solve keeps in its buffers (the "device side" of the convergence test), and
//! `ConvergenceResult` is what the caller gets back.

use crate::core::traits::Scalar;
use bitflags::bitflags;

bitflags! {
    /// Why a solve stopped. Empty while the solve is still iterating.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Status: u8 {
        /// Residual norm reached the absolute tolerance.
        const CONVERGED = 1;
        /// A pivot of the recurrence vanished (BiCGSTAB, GMRES restart).
        const BREAKDOWN = 1 << 1;
        /// The residual became NaN or infinite.
        const DIVERGED = 1 << 2;
        /// The iteration budget ran out.
        const MAXITER = 1 << 3;
    }
}

/// Stopping criteria.
///
/// `tol` is relative to ‖b‖, `atol` absolute; a missing one defaults to the other, and both
/// default to ε^(3/4) of the numeric kind. The tolerance actually used is
/// `max(tol·‖b‖, atol, ε^(9/10))`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Convergence<T> {
    pub tol: Option<T>,
    pub atol: Option<T>,
    /// 0 selects the system dimension.
    pub max_iters: usize,
}

impl<T: Scalar> Convergence<T> {
    pub fn new(tol: T, max_iters: usize) -> Self {
        Self { tol: Some(tol), atol: None, max_iters }
    }

    /// Absolute residual tolerance for a right-hand side of norm `b_norm`.
    pub fn absolute_tolerance(&self, b_norm: T) -> T {
        let eps = T::kind_epsilon();
        let default_tol = eps.powf(T::from_f64(0.75).unwrap_or_else(T::one));
        let min_tol = eps.powf(T::from_f64(0.9).unwrap_or_else(T::one));
        let (tol, atol) = match (self.tol, self.atol) {
            (None, None) => (default_tol, default_tol),
            (None, Some(a)) => (a, a),
            (Some(t), None) => (t, t),
            (Some(t), Some(a)) => (t, a),
        };
        (tol * b_norm).max(atol).max(min_tol)
    }

    /// Iteration budget for a system of dimension `n`.
    pub fn max_iters_for(&self, n: usize) -> usize {
        if self.max_iters == 0 { n } else { self.max_iters }
    }
}

/// Outcome of one solve call.
#[derive(Clone, Debug, PartialEq)]
pub struct ConvergenceResult<T> {
    /// Iterations executed (GMRES: inner Arnoldi steps).
    pub iterations: usize,
    /// Residual norm at exit.
    pub final_residual: T,
    /// Absolute tolerance the residual was tested against.
    pub tolerance: T,
    pub converged: bool,
    pub breakdown: bool,
    pub status: Status,
}

/// Alias for [`ConvergenceResult`].
pub type SolveStats<T> = ConvergenceResult<T>;

/// Running residual state of an in-flight solve.
#[derive(Clone, Debug)]
pub struct Tracker<T> {
    conv: Convergence<T>,
    maxiter: usize,
    iterations: usize,
    residual: T,
    atol: T,
    status: Status,
    active: bool,
}

impl<T: Scalar> Tracker<T> {
    pub fn new(conv: Convergence<T>, maxiter: usize) -> Self {
        Self {
            conv,
            maxiter,
            iterations: 0,
            residual: T::zero(),
            atol: T::zero(),
            status: Status::empty(),
            active: false,
        }
    }

    /// Resets for a new solve and tests the initial residual.
    pub fn start(&mut self, b_norm: T, r_norm: T) {
        self.atol = self.conv.absolute_tolerance(b_norm);
        self.iterations = 0;
        self.status = Status::empty();
        self.active = false;
        self.record(r_norm);
    }

    /// Opens the next iteration. Returns false, without counting, once the solve has
    /// finished or the budget is spent; the remaining kernels of that step are then no-ops.
    pub fn begin_iteration(&mut self) -> bool {
        self.active = self.status.is_empty() && self.iterations < self.maxiter;
        if self.active {
            self.iterations += 1;
        }
        self.active
    }

    /// Records a residual norm and folds it into the status.
    pub fn record(&mut self, r_norm: T) {
        self.residual = r_norm;
        if !r_norm.is_finite() {
            self.status |= Status::DIVERGED;
        } else if r_norm <= self.atol {
            self.status |= Status::CONVERGED;
        }
    }

    pub fn breakdown(&mut self) {
        self.status |= Status::BREAKDOWN;
    }

    /// Marks an unfinished solve as out of budget.
    pub fn close(&mut self) {
        if self.status.is_empty() {
            self.status |= Status::MAXITER;
        }
    }

    /// True while kernels of the current iteration should still do work.
    pub fn is_live(&self) -> bool {
        self.active && self.status.is_empty()
    }

    pub fn is_finished(&self) -> bool {
        !self.status.is_empty()
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    pub fn maxiter(&self) -> usize {
        self.maxiter
    }

    pub fn residual(&self) -> T {
        self.residual
    }

    pub fn tolerance(&self) -> T {
        self.atol
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn result(&self) -> ConvergenceResult<T> {
        ConvergenceResult {
            iterations: self.iterations,
            final_residual: self.residual,
            tolerance: self.atol,
            converged: self.status.contains(Status::CONVERGED),
            breakdown: self.status.contains(Status::BREAKDOWN),
            status: self.status,
        }
    }
}
