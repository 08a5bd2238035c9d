//! Krylov solver interfaces.
//!
//! Each solver is a struct carrying its stopping criteria and dispatch options, implementing
//! [`LinearSolver`]. The free functions [`cg`], [`bicgstab`] and [`gmres`] build one from a
//! [`SolverOptions`] and solve in a single call.

use crate::config::options::SolverOptions;
use crate::core::traits::{MatVec, Scalar};
use crate::error::KError;
use crate::preconditioner::Preconditioner;
use crate::utils::convergence::ConvergenceResult;

/// Common interface for the iterative solvers.
pub trait LinearSolver<A: ?Sized, T> {
    /// Solve A·x = b, starting from and overwriting `x`.
    ///
    /// Errors are reserved for malformed input; breakdown, divergence and running out of
    /// iterations are reported through the returned result.
    fn solve(
        &mut self,
        a: &A,
        pc: Option<&dyn Preconditioner<T>>,
        b: &[T],
        x: &mut [T],
    ) -> Result<ConvergenceResult<T>, KError>;
}

pub mod bicgstab;
pub mod cg;
pub mod gmres;

pub use bicgstab::BiCgStabSolver;
pub use cg::CgSolver;
pub use gmres::GmresSolver;

/// Checks that `A` is square and that `b`, `x` and `pc` all match its dimension.
pub(crate) fn check_system<A, T>(
    a: &A,
    pc: Option<&dyn Preconditioner<T>>,
    b_len: usize,
    x_len: usize,
) -> Result<(), KError>
where
    A: MatVec<T> + ?Sized,
{
    let n = a.nrows();
    KError::check_len("operator columns", n, a.ncols())?;
    KError::check_len("right-hand side b", n, b_len)?;
    KError::check_len("solution x", n, x_len)?;
    if let Some(m) = pc {
        KError::check_len("preconditioner", n, m.dim())?;
    }
    Ok(())
}

/// Preconditioned conjugate gradient on an SPD system.
pub fn cg<A, T>(
    a: &A,
    b: &[T],
    x: &mut [T],
    pc: Option<&dyn Preconditioner<T>>,
    opts: &SolverOptions<T>,
) -> Result<ConvergenceResult<T>, KError>
where
    A: MatVec<T> + ?Sized,
    T: Scalar,
{
    CgSolver::new(T::zero(), 0)
        .with_conv(opts.convergence())
        .with_execution(opts.execution)
        .with_check_every(opts.check_every)
        .solve(a, pc, b, x)
}

/// BiCGSTAB on a general system, preconditioned on `opts.side`.
pub fn bicgstab<A, T>(
    a: &A,
    b: &[T],
    x: &mut [T],
    pc: Option<&dyn Preconditioner<T>>,
    opts: &SolverOptions<T>,
) -> Result<ConvergenceResult<T>, KError>
where
    A: MatVec<T> + ?Sized,
    T: Scalar,
{
    BiCgStabSolver::new(T::zero(), 0)
        .with_conv(opts.convergence())
        .with_preconditioning(opts.side)
        .with_execution(opts.execution)
        .with_check_every(opts.check_every)
        .solve(a, pc, b, x)
}

/// GMRES restarted every `opts.restart` steps, preconditioned on `opts.side`.
pub fn gmres<A, T>(
    a: &A,
    b: &[T],
    x: &mut [T],
    pc: Option<&dyn Preconditioner<T>>,
    opts: &SolverOptions<T>,
) -> Result<ConvergenceResult<T>, KError>
where
    A: MatVec<T> + ?Sized,
    T: Scalar,
{
    GmresSolver::new(opts.restart, T::zero(), 0)
        .with_conv(opts.convergence())
        .with_preconditioning(opts.side)
        .with_execution(opts.execution)
        .with_check_every(opts.check_every)
        .solve(a, pc, b, x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preconditioner::Identity;
    use faer::Mat;

    #[test]
    fn shape_errors_come_before_iteration() {
        let a = Mat::<f64>::identity(3, 3);
        let opts = SolverOptions::default();
        let mut x = vec![0.0; 3];
        let err = cg(&a, &[1.0, 2.0], &mut x, None, &opts).unwrap_err();
        assert_eq!(err, KError::ShapeError { what: "right-hand side b", expected: 3, found: 2 });

        let mut short = vec![0.0; 4];
        let err = gmres(&a, &[1.0; 3], &mut short, None, &opts).unwrap_err();
        assert!(matches!(err, KError::ShapeError { what: "solution x", .. }));

        let pc = Identity::new(2);
        let err = bicgstab(&a, &[1.0; 3], &mut x, Some(&pc), &opts).unwrap_err();
        assert!(matches!(err, KError::ShapeError { what: "preconditioner", .. }));

        let rect = Mat::<f64>::zeros(3, 2);
        let err = cg(&rect, &[1.0; 3], &mut x, None, &opts).unwrap_err();
        assert!(matches!(err, KError::ShapeError { what: "operator columns", .. }));
        assert_eq!(x, vec![0.0; 3]);
    }

    #[test]
    fn empty_system_is_a_no_op() {
        let a = Mat::<f64>::zeros(0, 0);
        let opts = SolverOptions::default();
        let mut x: Vec<f64> = Vec::new();
        let results = [
            cg(&a, &[], &mut x, None, &opts).unwrap(),
            bicgstab(&a, &[], &mut x, None, &opts).unwrap(),
            gmres(&a, &[], &mut x, None, &opts).unwrap(),
        ];
        for stats in results {
            assert_eq!(stats.iterations, 0);
            assert!(stats.converged);
        }
    }
}
