//! Preconditioned Conjugate Gradient per Saad §9.2
//!
//! Valid for symmetric positive-definite `A` (and SPD `M`). On other systems the recurrence
//! still runs to completion; the result is whatever it produces, flagged as diverged if the
//! residual stops being finite.

use crate::core::traits::{MatVec, Scalar};
use crate::driver::{
    self, Buffers, CapturedSolve, ExecutionMode, Krylov, Monitor, Plan, SLOT_X, Stream,
};
use crate::error::KError;
use crate::preconditioner::Preconditioner;
use crate::solver::{LinearSolver, check_system};
use crate::utils::convergence::{Convergence, ConvergenceResult, Tracker};

// slots: b, x, residual, preconditioned residual, search direction, A·p
const R: usize = 2;
const Z: usize = 3;
const P: usize = 4;
const Q: usize = 5;

/// Scalar registers of a CG solve.
#[derive(Clone, Copy, Debug)]
pub struct CgState<T> {
    rho: T,
    rho_old: T,
    p_dot_q: T,
}

pub struct CgSolver<T> {
    pub conv: Convergence<T>,
    pub execution: ExecutionMode,
    pub check_every: usize,
    monitor: Option<Monitor<T>>,
}

impl<T: Scalar> CgSolver<T> {
    pub fn new(tol: T, max_iters: usize) -> Self {
        Self {
            conv: Convergence::new(tol, max_iters),
            execution: ExecutionMode::default(),
            check_every: 0,
            monitor: None,
        }
    }
    pub fn with_conv(mut self, conv: Convergence<T>) -> Self {
        self.conv = conv;
        self
    }
    pub fn with_execution(mut self, execution: ExecutionMode) -> Self {
        self.execution = execution;
        self
    }
    pub fn with_check_every(mut self, check_every: usize) -> Self {
        self.check_every = check_every;
        self
    }
    pub fn with_monitor<F>(mut self, f: F) -> Self
    where
        F: FnMut(usize, T, T) + 'static,
    {
        self.monitor = Some(Box::new(f));
        self
    }

    /// Record a reusable solve of `a` (with optional `pc`).
    pub fn capture<'a, A>(
        &self,
        a: &'a A,
        pc: Option<&'a dyn Preconditioner<T>>,
    ) -> Result<CapturedSolve<'a, T, CgState<T>>, KError>
    where
        A: MatVec<T> + ?Sized,
    {
        let n = a.nrows();
        check_system(a, pc, n, n)?;
        let plan = self.plan(n, ExecutionMode::Captured);
        Ok(CapturedSolve::record(&CgKernels { a, pc }, self.conv, plan))
    }

    fn plan(&self, n: usize, execution: ExecutionMode) -> Plan {
        Plan { execution, maxiter: self.conv.max_iters_for(n), check_every: self.check_every }
    }
}

impl<A, T> LinearSolver<A, T> for CgSolver<T>
where
    A: MatVec<T> + ?Sized,
    T: Scalar,
{
    fn solve(
        &mut self,
        a: &A,
        pc: Option<&dyn Preconditioner<T>>,
        b: &[T],
        x: &mut [T],
    ) -> Result<ConvergenceResult<T>, KError> {
        check_system(a, pc, b.len(), x.len())?;
        let plan = self.plan(b.len(), self.execution);
        Ok(driver::execute(&CgKernels { a, pc }, self.conv, plan, b, x, self.monitor.as_mut()))
    }
}

struct CgKernels<'a, A: ?Sized, T> {
    a: &'a A,
    pc: Option<&'a dyn Preconditioner<T>>,
}

impl<'a, A, T> Krylov<'a, T> for CgKernels<'a, A, T>
where
    A: MatVec<T> + ?Sized,
    T: Scalar,
{
    type State = CgState<T>;

    const NAME: &'static str = "cg";

    fn dim(&self) -> usize {
        self.a.nrows()
    }

    fn allocate(&self, tracker: Tracker<T>) -> Buffers<T, CgState<T>> {
        let n = self.dim();
        let state = CgState { rho: T::zero(), rho_old: T::one(), p_dot_q: T::zero() };
        Buffers::new(&[n; 6], tracker, state)
    }

    fn init<St: Stream<'a, T, CgState<T>>>(&self, s: &mut St) {
        let a = self.a;
        s.launch(move |buf| {
            buf.residual(a, R);
            let (b_norm, r_norm) = (buf.norm(driver::SLOT_B), buf.norm(R));
            buf.tracker.start(b_norm, r_norm);
            // p = 0, ρ_old = 1 turn the first direction update into p = z.
            buf.get_mut(P).fill(T::zero());
            buf.state = CgState { rho: T::zero(), rho_old: T::one(), p_dot_q: T::zero() };
        });
    }

    fn step<St: Stream<'a, T, CgState<T>>>(&self, s: &mut St) {
        let (a, pc) = (self.a, self.pc);
        s.launch(|buf| {
            buf.tracker.begin_iteration();
        });
        // z = M r
        s.launch(move |buf| {
            if buf.tracker.is_live() {
                buf.precondition(pc, R, Z);
            }
        });
        // ρ = rᵀz, p = z + (ρ/ρ_old) p
        s.launch(|buf| {
            if !buf.tracker.is_live() {
                return;
            }
            let rho = buf.dot(R, Z);
            let beta = rho / buf.state.rho_old;
            buf.write(P, |buf, p| crate::core::wrappers::xpby(buf.get(Z), beta, p));
            buf.state.rho = rho;
        });
        // q = A p
        s.launch(move |buf| {
            if !buf.tracker.is_live() {
                return;
            }
            buf.matvec(a, P, Q);
            buf.state.p_dot_q = buf.dot(P, Q);
        });
        // x += α p, r -= α q
        s.launch(|buf| {
            if !buf.tracker.is_live() {
                return;
            }
            let CgState { rho, p_dot_q, .. } = buf.state;
            if p_dot_q == T::zero() {
                buf.tracker.breakdown();
                return;
            }
            let alpha = rho / p_dot_q;
            buf.axpy(alpha, P, SLOT_X);
            buf.axpy(-alpha, Q, R);
            let r_norm = buf.norm(R);
            buf.tracker.record(r_norm);
            buf.state.rho_old = rho;
        });
    }
}
