//! BiCGStab solver (Saad §7.1)
//!
//! Right preconditioning solves `A M y = b` with `x = M y`: both half-steps search along
//! `M p` and `M s`, and ω minimizes the true residual. Left preconditioning keeps the same
//! search directions but chooses ω to minimize the preconditioned residual `‖M (s − ω t)‖`.
//! Either way the residual tested for convergence is the true `b − A x`.

use crate::core::traits::{MatVec, Scalar};
use crate::driver::{
    self, Buffers, CapturedSolve, ExecutionMode, Krylov, Monitor, Plan, SLOT_X, Stream,
};
use crate::error::KError;
use crate::preconditioner::{PcSide, Preconditioner};
use crate::solver::{LinearSolver, check_system};
use crate::utils::convergence::{Convergence, ConvergenceResult, Tracker};

const R: usize = 2;
// shadow residual r̃ = r₀
const RT: usize = 3;
const P: usize = 4;
const V: usize = 5;
// M p
const Y: usize = 6;
// M s
const Z: usize = 7;
const T_: usize = 8;
// M t, left preconditioning only
const MT: usize = 9;

#[derive(Clone, Copy, Debug)]
pub struct BiCgStabState<T> {
    rho: T,
    rho_old: T,
    alpha: T,
    omega: T,
}

impl<T: Scalar> BiCgStabState<T> {
    fn reset() -> Self {
        Self { rho: T::zero(), rho_old: T::one(), alpha: T::one(), omega: T::one() }
    }
}

pub struct BiCgStabSolver<T> {
    pub conv: Convergence<T>,
    pub side: PcSide,
    pub execution: ExecutionMode,
    pub check_every: usize,
    monitor: Option<Monitor<T>>,
}

impl<T: Scalar> BiCgStabSolver<T> {
    pub fn new(tol: T, max_iters: usize) -> Self {
        Self {
            conv: Convergence::new(tol, max_iters),
            side: PcSide::default(),
            execution: ExecutionMode::default(),
            check_every: 0,
            monitor: None,
        }
    }
    pub fn with_conv(mut self, conv: Convergence<T>) -> Self {
        self.conv = conv;
        self
    }
    pub fn with_preconditioning(mut self, side: PcSide) -> Self {
        self.side = side;
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
    ) -> Result<CapturedSolve<'a, T, BiCgStabState<T>>, KError>
    where
        A: MatVec<T> + ?Sized,
    {
        let n = a.nrows();
        check_system(a, pc, n, n)?;
        let kernels = BiCgStabKernels { a, pc, side: self.side };
        Ok(CapturedSolve::record(&kernels, self.conv, self.plan(n, ExecutionMode::Captured)))
    }

    fn plan(&self, n: usize, execution: ExecutionMode) -> Plan {
        Plan { execution, maxiter: self.conv.max_iters_for(n), check_every: self.check_every }
    }
}

impl<A, T> LinearSolver<A, T> for BiCgStabSolver<T>
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
        log::debug!("bicgstab: {:?} preconditioning", self.side);
        let kernels = BiCgStabKernels { a, pc, side: self.side };
        let plan = self.plan(b.len(), self.execution);
        Ok(driver::execute(&kernels, self.conv, plan, b, x, self.monitor.as_mut()))
    }
}

struct BiCgStabKernels<'a, A: ?Sized, T> {
    a: &'a A,
    pc: Option<&'a dyn Preconditioner<T>>,
    side: PcSide,
}

/// True when `value` is negligible against the magnitudes it was formed from.
fn vanishes<T: Scalar>(value: T, scale: T) -> bool {
    !(value.abs() > T::epsilon() * scale)
}

impl<'a, A, T> Krylov<'a, T> for BiCgStabKernels<'a, A, T>
where
    A: MatVec<T> + ?Sized,
    T: Scalar,
{
    type State = BiCgStabState<T>;

    const NAME: &'static str = "bicgstab";

    fn dim(&self) -> usize {
        self.a.nrows()
    }

    fn allocate(&self, tracker: Tracker<T>) -> Buffers<T, BiCgStabState<T>> {
        let n = self.dim();
        let mt = if self.side == PcSide::Left { n } else { 0 };
        Buffers::new(&[n, n, n, n, n, n, n, n, n, mt], tracker, BiCgStabState::reset())
    }

    fn init<St: Stream<'a, T, BiCgStabState<T>>>(&self, s: &mut St) {
        let a = self.a;
        s.launch(move |buf| {
            buf.residual(a, R);
            buf.copy(R, RT);
            let (b_norm, r_norm) = (buf.norm(driver::SLOT_B), buf.norm(R));
            buf.tracker.start(b_norm, r_norm);
            buf.get_mut(P).fill(T::zero());
            buf.get_mut(V).fill(T::zero());
            buf.state = BiCgStabState::reset();
        });
    }

    fn step<St: Stream<'a, T, BiCgStabState<T>>>(&self, s: &mut St) {
        let (a, pc) = (self.a, self.pc);
        s.launch(|buf| {
            buf.tracker.begin_iteration();
        });
        // ρ = r̃ᵀr, p = r + β (p − ω v)
        s.launch(|buf| {
            if !buf.tracker.is_live() {
                return;
            }
            let rho = buf.dot(RT, R);
            if vanishes(rho, buf.norm(RT) * buf.norm(R)) {
                buf.tracker.breakdown();
                return;
            }
            let BiCgStabState { rho_old, alpha, omega, .. } = buf.state;
            let beta = (rho / rho_old) * (alpha / omega);
            buf.write(P, |buf, p| {
                for ((pi, &ri), &vi) in p.iter_mut().zip(buf.get(R)).zip(buf.get(V)) {
                    *pi = ri + beta * (*pi - omega * vi);
                }
            });
            buf.state.rho = rho;
        });
        // y = M p, v = A y
        s.launch(move |buf| {
            if buf.tracker.is_live() {
                buf.precondition(pc, P, Y);
            }
        });
        s.launch(move |buf| {
            if buf.tracker.is_live() {
                buf.matvec(a, Y, V);
            }
        });
        // α = ρ / r̃ᵀv; x += α y; s = r − α v (kept in r)
        s.launch(|buf| {
            if !buf.tracker.is_live() {
                return;
            }
            let rt_v = buf.dot(RT, V);
            if vanishes(rt_v, buf.norm(RT) * buf.norm(V)) {
                buf.tracker.breakdown();
                return;
            }
            let alpha = buf.state.rho / rt_v;
            buf.axpy(alpha, Y, SLOT_X);
            buf.axpy(-alpha, V, R);
            buf.state.alpha = alpha;
            let s_norm = buf.norm(R);
            buf.tracker.record(s_norm);
        });
        // z = M s, t = A z
        s.launch(move |buf| {
            if buf.tracker.is_live() {
                buf.precondition(pc, R, Z);
            }
        });
        s.launch(move |buf| {
            if buf.tracker.is_live() {
                buf.matvec(a, Z, T_);
            }
        });
        if self.side == PcSide::Left {
            s.launch(move |buf| {
                if buf.tracker.is_live() {
                    buf.precondition(pc, T_, MT);
                }
            });
        }
        // ω, x += ω z, r = s − ω t
        let (num, den) = match self.side {
            PcSide::Left => (MT, Z),
            PcSide::Right => (T_, R),
        };
        s.launch(move |buf| {
            if !buf.tracker.is_live() {
                return;
            }
            let t_s = buf.dot(num, den);
            let t_t = buf.dot(num, num);
            if vanishes(t_s, t_t.sqrt() * buf.norm(den)) {
                buf.tracker.breakdown();
                return;
            }
            let omega = t_s / t_t;
            buf.axpy(omega, Z, SLOT_X);
            buf.axpy(-omega, T_, R);
            buf.state.omega = omega;
            buf.state.rho_old = buf.state.rho;
            let r_norm = buf.norm(R);
            buf.tracker.record(r_norm);
        });
    }
}
