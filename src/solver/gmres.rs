//! Generalized Minimal Residual (GMRES) solver with fixed restart (Saad §6.4)
//!
//! Each step extends the Arnoldi basis by one vector (modified Gram-Schmidt, one pass), folds
//! the new Hessenberg column into the running Givens QR and reads the least-squares residual
//! estimate `|g[j+1]|` off it. A cycle ends when the basis is full, the estimate drops below the
//! inner tolerance, or the basis becomes invariant (happy breakdown). At cycle end the
//! correction is reconstructed, `x` is updated, and the true residual `‖b − A x‖` is what gets
//! recorded and tested.
//!
//! The position inside the cycle lives in the solver state, not in the host loop, so every
//! step launches the same kernels and a whole restarted solve can be recorded as one graph.
//!
//! # Preconditioning
//! - Right: Arnoldi on `A M`, with `z_j = M v_j` kept for the update `x += Σ y_j z_j`.
//! - Left: Arnoldi on `M A` starting from `M r`, update `x += Σ y_j v_j`. The estimate then
//!   measures `‖M r‖`, so the inner tolerance is rescaled by `‖M r₀‖ / ‖r₀‖` of the cycle.

use crate::core::traits::{MatVec, Scalar};
use crate::core::wrappers;
use crate::driver::{
    self, Buffers, CapturedSolve, ExecutionMode, Krylov, Monitor, Plan, SLOT_X, Stream,
};
use crate::error::KError;
use crate::preconditioner::{PcSide, Preconditioner};
use crate::solver::{LinearSolver, check_system};
use crate::utils::convergence::{Convergence, ConvergenceResult, Tracker};

/// Restart length used when none is configured.
pub const DEFAULT_RESTART: usize = 31;

const R: usize = 2;
const W: usize = 3;
// A v_j before left preconditioning
const AW: usize = 4;
// v_0 .. v_k, then (right preconditioning) z_0 .. z_{k-1}
const BASIS: usize = 5;

/// Arnoldi/Givens registers of one restart cycle.
#[derive(Clone, Debug)]
pub struct GmresState<T> {
    k: usize,
    /// Next column of the cycle; 0 means no basis is pending.
    j: usize,
    /// Row-major (k+1)×k Hessenberg matrix, triangularized in place.
    h: Vec<T>,
    g: Vec<T>,
    cs: Vec<T>,
    sn: Vec<T>,
    y: Vec<T>,
    inner_atol: T,
    happy: bool,
}

impl<T: Scalar> GmresState<T> {
    fn new(k: usize) -> Self {
        Self {
            k,
            j: 0,
            h: vec![T::zero(); (k + 1) * k],
            g: vec![T::zero(); k + 1],
            cs: vec![T::zero(); k],
            sn: vec![T::zero(); k],
            y: vec![T::zero(); k],
            inner_atol: T::zero(),
            happy: false,
        }
    }

    fn at(&self, i: usize, j: usize) -> T {
        self.h[i * self.k + j]
    }

    fn h(&mut self, i: usize, j: usize) -> &mut T {
        &mut self.h[i * self.k + j]
    }

    /// Rotates column `j` by the previous rotations, then eliminates `h[j+1, j]`.
    fn givens(&mut self, j: usize) {
        for i in 0..j {
            let (c, s) = (self.cs[i], self.sn[i]);
            let (hi, hi1) = (self.at(i, j), self.at(i + 1, j));
            *self.h(i, j) = c * hi + s * hi1;
            *self.h(i + 1, j) = -s * hi + c * hi1;
        }
        let (hjj, hj1j) = (self.at(j, j), self.at(j + 1, j));
        let r = hjj.hypot(hj1j);
        if r == T::zero() {
            self.cs[j] = T::one();
            self.sn[j] = T::zero();
        } else {
            self.cs[j] = hjj / r;
            self.sn[j] = hj1j / r;
        }
        let (c, s) = (self.cs[j], self.sn[j]);
        *self.h(j, j) = c * hjj + s * hj1j;
        *self.h(j + 1, j) = T::zero();
        let gj = self.g[j];
        self.g[j] = c * gj;
        self.g[j + 1] = -s * gj;
    }

    /// Solves the leading `m`×`m` triangle `H y = g`; zero pivots give zero components.
    fn back_substitution(&mut self, m: usize) {
        for i in (0..m).rev() {
            let mut yi = self.g[i];
            for l in (i + 1)..m {
                yi = yi - self.at(i, l) * self.y[l];
            }
            let pivot = self.at(i, i);
            self.y[i] = if pivot == T::zero() { T::zero() } else { yi / pivot };
        }
    }
}

pub struct GmresSolver<T> {
    /// Number of Arnoldi vectors before restart
    pub restart: usize,
    pub conv: Convergence<T>,
    pub side: PcSide,
    pub execution: ExecutionMode,
    pub check_every: usize,
    monitor: Option<Monitor<T>>,
}

impl<T: Scalar> GmresSolver<T> {
    /// Create a new GMRES solver with restart, tolerance, and max iterations.
    ///
    /// `max_iters` counts Arnoldi steps across all cycles.
    pub fn new(restart: usize, tol: T, max_iters: usize) -> Self {
        Self {
            restart,
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
    /// Set the preconditioning side.
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
    ) -> Result<CapturedSolve<'a, T, GmresState<T>>, KError>
    where
        A: MatVec<T> + ?Sized,
    {
        let n = a.nrows();
        check_system(a, pc, n, n)?;
        let kernels = self.kernels(a, pc);
        Ok(CapturedSolve::record(&kernels, self.conv, self.plan(n, ExecutionMode::Captured)))
    }

    fn kernels<'a, A: ?Sized>(
        &self,
        a: &'a A,
        pc: Option<&'a dyn Preconditioner<T>>,
    ) -> GmresKernels<'a, A, T>
    where
        A: MatVec<T>,
    {
        let n = a.nrows();
        let restart = if self.restart == 0 { DEFAULT_RESTART } else { self.restart };
        GmresKernels { a, pc, side: self.side, k: restart.min(n).max(1) }
    }

    fn plan(&self, n: usize, execution: ExecutionMode) -> Plan {
        Plan { execution, maxiter: self.conv.max_iters_for(n), check_every: self.check_every }
    }
}

impl<A, T> LinearSolver<A, T> for GmresSolver<T>
where
    A: MatVec<T> + ?Sized,
    T: Scalar,
{
    /// Solve the linear system Ax = b using restarted GMRES.
    fn solve(
        &mut self,
        a: &A,
        pc: Option<&dyn Preconditioner<T>>,
        b: &[T],
        x: &mut [T],
    ) -> Result<ConvergenceResult<T>, KError> {
        check_system(a, pc, b.len(), x.len())?;
        let kernels = self.kernels(a, pc);
        log::debug!("gmres: restart = {}, {:?} preconditioning", kernels.k, self.side);
        let plan = self.plan(b.len(), self.execution);
        Ok(driver::execute(&kernels, self.conv, plan, b, x, self.monitor.as_mut()))
    }
}

struct GmresKernels<'a, A: ?Sized, T> {
    a: &'a A,
    pc: Option<&'a dyn Preconditioner<T>>,
    side: PcSide,
    k: usize,
}

type Buf<T> = Buffers<T, GmresState<T>>;

impl<'a, A, T> GmresKernels<'a, A, T>
where
    A: MatVec<T> + ?Sized,
    T: Scalar,
{
    fn v(j: usize) -> usize {
        BASIS + j
    }

    fn z(k: usize, j: usize) -> usize {
        BASIS + k + 1 + j
    }

    /// Seeds a fresh cycle from the residual in `R`.
    fn begin_cycle(buf: &mut Buf<T>, pc: Option<&dyn Preconditioner<T>>, side: PcSide) {
        let r_norm = buf.norm(R);
        let atol = buf.tracker.tolerance();
        let (beta, inner_atol) = match side {
            PcSide::Left => {
                buf.precondition(pc, R, W);
                let beta = buf.norm(W);
                let scale = if r_norm > T::zero() { beta / r_norm } else { T::one() };
                (beta, atol * scale)
            }
            PcSide::Right => {
                buf.copy(R, W);
                (r_norm, atol)
            }
        };
        if !(beta > T::zero()) || !beta.is_finite() {
            buf.tracker.breakdown();
            return;
        }
        buf.write(Self::v(0), |buf, v| wrappers::scale_into(beta.recip(), buf.get(W), v));
        let st = &mut buf.state;
        st.g.fill(T::zero());
        st.g[0] = beta;
        st.j = 0;
        st.happy = false;
        st.inner_atol = inner_atol;
    }

    /// x += Σ y_i u_i over the `m` basis vectors of the pending cycle, then r = b − A x.
    fn update_solution(buf: &mut Buf<T>, a: &A, side: PcSide) {
        let m = buf.state.j;
        let k = buf.state.k;
        buf.state.back_substitution(m);
        for i in 0..m {
            let yi = buf.state.y[i];
            let u = match side {
                PcSide::Left => Self::v(i),
                PcSide::Right => Self::z(k, i),
            };
            buf.axpy(yi, u, SLOT_X);
        }
        buf.state.j = 0;
        buf.residual(a, R);
        let r_norm = buf.norm(R);
        buf.tracker.record(r_norm);
    }
}

impl<'a, A, T> Krylov<'a, T> for GmresKernels<'a, A, T>
where
    A: MatVec<T> + ?Sized,
    T: Scalar,
{
    type State = GmresState<T>;

    const NAME: &'static str = "gmres";

    fn dim(&self) -> usize {
        self.a.nrows()
    }

    fn allocate(&self, tracker: Tracker<T>) -> Buf<T> {
        let n = self.dim();
        let (aw, z) = match self.side {
            PcSide::Left => (n, 0),
            PcSide::Right => (0, self.k),
        };
        let mut lens = vec![n, n, n, n, aw];
        lens.extend(std::iter::repeat_n(n, self.k + 1 + z));
        Buffers::new(&lens, tracker, GmresState::new(self.k))
    }

    fn init<St: Stream<'a, T, GmresState<T>>>(&self, s: &mut St) {
        let (a, pc, side) = (self.a, self.pc, self.side);
        s.launch(move |buf| {
            buf.residual(a, R);
            let (b_norm, r_norm) = (buf.norm(driver::SLOT_B), buf.norm(R));
            buf.tracker.start(b_norm, r_norm);
            buf.state.j = 0;
            if !buf.tracker.is_finished() {
                Self::begin_cycle(buf, pc, side);
            }
        });
    }

    fn step<St: Stream<'a, T, GmresState<T>>>(&self, s: &mut St) {
        let (a, pc, side, k) = (self.a, self.pc, self.side, self.k);
        s.launch(|buf| {
            buf.tracker.begin_iteration();
        });
        // w = A M v_j (right) or M A v_j (left)
        s.launch(move |buf| {
            if !buf.tracker.is_live() {
                return;
            }
            let j = buf.state.j;
            match side {
                PcSide::Right => {
                    buf.precondition(pc, Self::v(j), Self::z(k, j));
                    buf.matvec(a, Self::z(k, j), W);
                }
                PcSide::Left => {
                    buf.matvec(a, Self::v(j), AW);
                    buf.precondition(pc, AW, W);
                }
            }
        });
        // Arnoldi: orthogonalize w against v_0..v_j and append v_{j+1}
        s.launch(|buf| {
            if !buf.tracker.is_live() {
                return;
            }
            let j = buf.state.j;
            let w_norm = buf.norm(W);
            for i in 0..=j {
                let hij = buf.dot(W, Self::v(i));
                *buf.state.h(i, j) = hij;
                buf.axpy(-hij, Self::v(i), W);
            }
            let h_next = buf.norm(W);
            *buf.state.h(j + 1, j) = h_next;
            buf.state.happy = !(h_next > T::epsilon() * w_norm);
            if !buf.state.happy {
                buf.write(Self::v(j + 1), |buf, v| {
                    wrappers::scale_into(h_next.recip(), buf.get(W), v)
                });
            }
        });
        // Givens update, then close the cycle if it is done
        s.launch(move |buf| {
            if !buf.tracker.is_live() {
                return;
            }
            let st = &mut buf.state;
            let j = st.j;
            st.givens(j);
            st.j = j + 1;
            let estimate = st.g[j + 1].abs();
            let cycle_done = st.j == st.k || st.happy || estimate <= st.inner_atol;
            if !estimate.is_finite() {
                buf.tracker.record(estimate);
                return;
            }
            if cycle_done {
                Self::update_solution(buf, a, side);
                if !buf.tracker.is_finished() {
                    Self::begin_cycle(buf, pc, side);
                }
            }
        });
    }

    fn finalize<St: Stream<'a, T, GmresState<T>>>(&self, s: &mut St) {
        let (a, side) = (self.a, self.side);
        // out of budget mid-cycle: keep the partial correction
        s.launch(move |buf| {
            if buf.state.j > 0 && !buf.tracker.is_finished() {
                Self::update_solution(buf, a, side);
            }
        });
    }
}
