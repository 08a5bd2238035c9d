//! Capture-compatible execution of Krylov solvers.
//!
//! A solver is written once, as a [`Krylov`] implementation whose `step` launches a fixed
//! sequence of kernels onto a [`Stream`]. Every kernel that depends on the outcome of the
//! convergence test checks it *inside* the kernel (a no-op once the tracker is finished), so
//! the launched sequence never depends on runtime values. Two drivers consume that step:
//!
//! - **Eager**: kernels run as they are launched; the host checks the tracker after every
//!   iteration and stops early. True iteration counts are observable per call, which is what
//!   warm-start workflows need.
//! - **Captured**: init, `maxiter` steps and finalize are recorded once into [`Graph`]s and
//!   replayed. A [`CapturedSolve`] can be replayed any number of times against new `b`/`x`
//!   buffers without re-recording.
//!
//! Both drivers execute the same kernels on the same data, so they produce the same `x`.

pub mod buffers;
pub mod graph;

pub use buffers::{Buffers, SLOT_B, SLOT_X};
pub use graph::{Eager, Graph, Stream};

use crate::core::traits::Scalar;
use crate::error::KError;
use crate::utils::convergence::{Convergence, ConvergenceResult, Status, Tracker};

/// How a solve is dispatched.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum ExecutionMode {
    /// Record the whole fixed-length iteration once, then replay it.
    #[default]
    Captured,
    /// Run kernels immediately and exit as soon as the tracker finishes.
    Eager,
}

impl ExecutionMode {
    /// Maps a `use_captured_execution` flag.
    pub fn from_captured_flag(captured: bool) -> Self {
        if captured { ExecutionMode::Captured } else { ExecutionMode::Eager }
    }
}

/// Per-iteration callback: `(iterations, residual, tolerance)`.
pub type Monitor<T> = Box<dyn FnMut(usize, T, T)>;

/// A Krylov method expressed as kernels over [`Buffers`].
pub trait Krylov<'a, T: Scalar> {
    /// Scalar registers of the method.
    type State;

    const NAME: &'static str;

    /// System dimension.
    fn dim(&self) -> usize;

    /// Allocates the full scratch arena for one solve.
    fn allocate(&self, tracker: Tracker<T>) -> Buffers<T, Self::State>;

    /// Computes the initial residual and resets the tracker.
    fn init<St: Stream<'a, T, Self::State>>(&self, s: &mut St);

    /// One iteration.
    fn step<St: Stream<'a, T, Self::State>>(&self, s: &mut St);

    /// Runs once after the last step.
    fn finalize<St: Stream<'a, T, Self::State>>(&self, _s: &mut St) {}
}

/// Resolved dispatch parameters for one solve.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Plan {
    pub execution: ExecutionMode,
    pub maxiter: usize,
    pub check_every: usize,
}

/// Runs `kernels` on `b`/`x` according to `plan`; `x` is overwritten with the result.
pub(crate) fn execute<'a, T, K>(
    kernels: &K,
    conv: Convergence<T>,
    plan: Plan,
    b: &[T],
    x: &mut [T],
    monitor: Option<&mut Monitor<T>>,
) -> ConvergenceResult<T>
where
    T: Scalar,
    K: Krylov<'a, T>,
{
    log::debug!(
        "{}: n = {}, maxiter = {}, execution = {:?}",
        K::NAME,
        kernels.dim(),
        plan.maxiter,
        plan.execution
    );
    match plan.execution {
        ExecutionMode::Eager => run_eager(kernels, conv, plan, b, x, monitor),
        ExecutionMode::Captured => CapturedSolve::record(kernels, conv, plan).run(b, x, monitor),
    }
}

fn run_eager<'a, T, K>(
    kernels: &K,
    conv: Convergence<T>,
    plan: Plan,
    b: &[T],
    x: &mut [T],
    mut monitor: Option<&mut Monitor<T>>,
) -> ConvergenceResult<T>
where
    T: Scalar,
    K: Krylov<'a, T>,
{
    let mut buffers = kernels.allocate(Tracker::new(conv, plan.maxiter));
    buffers.upload(b, x);
    kernels.init(&mut Eager::new(&mut buffers));
    while !buffers.tracker.is_finished() && buffers.tracker.iterations() < plan.maxiter {
        kernels.step(&mut Eager::new(&mut buffers));
        notify(&mut monitor, &buffers.tracker);
    }
    kernels.finalize(&mut Eager::new(&mut buffers));
    buffers.tracker.close();
    buffers.download(x);
    let result = buffers.tracker.result();
    report(K::NAME, &result);
    result
}

fn notify<T: Scalar>(monitor: &mut Option<&mut Monitor<T>>, tracker: &Tracker<T>) {
    if let Some(m) = monitor {
        m(tracker.iterations(), tracker.residual(), tracker.tolerance());
    }
}

fn report<T: Scalar>(name: &str, r: &ConvergenceResult<T>) {
    if r.converged {
        log::debug!(
            "{name}: converged in {} iterations, residual {} <= {}",
            r.iterations,
            r.final_residual,
            r.tolerance
        );
    } else if r.breakdown {
        log::warn!("{name}: breakdown after {} iterations, residual {}", r.iterations, r.final_residual);
    } else if r.status.contains(Status::DIVERGED) {
        log::warn!("{name}: residual diverged after {} iterations", r.iterations);
    } else {
        log::warn!(
            "{name}: no convergence within {} iterations, residual {} > {}",
            r.iterations,
            r.final_residual,
            r.tolerance
        );
    }
}

/// A solve recorded once and replayable against new right-hand sides and initial guesses.
///
/// Bound to the operator and preconditioner it was recorded with. Replaying takes `&mut self`,
/// so a graph can never be replayed concurrently with itself.
pub struct CapturedSolve<'a, T, S> {
    name: &'static str,
    init: Graph<'a, T, S>,
    chunk: Graph<'a, T, S>,
    finalize: Graph<'a, T, S>,
    steps_per_chunk: usize,
    buffers: Buffers<T, S>,
}

impl<'a, T: Scalar, S> CapturedSolve<'a, T, S> {
    /// Records `plan.maxiter` steps, or `plan.check_every` steps per chunk when nonzero.
    pub(crate) fn record<K>(kernels: &K, conv: Convergence<T>, plan: Plan) -> Self
    where
        K: Krylov<'a, T, State = S>,
    {
        let steps_per_chunk = match plan.check_every {
            0 => plan.maxiter,
            k => k.min(plan.maxiter),
        };
        let mut init = Graph::new();
        kernels.init(&mut init);
        let mut chunk = Graph::new();
        for _ in 0..steps_per_chunk {
            kernels.step(&mut chunk);
        }
        let mut finalize = Graph::new();
        kernels.finalize(&mut finalize);
        log::trace!(
            "{}: recorded {} kernels ({} steps per replay)",
            K::NAME,
            init.len() + chunk.len() + finalize.len(),
            steps_per_chunk
        );
        Self {
            name: K::NAME,
            init,
            chunk,
            finalize,
            steps_per_chunk,
            buffers: kernels.allocate(Tracker::new(conv, plan.maxiter)),
        }
    }

    /// System dimension the graph was recorded for.
    pub fn dim(&self) -> usize {
        self.buffers.dim()
    }

    /// Total number of recorded kernels. Depends only on the method, dimension-independent
    /// parameters and `maxiter`, never on data.
    pub fn kernel_count(&self) -> usize {
        self.init.len() + self.chunk.len() + self.finalize.len()
    }

    /// Iterations recorded per replay of the step graph.
    pub fn steps_per_replay(&self) -> usize {
        self.steps_per_chunk
    }

    /// Replays the recorded solve for `b`, starting from and overwriting `x`.
    pub fn replay(&mut self, b: &[T], x: &mut [T]) -> Result<ConvergenceResult<T>, KError> {
        KError::check_len("right-hand side b", self.dim(), b.len())?;
        KError::check_len("solution x", self.dim(), x.len())?;
        Ok(self.run(b, x, None))
    }

    pub(crate) fn run(
        &mut self,
        b: &[T],
        x: &mut [T],
        mut monitor: Option<&mut Monitor<T>>,
    ) -> ConvergenceResult<T> {
        let buffers = &mut self.buffers;
        buffers.upload(b, x);
        self.init.launch(buffers);
        let maxiter = buffers.tracker.maxiter();
        if self.steps_per_chunk > 0 {
            while !buffers.tracker.is_finished() && buffers.tracker.iterations() < maxiter {
                self.chunk.launch(buffers);
                notify(&mut monitor, &buffers.tracker);
            }
        }
        self.finalize.launch(buffers);
        buffers.tracker.close();
        buffers.download(x);
        let result = buffers.tracker.result();
        report(self.name, &result);
        result
    }
}
