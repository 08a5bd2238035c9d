//! Matrix-free operators.
//!
//! `FnOperator` wraps a closure computing `y = A x` so a system can be solved without ever
//! storing `A`. A transpose action can be attached with [`FnOperator::with_transpose`]; only
//! then does the operator implement `MatTransVec`.

use crate::core::traits::{MatShape, MatTransVec, MatVec};

/// Marker for an operator without a transpose action.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoTranspose;

/// Square operator defined by its action.
#[derive(Clone)]
pub struct FnOperator<F, G = NoTranspose> {
    n: usize,
    apply: F,
    transpose: G,
}

impl<F> FnOperator<F> {
    /// `apply(x, y)` must overwrite `y` with `A x`, for `x` and `y` of length `n`.
    pub fn new(n: usize, apply: F) -> Self {
        Self { n, apply, transpose: NoTranspose }
    }
}

impl<F, G> FnOperator<F, G> {
    /// Attach `transpose(x, y)`: `y = Aᵀ x`.
    pub fn with_transpose<H>(self, transpose: H) -> FnOperator<F, H> {
        FnOperator { n: self.n, apply: self.apply, transpose }
    }
}

impl<F, G> MatShape for FnOperator<F, G> {
    fn nrows(&self) -> usize {
        self.n
    }
    fn ncols(&self) -> usize {
        self.n
    }
}

impl<T, F, G> MatVec<T> for FnOperator<F, G>
where
    F: Fn(&[T], &mut [T]),
{
    fn matvec(&self, x: &[T], y: &mut [T]) {
        (self.apply)(x, y)
    }
}

impl<T, F, G> MatTransVec<T> for FnOperator<F, G>
where
    G: Fn(&[T], &mut [T]),
{
    fn mattransvec(&self, x: &[T], y: &mut [T]) {
        (self.transpose)(x, y)
    }
}
