//! Core linear-algebra traits for krylov-replay.

use num_traits::{Float, FromPrimitive};
use std::fmt::{Debug, Display};

/// Floating-point kinds the solvers run on (`f32`, `f64`).
pub trait Scalar: Float + FromPrimitive + Send + Sync + Debug + Display + 'static {
    /// Resolution used to derive default tolerances for this kind.
    fn kind_epsilon() -> Self;

    /// Magnitudes below this are treated as exact zeros when inverting.
    fn tiny() -> Self {
        Self::min_positive_value().sqrt()
    }
}

impl Scalar for f32 {
    fn kind_epsilon() -> Self {
        1.0e-8
    }
}

impl Scalar for f64 {
    fn kind_epsilon() -> Self {
        1.0e-16
    }
}

/// Row and column counts of an operator.
pub trait MatShape {
    fn nrows(&self) -> usize;
    fn ncols(&self) -> usize;
}

/// Matrix–vector product: y ← A x.
pub trait MatVec<T>: MatShape {
    /// Compute y = A · x.
    fn matvec(&self, x: &[T], y: &mut [T]);

    /// Main diagonal of A.
    ///
    /// The default probes the operator with unit vectors (n products), which
    /// is all a matrix-free operator can offer. Stored matrices override it.
    fn diagonal(&self) -> Vec<T>
    where
        T: Float,
    {
        let n = self.nrows().min(self.ncols());
        let mut e = vec![T::zero(); self.ncols()];
        let mut col = vec![T::zero(); self.nrows()];
        let mut diag = Vec::with_capacity(n);
        for i in 0..n {
            e[i] = T::one();
            self.matvec(&e, &mut col);
            diag.push(col[i]);
            e[i] = T::zero();
        }
        diag
    }
}

/// Transposed product: y ← Aᵀ x.
pub trait MatTransVec<T>: MatShape {
    /// Compute y = Aᵀ · x.
    fn mattransvec(&self, x: &[T], y: &mut [T]);
}

/// Inner products & norms.
pub trait InnerProduct<V: ?Sized> {
    /// Associated scalar type.
    type Scalar: Copy + PartialOrd;
    /// Compute dot(x, y).
    fn dot(&self, x: &V, y: &V) -> Self::Scalar;
    /// Compute ‖x‖₂.
    fn norm(&self, x: &V) -> Self::Scalar;
}
