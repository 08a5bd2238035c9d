//! Wrappers for faer dense matrix types and vector operations.
//!
//! This module implements the core linear-algebra traits for `faer::Mat` and for plain
//! slices, so the Krylov solvers can run on a stored matrix or on any matrix-free operator.
//! It also provides the level-1 vector kernels (axpy, scaled copies, residuals) the solver
//! step functions launch.
//!
//! # Determinism
//! Within one build, every kernel produces bit-identical output for identical input, run after
//! run. Element-wise kernels are order independent. Long reductions are split into fixed-size
//! chunks whose partial sums are combined in index order, so the reduction tree never depends on
//! work stealing. The chunked sum is not the serial left fold, so results may differ in the last
//! bits between builds with and without `rayon`. Captured and eager solves rely on this to agree
//! exactly.
//!
//! # References
//! - [faer crate documentation](https://docs.rs/faer)
//! - [num-traits crate documentation](https://docs.rs/num-traits)

use crate::core::traits::{InnerProduct, MatShape, MatTransVec, MatVec, Scalar};
use faer::Mat;

/// Vectors shorter than this stay on the calling thread.
#[cfg(feature = "rayon")]
const PAR_LEN: usize = 1 << 14;

/// Fixed reduction chunk; part of the determinism contract.
#[cfg(feature = "rayon")]
const REDUCE_CHUNK: usize = 1 << 12;

impl<T> MatShape for Mat<T> {
    fn nrows(&self) -> usize {
        self.nrows()
    }
    fn ncols(&self) -> usize {
        self.ncols()
    }
}

/// Implements matrix-vector multiplication for `faer::Mat`.
///
/// Computes `y = A * x` row by row; each row is summed sequentially, rows are
/// distributed over the rayon pool for large matrices.
impl<T: Scalar> MatVec<T> for Mat<T> {
    fn matvec(&self, x: &[T], y: &mut [T]) {
        assert_eq!(self.nrows(), y.len(), "Output vector y has incorrect length");
        assert_eq!(self.ncols(), x.len(), "Input vector x has incorrect length");
        let ncols = self.ncols();
        let row = |i: usize| (0..ncols).fold(T::zero(), |acc, j| acc + self[(i, j)] * x[j]);
        #[cfg(feature = "rayon")]
        {
            use rayon::prelude::*;
            if self.nrows() * ncols >= PAR_LEN {
                y.par_iter_mut().enumerate().for_each(|(i, yi)| *yi = row(i));
                return;
            }
        }
        for (i, yi) in y.iter_mut().enumerate() {
            *yi = row(i);
        }
    }

    fn diagonal(&self) -> Vec<T> {
        let n = self.nrows().min(self.ncols());
        (0..n).map(|i| self[(i, i)]).collect()
    }
}

/// Implements matrix-transpose-vector multiplication for `faer::Mat`.
///
/// Computes `y = A^T * x`; column access is contiguous in faer's column-major layout.
impl<T: Scalar> MatTransVec<T> for Mat<T> {
    fn mattransvec(&self, x: &[T], y: &mut [T]) {
        assert_eq!(self.ncols(), y.len(), "Output vector y has incorrect length");
        assert_eq!(self.nrows(), x.len(), "Input vector x has incorrect length");
        for (j, yj) in y.iter_mut().enumerate() {
            *yj = (0..self.nrows()).fold(T::zero(), |acc, i| acc + self[(i, j)] * x[i]);
        }
    }
}

/// Implements inner product and norm for slices, with optional Rayon parallelism.
impl<T: Scalar> InnerProduct<[T]> for () {
    type Scalar = T;
    /// Computes the dot product of two vectors: `x^T y`.
    fn dot(&self, x: &[T], y: &[T]) -> T {
        assert_eq!(x.len(), y.len(), "Vectors must have the same length");
        #[cfg(feature = "rayon")]
        {
            use rayon::prelude::*;
            if x.len() >= PAR_LEN {
                let partials: Vec<T> = x
                    .par_chunks(REDUCE_CHUNK)
                    .zip(y.par_chunks(REDUCE_CHUNK))
                    .map(|(xc, yc)| dot_serial(xc, yc))
                    .collect();
                return partials.into_iter().fold(T::zero(), |acc, v| acc + v);
            }
        }
        dot_serial(x, y)
    }
    /// Computes the Euclidean norm of a vector: `||x||_2`.
    fn norm(&self, x: &[T]) -> T {
        self.dot(x, x).sqrt()
    }
}

fn dot_serial<T: Scalar>(x: &[T], y: &[T]) -> T {
    x.iter()
        .zip(y.iter())
        .fold(T::zero(), |acc, (&xi, &yi)| acc + xi * yi)
}

/// Applies `f(y_i, x_i)` element-wise.
fn zip_apply<T, F>(y: &mut [T], x: &[T], f: F)
where
    T: Scalar,
    F: Fn(&mut T, T) + Send + Sync,
{
    assert_eq!(x.len(), y.len(), "Vectors must have the same length");
    #[cfg(feature = "rayon")]
    {
        use rayon::prelude::*;
        if y.len() >= PAR_LEN {
            y.par_iter_mut().zip(x.par_iter()).for_each(|(yi, &xi)| f(yi, xi));
            return;
        }
    }
    y.iter_mut().zip(x.iter()).for_each(|(yi, &xi)| f(yi, xi));
}

/// y ← y + α x
pub fn axpy<T: Scalar>(alpha: T, x: &[T], y: &mut [T]) {
    zip_apply(y, x, |yi, xi| *yi = *yi + alpha * xi);
}

/// y ← x + β y
pub fn xpby<T: Scalar>(x: &[T], beta: T, y: &mut [T]) {
    zip_apply(y, x, |yi, xi| *yi = xi + beta * *yi);
}

/// y ← α x
pub fn scale_into<T: Scalar>(alpha: T, x: &[T], y: &mut [T]) {
    zip_apply(y, x, |yi, xi| *yi = alpha * xi);
}

/// y ← b − y, turning a product `A x` stored in `y` into the residual.
pub fn sub_from<T: Scalar>(b: &[T], y: &mut [T]) {
    zip_apply(y, b, |yi, bi| *yi = bi - *yi);
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn dense_diagonal_and_transpose() {
        let a = Mat::from_fn(3, 3, |i, j| (1 + i * 3 + j) as f64);
        assert_eq!(MatVec::diagonal(&a), vec![1.0, 5.0, 9.0]);
        let x = vec![1.0, 0.0, -1.0];
        let mut y = vec![0.0; 3];
        a.mattransvec(&x, &mut y);
        // columns of Aᵀ x: row0 - row2
        assert_eq!(y, vec![-6.0, -6.0, -6.0]);
    }

    #[test]
    fn chunked_dot_matches_serial() {
        let n = 40_000;
        let x: Vec<f64> = (0..n).map(|i| ((i % 17) as f64) * 0.25).collect();
        let y: Vec<f64> = (0..n).map(|i| ((i % 5) as f64) - 2.0).collect();
        let ip = ();
        let d1 = ip.dot(x.as_slice(), y.as_slice());
        let d2 = ip.dot(x.as_slice(), y.as_slice());
        assert_eq!(d1.to_bits(), d2.to_bits());
        assert_abs_diff_eq!(d1, dot_serial(&x, &y), epsilon = 1e-6);
    }

    #[test]
    fn level1_kernels() {
        let x = vec![1.0f32, 2.0, 3.0];
        let mut y = vec![1.0f32, 1.0, 1.0];
        axpy(2.0, &x, &mut y);
        assert_eq!(y, vec![3.0, 5.0, 7.0]);
        xpby(&x, 0.5, &mut y);
        assert_eq!(y, vec![2.5, 4.5, 6.5]);
        scale_into(-1.0, &x, &mut y);
        assert_eq!(y, vec![-1.0, -2.0, -3.0]);
        sub_from(&x, &mut y);
        assert_eq!(y, vec![2.0, 4.0, 6.0]);
    }
}
