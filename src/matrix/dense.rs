//! Dense‐matrix API on top of Faer.
//!
//! This module provides the `DenseMatrix` trait and its implementation for the `faer::Mat<T>` type,
//! enabling construction from raw column-major or row-major storage, the layouts most assembly
//! code hands over.

use crate::core::traits::{MatVec, Scalar};
use crate::error::KError;
use faer::Mat;

/// Constructors for a dense operator.
pub trait DenseMatrix<T>: MatVec<T> + Sized {
    /// Construct from raw column-major storage.
    fn from_raw(nrows: usize, ncols: usize, data: Vec<T>) -> Result<Self, KError>;
    /// Construct from raw row-major storage.
    fn from_row_major(nrows: usize, ncols: usize, data: &[T]) -> Result<Self, KError>;
}

impl<T: Scalar> DenseMatrix<T> for Mat<T> {
    fn from_raw(nrows: usize, ncols: usize, data: Vec<T>) -> Result<Self, KError> {
        KError::check_len("dense storage", nrows * ncols, data.len())?;
        Ok(Mat::from_fn(nrows, ncols, |i, j| data[j * nrows + i]))
    }

    fn from_row_major(nrows: usize, ncols: usize, data: &[T]) -> Result<Self, KError> {
        KError::check_len("dense storage", nrows * ncols, data.len())?;
        Ok(Mat::from_fn(nrows, ncols, |i, j| data[i * ncols + j]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layouts_agree() {
        let col = <Mat<f64> as DenseMatrix<f64>>::from_raw(2, 3, vec![1.0, 4.0, 2.0, 5.0, 3.0, 6.0]).unwrap();
        let row = <Mat<f64> as DenseMatrix<f64>>::from_row_major(2, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        for i in 0..2 {
            for j in 0..3 {
                assert_eq!(col[(i, j)], row[(i, j)]);
            }
        }
        let x = vec![1.0, 1.0, 1.0];
        let mut y = vec![0.0; 2];
        col.matvec(&x, &mut y);
        assert_eq!(y, vec![6.0, 15.0]);
    }

    #[test]
    fn wrong_storage_length_is_a_shape_error() {
        let err = <Mat<f32> as DenseMatrix<f32>>::from_raw(2, 2, vec![1.0; 3]).unwrap_err();
        assert_eq!(
            err,
            KError::ShapeError { what: "dense storage", expected: 4, found: 3 }
        );
    }
}
