//! Matrix module: dense matrices and matrix-free operators.

pub mod dense;
pub use dense::DenseMatrix;
pub mod operator;
pub use operator::{FnOperator, NoTranspose};
