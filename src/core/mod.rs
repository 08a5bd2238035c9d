//! Core traits and the dense/slice implementations behind them.

pub mod traits;
pub mod wrappers;

pub use traits::{InnerProduct, MatShape, MatTransVec, MatVec, Scalar};
