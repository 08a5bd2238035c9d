// Jacobi preconditioner implementation

use crate::core::traits::{MatVec, Scalar};
use crate::error::KError;
use crate::preconditioner::Preconditioner;

/// Jacobi preconditioner: M = D⁻¹
///
/// Diagonal entries with `|d| < T::tiny()` map to 0 rather than to an overflowing
/// reciprocal, so rows without a usable pivot are simply left out of the scaling.
#[derive(Clone, Debug, Default)]
pub struct Jacobi<T> {
    pub(crate) inv_diag: Vec<T>,
    use_abs: bool,
}

impl<T: Scalar> Jacobi<T> {
    /// new with empty state; user must call `setup`.
    pub fn new() -> Self {
        Self { inv_diag: Vec::new(), use_abs: false }
    }

    /// Scale by `1/|d|` instead of `1/d`, keeping the preconditioner positive on
    /// indefinite diagonals.
    pub fn absolute(mut self) -> Self {
        self.use_abs = true;
        self
    }

    /// Build directly from an operator.
    pub fn from_operator<A>(a: &A) -> Result<Self, KError>
    where
        A: MatVec<T> + ?Sized,
    {
        let mut pc = Self::new();
        pc.setup(a)?;
        Ok(pc)
    }

    /// Build from an explicit diagonal.
    pub fn from_diagonal(diag: &[T]) -> Self {
        let mut pc = Self::new();
        pc.invert(diag);
        pc
    }

    /// Extract and invert the diagonal of `a`.
    pub fn setup<A>(&mut self, a: &A) -> Result<(), KError>
    where
        A: MatVec<T> + ?Sized,
    {
        KError::check_len("preconditioner operator (square)", a.nrows(), a.ncols())?;
        let diag = MatVec::diagonal(a);
        self.invert(&diag);
        Ok(())
    }

    fn invert(&mut self, diag: &[T]) {
        let use_abs = self.use_abs;
        self.inv_diag = diag
            .iter()
            .map(|&d| {
                let d = if use_abs { d.abs() } else { d };
                if d.abs() < T::tiny() { T::zero() } else { T::one() / d }
            })
            .collect();
    }

    pub fn inverse_diagonal(&self) -> &[T] {
        &self.inv_diag
    }
}

impl<T: Scalar> Preconditioner<T> for Jacobi<T> {
    fn apply(&self, r: &[T], z: &mut [T]) {
        for ((zi, &ri), &di) in z.iter_mut().zip(r).zip(&self.inv_diag) {
            *zi = di * ri;
        }
    }

    fn dim(&self) -> usize {
        self.inv_diag.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use faer::Mat;

    #[test]
    fn zero_diagonal_entry_maps_to_zero() {
        let a = Mat::from_fn(3, 3, |i, j| if i == j { [2.0, 0.0, -4.0][i] } else { 1.0 });
        let pc = Jacobi::<f64>::from_operator(&a).unwrap();
        assert_eq!(pc.inverse_diagonal(), &[0.5, 0.0, -0.25]);
        let mut z = vec![f64::NAN; 3];
        pc.apply(&[1.0, 1.0, 1.0], &mut z);
        assert!(z.iter().all(|v| v.is_finite()));
        assert_eq!(z, vec![0.5, 0.0, -0.25]);
    }

    #[test]
    fn denormal_scale_diagonal_is_treated_as_zero() {
        let pc = Jacobi::<f32>::from_diagonal(&[1e-30, 4.0]);
        assert_eq!(pc.inverse_diagonal(), &[0.0, 0.25]);
    }

    #[test]
    fn absolute_variant() {
        let mut pc = Jacobi::<f64>::new().absolute();
        let a = Mat::from_fn(2, 2, |i, j| if i == j { -2.0 } else { 0.0 });
        pc.setup(&a).unwrap();
        assert_eq!(pc.inverse_diagonal(), &[0.5, 0.5]);
    }

    #[test]
    fn rectangular_operator_is_rejected() {
        let a = Mat::<f64>::zeros(2, 3);
        assert!(matches!(Jacobi::from_operator(&a), Err(KError::ShapeError { .. })));
    }
}
