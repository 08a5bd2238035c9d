//! Preconditioners for linear solvers.
//!
//! This module defines the `Preconditioner` trait, the side (`PcSide`) a solver applies it on,
//! and the `preconditioner` builder that turns a kind string into a ready operator.

use crate::core::traits::{MatVec, Scalar};
use crate::error::KError;

/// A preconditioner M ≈ A⁻¹.
///
/// Built once per system and only read afterwards, so one instance can serve any number of
/// warm-started or replayed solves of that system.
pub trait Preconditioner<T> {
    /// Apply M to r, writing z = M r
    fn apply(&self, r: &[T], z: &mut [T]);
    /// Dimension of the system M was built for.
    fn dim(&self) -> usize;
}

/// Which side of A the preconditioner is applied on.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum PcSide {
    Left,
    #[default]
    Right,
}

impl PcSide {
    /// Maps an `is_left_preconditioner` flag.
    pub fn from_left_flag(is_left: bool) -> Self {
        if is_left { PcSide::Left } else { PcSide::Right }
    }
}

pub mod identity;
pub mod jacobi;

pub use identity::Identity;
pub use jacobi::Jacobi;

/// Unified preconditioner kinds.
pub use crate::context::pc_context::PcKind;

/// Build the preconditioner named by `kind` for the operator `a`.
///
/// Recognized kinds are `"diag"`, `"diag_abs"`, `"identity"` and `"id"`; anything else fails
/// with `UnsupportedPreconditioner` before touching `a`.
pub fn preconditioner<T, A>(a: &A, kind: &str) -> Result<Box<dyn Preconditioner<T>>, KError>
where
    T: Scalar,
    A: MatVec<T> + ?Sized,
{
    let kind: PcKind = kind.parse()?;
    build(a, kind)
}

/// Build a preconditioner of an already parsed kind.
pub fn build<T, A>(a: &A, kind: PcKind) -> Result<Box<dyn Preconditioner<T>>, KError>
where
    T: Scalar,
    A: MatVec<T> + ?Sized,
{
    KError::check_len("preconditioner operator (square)", a.nrows(), a.ncols())?;
    let pc: Box<dyn Preconditioner<T>> = match kind {
        PcKind::Identity => Box::new(Identity::new(a.nrows())),
        PcKind::Diag => Box::new(Jacobi::from_operator(a)?),
        PcKind::DiagAbs => Box::new(Jacobi::new().absolute().with_setup(a)?),
    };
    log::debug!("built {:?} preconditioner for n = {}", kind, a.nrows());
    Ok(pc)
}

impl<T: Scalar> Jacobi<T> {
    fn with_setup<A: MatVec<T> + ?Sized>(mut self, a: &A) -> Result<Self, KError> {
        self.setup(a)?;
        Ok(self)
    }
}
