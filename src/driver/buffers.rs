//! Solver scratch arena.
//!
//! Every vector a solve touches lives in one pre-allocated slot of `Buffers`, so neither the
//! eager loop nor a replayed graph allocates per iteration. Slot 0 holds `b`, slot 1 holds `x`;
//! the rest are method specific. Scalar registers live in the method's `state` and the running
//! residual in the `tracker`.

use crate::core::traits::{InnerProduct, MatVec, Scalar};
use crate::core::wrappers;
use crate::preconditioner::Preconditioner;
use crate::utils::convergence::Tracker;

/// Right-hand side slot.
pub const SLOT_B: usize = 0;
/// Solution slot.
pub const SLOT_X: usize = 1;

pub struct Buffers<T, S> {
    vecs: Vec<Vec<T>>,
    pub(crate) tracker: Tracker<T>,
    pub(crate) state: S,
}

impl<T: Scalar, S> Buffers<T, S> {
    /// One zeroed slot per entry of `lens`.
    pub fn new(lens: &[usize], tracker: Tracker<T>, state: S) -> Self {
        Self {
            vecs: lens.iter().map(|&len| vec![T::zero(); len]).collect(),
            tracker,
            state,
        }
    }

    /// System dimension.
    pub fn dim(&self) -> usize {
        self.vecs[SLOT_B].len()
    }

    pub fn get(&self, slot: usize) -> &[T] {
        &self.vecs[slot]
    }

    pub fn get_mut(&mut self, slot: usize) -> &mut [T] {
        &mut self.vecs[slot]
    }

    /// Runs `f` with read access to every slot and write access to `dst`.
    ///
    /// `dst` reads as empty through the shared handle while `f` runs.
    pub fn write<R>(&mut self, dst: usize, f: impl FnOnce(&Self, &mut [T]) -> R) -> R {
        let mut out = std::mem::take(&mut self.vecs[dst]);
        let ret = f(self, &mut out);
        self.vecs[dst] = out;
        ret
    }

    pub fn tracker(&self) -> &Tracker<T> {
        &self.tracker
    }

    pub fn state(&self) -> &S {
        &self.state
    }

    /// dst ← src
    pub fn copy(&mut self, src: usize, dst: usize) {
        self.write(dst, |buf, d| d.copy_from_slice(buf.get(src)));
    }

    /// y ← y + α x
    pub fn axpy(&mut self, alpha: T, x: usize, y: usize) {
        self.write(y, |buf, y| wrappers::axpy(alpha, buf.get(x), y));
    }

    pub fn dot(&self, a: usize, b: usize) -> T {
        let ip = ();
        ip.dot(self.get(a), self.get(b))
    }

    pub fn norm(&self, a: usize) -> T {
        let ip = ();
        ip.norm(self.get(a))
    }

    /// dst ← A src
    pub fn matvec<A: MatVec<T> + ?Sized>(&mut self, a: &A, src: usize, dst: usize) {
        self.write(dst, |buf, d| a.matvec(buf.get(src), d));
    }

    /// dst ← M src, or a copy without a preconditioner.
    pub fn precondition(&mut self, pc: Option<&dyn Preconditioner<T>>, src: usize, dst: usize) {
        match pc {
            Some(m) => self.write(dst, |buf, d| m.apply(buf.get(src), d)),
            None => self.copy(src, dst),
        }
    }

    /// dst ← b − A x
    pub fn residual<A: MatVec<T> + ?Sized>(&mut self, a: &A, dst: usize) {
        self.write(dst, |buf, d| {
            a.matvec(buf.get(SLOT_X), d);
            wrappers::sub_from(buf.get(SLOT_B), d);
        });
    }

    pub(crate) fn upload(&mut self, b: &[T], x: &[T]) {
        self.vecs[SLOT_B].copy_from_slice(b);
        self.vecs[SLOT_X].copy_from_slice(x);
    }

    pub(crate) fn download(&self, x: &mut [T]) {
        x.copy_from_slice(&self.vecs[SLOT_X]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::convergence::Convergence;
    use faer::Mat;

    fn buffers() -> Buffers<f64, ()> {
        Buffers::new(&[2, 2, 2], Tracker::new(Convergence::new(1e-8, 4), 4), ())
    }

    #[test]
    fn residual_of_uploaded_system() {
        let a = Mat::from_fn(2, 2, |i, j| if i == j { 2.0 } else { 1.0 });
        let mut buf = buffers();
        buf.upload(&[3.0, 3.0], &[1.0, 0.0]);
        buf.residual(&a, 2);
        assert_eq!(buf.get(2), &[1.0, 2.0]);
        assert_eq!(buf.dot(2, 2), 5.0);
        buf.axpy(-1.0, 2, SLOT_X);
        let mut x = [0.0; 2];
        buf.download(&mut x);
        assert_eq!(x, [0.0, -2.0]);
    }

    #[test]
    fn write_sees_other_slots() {
        let mut buf = buffers();
        buf.get_mut(0).copy_from_slice(&[1.0, 2.0]);
        let len_seen = buf.write(1, |b, d| {
            d.copy_from_slice(b.get(0));
            b.get(1).len()
        });
        assert_eq!(len_seen, 0);
        assert_eq!(buf.get(1), &[1.0, 2.0]);
        buf.precondition(None, 1, 2);
        assert_eq!(buf.get(2), &[1.0, 2.0]);
    }
}
