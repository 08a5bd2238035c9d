//! Identity preconditioner, the no-op baseline.

use crate::preconditioner::Preconditioner;

/// M = I
#[derive(Clone, Copy, Debug)]
pub struct Identity {
    n: usize,
}

impl Identity {
    pub fn new(n: usize) -> Self {
        Self { n }
    }
}

impl<T: Copy> Preconditioner<T> for Identity {
    fn apply(&self, r: &[T], z: &mut [T]) {
        z.copy_from_slice(r);
    }

    fn dim(&self) -> usize {
        self.n
    }
}
