//! Kernel streams: run immediately, or record for replay.

use crate::driver::buffers::Buffers;

/// Where a solver step sends its kernels.
///
/// A kernel reads its scalars from the buffers it is launched on, never from the host, so a
/// recorded sequence stays valid for any data the buffers later hold.
pub trait Stream<'a, T, S> {
    fn launch<K>(&mut self, kernel: K)
    where
        K: Fn(&mut Buffers<T, S>) + 'a;
}

/// Executes each kernel as soon as it is launched.
pub struct Eager<'b, T, S> {
    buffers: &'b mut Buffers<T, S>,
}

impl<'b, T, S> Eager<'b, T, S> {
    pub fn new(buffers: &'b mut Buffers<T, S>) -> Self {
        Self { buffers }
    }
}

impl<'a, 'b, T, S> Stream<'a, T, S> for Eager<'b, T, S> {
    fn launch<K>(&mut self, kernel: K)
    where
        K: Fn(&mut Buffers<T, S>) + 'a,
    {
        kernel(&mut *self.buffers)
    }
}

/// A recorded, replayable kernel sequence.
pub struct Graph<'a, T, S> {
    kernels: Vec<Box<dyn Fn(&mut Buffers<T, S>) + 'a>>,
}

impl<'a, T, S> Graph<'a, T, S> {
    pub fn new() -> Self {
        Self { kernels: Vec::new() }
    }

    /// Replays every recorded kernel in order.
    pub fn launch(&self, buffers: &mut Buffers<T, S>) {
        for kernel in &self.kernels {
            kernel(buffers);
        }
    }

    pub fn len(&self) -> usize {
        self.kernels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kernels.is_empty()
    }
}

impl<'a, T, S> Default for Graph<'a, T, S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, T, S> Stream<'a, T, S> for Graph<'a, T, S> {
    fn launch<K>(&mut self, kernel: K)
    where
        K: Fn(&mut Buffers<T, S>) + 'a,
    {
        self.kernels.push(Box::new(kernel));
    }
}
