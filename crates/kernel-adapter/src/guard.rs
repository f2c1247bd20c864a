use crate::traits::Kernel;
use crate::types::{KernelError, ShapeHandle};

/// Scoped ownership of a shape handle. The shape is released when the guard
/// drops, on success, error and early return alike.
pub struct ShapeGuard<'k, K: Kernel + ?Sized> {
    kernel: &'k mut K,
    handle: ShapeHandle,
}

impl<'k, K: Kernel + ?Sized> ShapeGuard<'k, K> {
    pub fn new(kernel: &'k mut K, handle: ShapeHandle) -> Self {
        Self { kernel, handle }
    }

    pub fn kernel(&self) -> &K {
        &*self.kernel
    }

    pub fn handle(&self) -> &ShapeHandle {
        &self.handle
    }

    /// Tessellate the guarded shape.
    pub fn tessellate(&mut self, linear_deflection: f64, angular_deflection: f64) -> Result<(), KernelError> {
        self.kernel
            .tessellate(&self.handle, linear_deflection, angular_deflection)
    }
}

impl<K: Kernel + ?Sized> Drop for ShapeGuard<'_, K> {
    fn drop(&mut self) {
        self.kernel.release(ShapeHandle(self.handle.0));
    }
}
