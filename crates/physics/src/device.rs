//! Compute device abstraction.
//!
//! The physics pipeline is written against a device/host split: buffers are
//! allocated once on the "device", inputs are uploaded, the kernel runs there,
//! and results are downloaded to host memory. Here the device is a dedicated
//! rayon worker pool and device buffers are fixed-size heap allocations, which
//! keeps the upload/dispatch/barrier/download sequence explicit.

use std::panic::{self, AssertUnwindSafe};

use bytemuck::Pod;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{debug, trace};

use crate::error::PhysicsError;

/// Worker pool that runs kernel dispatches.
#[derive(Debug)]
pub struct ComputeDevice {
    pool: ThreadPool,
}

impl ComputeDevice {
    /// Start a device with `worker_threads` workers, or the rayon default if `None`.
    pub fn new(worker_threads: Option<usize>) -> Result<Self, PhysicsError> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(worker_threads.unwrap_or(0))
            .thread_name(|i| format!("bristle-physics-{i}"))
            .build()?;

        debug!("ComputeDevice: started {} workers", pool.current_num_threads());
        Ok(Self { pool })
    }

    pub fn num_threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Allocate a zeroed buffer of `len` elements.
    ///
    /// Allocation failure is reported instead of aborting.
    pub fn alloc<T: Pod>(
        &self,
        name: &'static str,
        len: usize,
    ) -> Result<DeviceBuffer<T>, PhysicsError> {
        let mut data = Vec::new();
        data.try_reserve_exact(len)
            .map_err(|_| PhysicsError::Allocation { buffer: name, len })?;
        data.resize(len, T::zeroed());

        trace!("ComputeDevice: allocated '{}' ({} elements)", name, len);
        Ok(DeviceBuffer { name, data })
    }

    /// Run `op` on the device's workers and block until it returns.
    ///
    /// Parallel iterators started inside `op` use this device's pool.
    pub fn dispatch<R, F>(&self, op: F) -> R
    where
        F: FnOnce() -> R + Send,
        R: Send,
    {
        self.pool.install(op)
    }

    /// Like [`dispatch`](Self::dispatch), but a panic in any worker is caught
    /// at the barrier and returned as [`PhysicsError::KernelPanic`].
    pub fn dispatch_catching<R, F>(&self, op: F) -> Result<R, PhysicsError>
    where
        F: FnOnce() -> R + Send,
        R: Send,
    {
        panic::catch_unwind(AssertUnwindSafe(|| self.pool.install(op)))
            .map_err(|payload| PhysicsError::KernelPanic(panic_message(&*payload)))
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// A fixed-size buffer owned by the device.
#[derive(Debug)]
pub struct DeviceBuffer<T> {
    name: &'static str,
    data: Vec<T>,
}

impl<T: Pod> DeviceBuffer<T> {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Upload `src`, which must match the buffer length exactly.
    pub fn copy_from(&mut self, src: &[T]) -> Result<(), PhysicsError> {
        self.check_len(src.len())?;
        self.data.copy_from_slice(src);
        Ok(())
    }

    /// Download into `dst`, which must match the buffer length exactly.
    pub fn copy_to(&self, dst: &mut [T]) -> Result<(), PhysicsError> {
        self.check_len(dst.len())?;
        dst.copy_from_slice(&self.data);
        Ok(())
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Raw bytes of the buffer contents.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.data)
    }

    /// Free the storage. The buffer is empty afterwards.
    pub fn release(&mut self) {
        self.data = Vec::new();
    }

    fn check_len(&self, actual: usize) -> Result<(), PhysicsError> {
        if actual != self.data.len() {
            return Err(PhysicsError::BufferSize {
                buffer: self.name,
                expected: self.data.len(),
                actual,
            });
        }
        Ok(())
    }
}
