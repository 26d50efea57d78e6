//! CPU/GPU fence synchronization
//!
//! The [`Synchronizer`] owns the work queue and the monotonically
//! increasing fence counter. It is the only place the engine blocks on
//! the GPU: either per ring slot through
//! [`FrameResourceRing::wait_if_pending`](crate::gpu::FrameResourceRing::wait_if_pending)
//! or wholesale through [`Synchronizer::flush_all`].
//!
//! Synchronization failures are treated as unrecoverable: a fence that
//! cannot be created or a completion value that never arrives terminates
//! the frame loop.

use crate::gpu::device::{DeviceError, GpuQueue};

/// Queue owner with a monotonic fence counter
pub struct Synchronizer<Q: GpuQueue> {
    queue: Q,
    next_fence: u64,
}

impl<Q: GpuQueue> Synchronizer<Q> {
    /// Take ownership of the queue; no fence values are outstanding yet
    pub fn new(queue: Q) -> Self {
        Self {
            queue,
            next_fence: 0,
        }
    }

    /// Enqueue previously recorded work on the queue
    pub fn submit(&mut self) -> Result<(), DeviceError> {
        self.queue.submit()
    }

    /// Advance the fence and enqueue its completion mark
    ///
    /// Returns the new fence value; consecutive calls return strictly
    /// increasing values.
    pub fn signal(&mut self) -> Result<u64, DeviceError> {
        self.next_fence += 1;
        self.queue.signal(self.next_fence)?;
        Ok(self.next_fence)
    }

    /// Highest fence value the device has retired
    pub fn completed_value(&self) -> u64 {
        self.queue.completed_value()
    }

    /// The most recently signaled fence value (0 if none)
    pub fn last_signaled(&self) -> u64 {
        self.next_fence
    }

    /// Block until the device retires `value`
    pub fn wait_for(&self, value: u64) -> Result<(), DeviceError> {
        if self.queue.completed_value() >= value {
            return Ok(());
        }
        self.queue.wait_for(value)
    }

    /// Drain the queue: signal, then wait for that signal
    ///
    /// After this returns, every fence value signaled before the call has
    /// been retired. Used after initial resource upload, before swap-chain
    /// resize, and at shutdown.
    pub fn flush_all(&mut self) -> Result<(), DeviceError> {
        let value = self.signal()?;
        self.wait_for(value)
    }

    /// Access the underlying queue
    pub fn queue(&self) -> &Q {
        &self.queue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::headless::{HeadlessConfig, HeadlessDevice};

    fn synchronizer(lag: usize) -> Synchronizer<crate::gpu::HeadlessQueue> {
        let (_device, queue) = HeadlessDevice::new(HeadlessConfig {
            gpu_lag_frames: lag,
            ..HeadlessConfig::default()
        });
        Synchronizer::new(queue)
    }

    #[test]
    fn test_signal_values_strictly_increase() {
        let mut sync = synchronizer(64);
        let mut last = 0;
        for _ in 0..32 {
            let value = sync.signal().unwrap();
            assert!(value > last);
            last = value;
        }
    }

    #[test]
    fn test_flush_retires_every_prior_signal() {
        let mut sync = synchronizer(64);
        let mut signaled = Vec::new();
        for _ in 0..10 {
            signaled.push(sync.signal().unwrap());
        }
        sync.flush_all().unwrap();
        let completed = sync.completed_value();
        for value in signaled {
            assert!(completed >= value);
        }
    }

    #[test]
    fn test_wait_for_already_retired_value_is_immediate() {
        let mut sync = synchronizer(0);
        let value = sync.signal().unwrap();
        // Lag 0 retires eagerly; the wait must not error or block.
        assert_eq!(sync.completed_value(), value);
        sync.wait_for(value).unwrap();
    }

    #[test]
    fn test_wait_for_unsignaled_value_is_fatal() {
        let sync = synchronizer(0);
        assert!(matches!(
            sync.wait_for(1),
            Err(DeviceError::WaitNeverSignaled { value: 1, last: 0 })
        ));
    }
}
