//! Deterministic headless implementation of the device seam
//!
//! Used by the test suite and the demo binaries. The "GPU" is a logical
//! device that retires fence signals with a configurable lag: a signal
//! retires either when more than `gpu_lag_frames` signals are
//! outstanding, or when the CPU blocks in `wait_for` and the device is
//! given time to catch up. That models a GPU running behind the CPU
//! while keeping every test single-threaded and reproducible.
//!
//! Waiting for a value that was never signaled would be an unbounded
//! hang on real hardware; here it fails fast with
//! [`DeviceError::WaitNeverSignaled`] so broken fence discipline surfaces
//! in tests instead of deadlocking them.

use crate::gpu::device::{
    CommandAllocator, DeviceError, GpuQueue, RenderDevice, UploadMemory,
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

/// Swap-chain buffer count of the headless device
pub const SWAP_CHAIN_BUFFER_COUNT: usize = 2;

/// Configuration for [`HeadlessDevice::new`]
#[derive(Debug, Clone, Copy)]
pub struct HeadlessConfig {
    /// How many signals the simulated GPU may leave outstanding before it
    /// is forced to retire the oldest
    pub gpu_lag_frames: usize,
    /// Minimum constant-block alignment reported by the device
    pub min_constant_alignment: usize,
    /// Initial swap-chain extent
    pub extent: (u32, u32),
}

impl Default for HeadlessConfig {
    fn default() -> Self {
        Self {
            gpu_lag_frames: 2,
            min_constant_alignment: 256,
            extent: (800, 600),
        }
    }
}

struct QueueState {
    completed: u64,
    last_signaled: u64,
    pending: VecDeque<u64>,
    lag: usize,
    submissions: u64,
}

struct QueueShared {
    state: Mutex<QueueState>,
}

impl QueueShared {
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().expect("headless queue state poisoned")
    }
}

/// Work queue of the headless device
pub struct HeadlessQueue {
    shared: Arc<QueueShared>,
}

impl HeadlessQueue {
    /// Number of signaled but unretired fence values
    pub fn pending_count(&self) -> usize {
        self.shared.lock().pending.len()
    }

    /// Number of submissions so far
    pub fn submissions(&self) -> u64 {
        self.shared.lock().submissions
    }

    /// Retire the oldest outstanding signal, ignoring the lag policy
    ///
    /// Test hook for driving GPU progress by hand.
    pub fn retire_one(&self) -> Option<u64> {
        let mut state = self.shared.lock();
        let value = state.pending.pop_front()?;
        state.completed = value;
        Some(value)
    }
}

impl GpuQueue for HeadlessQueue {
    fn submit(&mut self) -> Result<(), DeviceError> {
        self.shared.lock().submissions += 1;
        Ok(())
    }

    fn signal(&mut self, value: u64) -> Result<(), DeviceError> {
        let mut state = self.shared.lock();
        if value <= state.last_signaled {
            return Err(DeviceError::NonMonotonicSignal {
                value,
                current: state.last_signaled,
            });
        }
        state.last_signaled = value;
        state.pending.push_back(value);

        // The simulated GPU keeps at most `lag` signals outstanding.
        while state.pending.len() > state.lag {
            let retired = state.pending.pop_front().unwrap_or(state.completed);
            state.completed = retired;
        }
        Ok(())
    }

    fn completed_value(&self) -> u64 {
        self.shared.lock().completed
    }

    fn wait_for(&self, value: u64) -> Result<(), DeviceError> {
        let mut state = self.shared.lock();
        if state.completed >= value {
            return Ok(());
        }
        if state.last_signaled < value {
            return Err(DeviceError::WaitNeverSignaled {
                value,
                last: state.last_signaled,
            });
        }
        // Blocking gives the simulated GPU time to catch up.
        while state.completed < value {
            let retired = state.pending.pop_front().unwrap_or(value);
            state.completed = retired;
        }
        Ok(())
    }
}

/// Mapped upload region of the headless device
pub struct HeadlessMemory {
    bytes: Box<[u8]>,
}

impl UploadMemory for HeadlessMemory {
    fn len(&self) -> usize {
        self.bytes.len()
    }

    fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.bytes
    }
}

/// Command allocator of the headless device
pub struct HeadlessAllocator {
    resets: u64,
}

impl HeadlessAllocator {
    /// How many times this allocator has been reset
    pub fn reset_count(&self) -> u64 {
        self.resets
    }
}

impl CommandAllocator for HeadlessAllocator {
    fn reset(&mut self) -> Result<(), DeviceError> {
        self.resets += 1;
        Ok(())
    }
}

/// Deterministic in-process render device
pub struct HeadlessDevice {
    shared: Arc<QueueShared>,
    min_constant_alignment: usize,
    extent: (u32, u32),
    back_buffer: usize,
    presents: u64,
}

impl HeadlessDevice {
    /// Create the device and its paired queue
    pub fn new(config: HeadlessConfig) -> (Self, HeadlessQueue) {
        let shared = Arc::new(QueueShared {
            state: Mutex::new(QueueState {
                completed: 0,
                last_signaled: 0,
                pending: VecDeque::new(),
                lag: config.gpu_lag_frames,
                submissions: 0,
            }),
        });

        let device = Self {
            shared: Arc::clone(&shared),
            min_constant_alignment: config.min_constant_alignment,
            extent: config.extent,
            back_buffer: 0,
            presents: 0,
        };
        (device, HeadlessQueue { shared })
    }

    /// Number of presents so far
    pub fn present_count(&self) -> u64 {
        self.presents
    }
}

impl RenderDevice for HeadlessDevice {
    type Memory = HeadlessMemory;
    type Allocator = HeadlessAllocator;
    type Queue = HeadlessQueue;

    fn min_constant_alignment(&self) -> usize {
        self.min_constant_alignment
    }

    fn create_upload_memory(&mut self, bytes: usize) -> Result<Self::Memory, DeviceError> {
        Ok(HeadlessMemory {
            bytes: vec![0; bytes].into_boxed_slice(),
        })
    }

    fn create_command_allocator(&mut self) -> Result<Self::Allocator, DeviceError> {
        Ok(HeadlessAllocator { resets: 0 })
    }

    fn present(&mut self) -> Result<(), DeviceError> {
        self.back_buffer = (self.back_buffer + 1) % SWAP_CHAIN_BUFFER_COUNT;
        self.presents += 1;
        Ok(())
    }

    fn resize_buffers(&mut self, width: u32, height: u32) -> Result<(), DeviceError> {
        let pending = self.shared.lock().pending.len();
        if pending > 0 {
            return Err(DeviceError::ResizeWhileBusy {
                width,
                height,
                pending,
            });
        }
        self.extent = (width, height);
        self.back_buffer = 0;
        log::debug!("headless swap chain resized to {width}x{height}");
        Ok(())
    }

    fn extent(&self) -> (u32, u32) {
        self.extent
    }

    fn back_buffer_index(&self) -> usize {
        self.back_buffer
    }
}
