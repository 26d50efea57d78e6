//! Backend abstraction traits for the GPU device seam
//!
//! These traits describe the capabilities the frame-pipelining core needs
//! from a graphics backend: persistently mapped upload memory, resettable
//! command allocators, and a work queue with fence signal/wait semantics.
//! The core specifies *when* and *how many* of these calls happen; the
//! backend owns their wire format.

use thiserror::Error;

/// Errors reported by device-seam implementations
///
/// Synchronization and submission failures are fatal to the frame being
/// built; there is no partial-progress recovery (a half-submitted GPU
/// frame cannot be rolled back).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeviceError {
    /// An upload write addressed an element past the end of its buffer
    #[error("upload write at element {index} exceeds buffer length {len}")]
    IndexOutOfBounds {
        /// Offending element index
        index: usize,
        /// Buffer element count
        len: usize,
    },

    /// A fence signal did not advance past the last signaled value
    #[error("fence signal {value} does not advance past {current}")]
    NonMonotonicSignal {
        /// Requested fence value
        value: u64,
        /// Highest value signaled so far
        current: u64,
    },

    /// A fence wait targeted a value no signal will ever reach
    #[error("waiting for fence value {value} which was never signaled (last signal: {last})")]
    WaitNeverSignaled {
        /// Awaited fence value
        value: u64,
        /// Highest value signaled so far
        last: u64,
    },

    /// Swap-chain buffers were resized while GPU work was still in flight
    ///
    /// Resize must be serialized behind a full flush; hitting this error
    /// means the caller skipped it.
    #[error("resize to {width}x{height} with {pending} submissions still in flight; flush first")]
    ResizeWhileBusy {
        /// Requested width
        width: u32,
        /// Requested height
        height: u32,
        /// Number of unretired submissions
        pending: usize,
    },

    /// A frame-resource ring cannot have zero slots
    #[error("frame-resource ring depth must be at least 1")]
    EmptyRing,

    /// Backend-specific failure (device lost, allocation failure, ...)
    #[error("device backend error: {0}")]
    Backend(String),
}

/// A CPU-writable, GPU-readable memory block
///
/// The region is mapped for the lifetime of the object; it is never
/// unmapped and remapped between writes. Implementations provide no
/// internal synchronization: the frame-resource ring's fence discipline
/// is what makes writes safe.
pub trait UploadMemory {
    /// Size of the mapped region in bytes
    fn len(&self) -> usize;

    /// Whether the region is empty
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The mapped region, writable by the CPU
    fn bytes_mut(&mut self) -> &mut [u8];
}

/// A command allocator owned by one frame-resource slot
///
/// May only be reset once the GPU work recorded from it has retired;
/// the ring's per-slot fence guarantees that window.
pub trait CommandAllocator {
    /// Reclaim the allocator's memory for re-recording
    fn reset(&mut self) -> Result<(), DeviceError>;
}

/// The GPU work queue with fence semantics
///
/// Work submitted to one queue executes in submission order. The fence is
/// a monotonic counter: `signal(v)` enqueues a completion mark tagged `v`,
/// and `completed_value()` reports the highest retired mark.
pub trait GpuQueue {
    /// Enqueue previously recorded work
    fn submit(&mut self) -> Result<(), DeviceError>;

    /// Enqueue a completion mark tagged with `value`
    ///
    /// `value` must be strictly greater than every previously signaled
    /// value.
    fn signal(&mut self, value: u64) -> Result<(), DeviceError>;

    /// Highest fence value the device has retired
    fn completed_value(&self) -> u64;

    /// Block the calling thread until `completed_value() >= value`
    ///
    /// The wait is exact (no premature return) and unbounded; a device
    /// that never reaches `value` is a fatal condition, not a timeout.
    fn wait_for(&self, value: u64) -> Result<(), DeviceError>;
}

/// The full device seam consumed by the frame loop
pub trait RenderDevice {
    /// Persistently mapped upload memory
    type Memory: UploadMemory;
    /// Per-frame command allocator
    type Allocator: CommandAllocator;
    /// Work queue type paired with this device
    type Queue: GpuQueue;

    /// Minimum alignment for shader-visible constant blocks (bytes)
    fn min_constant_alignment(&self) -> usize;

    /// Allocate a mapped upload region of `bytes` bytes
    fn create_upload_memory(&mut self, bytes: usize) -> Result<Self::Memory, DeviceError>;

    /// Create a command allocator for one ring slot
    fn create_command_allocator(&mut self) -> Result<Self::Allocator, DeviceError>;

    /// Present the current back buffer and advance the back-buffer index
    fn present(&mut self) -> Result<(), DeviceError>;

    /// Release and recreate the swap-chain buffers at a new size
    ///
    /// All in-flight GPU work must be flushed first; destroying buffers
    /// the GPU might still reference is undefined behavior.
    fn resize_buffers(&mut self, width: u32, height: u32) -> Result<(), DeviceError>;

    /// Current swap-chain extent (width, height)
    fn extent(&self) -> (u32, u32);

    /// Index of the back buffer the next frame renders into
    fn back_buffer_index(&self) -> usize;
}
