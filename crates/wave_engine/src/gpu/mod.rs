//! GPU device seam and frame-pipelining primitives
//!
//! The graphics device itself (command recording, draw calls, swap-chain
//! wire format) is an external capability behind the [`RenderDevice`] and
//! [`GpuQueue`] traits. This module owns the part with real invariants:
//! fence ordering, upload-buffer lifetime, and the frame-resource ring
//! that keeps the CPU from overwriting memory the GPU still reads.
//!
//! Two implementations of the seam ship with the engine:
//! - [`HeadlessDevice`], a deterministic in-process device used by tests
//!   and the demo binaries
//! - a Vulkan device over timeline semaphores, behind the `vulkan` cargo
//!   feature

pub mod device;
pub mod frame;
pub mod headless;
pub mod sync;
pub mod upload;

#[cfg(feature = "vulkan")]
pub mod vulkan;

pub use device::{CommandAllocator, DeviceError, GpuQueue, RenderDevice, UploadMemory};
pub use frame::{FrameLayout, FrameResource, FrameResourceRing, DEFAULT_FRAME_RING_DEPTH};
pub use headless::{HeadlessConfig, HeadlessDevice, HeadlessQueue};
pub use sync::Synchronizer;
pub use upload::{UploadBuffer, UploadKind};
