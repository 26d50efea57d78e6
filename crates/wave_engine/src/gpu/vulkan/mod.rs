//! Vulkan implementation of the device seam
//!
//! Maps the engine's fence protocol onto a Vulkan 1.2 timeline
//! semaphore: [`Synchronizer::signal`](crate::gpu::Synchronizer::signal)
//! becomes a queue submit that signals the next counter value, and
//! fence waits become `vkWaitSemaphores` on that counter.
//!
//! The device here is offscreen: upload memory, command pools, and the
//! timeline queue are real Vulkan objects, while surface acquisition and
//! presentation stay with the embedding application. `present` only
//! rotates the logical back-buffer index.

mod context;
mod device;
mod timeline;

pub use context::{VulkanContext, VulkanError, VulkanResult};
pub use device::{VulkanAllocator, VulkanDevice, VulkanMemory, VulkanQueue};
pub use timeline::TimelineSemaphore;
