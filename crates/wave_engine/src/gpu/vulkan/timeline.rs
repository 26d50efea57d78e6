//! Timeline semaphore wrapper
//!
//! One monotonically increasing 64-bit counter replaces the
//! fence-per-frame pattern: the queue signals successive values, the
//! host waits for a specific value, and the current counter reading is
//! the set of retired submissions.

use crate::gpu::vulkan::context::{VulkanError, VulkanResult};
use ash::vk;
use ash::Device;

/// RAII wrapper around a Vulkan 1.2 timeline semaphore
pub struct TimelineSemaphore {
    device: Device,
    semaphore: vk::Semaphore,
}

impl TimelineSemaphore {
    /// Create a timeline semaphore with an initial value of 0
    pub fn new(device: Device) -> VulkanResult<Self> {
        let mut timeline_create_info = vk::SemaphoreTypeCreateInfo::builder()
            .semaphore_type(vk::SemaphoreType::TIMELINE)
            .initial_value(0);

        let create_info = vk::SemaphoreCreateInfo::builder().push_next(&mut timeline_create_info);

        let semaphore = unsafe {
            device
                .create_semaphore(&create_info, None)
                .map_err(VulkanError::Api)?
        };

        Ok(Self { device, semaphore })
    }

    /// The raw semaphore handle
    pub fn handle(&self) -> vk::Semaphore {
        self.semaphore
    }

    /// Read the current counter value
    pub fn counter_value(&self) -> VulkanResult<u64> {
        unsafe {
            self.device
                .get_semaphore_counter_value(self.semaphore)
                .map_err(VulkanError::Api)
        }
    }

    /// Block until the counter reaches `value`
    pub fn wait_for_value(&self, value: u64, timeout_ns: u64) -> VulkanResult<()> {
        let semaphores = [self.semaphore];
        let values = [value];
        let wait_info = vk::SemaphoreWaitInfo::builder()
            .semaphores(&semaphores)
            .values(&values);

        unsafe {
            self.device
                .wait_semaphores(&wait_info, timeout_ns)
                .map_err(VulkanError::Api)
        }
    }
}

impl Drop for TimelineSemaphore {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_semaphore(self.semaphore, None);
        }
    }
}
