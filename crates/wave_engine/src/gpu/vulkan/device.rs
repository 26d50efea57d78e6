//! Vulkan render device behind the engine's device seam
//!
//! Upload memory is a persistently mapped host-visible buffer, the
//! command allocator is a `vkCommandPool`, and the queue signals a
//! timeline semaphore in place of per-frame fences.

use crate::gpu::device::{
    CommandAllocator, DeviceError, GpuQueue, RenderDevice, UploadMemory,
};
use crate::gpu::vulkan::context::{VulkanContext, VulkanError, VulkanResult};
use crate::gpu::vulkan::timeline::TimelineSemaphore;
use ash::vk;
use std::sync::Arc;

/// Logical back-buffer count of the offscreen device
const BACK_BUFFER_COUNT: usize = 2;

fn backend(error: VulkanError) -> DeviceError {
    DeviceError::Backend(error.to_string())
}

/// Graphics queue driving a timeline semaphore
pub struct VulkanQueue {
    context: Arc<VulkanContext>,
    queue: vk::Queue,
    timeline: TimelineSemaphore,
    last_signaled: u64,
}

impl GpuQueue for VulkanQueue {
    fn submit(&mut self) -> Result<(), DeviceError> {
        // Command-buffer recording and submission belong to the embedding
        // renderer; the seam only orders the fence signal behind them.
        Ok(())
    }

    fn signal(&mut self, value: u64) -> Result<(), DeviceError> {
        if value <= self.last_signaled {
            return Err(DeviceError::NonMonotonicSignal {
                value,
                current: self.last_signaled,
            });
        }

        let signal_values = [value];
        let mut timeline_info =
            vk::TimelineSemaphoreSubmitInfo::builder().signal_semaphore_values(&signal_values);
        let signal_semaphores = [self.timeline.handle()];
        let submit_info = vk::SubmitInfo::builder()
            .signal_semaphores(&signal_semaphores)
            .push_next(&mut timeline_info);

        unsafe {
            self.context
                .device()
                .queue_submit(self.queue, &[submit_info.build()], vk::Fence::null())
                .map_err(VulkanError::Api)
                .map_err(backend)?;
        }
        self.last_signaled = value;
        Ok(())
    }

    fn completed_value(&self) -> u64 {
        self.timeline.counter_value().unwrap_or_else(|e| {
            log::error!("timeline counter read failed: {e}");
            0
        })
    }

    fn wait_for(&self, value: u64) -> Result<(), DeviceError> {
        if value > self.last_signaled {
            return Err(DeviceError::WaitNeverSignaled {
                value,
                last: self.last_signaled,
            });
        }
        self.timeline
            .wait_for_value(value, u64::MAX)
            .map_err(backend)
    }
}

/// Persistently mapped host-visible upload buffer
pub struct VulkanMemory {
    context: Arc<VulkanContext>,
    buffer: vk::Buffer,
    memory: vk::DeviceMemory,
    mapped: *mut u8,
    len: usize,
}

impl VulkanMemory {
    fn new(context: Arc<VulkanContext>, len: usize) -> VulkanResult<Self> {
        let buffer_info = vk::BufferCreateInfo::builder()
            .size(len as vk::DeviceSize)
            .usage(vk::BufferUsageFlags::UNIFORM_BUFFER | vk::BufferUsageFlags::VERTEX_BUFFER)
            .sharing_mode(vk::SharingMode::EXCLUSIVE);

        let device = context.device();
        let buffer = unsafe {
            device
                .create_buffer(&buffer_info, None)
                .map_err(VulkanError::Api)?
        };

        let requirements = unsafe { device.get_buffer_memory_requirements(buffer) };
        let memory_type_index = context.find_memory_type(
            requirements.memory_type_bits,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
        )?;

        let alloc_info = vk::MemoryAllocateInfo::builder()
            .allocation_size(requirements.size)
            .memory_type_index(memory_type_index);
        let memory = unsafe {
            device
                .allocate_memory(&alloc_info, None)
                .map_err(VulkanError::Api)?
        };

        unsafe {
            device
                .bind_buffer_memory(buffer, memory, 0)
                .map_err(VulkanError::Api)?;
        }

        // Mapped once here, unmapped on drop.
        let mapped = unsafe {
            device
                .map_memory(memory, 0, len as vk::DeviceSize, vk::MemoryMapFlags::empty())
                .map_err(VulkanError::Api)?
        }
        .cast::<u8>();

        Ok(Self {
            context,
            buffer,
            memory,
            mapped,
            len,
        })
    }

    /// The raw buffer handle, for binding in the embedding renderer
    pub fn handle(&self) -> vk::Buffer {
        self.buffer
    }
}

impl UploadMemory for VulkanMemory {
    fn len(&self) -> usize {
        self.len
    }

    fn bytes_mut(&mut self) -> &mut [u8] {
        unsafe { std::slice::from_raw_parts_mut(self.mapped, self.len) }
    }
}

impl Drop for VulkanMemory {
    fn drop(&mut self) {
        unsafe {
            let device = self.context.device();
            device.unmap_memory(self.memory);
            device.destroy_buffer(self.buffer, None);
            device.free_memory(self.memory, None);
        }
    }
}

/// Command pool owned by one frame-resource slot
pub struct VulkanAllocator {
    context: Arc<VulkanContext>,
    pool: vk::CommandPool,
}

impl VulkanAllocator {
    fn new(context: Arc<VulkanContext>) -> VulkanResult<Self> {
        let pool_info = vk::CommandPoolCreateInfo::builder()
            .queue_family_index(context.graphics_family());
        let pool = unsafe {
            context
                .device()
                .create_command_pool(&pool_info, None)
                .map_err(VulkanError::Api)?
        };
        Ok(Self { context, pool })
    }

    /// The raw command pool handle
    pub fn handle(&self) -> vk::CommandPool {
        self.pool
    }
}

impl CommandAllocator for VulkanAllocator {
    fn reset(&mut self) -> Result<(), DeviceError> {
        unsafe {
            self.context
                .device()
                .reset_command_pool(self.pool, vk::CommandPoolResetFlags::empty())
                .map_err(VulkanError::Api)
                .map_err(backend)
        }
    }
}

impl Drop for VulkanAllocator {
    fn drop(&mut self) {
        unsafe {
            self.context.device().destroy_command_pool(self.pool, None);
        }
    }
}

/// Offscreen Vulkan render device
pub struct VulkanDevice {
    context: Arc<VulkanContext>,
    min_constant_alignment: usize,
    extent: (u32, u32),
    back_buffer: usize,
}

impl VulkanDevice {
    /// Initialize Vulkan and create the device/queue pair
    pub fn new(app_name: &str, extent: (u32, u32)) -> VulkanResult<(Self, VulkanQueue)> {
        let context = Arc::new(VulkanContext::new(app_name)?);
        let timeline = TimelineSemaphore::new(context.device().clone())?;

        let min_constant_alignment =
            usize::try_from(context.limits().min_uniform_buffer_offset_alignment)
                .unwrap_or(256)
                .max(256);

        let queue = VulkanQueue {
            context: Arc::clone(&context),
            queue: context.graphics_queue(),
            timeline,
            last_signaled: 0,
        };
        let device = Self {
            context,
            min_constant_alignment,
            extent,
            back_buffer: 0,
        };
        Ok((device, queue))
    }

    /// The shared Vulkan context
    pub fn context(&self) -> &Arc<VulkanContext> {
        &self.context
    }
}

impl RenderDevice for VulkanDevice {
    type Memory = VulkanMemory;
    type Allocator = VulkanAllocator;
    type Queue = VulkanQueue;

    fn min_constant_alignment(&self) -> usize {
        self.min_constant_alignment
    }

    fn create_upload_memory(&mut self, bytes: usize) -> Result<Self::Memory, DeviceError> {
        VulkanMemory::new(Arc::clone(&self.context), bytes).map_err(backend)
    }

    fn create_command_allocator(&mut self) -> Result<Self::Allocator, DeviceError> {
        VulkanAllocator::new(Arc::clone(&self.context)).map_err(backend)
    }

    fn present(&mut self) -> Result<(), DeviceError> {
        self.back_buffer = (self.back_buffer + 1) % BACK_BUFFER_COUNT;
        Ok(())
    }

    fn resize_buffers(&mut self, width: u32, height: u32) -> Result<(), DeviceError> {
        // The engine drains the queue before calling this; verify.
        unsafe {
            self.context
                .device()
                .device_wait_idle()
                .map_err(VulkanError::Api)
                .map_err(backend)?;
        }
        self.extent = (width, height);
        self.back_buffer = 0;
        Ok(())
    }

    fn extent(&self) -> (u32, u32) {
        self.extent
    }

    fn back_buffer_index(&self) -> usize {
        self.back_buffer
    }
}
