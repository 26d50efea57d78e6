//! Vulkan context initialization
//!
//! Loads the Vulkan entry points, creates an instance, and selects a
//! physical device with a graphics queue family and timeline-semaphore
//! support. Validation layers are enabled in debug builds.

use ash::vk;
use ash::{Device, Entry, Instance};
use std::ffi::CString;
use thiserror::Error;

/// Vulkan-specific error types
#[derive(Error, Debug)]
pub enum VulkanError {
    /// General Vulkan API error with result code
    #[error("Vulkan API error: {0:?}")]
    Api(vk::Result),

    /// Vulkan context initialization failed
    #[error("Initialization failed: {0}")]
    InitializationFailed(String),

    /// No physical device offers a graphics queue plus timeline semaphores
    #[error("No suitable physical device found")]
    NoSuitableDevice,

    /// No suitable memory type found for allocation
    #[error("No suitable memory type found")]
    NoSuitableMemoryType,
}

/// Result type for Vulkan operations
pub type VulkanResult<T> = Result<T, VulkanError>;

/// Owned Vulkan instance, device, and graphics queue handles
pub struct VulkanContext {
    entry: Entry,
    instance: Instance,
    physical_device: vk::PhysicalDevice,
    device: Device,
    graphics_queue: vk::Queue,
    graphics_family: u32,
    memory_properties: vk::PhysicalDeviceMemoryProperties,
    limits: vk::PhysicalDeviceLimits,
}

impl VulkanContext {
    /// Initialize Vulkan and create a logical device
    ///
    /// Requires Vulkan 1.2 for timeline semaphores.
    pub fn new(app_name: &str) -> VulkanResult<Self> {
        let entry = unsafe { Entry::load() }.map_err(|e| {
            VulkanError::InitializationFailed(format!("Failed to load Vulkan: {e:?}"))
        })?;

        let app_name_cstr = CString::new(app_name)
            .map_err(|e| VulkanError::InitializationFailed(e.to_string()))?;
        let engine_name_cstr = CString::new("WaveEngine")
            .map_err(|e| VulkanError::InitializationFailed(e.to_string()))?;
        let app_info = vk::ApplicationInfo::builder()
            .application_name(&app_name_cstr)
            .application_version(vk::make_api_version(0, 1, 0, 0))
            .engine_name(&engine_name_cstr)
            .engine_version(vk::make_api_version(0, 1, 0, 0))
            .api_version(vk::API_VERSION_1_2);

        let layer_names = if cfg!(debug_assertions) {
            vec![CString::new("VK_LAYER_KHRONOS_validation")
                .map_err(|e| VulkanError::InitializationFailed(e.to_string()))?]
        } else {
            vec![]
        };
        let layer_name_ptrs: Vec<*const i8> =
            layer_names.iter().map(|name| name.as_ptr()).collect();

        let create_info = vk::InstanceCreateInfo::builder()
            .application_info(&app_info)
            .enabled_layer_names(&layer_name_ptrs);

        let instance = unsafe {
            entry
                .create_instance(&create_info, None)
                .map_err(VulkanError::Api)?
        };

        let (physical_device, graphics_family) = Self::pick_physical_device(&instance)?;

        let properties = unsafe { instance.get_physical_device_properties(physical_device) };
        let device_name = unsafe {
            std::ffi::CStr::from_ptr(properties.device_name.as_ptr())
                .to_string_lossy()
                .into_owned()
        };
        log::info!("selected GPU: {device_name}");

        let queue_priorities = [1.0_f32];
        let queue_info = vk::DeviceQueueCreateInfo::builder()
            .queue_family_index(graphics_family)
            .queue_priorities(&queue_priorities);
        let queue_infos = [queue_info.build()];

        let mut vulkan12_features =
            vk::PhysicalDeviceVulkan12Features::builder().timeline_semaphore(true);
        let device_create_info = vk::DeviceCreateInfo::builder()
            .queue_create_infos(&queue_infos)
            .push_next(&mut vulkan12_features);

        let device = unsafe {
            instance
                .create_device(physical_device, &device_create_info, None)
                .map_err(VulkanError::Api)?
        };
        let graphics_queue = unsafe { device.get_device_queue(graphics_family, 0) };

        let memory_properties =
            unsafe { instance.get_physical_device_memory_properties(physical_device) };

        Ok(Self {
            entry,
            instance,
            physical_device,
            device,
            graphics_queue,
            graphics_family,
            memory_properties,
            limits: properties.limits,
        })
    }

    fn pick_physical_device(instance: &Instance) -> VulkanResult<(vk::PhysicalDevice, u32)> {
        let devices = unsafe {
            instance
                .enumerate_physical_devices()
                .map_err(VulkanError::Api)?
        };

        let mut fallback = None;
        for device in devices {
            let families =
                unsafe { instance.get_physical_device_queue_family_properties(device) };
            let Some(family) = families
                .iter()
                .position(|f| f.queue_flags.contains(vk::QueueFlags::GRAPHICS))
            else {
                continue;
            };
            let family = u32::try_from(family)
                .map_err(|_| VulkanError::NoSuitableDevice)?;

            let mut vulkan12 = vk::PhysicalDeviceVulkan12Features::default();
            let mut features2 =
                vk::PhysicalDeviceFeatures2::builder().push_next(&mut vulkan12);
            unsafe { instance.get_physical_device_features2(device, &mut features2) };
            if vulkan12.timeline_semaphore != vk::TRUE {
                continue;
            }

            let properties = unsafe { instance.get_physical_device_properties(device) };
            if properties.device_type == vk::PhysicalDeviceType::DISCRETE_GPU {
                return Ok((device, family));
            }
            fallback.get_or_insert((device, family));
        }
        fallback.ok_or(VulkanError::NoSuitableDevice)
    }

    /// Find a memory type matching the filter and property flags
    pub fn find_memory_type(
        &self,
        type_filter: u32,
        properties: vk::MemoryPropertyFlags,
    ) -> VulkanResult<u32> {
        for i in 0..self.memory_properties.memory_type_count {
            let supported = type_filter & (1 << i) != 0;
            let matches = self.memory_properties.memory_types[i as usize]
                .property_flags
                .contains(properties);
            if supported && matches {
                return Ok(i);
            }
        }
        Err(VulkanError::NoSuitableMemoryType)
    }

    /// The logical device
    pub fn device(&self) -> &Device {
        &self.device
    }

    /// The graphics queue handle
    pub fn graphics_queue(&self) -> vk::Queue {
        self.graphics_queue
    }

    /// The graphics queue family index
    pub fn graphics_family(&self) -> u32 {
        self.graphics_family
    }

    /// Physical device limits
    pub fn limits(&self) -> &vk::PhysicalDeviceLimits {
        &self.limits
    }

    /// The Vulkan instance
    pub fn instance(&self) -> &Instance {
        &self.instance
    }

    /// The selected physical device
    pub fn physical_device(&self) -> vk::PhysicalDevice {
        self.physical_device
    }

    /// The loaded entry points
    pub fn entry(&self) -> &Entry {
        &self.entry
    }
}

impl Drop for VulkanContext {
    fn drop(&mut self) {
        unsafe {
            // All child objects must already be destroyed.
            let _ = self.device.device_wait_idle();
            self.device.destroy_device(None);
            self.instance.destroy_instance(None);
        }
    }
}
