//! Frame resources and the frames-in-flight ring
//!
//! A [`FrameResource`] bundles everything one in-flight frame writes: a
//! command allocator, the per-pass/per-object/per-material constant
//! buffers, an optional dynamic vertex buffer for simulated geometry, and
//! the fence value that retires the slot.
//!
//! [`FrameResourceRing`] rotates a fixed number of slots (3 in the
//! default configuration — enough to hide one full frame of GPU latency
//! beyond double-buffering). The ring's fence wait is the *only*
//! steady-state blocking point in the engine and bounds how far the CPU
//! may run ahead of the GPU to `depth - 1` frames.

use crate::gpu::device::{CommandAllocator, DeviceError, RenderDevice};
use crate::gpu::sync::Synchronizer;
use crate::gpu::upload::{UploadBuffer, UploadKind};
use crate::render::constants::{MaterialConstants, ObjectConstants, PassConstants, Vertex};

/// Default number of frames in flight
///
/// Depth 1 would stall the CPU on a full GPU round-trip every frame;
/// unbounded depth would let the CPU race arbitrarily far ahead. Three
/// slots let the CPU prepare frame `k+1` while the GPU executes `k-1`.
pub const DEFAULT_FRAME_RING_DEPTH: usize = 3;

/// Buffer sizing for one frame-resource slot
///
/// Counts are the maximums seen at scene-build time; buffers are never
/// grown afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameLayout {
    /// Number of render passes per frame (usually 1)
    pub pass_count: usize,
    /// Number of distinct render objects
    pub object_count: usize,
    /// Number of distinct materials
    pub material_count: usize,
    /// Vertex count of the dynamic wave surface, if the scene has one
    pub wave_vertex_count: Option<usize>,
}

impl Default for FrameLayout {
    fn default() -> Self {
        Self {
            pass_count: 1,
            object_count: 0,
            material_count: 0,
            wave_vertex_count: None,
        }
    }
}

/// Per-slot bundle of command allocator, upload buffers, and fence
pub struct FrameResource<D: RenderDevice> {
    /// Command allocator exclusively owned by this slot
    pub allocator: D::Allocator,
    /// Per-pass constants (view/projection, timing, lighting)
    pub pass_constants: UploadBuffer<PassConstants, D::Memory>,
    /// Per-object constants (world and texture transforms)
    pub object_constants: UploadBuffer<ObjectConstants, D::Memory>,
    /// Per-material constants
    pub material_constants: UploadBuffer<MaterialConstants, D::Memory>,
    /// Dynamic wave-surface vertices, present only for scenes with
    /// simulated geometry
    pub wave_vertices: Option<UploadBuffer<Vertex, D::Memory>>,
    fence: u64,
}

impl<D: RenderDevice> FrameResource<D> {
    /// Build one slot's resources on `device`
    pub fn new(device: &mut D, layout: &FrameLayout) -> Result<Self, DeviceError> {
        let allocator = device.create_command_allocator()?;
        let pass_constants =
            UploadBuffer::new(device, layout.pass_count, UploadKind::ConstantBlock)?;
        let object_constants =
            UploadBuffer::new(device, layout.object_count, UploadKind::ConstantBlock)?;
        let material_constants =
            UploadBuffer::new(device, layout.material_count, UploadKind::ConstantBlock)?;
        let wave_vertices = layout
            .wave_vertex_count
            .map(|count| UploadBuffer::new(device, count, UploadKind::VertexStream))
            .transpose()?;

        Ok(Self {
            allocator,
            pass_constants,
            object_constants,
            material_constants,
            wave_vertices,
            fence: 0,
        })
    }

    /// Fence value that retires this slot (0 before first use)
    pub fn fence(&self) -> u64 {
        self.fence
    }
}

/// Fixed-depth rotating collection of frame resources
pub struct FrameResourceRing<D: RenderDevice> {
    slots: Vec<FrameResource<D>>,
    current: usize,
}

impl<D: RenderDevice> FrameResourceRing<D> {
    /// Create `depth` slots sized by `layout`
    pub fn new(device: &mut D, depth: usize, layout: &FrameLayout) -> Result<Self, DeviceError> {
        if depth == 0 {
            return Err(DeviceError::EmptyRing);
        }

        let mut slots = Vec::with_capacity(depth);
        for _ in 0..depth {
            slots.push(FrameResource::new(device, layout)?);
        }

        Ok(Self {
            slots,
            // The first advance() lands on slot 0.
            current: depth - 1,
        })
    }

    /// Number of slots
    pub fn depth(&self) -> usize {
        self.slots.len()
    }

    /// Index of the slot currently being prepared
    pub fn current_index(&self) -> usize {
        self.current
    }

    /// Rotate to the next slot; called exactly once per rendered frame
    pub fn advance(&mut self) -> usize {
        self.current = (self.current + 1) % self.slots.len();
        self.current
    }

    /// The slot currently being prepared
    pub fn current(&self) -> &FrameResource<D> {
        &self.slots[self.current]
    }

    /// Mutable access to the slot currently being prepared
    pub fn current_mut(&mut self) -> &mut FrameResource<D> {
        &mut self.slots[self.current]
    }

    /// Block until the GPU is done with the current slot
    ///
    /// A slot with fence 0 has never been submitted and is free. Otherwise
    /// the slot's buffers may still be read by the GPU until its fence
    /// value retires; every `copy_data` into this slot afterwards is safe
    /// only because of this wait.
    pub fn wait_if_pending(&self, sync: &Synchronizer<D::Queue>) -> Result<(), DeviceError> {
        let fence = self.slots[self.current].fence;
        if fence != 0 && sync.completed_value() < fence {
            log::trace!(
                "frame ring stalling on slot {} (fence {}, completed {})",
                self.current,
                fence,
                sync.completed_value()
            );
            sync.wait_for(fence)?;
        }
        Ok(())
    }

    /// Reset the current slot's command allocator for re-recording
    ///
    /// Only valid after [`Self::wait_if_pending`] for this slot.
    pub fn reset_current_allocator(&mut self) -> Result<(), DeviceError> {
        self.slots[self.current].allocator.reset()
    }

    /// Record the fence value that will retire the current slot
    ///
    /// Called immediately after the slot's GPU work is enqueued, not when
    /// it completes.
    pub fn mark_submitted(&mut self, fence_value: u64) {
        self.slots[self.current].fence = fence_value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::headless::{HeadlessConfig, HeadlessDevice, HeadlessQueue};

    fn ring_fixture(
        lag: usize,
        depth: usize,
    ) -> (
        HeadlessDevice,
        FrameResourceRing<HeadlessDevice>,
        Synchronizer<HeadlessQueue>,
    ) {
        let (mut device, queue) = HeadlessDevice::new(HeadlessConfig {
            gpu_lag_frames: lag,
            ..HeadlessConfig::default()
        });
        let layout = FrameLayout {
            object_count: 4,
            material_count: 2,
            wave_vertex_count: Some(16),
            ..FrameLayout::default()
        };
        let ring = FrameResourceRing::new(&mut device, depth, &layout).unwrap();
        (device, ring, Synchronizer::new(queue))
    }

    #[test]
    fn test_ring_rejects_zero_depth() {
        let (mut device, _queue) = HeadlessDevice::new(HeadlessConfig::default());
        assert!(matches!(
            FrameResourceRing::new(&mut device, 0, &FrameLayout::default()),
            Err(DeviceError::EmptyRing)
        ));
    }

    #[test]
    fn test_advance_rotates_by_one_modulo_depth() {
        let (_device, mut ring, _sync) = ring_fixture(8, 3);
        assert_eq!(ring.advance(), 0);
        assert_eq!(ring.advance(), 1);
        assert_eq!(ring.advance(), 2);
        assert_eq!(ring.advance(), 0);
    }

    #[test]
    fn test_fresh_slot_never_waits() {
        let (_device, mut ring, sync) = ring_fixture(8, 3);
        for _ in 0..3 {
            ring.advance();
            // Fence 0: wait_if_pending must return without touching the
            // queue even though nothing has been signaled.
            ring.wait_if_pending(&sync).unwrap();
        }
    }

    #[test]
    fn test_wait_blocks_until_slot_fence_retires() {
        let (_device, mut ring, mut sync) = ring_fixture(64, 2);

        // Submit through both slots without the GPU retiring anything.
        for _ in 0..2 {
            ring.advance();
            ring.wait_if_pending(&sync).unwrap();
            sync.submit().unwrap();
            let fence = sync.signal().unwrap();
            ring.mark_submitted(fence);
        }

        // Re-entering slot 0 must force the queue to catch up to fence 1.
        ring.advance();
        assert_eq!(ring.current_index(), 0);
        assert!(sync.completed_value() < ring.current().fence());
        ring.wait_if_pending(&sync).unwrap();
        assert!(sync.completed_value() >= ring.current().fence());
    }

    #[test]
    fn test_ring_safety_no_write_into_unretired_slot() {
        // Drive many frames with a lagging GPU and assert the invariant
        // directly: by the time a slot is written, its previous submission
        // has always retired.
        let (_device, mut ring, mut sync) = ring_fixture(2, 3);

        for frame in 0..64_u32 {
            ring.advance();
            ring.wait_if_pending(&sync).unwrap();
            ring.reset_current_allocator().unwrap();

            let prior_fence = ring.current().fence();
            assert!(
                sync.completed_value() >= prior_fence,
                "slot {} written while fence {} unretired (completed {})",
                ring.current_index(),
                prior_fence,
                sync.completed_value()
            );

            let constants = ObjectConstants::default();
            ring.current_mut()
                .object_constants
                .copy_data((frame % 4) as usize, &constants)
                .unwrap();

            sync.submit().unwrap();
            let fence = sync.signal().unwrap();
            ring.mark_submitted(fence);
        }
    }

    #[test]
    fn test_cpu_runs_at_most_depth_minus_one_ahead() {
        let (_device, mut ring, mut sync) = ring_fixture(64, 3);

        for _ in 0..12 {
            ring.advance();
            ring.wait_if_pending(&sync).unwrap();
            sync.submit().unwrap();
            let fence = sync.signal().unwrap();
            ring.mark_submitted(fence);

            let outstanding = sync.last_signaled() - sync.completed_value();
            assert!(outstanding <= ring.depth() as u64);
        }
    }
}
