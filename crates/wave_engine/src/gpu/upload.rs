//! Typed upload buffers over persistently mapped device memory
//!
//! An [`UploadBuffer`] holds one fixed-stride array of Pod records in a
//! CPU-writable, GPU-readable region. The region is mapped once at
//! construction and stays mapped until drop, trading a held mapping for
//! the absence of a map/unmap syscall every frame; the CPU never reads
//! it back.
//!
//! The buffer does not synchronize with the GPU. A record must not be
//! overwritten while a submitted instruction stream may still read it —
//! that guarantee comes from the enclosing frame-resource ring's fence
//! wait, not from this type.

use crate::foundation::math::align_up;
use crate::gpu::device::{DeviceError, RenderDevice, UploadMemory};
use std::marker::PhantomData;

/// How an upload buffer is bound by the GPU
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    /// Shader-visible constant block; stride rounds up to the device's
    /// minimum constant alignment (usually 256 bytes)
    ConstantBlock,
    /// Vertex (or similar) stream; stride is the plain record size
    VertexStream,
}

/// Fixed-stride typed array in mapped upload memory
pub struct UploadBuffer<T, M> {
    memory: M,
    stride: usize,
    len: usize,
    _records: PhantomData<fn() -> T>,
}

impl<T: bytemuck::Pod, M: UploadMemory> UploadBuffer<T, M> {
    /// Allocate an upload buffer of `len` records on `device`
    pub fn new<D>(device: &mut D, len: usize, kind: UploadKind) -> Result<Self, DeviceError>
    where
        D: RenderDevice<Memory = M>,
    {
        let stride = match kind {
            UploadKind::ConstantBlock => {
                align_up(std::mem::size_of::<T>(), device.min_constant_alignment())
            }
            UploadKind::VertexStream => std::mem::size_of::<T>(),
        };
        let memory = device.create_upload_memory(stride * len)?;

        Ok(Self {
            memory,
            stride,
            len,
            _records: PhantomData,
        })
    }

    /// Write one record at `index`
    ///
    /// The caller must guarantee no in-flight GPU read of this record.
    pub fn copy_data(&mut self, index: usize, value: &T) -> Result<(), DeviceError> {
        if index >= self.len {
            return Err(DeviceError::IndexOutOfBounds {
                index,
                len: self.len,
            });
        }

        let offset = index * self.stride;
        let size = std::mem::size_of::<T>();
        self.memory.bytes_mut()[offset..offset + size].copy_from_slice(bytemuck::bytes_of(value));
        Ok(())
    }

    /// Element stride in bytes (alignment-rounded for constant blocks)
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the buffer holds no records
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Byte offset of record `index`, for descriptor binding
    pub fn offset_of(&self, index: usize) -> usize {
        index * self.stride
    }

    /// The backing mapped memory, for backends that bind by handle
    pub fn memory(&self) -> &M {
        &self.memory
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::headless::{HeadlessConfig, HeadlessDevice};

    #[derive(Clone, Copy, Debug, PartialEq)]
    #[repr(C)]
    struct Record {
        values: [f32; 3],
        id: u32,
    }

    unsafe impl bytemuck::Zeroable for Record {}
    unsafe impl bytemuck::Pod for Record {}

    #[test]
    fn test_constant_block_stride_rounds_to_alignment() {
        let (mut device, _queue) = HeadlessDevice::new(HeadlessConfig::default());
        let buffer: UploadBuffer<Record, _> =
            UploadBuffer::new(&mut device, 4, UploadKind::ConstantBlock).unwrap();
        assert_eq!(buffer.stride(), 256);
        assert_eq!(buffer.memory().len(), 1024);
        assert_eq!(buffer.offset_of(3), 768);
    }

    #[test]
    fn test_vertex_stream_stride_is_record_size() {
        let (mut device, _queue) = HeadlessDevice::new(HeadlessConfig::default());
        let buffer: UploadBuffer<Record, _> =
            UploadBuffer::new(&mut device, 4, UploadKind::VertexStream).unwrap();
        assert_eq!(buffer.stride(), std::mem::size_of::<Record>());
    }

    #[test]
    fn test_copy_data_writes_at_stride_offsets() {
        let (mut device, _queue) = HeadlessDevice::new(HeadlessConfig::default());
        let mut buffer: UploadBuffer<Record, _> =
            UploadBuffer::new(&mut device, 2, UploadKind::ConstantBlock).unwrap();

        let record = Record {
            values: [1.0, 2.0, 3.0],
            id: 7,
        };
        buffer.copy_data(1, &record).unwrap();

        let bytes = buffer.memory.bytes_mut();
        let written: Record =
            bytemuck::pod_read_unaligned(&bytes[256..256 + std::mem::size_of::<Record>()]);
        assert_eq!(written, record);
        // Element 0 untouched.
        assert!(bytes[..std::mem::size_of::<Record>()].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_copy_data_rejects_out_of_range_index() {
        let (mut device, _queue) = HeadlessDevice::new(HeadlessConfig::default());
        let mut buffer: UploadBuffer<Record, _> =
            UploadBuffer::new(&mut device, 2, UploadKind::VertexStream).unwrap();
        assert_eq!(
            buffer.copy_data(2, &Record { values: [0.0; 3], id: 0 }),
            Err(DeviceError::IndexOutOfBounds { index: 2, len: 2 })
        );
    }
}
