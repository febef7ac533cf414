//! Dynamic GPU storage buffers with automatic resizing
//!
//! Per-run kernel inputs and outputs change size with the active atom set.
//! These buffers grow by 2x when data exceeds capacity and never shrink.

use std::marker::PhantomData;

/// Minimum allocation; keeps bindings non-empty for empty inputs.
const MIN_CAPACITY: usize = 64;

/// A GPU buffer that can grow dynamically
pub struct DynamicBuffer {
    buffer: wgpu::Buffer,
    capacity: usize, // Capacity in bytes
    usage: wgpu::BufferUsages,
    label: String,
}

impl DynamicBuffer {
    /// Buffer with the given initial byte capacity.
    pub fn new(
        device: &wgpu::Device,
        label: &str,
        initial_capacity: usize,
        usage: wgpu::BufferUsages,
    ) -> Self {
        let capacity = initial_capacity.max(MIN_CAPACITY);
        Self {
            buffer: Self::allocate(device, label, capacity, usage),
            capacity,
            usage,
            label: label.to_owned(),
        }
    }

    fn allocate(
        device: &wgpu::Device,
        label: &str,
        capacity: usize,
        usage: wgpu::BufferUsages,
    ) -> wgpu::Buffer {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: capacity as u64,
            usage: usage | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    /// Grow to hold at least `needed` bytes. Contents are discarded on
    /// reallocation.
    ///
    /// Returns `true` if buffer was reallocated (bind groups need recreation)
    pub fn ensure_capacity(&mut self, device: &wgpu::Device, needed: usize) -> bool {
        if needed <= self.capacity {
            return false;
        }
        // 2x growth, minimum 1KB
        let new_capacity = (needed * 2).max(self.capacity + 1024);
        self.buffer.destroy();
        self.buffer = Self::allocate(device, &self.label, new_capacity, self.usage);
        self.capacity = new_capacity;
        log::debug!("{}: grew to {new_capacity} bytes", self.label);
        true
    }

    /// Write data to buffer, growing if necessary
    ///
    /// Returns `true` if buffer was reallocated (bind groups need recreation)
    pub fn write<T: bytemuck::Pod>(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        data: &[T],
    ) -> bool {
        let data_bytes: &[u8] = bytemuck::cast_slice(data);
        let reallocated = self.ensure_capacity(device, data_bytes.len());
        if !data_bytes.is_empty() {
            queue.write_buffer(&self.buffer, 0, data_bytes);
        }
        reallocated
    }

    /// The underlying wgpu buffer.
    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }
}

/// Typed wrapper for DynamicBuffer with cleaner API
///
/// Sizes are given in items rather than bytes.
pub struct TypedBuffer<T> {
    inner: DynamicBuffer,
    _marker: PhantomData<T>,
}

impl<T: bytemuck::Pod> TypedBuffer<T> {
    /// Specified initial capacity (in items).
    pub fn with_capacity(
        device: &wgpu::Device,
        label: &str,
        capacity: usize,
        usage: wgpu::BufferUsages,
    ) -> Self {
        let initial_capacity = size_of::<T>() * capacity;
        Self {
            inner: DynamicBuffer::new(device, label, initial_capacity, usage),
            _marker: PhantomData,
        }
    }

    /// Write data to buffer, growing if necessary
    ///
    /// Returns `true` if buffer was reallocated (bind groups need recreation)
    pub fn write(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, data: &[T]) -> bool {
        self.inner.write(device, queue, data)
    }

    /// Grow to hold at least `count` items without writing. Used for
    /// buffers the kernel fills.
    ///
    /// Returns `true` if buffer was reallocated (bind groups need recreation)
    pub fn reserve(&mut self, device: &wgpu::Device, count: usize) -> bool {
        self.inner.ensure_capacity(device, count * size_of::<T>())
    }

    /// The underlying wgpu buffer.
    pub fn buffer(&self) -> &wgpu::Buffer {
        self.inner.buffer()
    }
}
