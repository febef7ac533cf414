//! Staging buffers for copying kernel output back to the host.

use crate::error::SurfaceError;

/// Mappable copy target (`MAP_READ | COPY_DST`) that grows on demand.
pub struct ReadbackBuffer {
    buffer: wgpu::Buffer,
    capacity: u64,
    label: String,
}

impl ReadbackBuffer {
    /// Staging buffer of at least `capacity` bytes.
    pub fn new(device: &wgpu::Device, label: &str, capacity: u64) -> Self {
        let capacity = capacity.max(16);
        Self {
            buffer: Self::allocate(device, label, capacity),
            capacity,
            label: label.to_owned(),
        }
    }

    fn allocate(device: &wgpu::Device, label: &str, size: u64) -> wgpu::Buffer {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    /// Grow to at least `needed` bytes.
    pub fn ensure_capacity(&mut self, device: &wgpu::Device, needed: u64) {
        if needed <= self.capacity {
            return;
        }
        let new_capacity = needed.next_power_of_two();
        self.buffer.destroy();
        self.buffer = Self::allocate(device, &self.label, new_capacity);
        self.capacity = new_capacity;
    }

    /// Record a copy of `size` bytes from the start of `source`.
    pub fn copy_from(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        source: &wgpu::Buffer,
        size: u64,
    ) {
        if size > 0 {
            encoder.copy_buffer_to_buffer(source, 0, &self.buffer, 0, size);
        }
    }

    /// Block until the first `count` words are mapped and return them.
    ///
    /// The copy into this buffer must already be submitted.
    ///
    /// # Errors
    ///
    /// Returns [`SurfaceError::GpuResource`] if mapping fails or the device
    /// is lost while waiting.
    pub fn read_u32s(
        &self,
        device: &wgpu::Device,
        count: usize,
    ) -> Result<Vec<u32>, SurfaceError> {
        if count == 0 {
            return Ok(Vec::new());
        }
        let size = (count * size_of::<u32>()) as u64;
        if size > self.capacity {
            return Err(SurfaceError::GpuResource(format!(
                "{}: readback of {size} bytes exceeds {} byte staging buffer",
                self.label, self.capacity
            )));
        }

        let buffer_slice = self.buffer.slice(..size);
        let (sender, receiver) = std::sync::mpsc::channel();
        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });

        if let Err(e) = device.poll(wgpu::PollType::Wait) {
            // Cancels the pending map so the buffer stays usable.
            self.buffer.unmap();
            return Err(SurfaceError::GpuResource(format!(
                "{}: device poll failed: {e}",
                self.label
            )));
        }

        match receiver.recv() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                return Err(SurfaceError::GpuResource(format!(
                    "{}: map failed: {e}",
                    self.label
                )))
            }
            Err(_) => {
                return Err(SurfaceError::GpuResource(format!(
                    "{}: map callback dropped",
                    self.label
                )))
            }
        }

        let data = buffer_slice.get_mapped_range();
        let words = data
            .chunks_exact(4)
            .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect();
        drop(data);
        self.buffer.unmap();
        Ok(words)
    }
}

#[cfg(test)]
mod tests {
    use wgpu::util::DeviceExt;

    use super::*;
    use crate::gpu::ComputeContext;

    #[test]
    fn reads_back_copied_words_and_rejects_oversized_reads() {
        let Ok(context) = pollster::block_on(ComputeContext::new()) else {
            eprintln!("no GPU adapter, skipping");
            return;
        };
        let words: Vec<u32> = (0..10).map(|i| i * 3 + 1).collect();
        let source =
            context
                .device
                .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("readback test source"),
                    contents: bytemuck::cast_slice(&words),
                    usage: wgpu::BufferUsages::COPY_SRC,
                });
        let readback = ReadbackBuffer::new(&context.device, "readback test", 64);

        assert!(matches!(
            readback.read_u32s(&context.device, 17),
            Err(SurfaceError::GpuResource(_))
        ));

        let mut encoder = context.create_encoder("readback test");
        readback.copy_from(&mut encoder, &source, 40);
        context.submit(encoder);
        assert_eq!(readback.read_u32s(&context.device, 10).unwrap(), words);
        assert!(readback.read_u32s(&context.device, 0).unwrap().is_empty());
    }
}
