// src/wgpu_utils/uniform_buffer.rs
/// Fixed-size uniform buffer written from a CPU byte block
pub struct UniformBuffer {
    buffer: wgpu::Buffer,
    previous_content: Vec<u8>,
}

impl UniformBuffer {
    /// Create a new uniform buffer of `size` bytes
    pub fn new(device: &wgpu::Device, label: &str, size: u64) -> Self {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&format!("UniformBuffer: {}", label)),
            size,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        UniformBuffer {
            buffer,
            previous_content: Vec::new(),
        }
    }

    /// Update buffer content (skips the write when nothing changed)
    pub fn update_content(&mut self, queue: &wgpu::Queue, new_content: &[u8]) {
        if self.previous_content == new_content {
            return;
        }
        queue.write_buffer(&self.buffer, 0, new_content);
        self.previous_content = new_content.to_vec();
    }

    /// Get binding resource
    pub fn binding_resource(&self) -> wgpu::BindingResource {
        self.buffer.as_entire_binding()
    }
}

/// Uniform buffer addressed with dynamic offsets, one slot per draw
///
/// Slots are `stride` bytes apart, where `stride` is the block size rounded
/// up to the device's `min_uniform_buffer_offset_alignment`. The CPU staging
/// copy is uploaded in a single write per frame.
pub struct DynamicUniformBuffer {
    buffer: wgpu::Buffer,
    label: String,
    block_size: u64,
    stride: u64,
    capacity: usize,
    staging: Vec<u8>,
}

impl DynamicUniformBuffer {
    pub fn new(device: &wgpu::Device, label: &str, block_size: u64, capacity: usize) -> Self {
        let alignment = device.limits().min_uniform_buffer_offset_alignment as u64;
        let stride = align_to(block_size, alignment);
        let capacity = capacity.max(1);

        DynamicUniformBuffer {
            buffer: Self::create_buffer(device, label, stride * capacity as u64),
            label: label.to_string(),
            block_size,
            stride,
            capacity,
            staging: Vec::with_capacity((stride as usize) * capacity),
        }
    }

    fn create_buffer(device: &wgpu::Device, label: &str, size: u64) -> wgpu::Buffer {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    /// Clears staged slots at the start of a frame
    pub fn reset(&mut self) {
        self.staging.clear();
    }

    /// Stages one block and returns its dynamic offset
    pub fn push(&mut self, block: &[u8]) -> u32 {
        debug_assert_eq!(block.len() as u64, self.block_size);
        let offset = self.staging.len();
        self.staging.extend_from_slice(block);
        self.staging.resize(offset + self.stride as usize, 0);
        offset as u32
    }

    pub fn len(&self) -> usize {
        self.staging.len() / self.stride as usize
    }

    pub fn is_empty(&self) -> bool {
        self.staging.is_empty()
    }

    /// Uploads staged slots, growing the GPU buffer when needed.
    ///
    /// Returns true when the buffer was recreated, in which case bind groups
    /// referencing it must be rebuilt.
    pub fn upload(&mut self, device: &wgpu::Device, queue: &wgpu::Queue) -> bool {
        let mut recreated = false;
        if self.len() > self.capacity {
            self.capacity = self.len().next_power_of_two();
            self.buffer =
                Self::create_buffer(device, &self.label, self.stride * self.capacity as u64);
            recreated = true;
        }
        if !self.staging.is_empty() {
            queue.write_buffer(&self.buffer, 0, &self.staging);
        }
        recreated
    }

    /// Binding covering exactly one block; the offset is supplied per draw.
    pub fn binding_resource(&self) -> wgpu::BindingResource {
        wgpu::BindingResource::Buffer(wgpu::BufferBinding {
            buffer: &self.buffer,
            offset: 0,
            size: wgpu::BufferSize::new(self.block_size),
        })
    }
}

pub fn align_to(value: u64, alignment: u64) -> u64 {
    value.div_ceil(alignment) * alignment
}
