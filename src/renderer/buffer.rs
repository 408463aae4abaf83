const MIN_CAPACITY: u64 = 256;

/// A GPU buffer that grows to fit whatever is uploaded.
///
/// Growing replaces the underlying `wgpu::Buffer` and bumps
/// [`GlBuffer::generation`], so anything holding a bind group over the old
/// buffer knows to rebuild it.
pub struct GlBuffer {
    buffer: wgpu::Buffer,
    label: &'static str,
    usage: wgpu::BufferUsages,
    capacity: u64,
    len: u64,
    generation: u32,
}

impl GlBuffer {
    pub fn new(
        device: &wgpu::Device,
        label: &'static str,
        usage: wgpu::BufferUsages,
        capacity: u64,
    ) -> Self {
        let capacity = grow_capacity(0, capacity);
        let usage = usage | wgpu::BufferUsages::COPY_DST;
        Self {
            buffer: create(device, label, usage, capacity),
            label,
            usage,
            capacity,
            len: 0,
            generation: 0,
        }
    }

    /// Write `data` at offset 0. Returns whether the buffer was reallocated.
    pub fn upload(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, data: &[u8]) -> bool {
        let contents = padded(data);
        let needed = contents.len() as u64;
        let reallocated = needed > self.capacity;
        if reallocated {
            self.capacity = grow_capacity(self.capacity, needed);
            self.buffer = create(device, self.label, self.usage, self.capacity);
            self.generation = self.generation.wrapping_add(1);
            log::trace!("{} grown to {} bytes", self.label, self.capacity);
        }
        if !contents.is_empty() {
            queue.write_buffer(&self.buffer, 0, &contents);
        }
        self.len = data.len() as u64;
        reallocated
    }

    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    /// Bytes written by the last upload.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// The uploaded bytes, or `None` when nothing has been uploaded.
    pub fn slice(&self) -> Option<wgpu::BufferSlice<'_>> {
        (self.len > 0).then(|| self.buffer.slice(..self.len))
    }
}

fn create(device: &wgpu::Device, label: &str, usage: wgpu::BufferUsages, size: u64) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size,
        usage,
        mapped_at_creation: false,
    })
}

/// `queue.write_buffer` requires a multiple of `COPY_BUFFER_ALIGNMENT`.
fn padded(data: &[u8]) -> std::borrow::Cow<'_, [u8]> {
    let align = wgpu::COPY_BUFFER_ALIGNMENT as usize;
    let rem = data.len() % align;
    if rem == 0 {
        std::borrow::Cow::Borrowed(data)
    } else {
        let mut owned = data.to_vec();
        owned.resize(data.len() + align - rem, 0);
        std::borrow::Cow::Owned(owned)
    }
}

/// Next capacity able to hold `needed` bytes: at least double the current
/// one, rounded up to a power of two.
pub(crate) fn grow_capacity(current: u64, needed: u64) -> u64 {
    needed
        .max(current.saturating_mul(2))
        .max(MIN_CAPACITY)
        .next_power_of_two()
}
