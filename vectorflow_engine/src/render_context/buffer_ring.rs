//! Triple-buffered upload rings
//!
//! A ring owns a CPU shadow region plus [`BUFFER_RING_SIZE`] same-shape GPU
//! buffers. `map` rotates to the next GPU buffer and hands out the shadow;
//! `sync_*` records an upload of a shadow range into the current GPU buffer.
//! Nothing written in an earlier frame is assumed to survive.

use std::sync::Arc;
use crate::engine_bail;
use crate::error::Result;
use crate::graphics_device::{GraphicsDevice, Buffer, BufferDesc, BufferUsage, CommandList};
use crate::render_context::gpu_data::BUFFER_RING_SIZE;

/// What the ring's GPU buffers are used for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferRingKind {
    /// Vertex stream source
    Vertex,
    /// 16-bit index source
    Index,
    /// Uniform blocks addressed by byte offset
    Uniform,
    /// Structured storage buffer addressed by element
    Structured,
    /// CPU-only; the shadow is the source of texture updates
    Heap,
}

impl BufferRingKind {
    fn usage(&self) -> Option<BufferUsage> {
        match self {
            BufferRingKind::Vertex => Some(BufferUsage::Vertex),
            BufferRingKind::Index => Some(BufferUsage::Index),
            BufferRingKind::Uniform => Some(BufferUsage::Uniform),
            BufferRingKind::Structured => Some(BufferUsage::Storage),
            BufferRingKind::Heap => None,
        }
    }
}

pub struct BufferRing {
    kind: BufferRingKind,
    label: String,
    capacity: usize,
    stride: usize,
    shadow: Vec<u8>,
    buffers: Vec<Arc<dyn Buffer>>,
    current: usize,
    mapped: bool,
    last_map_size: usize,
}

impl BufferRing {
    /// Allocate the shadow and the GPU buffers (none for `Heap`)
    ///
    /// # Arguments
    ///
    /// * `capacity` - Size in bytes of the shadow and of each GPU buffer, must be > 0
    /// * `stride` - Element size (uniform block size for `Uniform` rings)
    pub fn new(
        device: &dyn GraphicsDevice,
        kind: BufferRingKind,
        capacity: usize,
        stride: usize,
        label: &str,
    ) -> Result<Self> {
        if capacity == 0 {
            engine_bail!("vectorflow::BufferRing", "ring '{}' created with zero capacity", label);
        }

        let mut buffers = Vec::new();
        if let Some(usage) = kind.usage() {
            for i in 0..BUFFER_RING_SIZE {
                buffers.push(device.create_buffer(BufferDesc::new(
                    format!("{}[{}]", label, i),
                    capacity as u64,
                    usage,
                    stride as u32,
                ))?);
            }
        }

        crate::engine_trace!(
            "vectorflow::BufferRing",
            "Allocated {:?} ring '{}' ({} bytes, stride {})",
            kind, label, capacity, stride
        );

        Ok(Self {
            kind,
            label: label.to_string(),
            capacity,
            stride,
            shadow: vec![0u8; capacity],
            buffers,
            // map() advances before use, so the first frame lands on buffer 0
            current: BUFFER_RING_SIZE - 1,
            mapped: false,
            last_map_size: 0,
        })
    }

    pub fn kind(&self) -> BufferRingKind {
        self.kind
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Capacity in bytes
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Index of the backing buffer the next sync writes to
    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn is_mapped(&self) -> bool {
        self.mapped
    }

    /// Size requested by the most recent `map`
    pub fn last_map_size(&self) -> usize {
        self.last_map_size
    }

    /// Rotate to the next backing buffer and expose the shadow for writing
    ///
    /// The returned slice covers the whole capacity, which is at least
    /// `requested` bytes.
    pub fn map(&mut self, requested: usize) -> Result<&mut [u8]> {
        if requested > self.capacity {
            engine_bail!(
                "vectorflow::BufferRing",
                "map of {} bytes exceeds ring '{}' capacity of {} bytes",
                requested, self.label, self.capacity
            );
        }
        self.current = (self.current + 1) % BUFFER_RING_SIZE;
        self.mapped = true;
        self.last_map_size = requested;
        Ok(&mut self.shadow[..])
    }

    /// Reopen the write window on the current backing buffer without rotating
    pub fn remap(&mut self) -> &mut [u8] {
        self.mapped = true;
        &mut self.shadow[..]
    }

    /// End the write window opened by `map`
    pub fn unmap(&mut self) {
        self.mapped = false;
    }

    /// Shadow contents (valid between `map` and the next sync)
    pub fn shadow(&self) -> &[u8] {
        &self.shadow
    }

    pub(crate) fn shadow_mut(&mut self) -> &mut [u8] {
        &mut self.shadow
    }

    /// GPU buffer the current frame reads from; `None` for heap rings
    pub fn contents(&self) -> Option<&Arc<dyn Buffer>> {
        self.buffers.get(self.current)
    }

    /// Upload the whole shadow
    pub fn sync_all(&self, cmd: &mut dyn CommandList) -> Result<bool> {
        self.sync_range(cmd, 0, self.capacity)
    }

    /// Upload the bytes requested by the most recent `map`
    pub fn sync_mapped(&self, cmd: &mut dyn CommandList) -> Result<bool> {
        self.sync_range(cmd, 0, self.last_map_size)
    }

    /// Upload `len` shadow bytes starting at `offset` to the same offset of the current buffer
    ///
    /// Returns whether an upload was recorded: heap rings and empty ranges
    /// record nothing.
    pub fn sync_range(&self, cmd: &mut dyn CommandList, offset: usize, len: usize) -> Result<bool> {
        if offset + len > self.capacity {
            engine_bail!(
                "vectorflow::BufferRing",
                "sync of [{}, {}) is outside ring '{}' ({} bytes)",
                offset, offset + len, self.label, self.capacity
            );
        }
        let Some(buffer) = self.contents() else {
            return Ok(false);
        };
        if len == 0 {
            return Ok(false);
        }
        cmd.write_buffer(buffer, offset as u64, &self.shadow[offset..offset + len])?;
        Ok(true)
    }

    /// Upload `count` elements starting at element `first`
    pub fn sync_elements(&self, cmd: &mut dyn CommandList, first: usize, count: usize) -> Result<bool> {
        self.sync_range(cmd, first * self.stride, count * self.stride)
    }

    /// Upload the uniform block starting at `offset`
    ///
    /// The block is `stride` bytes, shortened when the ring ends first.
    pub fn sync_block(&self, cmd: &mut dyn CommandList, offset: usize) -> Result<bool> {
        if offset >= self.capacity {
            engine_bail!(
                "vectorflow::BufferRing",
                "uniform offset {} is outside ring '{}' ({} bytes)",
                offset, self.label, self.capacity
            );
        }
        let len = self.stride.min(self.capacity - offset);
        self.sync_range(cmd, offset, len)
    }
}

#[cfg(test)]
#[path = "buffer_ring_tests.rs"]
mod tests;
