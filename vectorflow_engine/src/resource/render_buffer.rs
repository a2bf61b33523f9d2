//! Client-owned vertex and index buffers for image meshes.
//!
//! A RenderBuffer wraps a buffer ring sized to the requested byte size.
//! Writes go through a [`RenderBufferMapping`] guard that stages the bytes
//! and commits them on drop; the flush uploads them before the first draw
//! that reads them. While a mapping is alive, `map` and `sync` fail.
//!
//! Buffers created with `MAPPED_ONCE_AT_INITIALIZATION` are mapped when they
//! are created and never rotate: the first `map` returns that mapping and
//! later `map` calls fail.

use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use bitflags::bitflags;
use bytemuck::Pod;
use crate::error::Result;
use crate::{engine_bail, engine_err};
use crate::graphics_device::{GraphicsDevice, Buffer, CommandList};
use crate::render_context::buffer_ring::{BufferRing, BufferRingKind};

// ===== RENDER BUFFER TYPE =====

/// What the buffer feeds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderBufferType {
    /// `glam::Vec2` vertex positions or texture coordinates
    Vertex,
    /// `u16` triangle indices
    Index,
}

impl RenderBufferType {
    /// Element size in bytes
    pub fn stride(&self) -> usize {
        match self {
            RenderBufferType::Vertex => 8,
            RenderBufferType::Index => 2,
        }
    }

    fn ring_kind(&self) -> BufferRingKind {
        match self {
            RenderBufferType::Vertex => BufferRingKind::Vertex,
            RenderBufferType::Index => BufferRingKind::Index,
        }
    }
}

bitflags! {
    /// Creation flags of a render buffer
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct RenderBufferFlags: u32 {
        /// Written exactly once, right after creation
        const MAPPED_ONCE_AT_INITIALIZATION = 1 << 0;
    }
}

// ===== RENDER BUFFER =====

struct RenderBufferState {
    ring: BufferRing,
    /// Written since the last upload
    dirty: bool,
    /// `MAPPED_ONCE_AT_INITIALIZATION` buffer whose single mapping was handed out
    consumed: bool,
    /// A `RenderBufferMapping` is alive
    mapped: bool,
}

pub struct RenderBuffer {
    buffer_type: RenderBufferType,
    flags: RenderBufferFlags,
    size_in_bytes: usize,
    state: Mutex<RenderBufferState>,
}

impl RenderBuffer {
    /// Create a render buffer of `size_in_bytes` (must be > 0)
    pub(crate) fn new(
        device: &dyn GraphicsDevice,
        buffer_type: RenderBufferType,
        flags: RenderBufferFlags,
        size_in_bytes: usize,
    ) -> Result<Self> {
        let label = match buffer_type {
            RenderBufferType::Vertex => "render_vertex_buffer",
            RenderBufferType::Index => "render_index_buffer",
        };
        let mut ring = BufferRing::new(device, buffer_type.ring_kind(), size_in_bytes, buffer_type.stride(), label)?;

        if flags.contains(RenderBufferFlags::MAPPED_ONCE_AT_INITIALIZATION) {
            ring.map(size_in_bytes)?;
        }

        Ok(Self {
            buffer_type,
            flags,
            size_in_bytes,
            state: Mutex::new(RenderBufferState { ring, dirty: false, consumed: false, mapped: false }),
        })
    }

    pub fn buffer_type(&self) -> RenderBufferType {
        self.buffer_type
    }

    pub fn flags(&self) -> RenderBufferFlags {
        self.flags
    }

    pub fn size_in_bytes(&self) -> usize {
        self.size_in_bytes
    }

    fn lock(&self) -> Result<MutexGuard<'_, RenderBufferState>> {
        self.state.lock()
            .map_err(|_| engine_err!("vectorflow::RenderBuffer", "RenderBuffer lock poisoned"))
    }

    /// Open the buffer for writing
    ///
    /// Rotates to a fresh backing buffer unless the buffer was created
    /// `MAPPED_ONCE_AT_INITIALIZATION`, in which case the creation-time
    /// mapping is returned the first time and every later call fails.
    pub fn map(&self) -> Result<RenderBufferMapping<'_>> {
        let mut state = self.lock()?;

        if state.mapped {
            engine_bail!("vectorflow::RenderBuffer", "RenderBuffer is already mapped");
        }

        if self.flags.contains(RenderBufferFlags::MAPPED_ONCE_AT_INITIALIZATION) {
            if state.consumed {
                engine_bail!(
                    "vectorflow::RenderBuffer",
                    "RenderBuffer created MAPPED_ONCE_AT_INITIALIZATION cannot be mapped again"
                );
            }
            state.consumed = true;
            state.ring.remap();
        } else {
            state.ring.map(self.size_in_bytes)?;
        }
        state.mapped = true;

        let staging = state.ring.shadow()[..self.size_in_bytes].to_vec();
        Ok(RenderBufferMapping { buffer: self, staging })
    }

    /// Upload pending writes into the current backing buffer
    ///
    /// Records nothing when the contents were already uploaded.
    pub fn sync(&self, cmd: &mut dyn CommandList) -> Result<bool> {
        let mut state = self.lock()?;
        if state.mapped {
            engine_bail!("vectorflow::RenderBuffer", "RenderBuffer cannot be uploaded while mapped");
        }
        if !state.dirty {
            return Ok(false);
        }
        state.ring.sync_range(cmd, 0, self.size_in_bytes)?;
        state.dirty = false;
        Ok(true)
    }

    /// GPU buffer draws read from
    pub fn contents(&self) -> Result<Arc<dyn Buffer>> {
        let state = self.lock()?;
        match state.ring.contents() {
            Some(buffer) => Ok(buffer.clone()),
            None => engine_bail!("vectorflow::RenderBuffer", "RenderBuffer has no GPU backing"),
        }
    }
}

// ===== MAPPING GUARD =====

/// Write access to a mapped render buffer; commits and unmaps when dropped
pub struct RenderBufferMapping<'a> {
    buffer: &'a RenderBuffer,
    staging: Vec<u8>,
}

impl RenderBufferMapping<'_> {
    /// Copy `data` to the start of the mapping
    pub fn write<T: Pod>(&mut self, data: &[T]) -> Result<()> {
        let bytes: &[u8] = bytemuck::cast_slice(data);
        if bytes.len() > self.staging.len() {
            engine_bail!(
                "vectorflow::RenderBuffer",
                "write of {} bytes exceeds RenderBuffer size of {} bytes",
                bytes.len(), self.staging.len()
            );
        }
        self.staging[..bytes.len()].copy_from_slice(bytes);
        Ok(())
    }
}

impl Deref for RenderBufferMapping<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.staging
    }
}

impl DerefMut for RenderBufferMapping<'_> {
    fn deref_mut(&mut self) -> &mut [u8] {
        &mut self.staging
    }
}

impl Drop for RenderBufferMapping<'_> {
    fn drop(&mut self) {
        let mut state = self.buffer.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.ring.shadow_mut()[..self.staging.len()].copy_from_slice(&self.staging);
        state.ring.unmap();
        state.dirty = true;
        state.mapped = false;
    }
}

#[cfg(test)]
#[path = "render_buffer_tests.rs"]
mod tests;
