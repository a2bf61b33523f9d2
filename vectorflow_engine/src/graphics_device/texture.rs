/// Texture trait, texture descriptor, storage views and samplers

use std::sync::Arc;
use bitflags::bitflags;

/// Texel format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(non_camel_case_types)]
pub enum TextureFormat {
    R8G8B8A8_UNORM,
    B8G8R8A8_UNORM,
    R32_UINT,
    R32G32B32A32_UINT,
}

impl TextureFormat {
    /// Bytes per texel
    pub fn bytes_per_pixel(&self) -> u32 {
        match self {
            TextureFormat::R8G8B8A8_UNORM
            | TextureFormat::B8G8R8A8_UNORM
            | TextureFormat::R32_UINT => 4,
            TextureFormat::R32G32B32A32_UINT => 16,
        }
    }
}

bitflags! {
    /// Texture usage flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TextureUsage: u32 {
        /// Sampled in shaders
        const SAMPLED = 1 << 0;
        /// Color attachment of a render pass
        const RENDER_TARGET = 1 << 1;
        /// Read/write through a storage view
        const STORAGE = 1 << 2;
        /// Contents need not survive outside a pass (tile memory when available)
        const MEMORYLESS = 1 << 3;
        /// Destination of texture updates
        const COPY_DST = 1 << 4;
    }
}

/// Descriptor for creating a 2D texture
#[derive(Debug, Clone)]
pub struct TextureDesc {
    pub width: u32,
    pub height: u32,
    pub mip_levels: u32,
    pub format: TextureFormat,
    pub usage: TextureUsage,
    /// Debug label
    pub label: String,
    /// Optional mip 0 contents, tightly packed rows
    pub data: Option<Vec<u8>>,
}

/// Read-only properties of a created texture
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureInfo {
    pub width: u32,
    pub height: u32,
    pub mip_levels: u32,
    pub format: TextureFormat,
    pub usage: TextureUsage,
}

impl TextureInfo {
    /// Size of mip 0 in bytes
    pub fn byte_size(&self) -> u64 {
        self.width as u64 * self.height as u64 * self.format.bytes_per_pixel() as u64
    }
}

/// Texture resource trait
///
/// Implemented by backend-specific texture types.
/// The texture is destroyed when the last `Arc` drops.
pub trait Texture: Send + Sync {
    /// Backend-unique identifier
    fn id(&self) -> u64;

    /// Read-only properties of this texture
    fn info(&self) -> &TextureInfo;
}

/// Unordered-access view over a storage texture
pub trait StorageView: Send + Sync {
    /// Backend-unique identifier
    fn id(&self) -> u64;

    /// Texture the view covers
    fn texture(&self) -> &Arc<dyn Texture>;
}

/// Fixed sampler states bound alongside draw resources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SamplerType {
    /// Linear filtering, clamp to edge (gradient ramps)
    LinearClamp,
    /// Point filtering, clamp to edge (images)
    PointClamp,
}

/// Destination region of a texture update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}
