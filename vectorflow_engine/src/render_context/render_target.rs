//! Per-surface auxiliary resources for atomic-coverage rendering

use std::sync::Arc;
use crate::error::Result;
use crate::graphics_device::{
    GraphicsDevice, CommandList, Texture, TextureDesc, TextureFormat, TextureUsage, StorageView,
    ResourceState,
};

/// Destination texture plus the coverage, clip and scratch color textures
/// sized to it, each with a storage view
pub struct RenderTarget {
    texture: Arc<dyn Texture>,
    coverage_texture: Arc<dyn Texture>,
    clip_texture: Arc<dyn Texture>,
    scratch_color_texture: Arc<dyn Texture>,
    coverage_view: Arc<dyn StorageView>,
    clip_view: Arc<dyn StorageView>,
    scratch_color_view: Arc<dyn StorageView>,
    target_view: Arc<dyn StorageView>,
}

impl RenderTarget {
    /// Create the auxiliary textures and record their transitions (and the
    /// destination's) from `Unknown` to `Storage` into `cmd`
    ///
    /// The destination must have been created with `TextureUsage::STORAGE`.
    pub fn new(
        device: &dyn GraphicsDevice,
        cmd: &mut dyn CommandList,
        destination: Arc<dyn Texture>,
    ) -> Result<Self> {
        let (width, height) = (destination.info().width, destination.info().height);

        let aux = |label: &str, format: TextureFormat, extra: TextureUsage| {
            device.create_texture(TextureDesc {
                width,
                height,
                mip_levels: 1,
                format,
                usage: TextureUsage::STORAGE | extra,
                label: label.to_string(),
                data: None,
            })
        };

        let coverage_texture = aux("atomic_coverage", TextureFormat::R32_UINT, TextureUsage::MEMORYLESS)?;
        let scratch_color_texture = aux("scratch_color", TextureFormat::R8G8B8A8_UNORM, TextureUsage::empty())?;
        let clip_texture = aux("clip", TextureFormat::R32_UINT, TextureUsage::empty())?;

        for texture in [&coverage_texture, &scratch_color_texture, &clip_texture, &destination] {
            cmd.transition(texture, ResourceState::Unknown, ResourceState::Storage)?;
        }

        let coverage_view = device.create_storage_view(&coverage_texture)?;
        let clip_view = device.create_storage_view(&clip_texture)?;
        let scratch_color_view = device.create_storage_view(&scratch_color_texture)?;
        let target_view = device.create_storage_view(&destination)?;

        crate::engine_debug!("vectorflow::RenderTarget", "Created render target {}x{}", width, height);

        Ok(Self {
            texture: destination,
            coverage_texture,
            clip_texture,
            scratch_color_texture,
            coverage_view,
            clip_view,
            scratch_color_view,
            target_view,
        })
    }

    /// Destination texture
    pub fn texture(&self) -> &Arc<dyn Texture> {
        &self.texture
    }

    pub fn width(&self) -> u32 {
        self.texture.info().width
    }

    pub fn height(&self) -> u32 {
        self.texture.info().height
    }

    pub fn coverage_texture(&self) -> &Arc<dyn Texture> {
        &self.coverage_texture
    }

    pub fn clip_texture(&self) -> &Arc<dyn Texture> {
        &self.clip_texture
    }

    pub fn scratch_color_texture(&self) -> &Arc<dyn Texture> {
        &self.scratch_color_texture
    }

    pub fn coverage_view(&self) -> &Arc<dyn StorageView> {
        &self.coverage_view
    }

    pub fn clip_view(&self) -> &Arc<dyn StorageView> {
        &self.clip_view
    }

    pub fn scratch_color_view(&self) -> &Arc<dyn StorageView> {
        &self.scratch_color_view
    }

    /// Storage view over the destination texture
    pub fn target_view(&self) -> &Arc<dyn StorageView> {
        &self.target_view
    }
}

#[cfg(test)]
#[path = "render_target_tests.rs"]
mod tests;
