//! Shared sampled image drawn by image rect and image mesh batches.
//!
//! Cloned as `Arc<ImageTexture>` into every batch that draws it; the GPU
//! texture is released when the last reference drops.

use std::sync::Arc;
use crate::graphics_device::{Texture, TextureFormat};

pub struct ImageTexture {
    texture: Arc<dyn Texture>,
}

impl ImageTexture {
    pub(crate) fn new(texture: Arc<dyn Texture>) -> Self {
        Self { texture }
    }

    /// GPU texture sampled by image draws
    pub fn texture(&self) -> &Arc<dyn Texture> {
        &self.texture
    }

    pub fn width(&self) -> u32 {
        self.texture.info().width
    }

    pub fn height(&self) -> u32 {
        self.texture.info().height
    }

    pub fn format(&self) -> TextureFormat {
        self.texture.info().format
    }

    pub fn mip_levels(&self) -> u32 {
        self.texture.info().mip_levels
    }
}
