//! Image asset: encoded or raw pixels turned into an [`ImageTexture`].
//!
//! Encoded bytes may arrive before any renderer exists. `load_image_bytes`
//! defers the decode through `Engine::call_or_register_on_initialized` and
//! reaches the context through `Engine::render_context`, so a load never
//! races render context teardown. Failures are logged and leave the asset
//! without a texture.

use std::sync::{Arc, Mutex};
use crate::engine::Engine;
use crate::error::Result;
use crate::graphics_device::TextureFormat;
use crate::render_context::RenderContext;
use crate::resource::ImageTexture;

pub struct ImageAsset {
    name: String,
    texture: Arc<Mutex<Option<Arc<ImageTexture>>>>,
}

impl ImageAsset {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            texture: Arc::new(Mutex::new(None)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Decoded texture, once a load succeeded
    pub fn texture(&self) -> Option<Arc<ImageTexture>> {
        self.texture.lock().ok().and_then(|texture| texture.clone())
    }

    pub fn has_texture(&self) -> bool {
        self.texture().is_some()
    }

    fn store(slot: &Mutex<Option<Arc<ImageTexture>>>, texture: Arc<ImageTexture>) {
        if let Ok(mut slot) = slot.lock() {
            *slot = Some(texture);
        }
    }

    /// Decode `bytes` once a render context is available
    ///
    /// Runs immediately when the renderer is ready, otherwise when the next
    /// render context is created.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine is not initialized.
    pub fn load_image_bytes(&self, bytes: Vec<u8>) -> Result<()> {
        let slot = self.texture.clone();
        let name = self.name.clone();

        Engine::call_or_register_on_initialized(move || {
            let context = match Engine::render_context() {
                Ok(context) => context,
                Err(_) => {
                    crate::engine_warn!("vectorflow::ImageAsset", "No render context, skipping decode of '{}'", name);
                    return;
                }
            };
            let decoded = match context.lock() {
                Ok(context) => context.decode_image_texture(&bytes),
                Err(_) => {
                    crate::engine_error!("vectorflow::ImageAsset", "RenderContext lock poisoned, skipping '{}'", name);
                    return;
                }
            };
            match decoded {
                Some(texture) => {
                    crate::engine_debug!(
                        "vectorflow::ImageAsset",
                        "Decoded '{}' ({}x{})",
                        name, texture.width(), texture.height()
                    );
                    Self::store(&slot, texture);
                }
                None => {
                    crate::engine_warn!("vectorflow::ImageAsset", "Failed to decode '{}'", name);
                }
            }
        })
    }

    /// Upload already-decoded pixels
    ///
    /// Only tightly packed `R8G8B8A8_UNORM` pixels are accepted.
    pub fn load_texture_pixels(
        &self,
        context: &RenderContext,
        width: u32,
        height: u32,
        format: TextureFormat,
        pixels: Vec<u8>,
    ) -> bool {
        if format != TextureFormat::R8G8B8A8_UNORM {
            crate::engine_error!(
                "vectorflow::ImageAsset",
                "'{}': texture pixels must be R8G8B8A8_UNORM, got {:?}",
                self.name, format
            );
            return false;
        }
        if pixels.len() as u64 != width as u64 * height as u64 * 4 {
            crate::engine_error!(
                "vectorflow::ImageAsset",
                "'{}': {} bytes of pixels do not cover {}x{} RGBA8",
                self.name, pixels.len(), width, height
            );
            return false;
        }

        match context.make_image_texture(width, height, 1, pixels, format) {
            Ok(texture) => {
                Self::store(&self.texture, texture);
                true
            }
            Err(_) => false,
        }
    }

    /// Decode `bytes` on an already available context
    pub fn load_native_asset_bytes(&self, context: &RenderContext, bytes: &[u8]) -> bool {
        match context.decode_image_texture(bytes) {
            Some(texture) => {
                Self::store(&self.texture, texture);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
#[path = "image_asset_tests.rs"]
mod tests;
