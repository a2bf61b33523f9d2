/// GraphicsDevice trait - factory for GPU resources and command submission

use std::sync::Arc;
use crate::error::Result;
use crate::graphics_device::{
    Buffer, BufferDesc, Texture, TextureDesc, StorageView, Pipeline, PipelineDesc, CommandList,
};

/// Device configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Enable validation/debug layers
    pub enable_validation: bool,
    /// Application name
    pub app_name: String,
    /// Application version (major, minor, patch)
    pub app_version: (u32, u32, u32),
}

impl Default for Config {
    fn default() -> Self {
        Self {
            enable_validation: cfg!(debug_assertions),
            app_name: "Vectorflow Application".to_string(),
            app_version: (1, 0, 0),
        }
    }
}

/// Main graphics device trait
///
/// Implemented by platform backends. All creation methods take `&self`;
/// backends synchronize internally.
pub trait GraphicsDevice: Send + Sync {
    /// Create a buffer, uploading `desc.data` when present
    fn create_buffer(&self, desc: BufferDesc) -> Result<Arc<dyn Buffer>>;

    /// Create a 2D texture, uploading `desc.data` into mip 0 when present
    fn create_texture(&self, desc: TextureDesc) -> Result<Arc<dyn Texture>>;

    /// Create an unordered-access view over a texture created with `TextureUsage::STORAGE`
    fn create_storage_view(&self, texture: &Arc<dyn Texture>) -> Result<Arc<dyn StorageView>>;

    fn create_pipeline(&self, desc: PipelineDesc) -> Result<Arc<dyn Pipeline>>;

    fn create_command_list(&self) -> Result<Box<dyn CommandList>>;

    /// Submit ended command lists for execution, in order
    fn submit(&self, commands: &[&dyn CommandList]) -> Result<()>;

    /// Read back the contents of a buffer after all submitted work completes
    fn read_buffer(&self, buffer: &Arc<dyn Buffer>) -> Result<Vec<u8>>;

    /// Configuration the device was created with
    fn config(&self) -> &Config;
}
