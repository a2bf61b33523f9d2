/// CommandList trait - for recording GPU commands

use std::sync::Arc;
use crate::error::Result;
use crate::graphics_device::{
    Buffer, Texture, StorageView, Pipeline, IndexType, SamplerType, TextureRegion,
};

/// Access state of a texture, used by explicit transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceState {
    /// Freshly created, contents undefined
    Unknown,
    /// Sampled / read by shaders
    ShaderRead,
    /// Color attachment
    RenderTarget,
    /// Read/write through storage views
    Storage,
    /// Destination of a texture update
    CopyDest,
}

/// What a render pass does with its color attachment on begin
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LoadOp {
    /// Clear to the given RGBA value
    Clear([f32; 4]),
    /// Keep existing contents
    Load,
    /// Contents are undefined
    DontCare,
}

/// Render pass parameters
#[derive(Clone)]
pub struct RenderPassDesc {
    /// Debug label
    pub label: String,
    /// Color attachment; `None` for passes that only write storage views
    pub color_target: Option<Arc<dyn Texture>>,
    pub load_op: LoadOp,
    /// Render area
    pub width: u32,
    pub height: u32,
}

/// Viewport rectangle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// One resource bound to a shader slot
#[derive(Clone)]
pub enum BindingResource {
    /// Uniform block read from `offset` in the buffer
    UniformBuffer { buffer: Arc<dyn Buffer>, offset: u64 },
    /// Structured buffer read through a shader resource view
    StorageBuffer(Arc<dyn Buffer>),
    /// Sampled texture
    Texture(Arc<dyn Texture>),
    /// Read/write texture
    StorageView(Arc<dyn StorageView>),
    Sampler(SamplerType),
}

/// Named shader slots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BindingSlot {
    FlushUniforms,
    ImageDrawUniforms,
    PathBuffer,
    PaintBuffer,
    PaintAuxBuffer,
    ContourBuffer,
    TessVertexTexture,
    GradTexture,
    ImageTexture,
    GradSampler,
    ImageSampler,
    CoverageBuffer,
    ClipBuffer,
    ColorBuffer,
}

/// A resource bound to a slot
#[derive(Clone)]
pub struct Binding {
    pub slot: BindingSlot,
    pub resource: BindingResource,
}

impl Binding {
    pub fn new(slot: BindingSlot, resource: BindingResource) -> Self {
        Self { slot, resource }
    }
}

/// Parameters of an indexed draw
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexedDraw {
    /// Value added to every index
    pub base_vertex: u32,
    /// First instance id
    pub first_instance: u32,
    /// Number of vertices addressable by the indices
    pub num_vertices: u32,
    /// First index read from the index buffer
    pub start_index: u32,
    pub primitive_count: u32,
    pub instance_count: u32,
}

/// Command list for recording GPU commands
///
/// Commands are recorded between `begin` and `end`, then handed to
/// `GraphicsDevice::submit`. A list that is dropped without being ended and
/// submitted has no effect.
pub trait CommandList: Send + Sync {
    /// Begin recording commands
    fn begin(&mut self) -> Result<()>;

    /// End recording commands
    fn end(&mut self) -> Result<()>;

    /// Upload `data` into `buffer` at `offset` (write-only, no-overwrite)
    fn write_buffer(&mut self, buffer: &Arc<dyn Buffer>, offset: u64, data: &[u8]) -> Result<()>;

    /// Explicit state transition of a texture
    fn transition(&mut self, texture: &Arc<dyn Texture>, from: ResourceState, to: ResourceState) -> Result<()>;

    /// Order storage writes before subsequent storage reads of the same view
    fn storage_barrier(&mut self, view: &Arc<dyn StorageView>) -> Result<()>;

    /// Clear a storage view with an unsigned integer value
    fn clear_storage_uint(&mut self, view: &Arc<dyn StorageView>, value: [u32; 4]) -> Result<()>;

    /// Clear a storage view with a float value
    fn clear_storage_float(&mut self, view: &Arc<dyn StorageView>, value: [f32; 4]) -> Result<()>;

    /// Begin a render pass
    fn begin_render_pass(&mut self, desc: &RenderPassDesc) -> Result<()>;

    /// End the current render pass
    fn end_render_pass(&mut self) -> Result<()>;

    fn set_viewport(&mut self, viewport: Viewport) -> Result<()>;

    fn bind_pipeline(&mut self, pipeline: &Arc<dyn Pipeline>) -> Result<()>;

    /// Bind shader resources for the following draws
    fn set_bindings(&mut self, bindings: &[Binding]) -> Result<()>;

    /// Bind a vertex stream
    ///
    /// # Arguments
    ///
    /// * `stream` - Stream index of the pipeline's vertex layout
    /// * `buffer` - Source buffer
    /// * `offset` - Byte offset of the first element
    fn set_stream_source(&mut self, stream: u32, buffer: &Arc<dyn Buffer>, offset: u64) -> Result<()>;

    /// Non-indexed draw
    fn draw_primitive(&mut self, base_vertex: u32, primitive_count: u32, instance_count: u32) -> Result<()>;

    /// Indexed draw
    fn draw_indexed_primitive(
        &mut self,
        index_buffer: &Arc<dyn Buffer>,
        index_type: IndexType,
        draw: IndexedDraw,
    ) -> Result<()>;

    /// Copy tightly addressed rows from `data` into a texture region
    ///
    /// # Arguments
    ///
    /// * `row_pitch` - Byte distance between consecutive source rows
    fn update_texture_2d(
        &mut self,
        texture: &Arc<dyn Texture>,
        region: TextureRegion,
        row_pitch: u32,
        data: &[u8],
    ) -> Result<()>;
}
