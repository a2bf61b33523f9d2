//! One frame's flush payload

use std::sync::Arc;
use bitflags::bitflags;
use crate::render_context::RenderTarget;
use crate::resource::{ImageTexture, RenderBuffer};

bitflags! {
    /// Shader features enabled for a batch or a whole flush
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ShaderFeatures: u32 {
        const ENABLE_CLIPPING = 1 << 0;
        const ENABLE_CLIP_RECT = 1 << 1;
        const ENABLE_ADVANCED_BLEND = 1 << 2;
        const ENABLE_EVEN_ODD = 1 << 3;
        const ENABLE_NESTED_CLIPPING = 1 << 4;
        const ENABLE_HSL_BLEND_MODES = 1 << 5;
    }
}

/// Kind of draw in the batch list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DrawType {
    MidpointFanPatches,
    OuterCurvePatches,
    InteriorTriangulation,
    ImageRect,
    ImageMesh,
    GpuAtomicResolve,
    GpuAtomicInitialize,
    StencilClipReset,
}

/// What happens to the destination before the draw-batch pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadAction {
    /// Clear to `FlushDescriptor::clear_color`
    Clear,
    PreserveRenderTarget,
    DontCare,
}

/// Element layout of a structured storage buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBufferStructure {
    Uint32x4,
    Uint32x2,
    Float32x4,
}

impl StorageBufferStructure {
    /// Element size in bytes
    pub fn element_size(&self) -> usize {
        match self {
            StorageBufferStructure::Uint32x4 => 16,
            StorageBufferStructure::Uint32x2 => 8,
            StorageBufferStructure::Float32x4 => 16,
        }
    }
}

/// External buffers of an image mesh draw
#[derive(Clone)]
pub struct ImageMeshBuffers {
    pub vertex: Arc<RenderBuffer>,
    pub uv: Arc<RenderBuffer>,
    pub index: Arc<RenderBuffer>,
}

/// One ordered draw of the flush
#[derive(Clone)]
pub struct DrawBatch {
    pub draw_type: DrawType,
    pub base_element: u32,
    pub element_count: u32,
    pub shader_features: ShaderFeatures,
    /// Image drawn by `ImageRect` / `ImageMesh`
    pub image_texture: Option<Arc<ImageTexture>>,
    /// Byte offset of this draw's image uniforms
    pub image_draw_data_offset: u64,
    pub mesh: Option<ImageMeshBuffers>,
}

impl DrawBatch {
    pub fn new(draw_type: DrawType, base_element: u32, element_count: u32) -> Self {
        Self {
            draw_type,
            base_element,
            element_count,
            shader_features: ShaderFeatures::empty(),
            image_texture: None,
            image_draw_data_offset: 0,
            mesh: None,
        }
    }

    pub fn with_features(mut self, features: ShaderFeatures) -> Self {
        self.shader_features = features;
        self
    }

    pub fn with_image(mut self, texture: Arc<ImageTexture>, image_draw_data_offset: u64) -> Self {
        self.image_texture = Some(texture);
        self.image_draw_data_offset = image_draw_data_offset;
        self
    }

    pub fn with_mesh(mut self, mesh: ImageMeshBuffers) -> Self {
        self.mesh = Some(mesh);
        self
    }
}

/// Everything `RenderContext::flush` needs for one frame
///
/// Counts and offsets index into the rings the emitter filled since the last
/// flush. The descriptor is transient and owned by the caller.
#[derive(Clone)]
pub struct FlushDescriptor {
    pub render_target: Arc<RenderTarget>,

    pub flush_uniform_data_offset: u64,

    pub first_path: u32,
    pub path_count: u32,
    pub first_paint: u32,
    pub first_paint_aux: u32,
    pub first_contour: u32,
    pub contour_count: u32,

    pub first_complex_grad_span: u32,
    pub complex_grad_span_count: u32,
    pub complex_grad_rows_top: u32,
    pub complex_grad_rows_height: u32,

    pub simple_grad_texels_width: u32,
    pub simple_grad_texels_height: u32,
    pub simple_grad_data_offset: u64,

    pub first_tess_vertex_span: u32,
    pub tess_vertex_span_count: u32,
    pub tess_data_height: u32,

    /// Executed in order
    pub draw_list: Vec<DrawBatch>,
    /// Union of every batch's features
    pub combined_shader_features: ShaderFeatures,
    pub color_load_action: LoadAction,
    /// `0xAARRGGBB`
    pub clear_color: u32,
    /// Coverage sentinel written before the first batch
    pub coverage_clear_value: u32,
}

impl FlushDescriptor {
    /// Empty frame targeting `render_target`
    pub fn new(render_target: Arc<RenderTarget>) -> Self {
        Self {
            render_target,
            flush_uniform_data_offset: 0,
            first_path: 0,
            path_count: 0,
            first_paint: 0,
            first_paint_aux: 0,
            first_contour: 0,
            contour_count: 0,
            first_complex_grad_span: 0,
            complex_grad_span_count: 0,
            complex_grad_rows_top: 0,
            complex_grad_rows_height: 0,
            simple_grad_texels_width: 0,
            simple_grad_texels_height: 0,
            simple_grad_data_offset: 0,
            first_tess_vertex_span: 0,
            tess_vertex_span_count: 0,
            tess_data_height: 0,
            draw_list: Vec::new(),
            combined_shader_features: ShaderFeatures::empty(),
            color_load_action: LoadAction::PreserveRenderTarget,
            clear_color: 0,
            coverage_clear_value: 0,
        }
    }

    /// Append a batch and fold its features into `combined_shader_features`
    pub fn push_batch(&mut self, batch: DrawBatch) {
        self.combined_shader_features |= batch.shader_features;
        self.draw_list.push(batch);
    }
}

/// Work recorded by one flush
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushStats {
    /// Buffer uploads recorded
    pub uploads: u32,
    pub gradient_draws: u32,
    pub tessellation_draws: u32,
    /// Draw-batch pass draws, resolve excluded
    pub batch_draws: u32,
    pub resolve_draws: u32,
    /// Triangles issued by batch draws, all instances included
    pub triangles: u32,
}
