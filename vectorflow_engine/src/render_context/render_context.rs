//! Render context: ring-buffered frame resources and the flush algorithm
//!
//! The upstream emitter sizes each ring with `resize_*`, fills it between
//! `map_*` and `unmap_*`, then hands a [`FlushDescriptor`] to [`RenderContext::flush`].
//! A flush records one command list in a fixed order (uploads, gradient ramp,
//! simple gradient copy, tessellation, draw batches, resolve) and submits it
//! only when every step recorded successfully.

use std::mem::size_of;
use std::sync::Arc;
use glam::Vec2;
use rustc_hash::FxHashMap;
use crate::error::Result;
use crate::{engine_bail, engine_error};
use crate::graphics_device::{
    GraphicsDevice, CommandList, Buffer, BufferDesc, BufferUsage, IndexType, Texture, TextureDesc,
    TextureFormat, TextureUsage, TextureRegion, ResourceState, LoadOp, RenderPassDesc, Viewport,
    Pipeline, PipelineDesc, ShaderProgram, ShaderPermutation, PrimitiveTopology, CullMode, BlendMode,
    Binding, BindingSlot, BindingResource, SamplerType, IndexedDraw,
};
use crate::render_context::buffer_ring::{BufferRing, BufferRingKind};
use crate::render_context::draw_dispatch::{
    draw_type_info, permutation_for_features, vertex_layout, program_bindings, GeometrySource, Instancing,
};
use crate::render_context::gpu_data::{
    GradientSpan, TessVertexSpan, TriangleVertex, PatchVertex, GRAD_TEXTURE_WIDTH, TESS_TEXTURE_WIDTH,
    PATCH_VERTEX_BUFFER_COUNT, TESS_SPAN_INDICES, IMAGE_RECT_VERTICES, IMAGE_RECT_INDICES,
    generate_patch_buffer_data, patch_base_index, patch_index_count, unpack_color,
};
use crate::render_context::image_decode::{decode_image, DefaultImageCodec, ImageCodec, WebpDecodeOptions};
use crate::render_context::{
    RenderTarget, FlushDescriptor, FlushStats, DrawBatch, DrawType, LoadAction, ShaderFeatures,
    StorageBufferStructure,
};
use crate::resource::{ImageTexture, RenderBuffer, RenderBufferType, RenderBufferFlags};

/// Size of one uniform block; uniform offsets are multiples of it
pub const UNIFORM_BLOCK_SIZE: usize = 256;

// ===== CONFIGURATION =====

/// Capabilities reported to the emitter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformFeatures {
    pub supports_fragment_shader_atomics: bool,
    pub supports_clip_planes: bool,
    pub supports_raster_ordering: bool,
    /// Offscreen targets are addressed with Y pointing down
    pub invert_offscreen_y: bool,
}

impl Default for PlatformFeatures {
    fn default() -> Self {
        Self {
            supports_fragment_shader_atomics: true,
            supports_clip_planes: true,
            supports_raster_ordering: false,
            invert_offscreen_y: true,
        }
    }
}

/// Render context configuration
#[derive(Debug, Clone, Default)]
pub struct RenderContextConfig {
    pub platform_features: PlatformFeatures,
    /// Options passed to the WEBP decoder
    pub webp: WebpDecodeOptions,
}

// ===== STATIC GEOMETRY =====

/// Immutable buffers built once per context
struct StaticGeometry {
    patch_vertices: Arc<dyn Buffer>,
    patch_indices: Arc<dyn Buffer>,
    tess_span_indices: Arc<dyn Buffer>,
    image_rect_vertices: Arc<dyn Buffer>,
    image_rect_indices: Arc<dyn Buffer>,
}

impl StaticGeometry {
    fn new(device: &dyn GraphicsDevice) -> Result<Self> {
        let (patch_vertices, patch_indices) = generate_patch_buffer_data();

        let buffer = |label: &str, usage: BufferUsage, stride: usize, data: &[u8]| {
            device.create_buffer(BufferDesc::with_data(label, usage, stride as u32, data.to_vec()))
        };
        let index_stride = size_of::<u16>();

        Ok(Self {
            patch_vertices: buffer(
                "patch_vertices", BufferUsage::Vertex, size_of::<PatchVertex>(), bytemuck::cast_slice(&patch_vertices),
            )?,
            patch_indices: buffer(
                "patch_indices", BufferUsage::Index, index_stride, bytemuck::cast_slice(&patch_indices),
            )?,
            tess_span_indices: buffer(
                "tess_span_indices", BufferUsage::Index, index_stride, bytemuck::cast_slice(&TESS_SPAN_INDICES),
            )?,
            image_rect_vertices: buffer(
                "image_rect_vertices", BufferUsage::Vertex, 16, bytemuck::cast_slice(&IMAGE_RECT_VERTICES),
            )?,
            image_rect_indices: buffer(
                "image_rect_indices", BufferUsage::Index, index_stride, bytemuck::cast_slice(&IMAGE_RECT_INDICES),
            )?,
        })
    }
}

// ===== RING HELPERS =====

fn resize_ring(
    device: &dyn GraphicsDevice,
    ring: &mut Option<BufferRing>,
    kind: BufferRingKind,
    size_in_bytes: usize,
    stride: usize,
    label: &str,
) -> Result<()> {
    *ring = None;
    if size_in_bytes > 0 {
        *ring = Some(BufferRing::new(device, kind, size_in_bytes, stride, label)?);
    }
    crate::engine_debug!("vectorflow::RenderContext", "Resized {} to {} bytes", label, size_in_bytes);
    Ok(())
}

fn map_ring<'a>(ring: &'a mut Option<BufferRing>, map_size_in_bytes: usize, label: &str) -> Result<&'a mut [u8]> {
    match ring {
        Some(ring) => ring.map(map_size_in_bytes),
        None => engine_bail!("vectorflow::RenderContext", "map of unallocated {} ({} bytes)", label, map_size_in_bytes),
    }
}

fn unmap_ring(ring: &mut Option<BufferRing>, label: &str) -> Result<()> {
    match ring {
        Some(ring) => {
            ring.unmap();
            Ok(())
        }
        None => engine_bail!("vectorflow::RenderContext", "unmap of unallocated {}", label),
    }
}

fn ring_contents(ring: &Option<BufferRing>) -> Option<Arc<dyn Buffer>> {
    ring.as_ref().and_then(|ring| ring.contents()).cloned()
}

// ===== RENDER CONTEXT =====

pub struct RenderContext {
    device: Arc<dyn GraphicsDevice>,
    config: RenderContextConfig,
    codec: Box<dyn ImageCodec>,

    flush_uniforms: Option<BufferRing>,
    image_draw_uniforms: Option<BufferRing>,
    path_buffer: Option<BufferRing>,
    paint_buffer: Option<BufferRing>,
    paint_aux_buffer: Option<BufferRing>,
    contour_buffer: Option<BufferRing>,
    simple_color_ramps: Option<BufferRing>,
    grad_span_buffer: Option<BufferRing>,
    tess_span_buffer: Option<BufferRing>,
    triangle_buffer: Option<BufferRing>,

    gradient_texture: Option<Arc<dyn Texture>>,
    tessellation_texture: Option<Arc<dyn Texture>>,

    geometry: StaticGeometry,
    pipelines: FxHashMap<PipelineDesc, Arc<dyn Pipeline>>,
    last_flush_stats: FlushStats,
}

impl RenderContext {
    /// Create a context decoding images with [`DefaultImageCodec`]
    pub fn new(device: Arc<dyn GraphicsDevice>, config: RenderContextConfig) -> Result<Self> {
        Self::with_codec(device, config, Box::new(DefaultImageCodec))
    }

    /// Create a context with a custom image codec
    ///
    /// Builds the static patch, tessellation and image rect geometry. Every
    /// ring and frame texture starts unallocated.
    pub fn with_codec(
        device: Arc<dyn GraphicsDevice>,
        config: RenderContextConfig,
        codec: Box<dyn ImageCodec>,
    ) -> Result<Self> {
        let geometry = StaticGeometry::new(device.as_ref())?;

        crate::engine_info!(
            "vectorflow::RenderContext",
            "RenderContext created (app '{}', validation {})",
            device.config().app_name, device.config().enable_validation
        );

        Ok(Self {
            device,
            config,
            codec,
            flush_uniforms: None,
            image_draw_uniforms: None,
            path_buffer: None,
            paint_buffer: None,
            paint_aux_buffer: None,
            contour_buffer: None,
            simple_color_ramps: None,
            grad_span_buffer: None,
            tess_span_buffer: None,
            triangle_buffer: None,
            gradient_texture: None,
            tessellation_texture: None,
            geometry,
            pipelines: FxHashMap::default(),
            last_flush_stats: FlushStats::default(),
        })
    }

    pub fn device(&self) -> &Arc<dyn GraphicsDevice> {
        &self.device
    }

    pub fn config(&self) -> &RenderContextConfig {
        &self.config
    }

    pub fn platform_features(&self) -> PlatformFeatures {
        self.config.platform_features
    }

    /// Statistics of the most recent successful flush
    pub fn last_flush_stats(&self) -> FlushStats {
        self.last_flush_stats
    }

    // ===== RESOURCE FACTORIES =====

    /// Create the auxiliary resources of an output surface
    ///
    /// `destination` must have `TextureUsage::STORAGE`. The transitions to
    /// `Storage` are submitted immediately.
    pub fn make_render_target(&self, destination: Arc<dyn Texture>) -> Result<Arc<RenderTarget>> {
        let mut cmd = self.device.create_command_list()?;
        cmd.begin()?;
        let target = RenderTarget::new(self.device.as_ref(), cmd.as_mut(), destination)?;
        cmd.end()?;
        self.device.submit(&[cmd.as_ref()])?;
        Ok(Arc::new(target))
    }

    /// Create a client vertex or index buffer
    ///
    /// Returns `Ok(None)` for a zero size.
    pub fn make_render_buffer(
        &self,
        buffer_type: RenderBufferType,
        flags: RenderBufferFlags,
        size_in_bytes: usize,
    ) -> Result<Option<Arc<RenderBuffer>>> {
        if size_in_bytes == 0 {
            return Ok(None);
        }
        let buffer = RenderBuffer::new(self.device.as_ref(), buffer_type, flags, size_in_bytes)?;
        Ok(Some(Arc::new(buffer)))
    }

    /// Decode PNG, JPEG or WEBP bytes into a sampled texture
    ///
    /// Returns `None` for unknown signatures and decode failures.
    pub fn decode_image_texture(&self, encoded: &[u8]) -> Option<Arc<ImageTexture>> {
        let decoded = decode_image(self.codec.as_ref(), encoded, &self.config.webp)?;
        match self.make_image_texture(decoded.width, decoded.height, 1, decoded.pixels, decoded.format) {
            Ok(texture) => Some(texture),
            Err(error) => {
                engine_error!(
                    "vectorflow::RenderContext",
                    "decoded {}x{} image could not be uploaded: {}",
                    decoded.width, decoded.height, error
                );
                None
            }
        }
    }

    /// Create a sampled texture from decoded pixels (mip 0 tightly packed)
    pub fn make_image_texture(
        &self,
        width: u32,
        height: u32,
        mip_levels: u32,
        pixels: Vec<u8>,
        format: TextureFormat,
    ) -> Result<Arc<ImageTexture>> {
        if width == 0 || height == 0 {
            engine_bail!("vectorflow::RenderContext", "image texture has zero size ({}x{})", width, height);
        }
        let required = width as u64 * height as u64 * format.bytes_per_pixel() as u64;
        if (pixels.len() as u64) < required {
            engine_bail!(
                "vectorflow::RenderContext",
                "image texture {}x{} needs {} bytes, got {}",
                width, height, required, pixels.len()
            );
        }

        let texture = self.device.create_texture(TextureDesc {
            width,
            height,
            mip_levels: mip_levels.max(1),
            format,
            usage: TextureUsage::SAMPLED,
            label: "image_texture".to_string(),
            data: Some(pixels),
        })?;
        Ok(Arc::new(ImageTexture::new(texture)))
    }

    // ===== FRAME TEXTURES =====

    fn make_frame_texture(
        &self,
        width: u32,
        height: u32,
        format: TextureFormat,
        usage: TextureUsage,
        label: &str,
    ) -> Result<Option<Arc<dyn Texture>>> {
        if width == 0 && height == 0 {
            return Ok(None);
        }

        let texture = self.device.create_texture(TextureDesc {
            width: width.max(1),
            height: height.max(1),
            mip_levels: 1,
            format,
            usage,
            label: label.to_string(),
            data: None,
        })?;

        let mut cmd = self.device.create_command_list()?;
        cmd.begin()?;
        cmd.transition(&texture, ResourceState::Unknown, ResourceState::ShaderRead)?;
        cmd.end()?;
        self.device.submit(&[cmd.as_ref()])?;

        crate::engine_debug!("vectorflow::RenderContext", "Resized {} to {}x{}", label, width, height);
        Ok(Some(texture))
    }

    /// Recreate the gradient ramp texture; `(0, 0)` releases it
    pub fn resize_gradient_texture(&mut self, width: u32, height: u32) -> Result<()> {
        self.gradient_texture = None;
        self.gradient_texture = self.make_frame_texture(
            width,
            height,
            TextureFormat::R8G8B8A8_UNORM,
            TextureUsage::SAMPLED | TextureUsage::RENDER_TARGET | TextureUsage::COPY_DST,
            "gradient_texture",
        )?;
        Ok(())
    }

    /// Recreate the tessellation texture; `(0, 0)` releases it
    pub fn resize_tessellation_texture(&mut self, width: u32, height: u32) -> Result<()> {
        self.tessellation_texture = None;
        self.tessellation_texture = self.make_frame_texture(
            width,
            height,
            TextureFormat::R32G32B32A32_UINT,
            TextureUsage::SAMPLED | TextureUsage::RENDER_TARGET,
            "tessellation_texture",
        )?;
        Ok(())
    }

    pub fn gradient_texture(&self) -> Option<&Arc<dyn Texture>> {
        self.gradient_texture.as_ref()
    }

    pub fn tessellation_texture(&self) -> Option<&Arc<dyn Texture>> {
        self.tessellation_texture.as_ref()
    }

    // ===== RING RESIZE / MAP / UNMAP =====

    pub fn resize_flush_uniform_buffer(&mut self, size_in_bytes: usize) -> Result<()> {
        resize_ring(
            self.device.as_ref(), &mut self.flush_uniforms, BufferRingKind::Uniform,
            size_in_bytes, UNIFORM_BLOCK_SIZE, "flush_uniforms",
        )
    }

    pub fn map_flush_uniform_buffer(&mut self, map_size_in_bytes: usize) -> Result<&mut [u8]> {
        map_ring(&mut self.flush_uniforms, map_size_in_bytes, "flush_uniforms")
    }

    pub fn unmap_flush_uniform_buffer(&mut self) -> Result<()> {
        unmap_ring(&mut self.flush_uniforms, "flush_uniforms")
    }

    pub fn resize_image_draw_uniform_buffer(&mut self, size_in_bytes: usize) -> Result<()> {
        resize_ring(
            self.device.as_ref(), &mut self.image_draw_uniforms, BufferRingKind::Uniform,
            size_in_bytes, UNIFORM_BLOCK_SIZE, "image_draw_uniforms",
        )
    }

    pub fn map_image_draw_uniform_buffer(&mut self, map_size_in_bytes: usize) -> Result<&mut [u8]> {
        map_ring(&mut self.image_draw_uniforms, map_size_in_bytes, "image_draw_uniforms")
    }

    pub fn unmap_image_draw_uniform_buffer(&mut self) -> Result<()> {
        unmap_ring(&mut self.image_draw_uniforms, "image_draw_uniforms")
    }

    pub fn resize_path_buffer(&mut self, size_in_bytes: usize, structure: StorageBufferStructure) -> Result<()> {
        resize_ring(
            self.device.as_ref(), &mut self.path_buffer, BufferRingKind::Structured,
            size_in_bytes, structure.element_size(), "path_buffer",
        )
    }

    pub fn map_path_buffer(&mut self, map_size_in_bytes: usize) -> Result<&mut [u8]> {
        map_ring(&mut self.path_buffer, map_size_in_bytes, "path_buffer")
    }

    pub fn unmap_path_buffer(&mut self) -> Result<()> {
        unmap_ring(&mut self.path_buffer, "path_buffer")
    }

    pub fn resize_paint_buffer(&mut self, size_in_bytes: usize, structure: StorageBufferStructure) -> Result<()> {
        resize_ring(
            self.device.as_ref(), &mut self.paint_buffer, BufferRingKind::Structured,
            size_in_bytes, structure.element_size(), "paint_buffer",
        )
    }

    pub fn map_paint_buffer(&mut self, map_size_in_bytes: usize) -> Result<&mut [u8]> {
        map_ring(&mut self.paint_buffer, map_size_in_bytes, "paint_buffer")
    }

    pub fn unmap_paint_buffer(&mut self) -> Result<()> {
        unmap_ring(&mut self.paint_buffer, "paint_buffer")
    }

    pub fn resize_paint_aux_buffer(&mut self, size_in_bytes: usize, structure: StorageBufferStructure) -> Result<()> {
        resize_ring(
            self.device.as_ref(), &mut self.paint_aux_buffer, BufferRingKind::Structured,
            size_in_bytes, structure.element_size(), "paint_aux_buffer",
        )
    }

    pub fn map_paint_aux_buffer(&mut self, map_size_in_bytes: usize) -> Result<&mut [u8]> {
        map_ring(&mut self.paint_aux_buffer, map_size_in_bytes, "paint_aux_buffer")
    }

    pub fn unmap_paint_aux_buffer(&mut self) -> Result<()> {
        unmap_ring(&mut self.paint_aux_buffer, "paint_aux_buffer")
    }

    pub fn resize_contour_buffer(&mut self, size_in_bytes: usize, structure: StorageBufferStructure) -> Result<()> {
        resize_ring(
            self.device.as_ref(), &mut self.contour_buffer, BufferRingKind::Structured,
            size_in_bytes, structure.element_size(), "contour_buffer",
        )
    }

    pub fn map_contour_buffer(&mut self, map_size_in_bytes: usize) -> Result<&mut [u8]> {
        map_ring(&mut self.contour_buffer, map_size_in_bytes, "contour_buffer")
    }

    pub fn unmap_contour_buffer(&mut self) -> Result<()> {
        unmap_ring(&mut self.contour_buffer, "contour_buffer")
    }

    /// CPU-only ring; its shadow is copied into the gradient texture
    pub fn resize_simple_color_ramps_buffer(&mut self, size_in_bytes: usize) -> Result<()> {
        resize_ring(
            self.device.as_ref(), &mut self.simple_color_ramps, BufferRingKind::Heap,
            size_in_bytes, 4, "simple_color_ramps",
        )
    }

    pub fn map_simple_color_ramps_buffer(&mut self, map_size_in_bytes: usize) -> Result<&mut [u8]> {
        map_ring(&mut self.simple_color_ramps, map_size_in_bytes, "simple_color_ramps")
    }

    pub fn unmap_simple_color_ramps_buffer(&mut self) -> Result<()> {
        unmap_ring(&mut self.simple_color_ramps, "simple_color_ramps")
    }

    pub fn resize_grad_span_buffer(&mut self, size_in_bytes: usize) -> Result<()> {
        resize_ring(
            self.device.as_ref(), &mut self.grad_span_buffer, BufferRingKind::Vertex,
            size_in_bytes, size_of::<GradientSpan>(), "grad_span_buffer",
        )
    }

    pub fn map_grad_span_buffer(&mut self, map_size_in_bytes: usize) -> Result<&mut [u8]> {
        map_ring(&mut self.grad_span_buffer, map_size_in_bytes, "grad_span_buffer")
    }

    pub fn unmap_grad_span_buffer(&mut self) -> Result<()> {
        unmap_ring(&mut self.grad_span_buffer, "grad_span_buffer")
    }

    pub fn resize_tess_vertex_span_buffer(&mut self, size_in_bytes: usize) -> Result<()> {
        resize_ring(
            self.device.as_ref(), &mut self.tess_span_buffer, BufferRingKind::Vertex,
            size_in_bytes, size_of::<TessVertexSpan>(), "tess_span_buffer",
        )
    }

    pub fn map_tess_vertex_span_buffer(&mut self, map_size_in_bytes: usize) -> Result<&mut [u8]> {
        map_ring(&mut self.tess_span_buffer, map_size_in_bytes, "tess_span_buffer")
    }

    pub fn unmap_tess_vertex_span_buffer(&mut self) -> Result<()> {
        unmap_ring(&mut self.tess_span_buffer, "tess_span_buffer")
    }

    pub fn resize_triangle_vertex_buffer(&mut self, size_in_bytes: usize) -> Result<()> {
        resize_ring(
            self.device.as_ref(), &mut self.triangle_buffer, BufferRingKind::Vertex,
            size_in_bytes, size_of::<TriangleVertex>(), "triangle_buffer",
        )
    }

    pub fn map_triangle_vertex_buffer(&mut self, map_size_in_bytes: usize) -> Result<&mut [u8]> {
        map_ring(&mut self.triangle_buffer, map_size_in_bytes, "triangle_buffer")
    }

    pub fn unmap_triangle_vertex_buffer(&mut self) -> Result<()> {
        unmap_ring(&mut self.triangle_buffer, "triangle_buffer")
    }

    // ===== FLUSH =====

    /// Record and submit one frame
    ///
    /// Nothing is submitted when any step fails; the error is returned and
    /// the frame is dropped.
    ///
    /// # Panics
    ///
    /// On `GpuAtomicInitialize` or `StencilClipReset` batches, which the
    /// atomic coverage path never emits.
    pub fn flush(&mut self, desc: &FlushDescriptor) -> Result<FlushStats> {
        let mut stats = FlushStats::default();
        let mut cmd = self.device.create_command_list()?;
        cmd.begin()?;

        self.upload(cmd.as_mut(), desc, &mut stats)?;
        self.render_complex_gradients(cmd.as_mut(), desc, &mut stats)?;
        self.copy_simple_gradients(cmd.as_mut(), desc)?;
        self.render_tessellation(cmd.as_mut(), desc, &mut stats)?;
        self.render_draw_batches(cmd.as_mut(), desc, &mut stats)?;

        cmd.end()?;
        self.device.submit(&[cmd.as_ref()])?;

        crate::engine_trace!("vectorflow::RenderContext", "Flushed {} batch(es): {:?}", desc.draw_list.len(), stats);
        self.last_flush_stats = stats;
        Ok(stats)
    }

    fn upload(&self, cmd: &mut dyn CommandList, desc: &FlushDescriptor, stats: &mut FlushStats) -> Result<()> {
        let Some(flush_uniforms) = &self.flush_uniforms else {
            engine_bail!("vectorflow::RenderContext", "flush uniform buffer is not allocated");
        };
        stats.uploads += flush_uniforms.sync_block(cmd, desc.flush_uniform_data_offset as usize)? as u32;

        if desc.path_count > 0 {
            let per_path = [
                (&self.path_buffer, desc.first_path, "path"),
                (&self.paint_buffer, desc.first_paint, "paint"),
                (&self.paint_aux_buffer, desc.first_paint_aux, "paint aux"),
            ];
            for (ring, first, name) in per_path {
                let Some(ring) = ring else {
                    engine_bail!(
                        "vectorflow::RenderContext",
                        "{} buffer is not allocated but path_count is {}",
                        name, desc.path_count
                    );
                };
                stats.uploads += ring.sync_elements(cmd, first as usize, desc.path_count as usize)? as u32;
            }
        }

        if desc.contour_count > 0 {
            let Some(contours) = &self.contour_buffer else {
                engine_bail!(
                    "vectorflow::RenderContext",
                    "contour buffer is not allocated but contour_count is {}",
                    desc.contour_count
                );
            };
            stats.uploads += contours.sync_elements(cmd, desc.first_contour as usize, desc.contour_count as usize)? as u32;
        }

        for ring in [&self.grad_span_buffer, &self.tess_span_buffer, &self.triangle_buffer].into_iter().flatten() {
            stats.uploads += ring.sync_mapped(cmd)? as u32;
        }
        Ok(())
    }

    fn render_complex_gradients(&mut self, cmd: &mut dyn CommandList, desc: &FlushDescriptor, stats: &mut FlushStats) -> Result<()> {
        if desc.complex_grad_span_count == 0 {
            return Ok(());
        }
        let Some(texture) = self.gradient_texture.clone() else {
            engine_bail!("vectorflow::RenderContext", "complex gradients without a gradient texture");
        };
        let Some(spans) = ring_contents(&self.grad_span_buffer) else {
            engine_bail!("vectorflow::RenderContext", "complex gradients without a gradient span buffer");
        };
        let pipeline = self.fixed_pipeline(ShaderProgram::ColorRamp, PrimitiveTopology::TriangleStrip, CullMode::None)?;

        cmd.transition(&texture, ResourceState::ShaderRead, ResourceState::RenderTarget)?;
        cmd.begin_render_pass(&RenderPassDesc {
            label: "gradient".to_string(),
            color_target: Some(texture.clone()),
            load_op: LoadOp::Clear([0.0; 4]),
            width: texture.info().width,
            height: texture.info().height,
        })?;
        cmd.set_viewport(Viewport {
            x: 0.0,
            y: desc.complex_grad_rows_top as f32,
            width: GRAD_TEXTURE_WIDTH as f32,
            height: desc.complex_grad_rows_height as f32,
        })?;
        cmd.bind_pipeline(&pipeline)?;
        cmd.set_bindings(&self.bindings(ShaderProgram::ColorRamp, desc, None))?;
        cmd.set_stream_source(0, &spans, desc.first_complex_grad_span as u64 * size_of::<GradientSpan>() as u64)?;
        cmd.draw_primitive(0, 2, desc.complex_grad_span_count)?;
        cmd.end_render_pass()?;
        cmd.transition(&texture, ResourceState::RenderTarget, ResourceState::ShaderRead)?;

        stats.gradient_draws += 1;
        Ok(())
    }

    fn copy_simple_gradients(&self, cmd: &mut dyn CommandList, desc: &FlushDescriptor) -> Result<()> {
        if desc.simple_grad_texels_height == 0 {
            return Ok(());
        }
        let (width, height) = (desc.simple_grad_texels_width, desc.simple_grad_texels_height);
        let texel_bytes = width as usize * height as usize * 4;

        let Some(ramps) = &self.simple_color_ramps else {
            engine_bail!("vectorflow::RenderContext", "simple gradients without a color ramp buffer");
        };
        if texel_bytes > ramps.capacity() || width > GRAD_TEXTURE_WIDTH {
            engine_bail!(
                "vectorflow::RenderContext",
                "simple gradient {}x{} texels exceed the color ramp buffer ({} bytes)",
                width, height, ramps.capacity()
            );
        }

        let row_pitch = GRAD_TEXTURE_WIDTH as usize * 4;
        let offset = desc.simple_grad_data_offset as usize;
        let span = (height as usize - 1) * row_pitch + width as usize * 4;
        if offset + span > ramps.capacity() {
            engine_bail!(
                "vectorflow::RenderContext",
                "simple gradient data at {} (+{} bytes) is outside the color ramp buffer ({} bytes)",
                offset, span, ramps.capacity()
            );
        }
        let Some(texture) = &self.gradient_texture else {
            engine_bail!("vectorflow::RenderContext", "simple gradients without a gradient texture");
        };

        cmd.transition(texture, ResourceState::ShaderRead, ResourceState::CopyDest)?;
        cmd.update_texture_2d(
            texture,
            TextureRegion { x: 0, y: 0, width, height },
            row_pitch as u32,
            &ramps.shadow()[offset..offset + span],
        )?;
        cmd.transition(texture, ResourceState::CopyDest, ResourceState::ShaderRead)?;
        Ok(())
    }

    fn render_tessellation(&mut self, cmd: &mut dyn CommandList, desc: &FlushDescriptor, stats: &mut FlushStats) -> Result<()> {
        if desc.tess_vertex_span_count == 0 {
            return Ok(());
        }
        let Some(texture) = self.tessellation_texture.clone() else {
            engine_bail!("vectorflow::RenderContext", "tessellation spans without a tessellation texture");
        };
        let Some(span_ring) = &self.tess_span_buffer else {
            engine_bail!("vectorflow::RenderContext", "tessellation spans without a tessellation span buffer");
        };
        let span_capacity = (span_ring.capacity() / size_of::<TessVertexSpan>()) as u32;
        let Some(spans) = span_ring.contents().cloned() else {
            engine_bail!("vectorflow::RenderContext", "tessellation span buffer has no GPU backing");
        };
        let pipeline = self.fixed_pipeline(ShaderProgram::Tessellation, PrimitiveTopology::TriangleList, CullMode::CounterClockwise)?;

        cmd.transition(&texture, ResourceState::ShaderRead, ResourceState::RenderTarget)?;
        cmd.begin_render_pass(&RenderPassDesc {
            label: "tessellate".to_string(),
            color_target: Some(texture.clone()),
            load_op: LoadOp::DontCare,
            width: texture.info().width,
            height: texture.info().height,
        })?;
        cmd.bind_pipeline(&pipeline)?;
        cmd.set_stream_source(0, &spans, desc.first_tess_vertex_span as u64 * size_of::<TessVertexSpan>() as u64)?;
        cmd.set_bindings(&self.bindings(ShaderProgram::Tessellation, desc, None))?;
        cmd.set_viewport(Viewport {
            x: 0.0,
            y: 0.0,
            width: TESS_TEXTURE_WIDTH as f32,
            height: desc.tess_data_height as f32,
        })?;
        cmd.draw_indexed_primitive(&self.geometry.tess_span_indices, IndexType::U16, IndexedDraw {
            base_vertex: 0,
            first_instance: desc.first_tess_vertex_span,
            num_vertices: span_capacity.saturating_sub(desc.first_tess_vertex_span),
            start_index: 0,
            primitive_count: TESS_SPAN_INDICES.len() as u32 / 3,
            instance_count: desc.tess_vertex_span_count,
        })?;
        cmd.end_render_pass()?;
        cmd.transition(&texture, ResourceState::RenderTarget, ResourceState::ShaderRead)?;

        stats.tessellation_draws += 1;
        Ok(())
    }

    fn render_draw_batches(&mut self, cmd: &mut dyn CommandList, desc: &FlushDescriptor, stats: &mut FlushStats) -> Result<()> {
        let target = desc.render_target.clone();
        let features = desc.combined_shader_features;
        let advanced_blend = features.contains(ShaderFeatures::ENABLE_ADVANCED_BLEND);

        let load_op = match desc.color_load_action {
            LoadAction::Clear => {
                cmd.clear_storage_float(target.target_view(), unpack_color(desc.clear_color).to_array())?;
                LoadOp::Load
            }
            LoadAction::PreserveRenderTarget => LoadOp::Load,
            LoadAction::DontCare => LoadOp::DontCare,
        };

        cmd.clear_storage_uint(target.coverage_view(), [desc.coverage_clear_value; 4])?;
        if features.contains(ShaderFeatures::ENABLE_CLIPPING) {
            cmd.clear_storage_uint(target.clip_view(), [0; 4])?;
        }

        // Advanced blending writes color through the target's storage view
        let (color_target, blend) = if advanced_blend {
            (None, BlendMode::WritesDisabled)
        } else {
            cmd.transition(target.texture(), ResourceState::Storage, ResourceState::RenderTarget)?;
            (Some(target.texture().clone()), BlendMode::PremultipliedSrcOver)
        };

        cmd.begin_render_pass(&RenderPassDesc {
            label: "flush".to_string(),
            color_target,
            load_op,
            width: target.width(),
            height: target.height(),
        })?;
        cmd.set_viewport(Viewport {
            x: 0.0,
            y: 0.0,
            width: target.width() as f32,
            height: target.height() as f32,
        })?;

        let mut resolved = false;
        for batch in &desc.draw_list {
            if batch.element_count == 0 {
                continue;
            }
            resolved |= batch.draw_type == DrawType::GpuAtomicResolve;
            self.draw_batch(cmd, desc, batch, blend, stats)?;
        }
        if advanced_blend && !resolved {
            self.draw_batch(cmd, desc, &DrawBatch::new(DrawType::GpuAtomicResolve, 0, 1), blend, stats)?;
        }

        cmd.end_render_pass()?;
        if advanced_blend {
            cmd.storage_barrier(target.target_view())?;
        } else {
            cmd.transition(target.texture(), ResourceState::RenderTarget, ResourceState::Storage)?;
        }
        Ok(())
    }

    fn draw_batch(
        &mut self,
        cmd: &mut dyn CommandList,
        desc: &FlushDescriptor,
        batch: &DrawBatch,
        blend: BlendMode,
        stats: &mut FlushStats,
    ) -> Result<()> {
        let target = &desc.render_target;
        let features = desc.combined_shader_features;

        cmd.storage_barrier(target.coverage_view())?;
        if features.contains(ShaderFeatures::ENABLE_CLIPPING) {
            cmd.storage_barrier(target.clip_view())?;
        }
        if features.contains(ShaderFeatures::ENABLE_ADVANCED_BLEND) {
            cmd.storage_barrier(target.target_view())?;
        }

        let Some(info) = draw_type_info(batch.draw_type) else {
            unreachable!("{:?} is never drawn with atomic coverage", batch.draw_type);
        };

        let pipeline = self.pipeline(PipelineDesc {
            program: info.program,
            permutation: permutation_for_features(features),
            topology: info.topology,
            vertex_layout: vertex_layout(info.program),
            cull_mode: info.cull_mode,
            blend,
        })?;

        if matches!(info.geometry, GeometrySource::ImageRectQuad | GeometrySource::ImageMeshBuffers) {
            if batch.image_texture.is_none() {
                engine_bail!("vectorflow::RenderContext", "{:?} batch without an image texture", batch.draw_type);
            }
            let Some(image_uniforms) = &self.image_draw_uniforms else {
                engine_bail!("vectorflow::RenderContext", "{:?} batch without an image draw uniform buffer", batch.draw_type);
            };
            stats.uploads += image_uniforms.sync_block(cmd, batch.image_draw_data_offset as usize)? as u32;
        }

        cmd.bind_pipeline(&pipeline)?;
        cmd.set_bindings(&self.bindings(info.program, desc, Some(batch)))?;

        let (first_instance, instance_count) = match info.instancing {
            Instancing::PerElement => (batch.base_element, batch.element_count),
            Instancing::Single => (0, 1),
        };

        let primitive_count = match info.geometry {
            GeometrySource::PatchBuffers => {
                let draw = IndexedDraw {
                    base_vertex: 0,
                    first_instance,
                    num_vertices: PATCH_VERTEX_BUFFER_COUNT,
                    start_index: patch_base_index(batch.draw_type),
                    primitive_count: patch_index_count(batch.draw_type) / 3,
                    instance_count,
                };
                cmd.set_stream_source(0, &self.geometry.patch_vertices, 0)?;
                cmd.draw_indexed_primitive(&self.geometry.patch_indices, IndexType::U16, draw)?;
                draw.primitive_count
            }
            GeometrySource::TriangleRing => {
                let Some(triangles) = ring_contents(&self.triangle_buffer) else {
                    engine_bail!("vectorflow::RenderContext", "interior triangulation without a triangle buffer");
                };
                let primitive_count = batch.element_count / 3;
                cmd.set_stream_source(0, &triangles, 0)?;
                cmd.draw_primitive(batch.base_element, primitive_count, instance_count)?;
                primitive_count
            }
            GeometrySource::ImageRectQuad => {
                let draw = IndexedDraw {
                    base_vertex: 0,
                    first_instance: 0,
                    num_vertices: IMAGE_RECT_VERTICES.len() as u32,
                    start_index: 0,
                    primitive_count: IMAGE_RECT_INDICES.len() as u32 / 3,
                    instance_count,
                };
                cmd.set_stream_source(0, &self.geometry.image_rect_vertices, 0)?;
                cmd.draw_indexed_primitive(&self.geometry.image_rect_indices, IndexType::U16, draw)?;
                draw.primitive_count
            }
            GeometrySource::ImageMeshBuffers => {
                let Some(mesh) = &batch.mesh else {
                    engine_bail!("vectorflow::RenderContext", "image mesh batch without mesh buffers");
                };
                for buffer in [&mesh.index, &mesh.vertex, &mesh.uv] {
                    stats.uploads += buffer.sync(cmd)? as u32;
                }
                let draw = IndexedDraw {
                    base_vertex: 0,
                    first_instance: 0,
                    num_vertices: (mesh.vertex.size_in_bytes() / size_of::<Vec2>()) as u32,
                    start_index: 0,
                    primitive_count: batch.element_count / 3,
                    instance_count,
                };
                cmd.set_stream_source(0, &mesh.vertex.contents()?, 0)?;
                cmd.set_stream_source(1, &mesh.uv.contents()?, 0)?;
                cmd.draw_indexed_primitive(&mesh.index.contents()?, IndexType::U16, draw)?;
                draw.primitive_count
            }
            GeometrySource::Procedural => {
                cmd.draw_primitive(0, 2, instance_count)?;
                stats.resolve_draws += 1;
                return Ok(());
            }
        };

        stats.batch_draws += 1;
        stats.triangles += primitive_count * instance_count;
        Ok(())
    }

    // ===== PIPELINES & BINDINGS =====

    fn pipeline(&mut self, desc: PipelineDesc) -> Result<Arc<dyn Pipeline>> {
        if let Some(pipeline) = self.pipelines.get(&desc) {
            return Ok(pipeline.clone());
        }
        crate::engine_debug!(
            "vectorflow::RenderContext",
            "Creating {:?} pipeline ({} vertex / {} pixel define(s))",
            desc.program, desc.permutation.vertex.len(), desc.permutation.pixel.len()
        );
        let pipeline = self.device.create_pipeline(desc.clone())?;
        self.pipelines.insert(desc, pipeline.clone());
        Ok(pipeline)
    }

    /// Pipeline of the offscreen gradient and tessellation passes
    fn fixed_pipeline(&mut self, program: ShaderProgram, topology: PrimitiveTopology, cull_mode: CullMode) -> Result<Arc<dyn Pipeline>> {
        self.pipeline(PipelineDesc {
            program,
            permutation: ShaderPermutation::default(),
            topology,
            vertex_layout: vertex_layout(program),
            cull_mode,
            blend: BlendMode::Replace,
        })
    }

    /// Resources for every slot `program` uses; unallocated resources are left unbound
    fn bindings(&self, program: ShaderProgram, desc: &FlushDescriptor, batch: Option<&DrawBatch>) -> Vec<Binding> {
        let target = &desc.render_target;
        let uniform = |ring: &Option<BufferRing>, offset: u64| {
            ring_contents(ring).map(|buffer| BindingResource::UniformBuffer { buffer, offset })
        };
        let storage = |ring: &Option<BufferRing>| ring_contents(ring).map(BindingResource::StorageBuffer);

        program_bindings(program)
            .into_iter()
            .filter_map(|slot| {
                let resource = match slot {
                    BindingSlot::FlushUniforms => uniform(&self.flush_uniforms, desc.flush_uniform_data_offset),
                    BindingSlot::ImageDrawUniforms => {
                        uniform(&self.image_draw_uniforms, batch.map_or(0, |b| b.image_draw_data_offset))
                    }
                    BindingSlot::PathBuffer => storage(&self.path_buffer),
                    BindingSlot::PaintBuffer => storage(&self.paint_buffer),
                    BindingSlot::PaintAuxBuffer => storage(&self.paint_aux_buffer),
                    BindingSlot::ContourBuffer => storage(&self.contour_buffer),
                    BindingSlot::TessVertexTexture => self.tessellation_texture.clone().map(BindingResource::Texture),
                    BindingSlot::GradTexture => self.gradient_texture.clone().map(BindingResource::Texture),
                    BindingSlot::ImageTexture => batch
                        .and_then(|b| b.image_texture.as_ref())
                        .map(|image| BindingResource::Texture(image.texture().clone())),
                    BindingSlot::GradSampler => Some(BindingResource::Sampler(SamplerType::LinearClamp)),
                    BindingSlot::ImageSampler => Some(BindingResource::Sampler(SamplerType::PointClamp)),
                    BindingSlot::CoverageBuffer => Some(BindingResource::StorageView(target.coverage_view().clone())),
                    BindingSlot::ClipBuffer => Some(BindingResource::StorageView(target.clip_view().clone())),
                    BindingSlot::ColorBuffer => Some(BindingResource::StorageView(target.target_view().clone())),
                }?;
                Some(Binding::new(slot, resource))
            })
            .collect()
    }
}

#[cfg(test)]
#[path = "render_context_tests.rs"]
mod tests;
