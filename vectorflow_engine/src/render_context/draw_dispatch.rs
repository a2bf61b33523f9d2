//! Draw batch dispatch table
//!
//! Maps each [`DrawType`] to the program, topology, geometry source and
//! instancing used to draw it, and each program to its vertex layout and
//! shader bindings. Shader permutations are selected by the pure
//! [`permutation_for_features`].

use std::mem::size_of;
use crate::graphics_device::{
    ShaderProgram, ShaderDefine, ShaderPermutation, PrimitiveTopology, CullMode, VertexLayout,
    VertexBinding, VertexAttribute, VertexInputRate, BufferFormat, BindingSlot,
};
use crate::render_context::{DrawType, ShaderFeatures};
use crate::render_context::gpu_data::{
    GradientSpan, TessVertexSpan, TriangleVertex, PatchVertex, ImageRectVertex,
};

/// Where a draw's vertices come from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometrySource {
    /// Shared patch vertex/index buffers built at context creation
    PatchBuffers,
    /// Interior triangle vertex ring
    TriangleRing,
    /// Static image rect vertex/index buffers
    ImageRectQuad,
    /// External vertex/uv/index render buffers carried by the batch
    ImageMeshBuffers,
    /// Vertices generated in the shader
    Procedural,
}

/// How many instances a draw issues
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instancing {
    /// `element_count` instances starting at `base_element`
    PerElement,
    /// One instance
    Single,
}

/// Dispatch entry of a draw type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawTypeInfo {
    pub program: ShaderProgram,
    pub topology: PrimitiveTopology,
    pub geometry: GeometrySource,
    pub instancing: Instancing,
    pub cull_mode: CullMode,
}

/// Dispatch entry of `draw_type`
///
/// Returns `None` for draw types the atomic-coverage path never emits
/// (`GpuAtomicInitialize`, `StencilClipReset`).
pub fn draw_type_info(draw_type: DrawType) -> Option<DrawTypeInfo> {
    let info = match draw_type {
        DrawType::MidpointFanPatches | DrawType::OuterCurvePatches => DrawTypeInfo {
            program: ShaderProgram::Path,
            topology: PrimitiveTopology::TriangleList,
            geometry: GeometrySource::PatchBuffers,
            instancing: Instancing::PerElement,
            cull_mode: CullMode::CounterClockwise,
        },
        DrawType::InteriorTriangulation => DrawTypeInfo {
            program: ShaderProgram::InteriorTriangles,
            topology: PrimitiveTopology::TriangleList,
            geometry: GeometrySource::TriangleRing,
            instancing: Instancing::Single,
            cull_mode: CullMode::CounterClockwise,
        },
        DrawType::ImageRect => DrawTypeInfo {
            program: ShaderProgram::ImageRect,
            topology: PrimitiveTopology::TriangleList,
            geometry: GeometrySource::ImageRectQuad,
            instancing: Instancing::Single,
            cull_mode: CullMode::None,
        },
        DrawType::ImageMesh => DrawTypeInfo {
            program: ShaderProgram::ImageMesh,
            topology: PrimitiveTopology::TriangleList,
            geometry: GeometrySource::ImageMeshBuffers,
            instancing: Instancing::Single,
            cull_mode: CullMode::None,
        },
        DrawType::GpuAtomicResolve => DrawTypeInfo {
            program: ShaderProgram::AtomicResolve,
            topology: PrimitiveTopology::TriangleStrip,
            geometry: GeometrySource::Procedural,
            instancing: Instancing::Single,
            cull_mode: CullMode::None,
        },
        DrawType::GpuAtomicInitialize | DrawType::StencilClipReset => return None,
    };
    Some(info)
}

/// Shader permutation for a set of features
///
/// Vertex stage: clip, clip-rect, advanced blend. Pixel stage: clip,
/// clip-rect, nested clip, advanced blend, fixed-function blend (whenever
/// advanced blend is off), even-odd, HSL blend modes.
pub fn permutation_for_features(features: ShaderFeatures) -> ShaderPermutation {
    let advanced_blend = features.contains(ShaderFeatures::ENABLE_ADVANCED_BLEND);
    let mut vertex = Vec::new();
    let mut pixel = Vec::new();

    if features.contains(ShaderFeatures::ENABLE_CLIPPING) {
        vertex.push(ShaderDefine::EnableClipping);
        pixel.push(ShaderDefine::EnableClipping);
    }
    if features.contains(ShaderFeatures::ENABLE_CLIP_RECT) {
        vertex.push(ShaderDefine::EnableClipRect);
        pixel.push(ShaderDefine::EnableClipRect);
    }
    if features.contains(ShaderFeatures::ENABLE_NESTED_CLIPPING) {
        pixel.push(ShaderDefine::EnableNestedClipping);
    }
    if advanced_blend {
        vertex.push(ShaderDefine::EnableAdvancedBlend);
        pixel.push(ShaderDefine::EnableAdvancedBlend);
    } else {
        pixel.push(ShaderDefine::EnableFixedFunctionColorBlend);
    }
    if features.contains(ShaderFeatures::ENABLE_EVEN_ODD) {
        pixel.push(ShaderDefine::EnableEvenOdd);
    }
    if features.contains(ShaderFeatures::ENABLE_HSL_BLEND_MODES) {
        pixel.push(ShaderDefine::EnableHslBlendModes);
    }

    vertex.sort();
    pixel.sort();
    ShaderPermutation { vertex, pixel }
}

fn attribute(location: u32, binding: u32, format: BufferFormat, offset: u32) -> VertexAttribute {
    VertexAttribute { location, binding, format, offset }
}

fn single_stream(stride: usize, input_rate: VertexInputRate, attributes: Vec<VertexAttribute>) -> VertexLayout {
    VertexLayout {
        bindings: vec![VertexBinding { binding: 0, stride: stride as u32, input_rate }],
        attributes,
    }
}

/// Vertex layout read by `program`
pub fn vertex_layout(program: ShaderProgram) -> VertexLayout {
    use BufferFormat::*;

    match program {
        ShaderProgram::Path => single_stream(
            size_of::<PatchVertex>(),
            VertexInputRate::Vertex,
            vec![
                attribute(0, 0, R32G32B32A32_SFLOAT, 0),
                attribute(1, 0, R32G32B32A32_SFLOAT, 16),
            ],
        ),
        ShaderProgram::InteriorTriangles => single_stream(
            size_of::<TriangleVertex>(),
            VertexInputRate::Vertex,
            vec![attribute(0, 0, R32G32B32_SFLOAT, 0)],
        ),
        ShaderProgram::ImageMesh => VertexLayout {
            bindings: vec![
                VertexBinding { binding: 0, stride: 8, input_rate: VertexInputRate::Vertex },
                VertexBinding { binding: 1, stride: 8, input_rate: VertexInputRate::Vertex },
            ],
            attributes: vec![
                attribute(0, 0, R32G32_SFLOAT, 0),
                attribute(1, 1, R32G32_SFLOAT, 0),
            ],
        },
        ShaderProgram::ColorRamp => single_stream(
            size_of::<GradientSpan>(),
            VertexInputRate::Instance,
            (0..4).map(|i| attribute(i, 0, R32_UINT, i * 4)).collect(),
        ),
        ShaderProgram::Tessellation => single_stream(
            size_of::<TessVertexSpan>(),
            VertexInputRate::Instance,
            vec![
                attribute(0, 0, R32G32B32A32_SFLOAT, 0),
                attribute(1, 0, R32G32B32A32_SFLOAT, 16),
                attribute(2, 0, R32G32B32A32_SFLOAT, 32),
                attribute(3, 0, R32_UINT, 48),
                attribute(4, 0, R32_UINT, 52),
                attribute(5, 0, R32_UINT, 56),
                attribute(6, 0, R32_UINT, 60),
            ],
        ),
        ShaderProgram::ImageRect => single_stream(
            size_of::<ImageRectVertex>(),
            VertexInputRate::Vertex,
            vec![attribute(0, 0, R32G32B32A32_SFLOAT, 0)],
        ),
        ShaderProgram::AtomicResolve => VertexLayout::default(),
    }
}

const TARGET_SLOTS: [BindingSlot; 3] = [
    BindingSlot::CoverageBuffer,
    BindingSlot::ClipBuffer,
    BindingSlot::ColorBuffer,
];

/// Shader slots read or written by `program`
pub fn program_bindings(program: ShaderProgram) -> Vec<BindingSlot> {
    use BindingSlot::*;

    let mut slots = match program {
        ShaderProgram::ColorRamp => return vec![FlushUniforms],
        ShaderProgram::Tessellation => return vec![FlushUniforms, PathBuffer, ContourBuffer],
        ShaderProgram::Path => vec![
            FlushUniforms, PathBuffer, ContourBuffer, TessVertexTexture,
            GradTexture, GradSampler, PaintBuffer, PaintAuxBuffer,
        ],
        ShaderProgram::InteriorTriangles => vec![
            FlushUniforms, PathBuffer, GradTexture, GradSampler, PaintBuffer, PaintAuxBuffer,
        ],
        ShaderProgram::ImageRect | ShaderProgram::ImageMesh => vec![
            FlushUniforms, ImageDrawUniforms, GradTexture, GradSampler,
            ImageTexture, ImageSampler, PaintBuffer, PaintAuxBuffer,
        ],
        ShaderProgram::AtomicResolve => vec![
            FlushUniforms, GradTexture, GradSampler, PaintBuffer, PaintAuxBuffer,
        ],
    };
    slots.extend_from_slice(&TARGET_SLOTS);
    slots
}

#[cfg(test)]
#[path = "draw_dispatch_tests.rs"]
mod tests;
