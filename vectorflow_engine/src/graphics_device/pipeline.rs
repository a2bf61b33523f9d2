/// Pipeline trait and pipeline descriptor

use crate::graphics_device::BufferFormat;

/// Primitive topology
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveTopology {
    TriangleList,
    TriangleStrip,
}

/// Vertex input rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexInputRate {
    /// Data is per-vertex
    Vertex,
    /// Data is per-instance
    Instance,
}

/// Vertex attribute description
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexAttribute {
    /// Attribute location in shader
    pub location: u32,
    /// Stream index
    pub binding: u32,
    pub format: BufferFormat,
    /// Offset in bytes from the start of the element
    pub offset: u32,
}

/// Vertex stream description
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexBinding {
    /// Stream index
    pub binding: u32,
    /// Stride in bytes between consecutive elements
    pub stride: u32,
    pub input_rate: VertexInputRate,
}

/// Vertex input layout
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct VertexLayout {
    pub bindings: Vec<VertexBinding>,
    pub attributes: Vec<VertexAttribute>,
}

impl VertexLayout {
    /// True for procedural draws that fetch no vertex data
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty() && self.attributes.is_empty()
    }
}

/// Face culling mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CullMode {
    None,
    /// Cull counter-clockwise faces
    CounterClockwise,
}

/// Color output of a pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendMode {
    /// Source replaces destination
    Replace,
    /// `src + dst * (1 - src.a)` on color and alpha
    PremultipliedSrcOver,
    /// Color writes disabled; the shader writes through storage views
    WritesDisabled,
}

/// Shader programs known to the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderProgram {
    /// Complex gradient ramp rendering
    ColorRamp,
    /// Tessellation span rendering
    Tessellation,
    /// Path patches (midpoint fan and outer curve)
    Path,
    /// Interior triangulation
    InteriorTriangles,
    ImageRect,
    ImageMesh,
    /// Full-screen atomic coverage resolve
    AtomicResolve,
}

/// Compile-time switch of a shader permutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ShaderDefine {
    EnableClipping,
    EnableClipRect,
    EnableNestedClipping,
    EnableAdvancedBlend,
    EnableFixedFunctionColorBlend,
    EnableEvenOdd,
    EnableHslBlendModes,
}

/// Enabled defines for the vertex and pixel stages
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ShaderPermutation {
    pub vertex: Vec<ShaderDefine>,
    pub pixel: Vec<ShaderDefine>,
}

/// Descriptor for creating a graphics pipeline
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PipelineDesc {
    pub program: ShaderProgram,
    pub permutation: ShaderPermutation,
    pub topology: PrimitiveTopology,
    pub vertex_layout: VertexLayout,
    pub cull_mode: CullMode,
    pub blend: BlendMode,
}

/// Graphics pipeline resource trait
pub trait Pipeline: Send + Sync {
    /// Backend-unique identifier
    fn id(&self) -> u64;

    /// Descriptor the pipeline was created from
    fn desc(&self) -> &PipelineDesc;
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
