//! GPU element layouts and static geometry
//!
//! Every type uploaded to a ring or static buffer is a `bytemuck::Pod` struct
//! with a fixed size the vertex layouts rely on.

use bytemuck::{Pod, Zeroable};
use glam::Vec4;
use crate::render_context::DrawType;

/// Width of the gradient ramp texture in texels
pub const GRAD_TEXTURE_WIDTH: u32 = 512;

/// Width of the tessellation texture in texels
pub const TESS_TEXTURE_WIDTH: u32 = 2048;

/// Number of backing buffers rotated by a buffer ring
pub const BUFFER_RING_SIZE: usize = 3;

/// One complex gradient span, rendered as an instanced strip into the ramp texture
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct GradientSpan {
    /// Packed horizontal span (two 16-bit fixed point x coordinates)
    pub horizontal_span: u32,
    /// Ramp row and span flags
    pub y_with_flags: u32,
    /// RGBA8 color at the left edge
    pub color0: u32,
    /// RGBA8 color at the right edge
    pub color1: u32,
}

/// One tessellation span, rendered as an instanced pair of quads into the
/// tessellation texture
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct TessVertexSpan {
    /// Cubic control points
    pub pts: [f32; 8],
    pub join_tangent: [f32; 2],
    pub y: f32,
    pub reflection_y: f32,
    pub x0_x1: i32,
    pub reflection_x0_x1: i32,
    pub segment_counts: u32,
    pub contour_id_with_flags: u32,
}

/// Interior triangulation vertex: position and packed path id / winding weight
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct TriangleVertex {
    pub point: [f32; 2],
    pub weight_path_id: f32,
}

/// Patch vertex shared by every path patch instance
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct PatchVertex {
    pub local_vertex_id: f32,
    pub outset: f32,
    pub fill_coverage: f32,
    pub params: f32,
    pub mirrored_vertex_id: f32,
    pub mirrored_outset: f32,
    pub mirrored_fill_coverage: f32,
    pub mirrored_params: f32,
}

/// Image rect vertex: unit-square corner and anti-aliasing outset
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct ImageRectVertex {
    pub x: f32,
    pub y: f32,
    pub aa_offset_x: f32,
    pub aa_offset_y: f32,
}

// ===== PATCH GEOMETRY =====

/// Curve segments spanned by one midpoint-fan patch
pub const MIDPOINT_FAN_PATCH_SEGMENT_SPAN: u32 = 8;
/// Curve segments spanned by one outer-curve patch
pub const OUTER_CURVE_PATCH_SEGMENT_SPAN: u32 = 17;

/// Outer ramp (two vertices per edge point), curve fan, and fan midpoint
pub const MIDPOINT_FAN_PATCH_VERTEX_COUNT: u32 =
    (MIDPOINT_FAN_PATCH_SEGMENT_SPAN + 1) * 2 + (MIDPOINT_FAN_PATCH_SEGMENT_SPAN + 1) + 1;
pub const MIDPOINT_FAN_PATCH_INDEX_COUNT: u32 =
    MIDPOINT_FAN_PATCH_SEGMENT_SPAN * 6 + MIDPOINT_FAN_PATCH_SEGMENT_SPAN * 3;

/// Outer ramp and curve interior fan
pub const OUTER_CURVE_PATCH_VERTEX_COUNT: u32 =
    (OUTER_CURVE_PATCH_SEGMENT_SPAN + 1) * 2 + (OUTER_CURVE_PATCH_SEGMENT_SPAN + 1);
pub const OUTER_CURVE_PATCH_INDEX_COUNT: u32 =
    OUTER_CURVE_PATCH_SEGMENT_SPAN * 6 + (OUTER_CURVE_PATCH_SEGMENT_SPAN - 1) * 3;

pub const PATCH_VERTEX_BUFFER_COUNT: u32 = MIDPOINT_FAN_PATCH_VERTEX_COUNT + OUTER_CURVE_PATCH_VERTEX_COUNT;
pub const PATCH_INDEX_BUFFER_COUNT: u32 = MIDPOINT_FAN_PATCH_INDEX_COUNT + OUTER_CURVE_PATCH_INDEX_COUNT;

/// First index of a patch type inside the shared patch index buffer
///
/// # Panics
///
/// Only the two patch draw types have patch geometry.
pub fn patch_base_index(draw_type: DrawType) -> u32 {
    match draw_type {
        DrawType::MidpointFanPatches => 0,
        DrawType::OuterCurvePatches => MIDPOINT_FAN_PATCH_INDEX_COUNT,
        other => unreachable!("{:?} has no patch geometry", other),
    }
}

/// Number of indices of a patch type
///
/// # Panics
///
/// Only the two patch draw types have patch geometry.
pub fn patch_index_count(draw_type: DrawType) -> u32 {
    match draw_type {
        DrawType::MidpointFanPatches => MIDPOINT_FAN_PATCH_INDEX_COUNT,
        DrawType::OuterCurvePatches => OUTER_CURVE_PATCH_INDEX_COUNT,
        other => unreachable!("{:?} has no patch geometry", other),
    }
}

fn ramp_vertex(vertex_id: u32, outset: f32, fill_coverage: f32, params: f32) -> PatchVertex {
    let id = vertex_id as f32;
    PatchVertex {
        local_vertex_id: id,
        outset,
        fill_coverage,
        params,
        mirrored_vertex_id: id,
        mirrored_outset: outset,
        mirrored_fill_coverage: fill_coverage,
        mirrored_params: params,
    }
}

/// Emit a quad strip between the outer edge (`outer_start`) and the center
/// line (`inner_start`) for `span` segments
fn push_ramp_indices(indices: &mut Vec<u16>, outer_start: u16, inner_start: u16, span: u16) {
    for i in 0..span {
        let (o0, o1) = (outer_start + i, outer_start + i + 1);
        let (c0, c1) = (inner_start + i, inner_start + i + 1);
        indices.extend_from_slice(&[o0, o1, c0, c0, o1, c1]);
    }
}

/// Build the shared patch vertex and index buffers
///
/// Midpoint-fan patches come first, followed by outer-curve patches whose
/// indices are rebased past the midpoint-fan vertices.
pub fn generate_patch_buffer_data() -> (Vec<PatchVertex>, Vec<u16>) {
    let mut vertices = Vec::with_capacity(PATCH_VERTEX_BUFFER_COUNT as usize);
    let mut indices = Vec::with_capacity(PATCH_INDEX_BUFFER_COUNT as usize);

    // Midpoint fan
    let span = MIDPOINT_FAN_PATCH_SEGMENT_SPAN;
    for i in 0..=span {
        vertices.push(ramp_vertex(i, 1.0, 0.0, 0.0));
    }
    for i in 0..=span {
        vertices.push(ramp_vertex(i, 0.0, 1.0, 0.0));
    }
    let fan_start = vertices.len() as u16;
    for i in 0..=span {
        vertices.push(ramp_vertex(i, 0.0, 1.0, 1.0));
    }
    let midpoint = vertices.len() as u16;
    vertices.push(ramp_vertex(0, 0.0, 1.0, -1.0));

    push_ramp_indices(&mut indices, 0, (span + 1) as u16, span as u16);
    for i in 0..span as u16 {
        indices.extend_from_slice(&[midpoint, fan_start + i, fan_start + i + 1]);
    }

    // Outer curve
    let base = vertices.len() as u16;
    let span = OUTER_CURVE_PATCH_SEGMENT_SPAN;
    for i in 0..=span {
        vertices.push(ramp_vertex(i, 1.0, 0.0, 2.0));
    }
    for i in 0..=span {
        vertices.push(ramp_vertex(i, 0.0, 1.0, 2.0));
    }
    let curve_start = vertices.len() as u16;
    for i in 0..=span {
        vertices.push(ramp_vertex(i, 0.0, 1.0, 3.0));
    }

    push_ramp_indices(&mut indices, base, base + (span + 1) as u16, span as u16);
    for i in 1..span as u16 {
        indices.extend_from_slice(&[curve_start, curve_start + i, curve_start + i + 1]);
    }

    (vertices, indices)
}

// ===== TESSELLATION / IMAGE RECT GEOMETRY =====

/// Two quads per tessellation span instance
pub const TESS_SPAN_INDICES: [u16; 12] = [0, 1, 2, 2, 1, 3, 4, 5, 6, 6, 5, 7];

/// Unit square with inward and outward anti-aliasing rings
pub const IMAGE_RECT_VERTICES: [ImageRectVertex; 8] = [
    ImageRectVertex { x: 0.0, y: 0.0, aa_offset_x: 0.0, aa_offset_y: 1.0 },
    ImageRectVertex { x: 1.0, y: 0.0, aa_offset_x: 1.0, aa_offset_y: 0.0 },
    ImageRectVertex { x: 1.0, y: 1.0, aa_offset_x: 0.0, aa_offset_y: -1.0 },
    ImageRectVertex { x: 0.0, y: 1.0, aa_offset_x: -1.0, aa_offset_y: 0.0 },
    ImageRectVertex { x: 0.0, y: 0.0, aa_offset_x: 0.0, aa_offset_y: -1.0 },
    ImageRectVertex { x: 1.0, y: 0.0, aa_offset_x: -1.0, aa_offset_y: 0.0 },
    ImageRectVertex { x: 1.0, y: 1.0, aa_offset_x: 0.0, aa_offset_y: 1.0 },
    ImageRectVertex { x: 0.0, y: 1.0, aa_offset_x: 1.0, aa_offset_y: 0.0 },
];

/// Four edge quads plus the center quad
pub const IMAGE_RECT_INDICES: [u16; 30] = [
    0, 1, 5, 0, 5, 4,
    1, 2, 6, 1, 6, 5,
    2, 3, 7, 2, 7, 6,
    3, 0, 4, 3, 4, 7,
    4, 5, 6, 4, 6, 7,
];

// ===== COLORS =====

/// Unpack a `0xAARRGGBB` color into normalized RGBA
pub fn unpack_color(color: u32) -> Vec4 {
    let channel = |shift: u32| ((color >> shift) & 0xff) as f32 / 255.0;
    Vec4::new(channel(16), channel(8), channel(0), channel(24))
}

#[cfg(test)]
#[path = "gpu_data_tests.rs"]
mod tests;
