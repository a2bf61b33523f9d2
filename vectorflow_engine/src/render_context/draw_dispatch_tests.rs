//! Unit tests for draw_dispatch.rs

use crate::render_context::draw_dispatch::*;
use crate::render_context::{DrawType, ShaderFeatures};
use crate::graphics_device::{ShaderDefine, ShaderProgram, PrimitiveTopology, BindingSlot};

// ============================================================================
// DISPATCH TABLE
// ============================================================================

#[test]
fn test_patch_types_share_path_program() {
    let fan = draw_type_info(DrawType::MidpointFanPatches).unwrap();
    let curve = draw_type_info(DrawType::OuterCurvePatches).unwrap();
    assert_eq!(fan, curve);
    assert_eq!(fan.program, ShaderProgram::Path);
    assert_eq!(fan.instancing, Instancing::PerElement);
    assert_eq!(fan.geometry, GeometrySource::PatchBuffers);
}

#[test]
fn test_interior_triangulation_is_single_instance_list() {
    let info = draw_type_info(DrawType::InteriorTriangulation).unwrap();
    assert_eq!(info.topology, PrimitiveTopology::TriangleList);
    assert_eq!(info.instancing, Instancing::Single);
    assert_eq!(info.geometry, GeometrySource::TriangleRing);
}

#[test]
fn test_resolve_is_procedural_strip() {
    let info = draw_type_info(DrawType::GpuAtomicResolve).unwrap();
    assert_eq!(info.topology, PrimitiveTopology::TriangleStrip);
    assert_eq!(info.geometry, GeometrySource::Procedural);
    assert!(vertex_layout(info.program).is_empty());
}

#[test]
fn test_image_draws() {
    assert_eq!(draw_type_info(DrawType::ImageRect).unwrap().geometry, GeometrySource::ImageRectQuad);
    assert_eq!(draw_type_info(DrawType::ImageMesh).unwrap().geometry, GeometrySource::ImageMeshBuffers);
}

#[test]
fn test_unsupported_types_have_no_entry() {
    assert!(draw_type_info(DrawType::GpuAtomicInitialize).is_none());
    assert!(draw_type_info(DrawType::StencilClipReset).is_none());
}

// ============================================================================
// PERMUTATIONS
// ============================================================================

#[test]
fn test_empty_features_select_fixed_function_blend() {
    let permutation = permutation_for_features(ShaderFeatures::empty());
    assert!(permutation.vertex.is_empty());
    assert_eq!(permutation.pixel, vec![ShaderDefine::EnableFixedFunctionColorBlend]);
}

#[test]
fn test_advanced_blend_replaces_fixed_function_blend() {
    let permutation = permutation_for_features(ShaderFeatures::ENABLE_ADVANCED_BLEND);
    assert_eq!(permutation.vertex, vec![ShaderDefine::EnableAdvancedBlend]);
    assert!(permutation.pixel.contains(&ShaderDefine::EnableAdvancedBlend));
    assert!(!permutation.pixel.contains(&ShaderDefine::EnableFixedFunctionColorBlend));
}

#[test]
fn test_pixel_only_features_stay_off_vertex_stage() {
    let features = ShaderFeatures::ENABLE_NESTED_CLIPPING
        | ShaderFeatures::ENABLE_EVEN_ODD
        | ShaderFeatures::ENABLE_HSL_BLEND_MODES;
    let permutation = permutation_for_features(features);

    assert!(permutation.vertex.is_empty());
    assert!(permutation.pixel.contains(&ShaderDefine::EnableNestedClipping));
    assert!(permutation.pixel.contains(&ShaderDefine::EnableEvenOdd));
    assert!(permutation.pixel.contains(&ShaderDefine::EnableHslBlendModes));
}

#[test]
fn test_all_features() {
    let permutation = permutation_for_features(ShaderFeatures::all());
    assert_eq!(permutation.vertex.len(), 3);
    assert_eq!(permutation.pixel.len(), 6);
}

#[test]
fn test_permutation_is_deterministic() {
    let features = ShaderFeatures::ENABLE_CLIPPING | ShaderFeatures::ENABLE_CLIP_RECT;
    assert_eq!(permutation_for_features(features), permutation_for_features(features));
}

// ============================================================================
// LAYOUTS AND BINDINGS
// ============================================================================

#[test]
fn test_layout_strides_match_elements() {
    assert_eq!(vertex_layout(ShaderProgram::Path).bindings[0].stride, 32);
    assert_eq!(vertex_layout(ShaderProgram::InteriorTriangles).bindings[0].stride, 12);
    assert_eq!(vertex_layout(ShaderProgram::ColorRamp).bindings[0].stride, 16);
    assert_eq!(vertex_layout(ShaderProgram::Tessellation).bindings[0].stride, 64);
    assert_eq!(vertex_layout(ShaderProgram::ImageRect).bindings[0].stride, 16);
    assert_eq!(vertex_layout(ShaderProgram::ImageMesh).bindings.len(), 2);
}

#[test]
fn test_tessellation_layout_covers_whole_span() {
    let layout = vertex_layout(ShaderProgram::Tessellation);
    let end = layout.attributes.iter().map(|a| a.offset + a.format.size_bytes()).max().unwrap();
    assert_eq!(end, 64);
}

#[test]
fn test_batch_programs_bind_target_views() {
    for program in [
        ShaderProgram::Path,
        ShaderProgram::InteriorTriangles,
        ShaderProgram::ImageRect,
        ShaderProgram::ImageMesh,
        ShaderProgram::AtomicResolve,
    ] {
        let slots = program_bindings(program);
        assert!(slots.contains(&BindingSlot::CoverageBuffer));
        assert!(slots.contains(&BindingSlot::ColorBuffer));
    }
    assert!(!program_bindings(ShaderProgram::ColorRamp).contains(&BindingSlot::CoverageBuffer));
    assert!(program_bindings(ShaderProgram::ImageMesh).contains(&BindingSlot::ImageTexture));
}
