//! Helpers shared by the built-in passes (spec §6): canonical transient RT
//! names, the directional-light shadow frustum, light packing, and the
//! depth-only shader used by both `shadow_map` and `depth_prepass`.
//!
//! [`IRenderPass::execute`] takes `scene: &Scene` immutably, so a pass cannot
//! stash per-frame derived state (like the shadow caster's view-projection
//! matrix) into `Scene` for a later pass to read. Instead
//! [`directional_light_view_proj`] is a pure function of `Scene` — every pass
//! that needs it recomputes the identical matrix rather than the executor
//! threading one more field through [`Context`].

use glam::{Mat4, Vec3, Vec4};

use crate::context::Context;
use crate::frame::{FrameParams, TechniqueMode};
use crate::geometry::Aabb;
use crate::lighting::{build_light_bin_culling, gather_lights_for_object, LightBinCullingConfig, LightCullingMode, MAX_LIGHTS_PER_OBJECT};
use crate::pass::types::technique_mode_bit;
use crate::raster::shader::{default_vertex_out, FragmentIn, FragmentOut, ShaderProgram, ShaderUniforms, ShaderVertex, ShadowMapView, VertexOut};
use crate::registry::{ColorKind, DepthKind, RenderTarget, RtColor, RtDepth, RtRegistry, ShadowKind};
use crate::scene::camera::RenderCamera;
use crate::scene::light::Light;
use crate::scene::{PackedLight, Scene};
use bytemuck::Zeroable;

/// Bitmask matching every [`TechniqueMode`] — used by passes that run the
/// same way regardless of which technique a recipe selects (shadow map,
/// tonemap, light shafts, motion blur).
pub const ALL_TECHNIQUE_MODES_MASK: u32 = technique_mode_bit(TechniqueMode::Forward)
    | technique_mode_bit(TechniqueMode::ForwardPlus)
    | technique_mode_bit(TechniqueMode::Deferred)
    | technique_mode_bit(TechniqueMode::TiledDeferred)
    | technique_mode_bit(TechniqueMode::ClusteredForward);

pub const RT_SHADOW_MAP: &str = "shadow_map";
pub const RT_DEPTH_MOTION: &str = "depth_motion";
pub const RT_HDR: &str = "hdr";
pub const RT_LDR: &str = "ldr";
pub const RT_GBUFFER_ALBEDO: &str = "gbuffer_albedo";
pub const RT_GBUFFER_NORMAL: &str = "gbuffer_normal";
pub const RT_SHAFTS_TMP: &str = "shafts_tmp";
pub const RT_MOTION_BLUR_TMP: &str = "motion_blur_tmp";

/// Fixed shadow-map resolution. Not exposed as a `FrameParams` knob — the
/// original system hardcodes it the same way, and nothing downstream depends
/// on it being runtime-configurable.
pub const SHADOW_MAP_SIZE: u32 = 1024;

/// The directional light's view-projection matrix for this frame: an
/// orthographic frustum sized to the union of shadow-casting elements'
/// world-space bounds, looking down `scene.sun.direction`. Deterministic
/// given `scene`, so `shadow_map` (to render) and any forward/deferred
/// lighting pass (to sample) independently compute the same matrix.
#[must_use]
pub fn directional_light_view_proj(scene: &Scene) -> Mat4 {
    let mut bounds = Aabb::empty();
    for element in scene.elements.iter() {
        if element.enabled && element.casts_shadow {
            bounds = bounds.union(&element.bounds.bounding_aabb());
        }
    }
    if bounds.min.x > bounds.max.x {
        bounds = Aabb::from_center_half_extents(Vec3::ZERO, Vec3::splat(1.0));
    }

    let center = bounds.center();
    let radius = bounds.half_extents().length().max(1e-3);

    let dir = {
        let d = scene.sun.direction.normalize_or_zero();
        if d == Vec3::ZERO {
            Vec3::NEG_Y
        } else {
            d
        }
    };
    let up = if dir.abs().dot(Vec3::Y) > 0.99 { Vec3::Z } else { Vec3::Y };
    let eye = center - dir * radius * 2.0;

    let view = Mat4::look_at_rh(eye, center, up);
    let proj = Mat4::orthographic_rh(-radius, radius, -radius, radius, 0.01, radius * 4.0);
    proj * view
}

/// Packs every local light in the scene into its fixed-size GPU form, in
/// scene order (light indices used by `ctx.light_bins` refer to this order).
#[must_use]
pub fn packed_lights(scene: &Scene) -> Vec<PackedLight> {
    scene.lights.iter().map(Light::pack).collect()
}

/// Runs light binning for `mode` and stores the result in `ctx`, shared by
/// `light_culling` (tiled/forward-plus) and `cluster_light_assign`
/// (clustered) so both update the same `ForwardPlusState`/`light_bins`
/// fields the same way.
pub fn run_light_binning(ctx: &mut Context, scene: &Scene, frame: &FrameParams, mode: LightCullingMode) {
    let camera = scene.camera.extract_render_camera();
    let config = LightBinCullingConfig {
        mode,
        tile_size: frame.technique.tile_size.max(1),
        max_lights_per_tile: frame.technique.max_lights_per_tile.max(1),
        ..LightBinCullingConfig::default()
    };
    let data = build_light_bin_culling(&scene.lights, &camera, frame.width.max(1), frame.height.max(1), &config, ctx.tile_depth_range.as_ref());

    ctx.forward_plus.tile_size = config.tile_size;
    ctx.forward_plus.tile_count_x = data.tile_count_x;
    ctx.forward_plus.tile_count_y = data.tile_count_y;
    ctx.forward_plus.max_lights_per_tile = data.max_lights_per_tile;
    ctx.forward_plus.visible_light_count = scene.lights.len() as u32;
    ctx.forward_plus.per_tile_light_counts = (0..data.tile_count_y)
        .flat_map(|ty| (0..data.tile_count_x).map(move |tx| (tx, ty)))
        .map(|(tx, ty)| (0..data.depth_slices).map(|slice| data.lights_in_bin(tx, ty, slice).len() as u32).sum())
        .collect();
    ctx.forward_plus.light_culling_valid = true;
    ctx.light_bins = Some(data);
}

/// Writes nothing but depth — used by `shadow_map` and `depth_prepass`, which
/// only care about the Z buffer produced alongside their rasterize call.
#[derive(Debug, Clone, Copy, Default)]
pub struct DepthOnlyShader;

impl ShaderProgram for DepthOnlyShader {
    fn vertex_main(&self, vin: &ShaderVertex, uniforms: &ShaderUniforms) -> VertexOut {
        default_vertex_out(vin, uniforms)
    }

    fn fragment_main(&self, _fin: &FragmentIn, _uniforms: &ShaderUniforms) -> FragmentOut {
        FragmentOut { color: Vec4::ZERO, aux: Vec4::ZERO, discard: false }
    }
}

/// Raw `(ptr, len, width, height)` over a `ColorHdr` target's texel storage,
/// reinterpreted as `Vec4`s via `bytemuck` (both `glam::Vec4` and `[f32; 4]`
/// are `Pod`/`Zeroable` with identical layout). Used only by `gbuffer`, which
/// needs simultaneous mutable access to two separate `ColorHdr` targets (for
/// `color`/`aux`) plus a `ColorDepthMotion` target (for `depth`/`motion`)
/// within one `rasterize_mesh` call — three distinct registry slots that the
/// borrow checker cannot see are disjoint through one `&mut RtRegistry`.
/// Safety of the resulting slices rests on the caller never requesting the
/// same handle twice.
pub(super) fn color_hdr_raw_parts(rt_registry: &mut RtRegistry, handle: RtColor) -> Option<(*mut Vec4, usize, u32, u32)> {
    let target = rt_registry.get_mut::<RenderTarget, ColorKind>(handle)?;
    match target {
        RenderTarget::ColorHdr { width, height, texels } => {
            let slice: &mut [Vec4] = bytemuck::cast_slice_mut(texels);
            Some((slice.as_mut_ptr(), slice.len(), *width, *height))
        }
        _ => None,
    }
}

/// Raw depth/motion parts of a `ColorDepthMotion` target. See
/// [`color_hdr_raw_parts`] for why this bypasses the registry's normal
/// borrow-scoped `get_mut`.
pub(super) fn depth_motion_raw_parts(rt_registry: &mut RtRegistry, handle: RtDepth) -> Option<(*mut f32, usize, *mut [f32; 2], usize, u32, u32)> {
    let target = rt_registry.get_mut::<RenderTarget, DepthKind>(handle)?;
    match target {
        RenderTarget::ColorDepthMotion { width, height, depth, motion, .. } => Some((depth.as_mut_ptr(), depth.len(), motion.as_mut_ptr(), motion.len(), *width, *height)),
        _ => None,
    }
}

/// Looks up the frame's shadow map, re-resolving it by name the same way
/// `shadow_map` allocated it rather than threading a handle through
/// `Context`. If `shadow_map` never ran this frame (shadows disabled, no
/// casters), the target still exists but is cleared to far depth, which
/// naturally reads back as "nothing occludes" rather than as a missing map.
pub(super) fn sample_shadow_map(rt_registry: &mut RtRegistry) -> Option<ShadowMapView<'_>> {
    let handle = rt_registry.ensure_transient_shadow(RT_SHADOW_MAP, SHADOW_MAP_SIZE, SHADOW_MAP_SIZE);
    match rt_registry.get::<RenderTarget, ShadowKind>(handle)? {
        RenderTarget::ShadowDepth { width, height, depth } => Some(ShadowMapView { width: *width, height: *height, depth }),
        _ => None,
    }
}

/// Builds the portion of [`ShaderUniforms`] every lighting pass (forward or
/// deferred) agrees on: camera transforms, the sun, and the shadow map —
/// callers still set `model`/`prev_model`/material scalars/local lights
/// per-draw.
pub(super) fn base_lighting_uniforms<'a>(scene: &Scene, frame: &FrameParams, camera: &RenderCamera, shadow_map: Option<ShadowMapView<'a>>) -> ShaderUniforms<'a> {
    ShaderUniforms {
        viewproj: camera.view_projection_matrix,
        prev_viewproj: camera.prev_view_projection_matrix,
        light_dir_ws: scene.sun.direction,
        light_color: scene.sun.color,
        light_intensity: scene.sun.intensity,
        camera_pos: Vec3::from(camera.position),
        shadow_map,
        light_viewproj: directional_light_view_proj(scene),
        enable_motion_vectors: frame.enable_motion_vectors,
        ..ShaderUniforms::default()
    }
}

/// The inclusive screen-tile range an object's world AABB touches, used to
/// gather its local lights from `ctx.light_bins` without scanning the whole
/// screen. Depth-slice range is deliberately not narrowed per object (every
/// `gather_object_lights` call scans all of `ctx.light_bins`'s slices) —
/// computing the object's own near/far slice would need the same exponential
/// mapping `lighting::binning` keeps private, and `LightBinCullingData`
/// already dedups by light index, so over-scanning costs cycles, not
/// correctness.
fn object_tile_range(aabb: &Aabb, camera: &RenderCamera, viewport_w: u32, viewport_h: u32, tile_size: u32) -> ((u32, u32), (u32, u32)) {
    let tile_size = tile_size.max(1);
    let tile_count_x = viewport_w.div_ceil(tile_size).max(1);
    let tile_count_y = viewport_h.div_ceil(tile_size).max(1);

    let mut px_min = glam::Vec2::splat(f32::INFINITY);
    let mut px_max = glam::Vec2::splat(f32::NEG_INFINITY);
    for c in aabb.corners() {
        let clip = camera.view_projection_matrix * c.extend(1.0);
        if clip.w.abs() < 1e-6 {
            continue;
        }
        let ndc = clip.truncate() / clip.w;
        let px = glam::Vec2::new((ndc.x * 0.5 + 0.5) * viewport_w as f32, (1.0 - (ndc.y * 0.5 + 0.5)) * viewport_h as f32);
        px_min = px_min.min(px);
        px_max = px_max.max(px);
    }
    if !px_min.x.is_finite() {
        return ((0, 0), (0, 0));
    }

    let tx0 = (px_min.x / tile_size as f32).floor().max(0.0) as u32;
    let ty0 = (px_min.y / tile_size as f32).floor().max(0.0) as u32;
    let tx1 = ((px_max.x / tile_size as f32).floor() as u32).min(tile_count_x - 1);
    let ty1 = ((px_max.y / tile_size as f32).floor() as u32).min(tile_count_y - 1);
    ((tx0.min(tx1), ty0.min(ty1)), (tx1, ty1))
}

/// Gathers up to [`MAX_LIGHTS_PER_OBJECT`] lights overlapping `object_aabb`
/// from the bins `ctx.light_bins` built this frame, returning a fixed-size
/// packed array ready to drop into [`ShaderUniforms::local_lights`]. Returns
/// an all-zero, zero-count array when no culling pass ran this frame (plain
/// `Forward`/`Deferred` techniques shade from the sun alone).
pub(super) fn gather_object_lights(ctx: &Context, scene: &Scene, packed: &[PackedLight], camera: &RenderCamera, viewport_w: u32, viewport_h: u32, object_aabb: &Aabb) -> ([PackedLight; MAX_LIGHTS_PER_OBJECT], u32) {
    let mut local_lights = [PackedLight::zeroed(); MAX_LIGHTS_PER_OBJECT];
    let Some(data) = ctx.light_bins.as_ref() else { return (local_lights, 0) };
    let tile_size = ctx.forward_plus.tile_size.max(1);
    let (tile_min, tile_max) = object_tile_range(object_aabb, camera, viewport_w, viewport_h, tile_size);
    let slice_max = data.depth_slices.saturating_sub(1);
    let gathered = gather_lights_for_object(data, &scene.lights, object_aabb.center(), tile_min, tile_max, 0, slice_max);
    for (i, &idx) in gathered.iter().enumerate() {
        if let Some(light) = packed.get(idx as usize) {
            local_lights[i] = *light;
        }
    }
    (local_lights, gathered.len() as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{MaterialHandle, MeshHandle};
    use crate::scene::element::SceneElement;
    use glam::Affine3A;

    #[test]
    fn directional_light_view_proj_is_finite_for_an_empty_scene() {
        let scene = Scene::new();
        let m = directional_light_view_proj(&scene);
        assert!(m.is_finite());
    }

    #[test]
    fn directional_light_view_proj_centers_on_shadow_casters() {
        let mut scene = Scene::new();
        let element = SceneElement::new(
            1,
            0,
            Affine3A::from_translation(Vec3::new(10.0, 0.0, 0.0)),
            crate::geometry::ShapeVolume::Sphere { center: Vec3::new(10.0, 0.0, 0.0), radius: 1.0 },
            MeshHandle::invalid(),
            MaterialHandle::invalid(),
        );
        scene.elements.push(element);
        let m = directional_light_view_proj(&scene);
        assert!(m.is_finite());
    }

    #[test]
    fn packed_lights_preserves_scene_order() {
        let mut scene = Scene::new();
        scene.lights.push(Light::new_point(Vec3::X, 1.0, Vec3::ONE, 1.0));
        scene.lights.push(Light::new_point(Vec3::Y, 1.0, Vec3::ONE, 1.0));
        let packed = packed_lights(&scene);
        assert_eq!(packed.len(), 2);
        assert_eq!(packed[0].vecs[0].truncate(), Vec3::X);
        assert_eq!(packed[1].vecs[0].truncate(), Vec3::Y);
    }
}
