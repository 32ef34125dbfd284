//! Built-in `deferred_lighting` pass (spec §6, `SPEC_FULL.md` supplement): a
//! full-screen resolve over `gbuffer`'s albedo+normal attachments, shading
//! each pixel with the same Cook-Torrance BRDF the forward passes use, sun
//! only (no per-tile local lights — that is what `deferred_lighting_tiled`
//! adds on top of this).

use std::borrow::Cow;

use glam::{Vec3, Vec4};

use crate::context::Context;
use crate::errors::Result;
use crate::frame::{FrameParams, TechniqueMode};
use crate::pass::builtin::shared;
use crate::pass::types::{technique_mode_bit, PassContract, PassIoDescriptor, PassRole, ResourceKind, ResourceRef};
use crate::pass::IRenderPass;
use crate::raster::shaders::{eval_fake_ibl, pbr_brdf};
use crate::registry::{ColorKind, DepthKind, RenderTarget, RtRegistry};
use crate::scene::Scene;

/// Reconstructs world-space position from a normalized-device depth sample
/// via the inverse view-projection matrix — the gbuffer carries no dedicated
/// world-position attachment, so every full-screen resolve pass derives it
/// the same way.
pub(super) fn reconstruct_world_pos(inv_view_proj: glam::Mat4, px: u32, py: u32, width: u32, height: u32, depth01: f32) -> Option<Vec3> {
    let ndc_x = (px as f32 + 0.5) / width as f32 * 2.0 - 1.0;
    let ndc_y = 1.0 - (py as f32 + 0.5) / height as f32 * 2.0;
    let ndc_z = depth01 * 2.0 - 1.0;
    let clip = Vec4::new(ndc_x, ndc_y, ndc_z, 1.0);
    let world = inv_view_proj * clip;
    if world.w.abs() < 1e-8 {
        return None;
    }
    Some((world.truncate() / world.w))
}

#[derive(Default)]
pub struct DeferredLightingPass;

impl IRenderPass for DeferredLightingPass {
    fn id(&self) -> &str {
        "deferred_lighting"
    }

    fn describe_contract(&self) -> PassContract {
        PassContract {
            role: PassRole::Lighting,
            supported_modes_mask: technique_mode_bit(TechniqueMode::Deferred),
            requires_depth_prepass: false,
            requires_light_culling: false,
            prefer_async_compute: false,
            semantics: vec![Cow::Borrowed("hdr")],
        }
    }

    fn describe_io(&self) -> PassIoDescriptor {
        PassIoDescriptor::new(
            vec![
                ResourceRef::new(shared::RT_GBUFFER_ALBEDO, ResourceKind::ColorHdr),
                ResourceRef::new(shared::RT_GBUFFER_NORMAL, ResourceKind::ColorHdr),
                ResourceRef::new(shared::RT_DEPTH_MOTION, ResourceKind::ColorDepthMotion),
                ResourceRef::new(shared::RT_SHADOW_MAP, ResourceKind::ShadowDepth),
            ],
            vec![ResourceRef::new(shared::RT_HDR, ResourceKind::ColorHdr)],
        )
    }

    fn execute(&mut self, ctx: &mut Context, scene: &Scene, frame: &FrameParams, rt_registry: &mut RtRegistry) -> Result<()> {
        let camera = scene.camera.extract_render_camera();
        let albedo_handle = rt_registry.ensure_transient_color_hdr(shared::RT_GBUFFER_ALBEDO, frame.width, frame.height);
        let normal_handle = rt_registry.ensure_transient_color_hdr(shared::RT_GBUFFER_NORMAL, frame.width, frame.height);
        let depth_handle = rt_registry.ensure_transient_depth_motion(shared::RT_DEPTH_MOTION, frame.width, frame.height, camera.near, camera.far);
        let hdr_handle = rt_registry.ensure_transient_color_hdr(shared::RT_HDR, frame.width, frame.height);

        let Some(RenderTarget::ColorHdr { texels: albedo, .. }) = rt_registry.get::<RenderTarget, ColorKind>(albedo_handle) else { return Ok(()) };
        let albedo = albedo.clone();
        let Some(RenderTarget::ColorHdr { texels: normal, .. }) = rt_registry.get::<RenderTarget, ColorKind>(normal_handle) else { return Ok(()) };
        let normal = normal.clone();
        let Some(RenderTarget::ColorDepthMotion { depth, .. }) = rt_registry.get::<RenderTarget, DepthKind>(depth_handle) else { return Ok(()) };
        let depth = depth.clone();

        let shadow_map = shared::sample_shadow_map(rt_registry);
        let uniforms = shared::base_lighting_uniforms(scene, frame, &camera, shadow_map);
        let inv_view_proj = camera.view_projection_matrix.inverse();
        let eye = Vec3::from(camera.position);

        let Some(RenderTarget::ColorHdr { width, height, texels: hdr }) = rt_registry.get_mut::<RenderTarget, ColorKind>(hdr_handle) else { return Ok(()) };
        let (width, height) = (*width, *height);

        for py in 0..height {
            for px in 0..width {
                let i = (py * width + px) as usize;
                let depth01 = depth[i];
                if depth01 >= 1.0 {
                    hdr[i] = [0.0; 4];
                    continue;
                }
                let Some(world_pos) = reconstruct_world_pos(inv_view_proj, px, py, width, height, depth01) else { continue };

                let albedo_rgba = Vec4::from(albedo[i]);
                let base_color = albedo_rgba.truncate();
                let metallic = albedo_rgba.w;
                let normal_rgba = Vec4::from(normal[i]);
                let n = normal_rgba.truncate().normalize_or_zero();
                let roughness = normal_rgba.w;

                let l = (-uniforms.light_dir_ws).normalize_or_zero();
                let v = (eye - world_pos).normalize_or_zero();
                let n_dot_l = n.dot(l).max(0.0);
                let visibility = if n_dot_l > 0.0 {
                    uniforms.shadow_map.as_ref().map_or(1.0, |map| crate::raster::shadow::shadow_visibility_dir(map, world_pos, uniforms.light_viewproj, n_dot_l, &crate::raster::shadow::ShadowParams { bias_const: uniforms.shadow_bias_const, bias_slope: uniforms.shadow_bias_slope, pcf_radius: uniforms.shadow_pcf_radius, pcf_step: uniforms.shadow_pcf_step, strength: uniforms.shadow_strength }))
                } else {
                    1.0
                };
                let sun_radiance = uniforms.light_color * uniforms.light_intensity;
                let direct = pbr_brdf(n, v, l, base_color, roughness, metallic) * sun_radiance * visibility;
                let ambient = eval_fake_ibl(n, 1.0) * base_color * (1.0 - metallic * 0.5);

                hdr[i] = (direct + ambient).extend(1.0).to_array();
            }
        }

        ctx.debug.pass_count += 1;
        Ok(())
    }
}
