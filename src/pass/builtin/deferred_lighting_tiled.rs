//! Built-in `deferred_lighting_tiled` pass (spec §6, `SPEC_FULL.md`
//! supplement): the tiled-deferred resolve, identical to `deferred_lighting`
//! for the sun term but adding each pixel's tile-local lights from
//! `light_culling`'s bins — the deferred analogue of what
//! `pbr_forward_plus` does per-object.

use std::borrow::Cow;

use glam::Vec4;

use crate::context::Context;
use crate::errors::Result;
use crate::frame::{FrameParams, TechniqueMode};
use crate::pass::builtin::{deferred_lighting::reconstruct_world_pos, shared};
use crate::pass::types::{technique_mode_bit, PassContract, PassIoDescriptor, PassRole, ResourceKind, ResourceRef};
use crate::pass::IRenderPass;
use crate::raster::shaders::{eval_fake_ibl, eval_packed_light_point, pbr_brdf};
use crate::registry::{ColorKind, DepthKind, RenderTarget, RtRegistry};
use crate::scene::Scene;

#[derive(Default)]
pub struct DeferredLightingTiledPass;

impl IRenderPass for DeferredLightingTiledPass {
    fn id(&self) -> &str {
        "deferred_lighting_tiled"
    }

    fn describe_contract(&self) -> PassContract {
        PassContract {
            role: PassRole::Lighting,
            supported_modes_mask: technique_mode_bit(TechniqueMode::TiledDeferred),
            requires_depth_prepass: true,
            requires_light_culling: true,
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
        if !ctx.forward_plus.depth_prepass_valid || !ctx.forward_plus.light_culling_valid {
            return Ok(());
        }
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

        let Some(light_bins) = ctx.light_bins.clone() else { return Ok(()) };
        let packed = shared::packed_lights(scene);
        let tile_size = ctx.forward_plus.tile_size.max(1);

        let shadow_map = shared::sample_shadow_map(rt_registry);
        let uniforms = shared::base_lighting_uniforms(scene, frame, &camera, shadow_map);
        let inv_view_proj = camera.view_projection_matrix.inverse();
        let eye = glam::Vec3::from(camera.position);

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
                    uniforms.shadow_map.as_ref().map_or(1.0, |map| {
                        crate::raster::shadow::shadow_visibility_dir(
                            map,
                            world_pos,
                            uniforms.light_viewproj,
                            n_dot_l,
                            &crate::raster::shadow::ShadowParams { bias_const: uniforms.shadow_bias_const, bias_slope: uniforms.shadow_bias_slope, pcf_radius: uniforms.shadow_pcf_radius, pcf_step: uniforms.shadow_pcf_step, strength: uniforms.shadow_strength },
                        )
                    })
                } else {
                    1.0
                };
                let sun_radiance = uniforms.light_color * uniforms.light_intensity;
                let mut color = pbr_brdf(n, v, l, base_color, roughness, metallic) * sun_radiance * visibility;

                let (tx, ty) = light_bins.tile_of_pixel(px, py, tile_size);
                for &idx in light_bins.lights_in_bin(tx, ty, 0) {
                    let Some(light) = packed.get(idx as usize) else { continue };
                    let (ldir, radiance) = eval_packed_light_point(light, world_pos);
                    if radiance == glam::Vec3::ZERO {
                        continue;
                    }
                    color += pbr_brdf(n, v, ldir, base_color, roughness, metallic) * radiance;
                }

                let ambient = eval_fake_ibl(n, 1.0) * base_color * (1.0 - metallic * 0.5);
                hdr[i] = (color + ambient).extend(1.0).to_array();
            }
        }

        ctx.debug.pass_count += 1;
        Ok(())
    }
}
