//! Built-in `pbr_forward` pass (spec §6): the plain forward technique's sole
//! opaque draw pass — every visible element shaded in one pass with the sun
//! plus shadow map, no per-tile/per-object local-light gathering (that is
//! what `pbr_forward_plus` adds on top of the same draw loop).

use std::borrow::Cow;

use glam::Vec4;

use crate::context::Context;
use crate::errors::Result;
use crate::frame::{FrameParams, TechniqueMode};
use crate::pass::builtin::shared;
use crate::pass::types::{technique_mode_bit, PassContract, PassIoDescriptor, PassRole, ResourceKind, ResourceRef};
use crate::pass::IRenderPass;
use crate::raster::rasterizer::{rasterize_mesh, RasterizerConfig, RasterizerTarget};
use crate::raster::shader::ShaderUniforms;
use crate::raster::shaders::PbrMetallicRoughnessShader;
use crate::registry::{ColorKind, DepthKind, RenderTarget, RtRegistry};
use crate::scene::Scene;

#[derive(Default)]
pub struct PbrForwardPass;

impl IRenderPass for PbrForwardPass {
    fn id(&self) -> &str {
        "pbr_forward"
    }

    fn describe_contract(&self) -> PassContract {
        PassContract {
            role: PassRole::ForwardOpaque,
            supported_modes_mask: technique_mode_bit(TechniqueMode::Forward),
            requires_depth_prepass: false,
            requires_light_culling: false,
            prefer_async_compute: false,
            semantics: vec![Cow::Borrowed("hdr")],
        }
    }

    fn describe_io(&self) -> PassIoDescriptor {
        PassIoDescriptor::new(
            vec![ResourceRef::new(shared::RT_SHADOW_MAP, ResourceKind::ShadowDepth)],
            vec![ResourceRef::new(shared::RT_HDR, ResourceKind::ColorHdr), ResourceRef::new(shared::RT_DEPTH_MOTION, ResourceKind::ColorDepthMotion)],
        )
    }

    fn execute(&mut self, ctx: &mut Context, scene: &Scene, frame: &FrameParams, rt_registry: &mut RtRegistry) -> Result<()> {
        let camera = scene.camera.extract_render_camera();

        let hdr_handle = rt_registry.ensure_transient_color_hdr(shared::RT_HDR, frame.width, frame.height);
        let depth_handle = rt_registry.ensure_transient_depth_motion(shared::RT_DEPTH_MOTION, frame.width, frame.height, camera.near, camera.far);
        if let Some(t) = rt_registry.get_mut::<RenderTarget, ColorKind>(hdr_handle) {
            t.clear();
        }
        if let Some(t) = rt_registry.get_mut::<RenderTarget, DepthKind>(depth_handle) {
            t.clear();
        }

        let Some((color_ptr, color_len, width, height)) = shared::color_hdr_raw_parts(rt_registry, hdr_handle) else { return Ok(()) };
        let Some((depth_ptr, depth_len, motion_ptr, motion_len, _, _)) = shared::depth_motion_raw_parts(rt_registry, depth_handle) else { return Ok(()) };

        // Safety: `hdr_handle` and `depth_handle` name disjoint registry
        // slots resolved just above; both slices are dropped before
        // `rt_registry` is touched again.
        let color: &mut [Vec4] = unsafe { std::slice::from_raw_parts_mut(color_ptr, color_len) };
        let depth: &mut [f32] = unsafe { std::slice::from_raw_parts_mut(depth_ptr, depth_len) };
        let motion: &mut [[f32; 2]] = unsafe { std::slice::from_raw_parts_mut(motion_ptr, motion_len) };

        let shadow_map = shared::sample_shadow_map(rt_registry);
        let base_uniforms = shared::base_lighting_uniforms(scene, frame, &camera, shadow_map);

        let Some(resources) = scene.resources.clone() else { return Ok(()) };

        for element in scene.elements.iter() {
            if !element.enabled || !element.visible {
                continue;
            }
            let Some(mesh) = resources.get_mesh(element.mesh) else { continue };
            let material = resources.get_material(element.material).copied().unwrap_or_default();
            let uniforms = ShaderUniforms {
                base_color: material.base_color,
                metallic: material.metallic,
                roughness: material.roughness,
                ao: material.ao,
                base_color_tex: material.base_color_texture.and_then(|h| resources.get_texture(h)),
                ..base_uniforms
            };

            let mut rt_target = RasterizerTarget { width, height, color: &mut *color, depth: Some(&mut *depth), motion: Some(&mut *motion), aux: None };
            let stats = rasterize_mesh(ctx.job_system.as_ref(), &RasterizerConfig::default(), mesh, &PbrMetallicRoughnessShader, &uniforms, element.world_transform, element.prev_world_transform, &mut rt_target);
            ctx.debug.tri_input += stats.tri_input;
            ctx.debug.tri_after_clip += stats.tri_after_clip;
            ctx.debug.tri_raster += stats.tri_raster;
            ctx.debug.draw_calls += 1;
        }

        ctx.debug.pass_count += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::InlineJobSystem;
    use std::sync::Arc;

    #[test]
    fn runs_without_elements_and_clears_targets() {
        let mut ctx = Context::new(Arc::new(InlineJobSystem));
        let mut scene = Scene::new();
        scene.resources = Some(Arc::new(crate::registry::ResourceRegistry::new()));
        let frame = FrameParams::new(8, 8);
        let mut rt_registry = RtRegistry::new();
        let mut pass = PbrForwardPass;
        pass.execute(&mut ctx, &scene, &frame, &mut rt_registry).unwrap();
        assert_eq!(ctx.debug.pass_count, 1);
    }
}
