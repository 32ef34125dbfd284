//! Built-in `gbuffer` pass (spec §6, `SPEC_FULL.md` supplement): writes
//! albedo+metallic and world-normal+roughness into two MRT-style targets plus
//! depth/motion, feeding `deferred_lighting`/`deferred_lighting_tiled`'s
//! resolve. One `rasterize_mesh` call per element writes all three targets
//! under a single depth test, via [`shared::color_hdr_raw_parts`]/
//! [`shared::depth_motion_raw_parts`] since the borrow checker cannot see that
//! three separate registry slots are disjoint through one `&mut RtRegistry`.

use std::borrow::Cow;

use glam::Vec4;

use crate::context::Context;
use crate::errors::Result;
use crate::frame::{FrameParams, TechniqueMode};
use crate::pass::builtin::shared;
use crate::pass::types::{technique_mode_bit, PassContract, PassIoDescriptor, PassRole, ResourceKind, ResourceRef};
use crate::pass::IRenderPass;
use crate::raster::rasterizer::{rasterize_mesh, RasterizerConfig, RasterizerTarget};
use crate::raster::shader::{default_vertex_out, FragmentIn, FragmentOut, ShaderProgram, ShaderUniforms, ShaderVertex, VertexOut};
use crate::registry::{ColorKind, RenderTarget, RtRegistry};
use crate::scene::Scene;

/// Writes base-color (+ metallic in alpha) to `color`, world-normal (+
/// roughness in alpha) to `aux`. Texture sampling is intentionally skipped —
/// the gbuffer stores material scalars only, the same fast path every
/// deferred renderer's geometry stage takes.
struct GBufferShader;

impl ShaderProgram for GBufferShader {
    fn vertex_main(&self, vin: &ShaderVertex, uniforms: &ShaderUniforms) -> VertexOut {
        default_vertex_out(vin, uniforms)
    }

    fn fragment_main(&self, fin: &FragmentIn, uniforms: &ShaderUniforms) -> FragmentOut {
        FragmentOut { color: uniforms.base_color.extend(uniforms.metallic), aux: fin.normal_ws.normalize_or_zero().extend(uniforms.roughness), discard: false }
    }
}

#[derive(Default)]
pub struct GBufferPass;

impl IRenderPass for GBufferPass {
    fn id(&self) -> &str {
        "gbuffer"
    }

    fn describe_contract(&self) -> PassContract {
        PassContract {
            role: PassRole::GBuffer,
            supported_modes_mask: technique_mode_bit(TechniqueMode::Deferred) | technique_mode_bit(TechniqueMode::TiledDeferred),
            requires_depth_prepass: false,
            requires_light_culling: false,
            prefer_async_compute: false,
            semantics: vec![Cow::Borrowed("gbuffer_albedo"), Cow::Borrowed("gbuffer_normal")],
        }
    }

    fn describe_io(&self) -> PassIoDescriptor {
        PassIoDescriptor::new(
            vec![],
            vec![
                ResourceRef::new(shared::RT_GBUFFER_ALBEDO, ResourceKind::ColorHdr),
                ResourceRef::new(shared::RT_GBUFFER_NORMAL, ResourceKind::ColorHdr),
                ResourceRef::new(shared::RT_DEPTH_MOTION, ResourceKind::ColorDepthMotion),
            ],
        )
    }

    fn execute(&mut self, ctx: &mut Context, scene: &Scene, frame: &FrameParams, rt_registry: &mut RtRegistry) -> Result<()> {
        let camera = scene.camera.extract_render_camera();
        let albedo_handle = rt_registry.ensure_transient_color_hdr(shared::RT_GBUFFER_ALBEDO, frame.width, frame.height);
        let normal_handle = rt_registry.ensure_transient_color_hdr(shared::RT_GBUFFER_NORMAL, frame.width, frame.height);
        let depth_handle = rt_registry.ensure_transient_depth_motion(shared::RT_DEPTH_MOTION, frame.width, frame.height, camera.near, camera.far);

        if let Some(t) = rt_registry.get_mut::<RenderTarget, ColorKind>(albedo_handle) {
            t.clear();
        }
        if let Some(t) = rt_registry.get_mut::<RenderTarget, ColorKind>(normal_handle) {
            t.clear();
        }
        if let Some(t) = rt_registry.get_mut::<RenderTarget, crate::registry::DepthKind>(depth_handle) {
            t.clear();
        }

        let Some((albedo_ptr, albedo_len, width, height)) = shared::color_hdr_raw_parts(rt_registry, albedo_handle) else { return Ok(()) };
        let Some((normal_ptr, normal_len, _, _)) = shared::color_hdr_raw_parts(rt_registry, normal_handle) else { return Ok(()) };
        let Some((depth_ptr, depth_len, motion_ptr, motion_len, _, _)) = shared::depth_motion_raw_parts(rt_registry, depth_handle) else { return Ok(()) };

        // Safety: the three handles above were freshly resolved from
        // disjoint registry slots (albedo, normal, depth+motion), and every
        // slice below is dropped before `rt_registry` is touched again.
        let color: &mut [Vec4] = unsafe { std::slice::from_raw_parts_mut(albedo_ptr, albedo_len) };
        let aux: &mut [Vec4] = unsafe { std::slice::from_raw_parts_mut(normal_ptr, normal_len) };
        let depth: &mut [f32] = unsafe { std::slice::from_raw_parts_mut(depth_ptr, depth_len) };
        let motion: &mut [[f32; 2]] = unsafe { std::slice::from_raw_parts_mut(motion_ptr, motion_len) };

        let Some(resources) = scene.resources.clone() else { return Ok(()) };
        let base_uniforms = ShaderUniforms { viewproj: camera.view_projection_matrix, prev_viewproj: camera.prev_view_projection_matrix, enable_motion_vectors: frame.enable_motion_vectors, ..ShaderUniforms::default() };

        for element in scene.elements.iter() {
            if !element.enabled || !element.visible {
                continue;
            }
            let Some(mesh) = resources.get_mesh(element.mesh) else { continue };
            let material = resources.get_material(element.material).copied().unwrap_or_default();
            let uniforms = ShaderUniforms { base_color: material.base_color, metallic: material.metallic, roughness: material.roughness, ao: material.ao, ..base_uniforms };

            let mut rt_target = RasterizerTarget { width, height, color: &mut *color, depth: Some(&mut *depth), motion: Some(&mut *motion), aux: Some(&mut *aux) };
            let stats = rasterize_mesh(ctx.job_system.as_ref(), &RasterizerConfig::default(), mesh, &GBufferShader, &uniforms, element.world_transform, element.prev_world_transform, &mut rt_target);
            ctx.debug.tri_input += stats.tri_input;
            ctx.debug.tri_after_clip += stats.tri_after_clip;
            ctx.debug.tri_raster += stats.tri_raster;
            ctx.debug.draw_calls += 1;
        }

        Ok(())
    }
}
