//! Built-in `depth_prepass` pass (spec §6): writes depth-only geometry ahead
//! of forward-plus/tiled-deferred/clustered techniques so `light_culling` can
//! classify lights against real scene depth instead of the far plane, and so
//! `pbr_forward_plus`/`pbr_forward_clustered` can early-reject overdraw.

use std::borrow::Cow;

use glam::Vec4;

use crate::context::Context;
use crate::errors::Result;
use crate::frame::FrameParams;
use crate::geometry::TileViewDepthRange;
use crate::pass::builtin::shared;
use crate::pass::types::technique_mode_bit;
use crate::pass::types::{PassContract, PassIoDescriptor, PassRole, ResourceKind, ResourceRef};
use crate::pass::IRenderPass;
use crate::raster::rasterizer::{rasterize_mesh, RasterizerConfig, RasterizerTarget};
use crate::raster::shader::ShaderUniforms;
use crate::registry::{DepthKind, RenderTarget, RtRegistry};
use crate::scene::Scene;

#[derive(Default)]
pub struct DepthPrepassPass;

impl IRenderPass for DepthPrepassPass {
    fn id(&self) -> &str {
        "depth_prepass"
    }

    fn describe_contract(&self) -> PassContract {
        PassContract {
            role: PassRole::Visibility,
            supported_modes_mask: technique_mode_bit(crate::frame::TechniqueMode::ForwardPlus)
                | technique_mode_bit(crate::frame::TechniqueMode::TiledDeferred)
                | technique_mode_bit(crate::frame::TechniqueMode::ClusteredForward),
            requires_depth_prepass: false,
            requires_light_culling: false,
            prefer_async_compute: false,
            semantics: vec![Cow::Borrowed("depth")],
        }
    }

    fn describe_io(&self) -> PassIoDescriptor {
        PassIoDescriptor::new(vec![], vec![ResourceRef::new(shared::RT_DEPTH_MOTION, ResourceKind::ColorDepthMotion)])
    }

    fn execute(&mut self, ctx: &mut Context, scene: &Scene, frame: &FrameParams, rt_registry: &mut RtRegistry) -> Result<()> {
        if !frame.technique.depth_prepass {
            return Ok(());
        }
        let camera = scene.camera.extract_render_camera();

        let handle = rt_registry.ensure_transient_depth_motion(shared::RT_DEPTH_MOTION, frame.width, frame.height, camera.near, camera.far);
        let Some(target) = rt_registry.get_mut::<RenderTarget, DepthKind>(handle) else { return Ok(()) };
        target.clear();
        let RenderTarget::ColorDepthMotion { width, height, depth, motion } = target else { return Ok(()) };
        let (width, height) = (*width, *height);

        let Some(resources) = scene.resources.clone() else { return Ok(()) };
        let uniforms = ShaderUniforms { viewproj: camera.view_projection_matrix, prev_viewproj: camera.prev_view_projection_matrix, enable_motion_vectors: frame.enable_motion_vectors, ..ShaderUniforms::default() };
        let mut color_scratch = vec![Vec4::ZERO; (width * height) as usize];

        let mut depth_range = TileViewDepthRange::new(width, height, frame.technique.tile_size.max(1));

        for element in scene.elements.iter() {
            if !element.enabled || !element.visible {
                continue;
            }
            let Some(mesh) = resources.get_mesh(element.mesh) else { continue };

            depth_range.accumulate_aabb(&element.bounds.bounding_aabb(), camera.view_matrix, camera.projection_matrix, width, height);

            let mut rt_target = RasterizerTarget { width, height, color: &mut color_scratch[..], depth: Some(&mut depth[..]), motion: Some(&mut motion[..]), aux: None };
            let stats = rasterize_mesh(ctx.job_system.as_ref(), &RasterizerConfig::default(), mesh, &shared::DepthOnlyShader, &uniforms, element.world_transform, element.prev_world_transform, &mut rt_target);
            ctx.debug.tri_input += stats.tri_input;
            ctx.debug.tri_after_clip += stats.tri_after_clip;
            ctx.debug.tri_raster += stats.tri_raster;
            ctx.debug.draw_calls += 1;
        }

        ctx.tile_depth_range = Some(depth_range);
        ctx.forward_plus.depth_prepass_valid = true;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::InlineJobSystem;
    use std::sync::Arc;

    #[test]
    fn skipped_without_depth_prepass_requested() {
        let mut ctx = Context::new(Arc::new(InlineJobSystem));
        let scene = Scene::new();
        let frame = FrameParams::new(32, 32);
        let mut rt_registry = RtRegistry::new();
        let mut pass = DepthPrepassPass;
        pass.execute(&mut ctx, &scene, &frame, &mut rt_registry).unwrap();
        assert!(!ctx.forward_plus.depth_prepass_valid);
    }

    #[test]
    fn marks_depth_prepass_valid_when_requested() {
        let mut ctx = Context::new(Arc::new(InlineJobSystem));
        let scene = Scene::new();
        let mut frame = FrameParams::new(32, 32);
        frame.technique.depth_prepass = true;
        let mut rt_registry = RtRegistry::new();
        let mut pass = DepthPrepassPass;
        pass.execute(&mut ctx, &scene, &frame, &mut rt_registry).unwrap();
        assert!(ctx.forward_plus.depth_prepass_valid);
        assert!(ctx.tile_depth_range.is_some());
    }
}
