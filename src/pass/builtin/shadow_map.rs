//! Built-in `shadow_map` pass (spec §6): renders depth-only from the
//! directional light's point of view into a fixed-size shadow map, read back
//! by every forward/deferred lighting pass via the same
//! [`shared::directional_light_view_proj`] matrix.

use std::borrow::Cow;

use glam::Vec4;

use crate::context::Context;
use crate::errors::Result;
use crate::frame::FrameParams;
use crate::pass::builtin::shared::{self, ALL_TECHNIQUE_MODES_MASK};
use crate::pass::types::{PassContract, PassIoDescriptor, PassRole, ResourceKind, ResourceRef};
use crate::pass::IRenderPass;
use crate::raster::rasterizer::{rasterize_mesh, RasterizerConfig, RasterizerTarget};
use crate::raster::shader::ShaderUniforms;
use crate::registry::{RenderTarget, RtRegistry, ShadowKind};
use crate::scene::Scene;

#[derive(Default)]
pub struct ShadowMapPass;

impl IRenderPass for ShadowMapPass {
    fn id(&self) -> &str {
        "shadow_map"
    }

    fn describe_contract(&self) -> PassContract {
        PassContract {
            role: PassRole::Visibility,
            supported_modes_mask: ALL_TECHNIQUE_MODES_MASK,
            requires_depth_prepass: false,
            requires_light_culling: false,
            prefer_async_compute: false,
            semantics: vec![Cow::Borrowed("shadow_depth")],
        }
    }

    fn describe_io(&self) -> PassIoDescriptor {
        PassIoDescriptor::new(vec![], vec![ResourceRef::new(shared::RT_SHADOW_MAP, ResourceKind::ShadowDepth)])
    }

    fn execute(&mut self, ctx: &mut Context, scene: &Scene, frame: &FrameParams, rt_registry: &mut RtRegistry) -> Result<()> {
        if !frame.enable_shadows || !scene.sun.cast_shadows {
            return Ok(());
        }

        let handle = rt_registry.ensure_transient_shadow(shared::RT_SHADOW_MAP, shared::SHADOW_MAP_SIZE, shared::SHADOW_MAP_SIZE);
        let Some(target) = rt_registry.get_mut::<RenderTarget, ShadowKind>(handle) else { return Ok(()) };
        target.clear();
        let RenderTarget::ShadowDepth { width, height, depth } = target else { return Ok(()) };
        let (width, height) = (*width, *height);

        let Some(resources) = scene.resources.clone() else { return Ok(()) };
        let light_viewproj = shared::directional_light_view_proj(scene);
        let uniforms = ShaderUniforms { viewproj: light_viewproj, ..ShaderUniforms::default() };
        let mut color_scratch = vec![Vec4::ZERO; (width * height) as usize];

        for element in scene.elements.iter() {
            if !element.enabled || !element.casts_shadow {
                continue;
            }
            let Some(mesh) = resources.get_mesh(element.mesh) else { continue };

            let mut rt_target = RasterizerTarget { width, height, color: &mut color_scratch[..], depth: Some(&mut depth[..]), motion: None, aux: None };
            let stats = rasterize_mesh(ctx.job_system.as_ref(), &RasterizerConfig::default(), mesh, &shared::DepthOnlyShader, &uniforms, element.world_transform, element.prev_world_transform, &mut rt_target);
            ctx.debug.tri_input += stats.tri_input;
            ctx.debug.tri_after_clip += stats.tri_after_clip;
            ctx.debug.tri_raster += stats.tri_raster;
            ctx.debug.draw_calls += 1;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::InlineJobSystem;
    use crate::registry::RenderTarget as Rt;
    use std::sync::Arc;

    #[test]
    fn disabled_shadows_leave_the_target_unregistered() {
        let mut ctx = Context::new(Arc::new(InlineJobSystem));
        let scene = Scene::new();
        let frame = FrameParams { enable_shadows: false, ..FrameParams::new(64, 64) };
        let mut rt_registry = RtRegistry::new();
        let mut pass = ShadowMapPass;
        pass.execute(&mut ctx, &scene, &frame, &mut rt_registry).unwrap();
        assert!(rt_registry.get::<Rt, ShadowKind>(crate::registry::RtHandle::invalid()).is_none());
    }
}
