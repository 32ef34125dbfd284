//! Built-in `light_culling` pass (spec §6): classifies local lights into
//! screen-space tiles for the forward-plus and tiled-deferred techniques.
//! Depth-clips each tile's cell to `depth_prepass`'s per-tile depth range when
//! one is available, otherwise falls back to the camera's full frustum depth.

use std::borrow::Cow;

use crate::context::Context;
use crate::errors::Result;
use crate::frame::{FrameParams, TechniqueMode};
use crate::lighting::LightCullingMode;
use crate::pass::builtin::shared;
use crate::pass::types::{technique_mode_bit, PassContract, PassIoDescriptor, PassRole, ResourceKind, ResourceRef};
use crate::pass::IRenderPass;
use crate::registry::RtRegistry;
use crate::scene::Scene;

#[derive(Default)]
pub struct LightCullingPass;

impl IRenderPass for LightCullingPass {
    fn id(&self) -> &str {
        "light_culling"
    }

    fn describe_contract(&self) -> PassContract {
        PassContract {
            role: PassRole::LightCulling,
            supported_modes_mask: technique_mode_bit(TechniqueMode::ForwardPlus) | technique_mode_bit(TechniqueMode::TiledDeferred),
            requires_depth_prepass: true,
            requires_light_culling: false,
            prefer_async_compute: true,
            semantics: vec![Cow::Borrowed("light_grid"), Cow::Borrowed("light_index_list")],
        }
    }

    fn describe_io(&self) -> PassIoDescriptor {
        PassIoDescriptor::new(vec![ResourceRef::new(shared::RT_DEPTH_MOTION, ResourceKind::ColorDepthMotion)], vec![])
    }

    fn execute(&mut self, ctx: &mut Context, scene: &Scene, frame: &FrameParams, _rt_registry: &mut RtRegistry) -> Result<()> {
        if !frame.technique.light_culling || !ctx.forward_plus.depth_prepass_valid {
            return Ok(());
        }
        let mode = if ctx.tile_depth_range.as_ref().is_some_and(|r| r.valid) { LightCullingMode::TiledDepthRange } else { LightCullingMode::Tiled };
        shared::run_light_binning(ctx, scene, frame, mode);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::InlineJobSystem;
    use std::sync::Arc;

    #[test]
    fn skipped_without_a_valid_depth_prepass() {
        let mut ctx = Context::new(Arc::new(InlineJobSystem));
        let scene = Scene::new();
        let mut frame = FrameParams::new(64, 64);
        frame.technique.light_culling = true;
        let mut rt_registry = RtRegistry::new();
        let mut pass = LightCullingPass;
        pass.execute(&mut ctx, &scene, &frame, &mut rt_registry).unwrap();
        assert!(ctx.light_bins.is_none());
    }

    #[test]
    fn runs_once_depth_prepass_is_valid() {
        let mut ctx = Context::new(Arc::new(InlineJobSystem));
        ctx.forward_plus.depth_prepass_valid = true;
        let scene = Scene::new();
        let mut frame = FrameParams::new(64, 64);
        frame.technique.light_culling = true;
        let mut rt_registry = RtRegistry::new();
        let mut pass = LightCullingPass;
        pass.execute(&mut ctx, &scene, &frame, &mut rt_registry).unwrap();
        assert!(ctx.light_bins.is_some());
        assert!(ctx.forward_plus.light_culling_valid);
    }
}
