//! Built-in `cluster_light_assign` pass (spec §6): classifies local lights
//! into the clustered-forward grid `cluster_build` sized. Unlike
//! `light_culling`, this pass is unconditional on `frame.technique.light_culling`
//! once depth is valid — clustered forward always needs its own binning to
//! shade anything, so there is no "technique requested it but it's off" state
//! to honor (mirrors the original's `force_enable = true` on this call).

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
pub struct ClusterLightAssignPass;

impl IRenderPass for ClusterLightAssignPass {
    fn id(&self) -> &str {
        "cluster_light_assign"
    }

    fn describe_contract(&self) -> PassContract {
        PassContract {
            role: PassRole::LightCulling,
            supported_modes_mask: technique_mode_bit(TechniqueMode::ClusteredForward),
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
        if !ctx.forward_plus.depth_prepass_valid {
            return Ok(());
        }
        shared::run_light_binning(ctx, scene, frame, LightCullingMode::Clustered);
        Ok(())
    }
}
