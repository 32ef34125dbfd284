//! Built-in `cluster_build` pass (spec §6): sizes the clustered-forward
//! technique's tile grid from the current viewport ahead of
//! `cluster_light_assign`'s actual light classification. Mirrors the
//! original system's split between building cluster *geometry* and
//! *assigning* lights to it as two separate passes, even though this crate's
//! `build_light_bin_culling` computes both in one call — `cluster_build`
//! still reserves the per-tile count storage so a recipe's IO graph sees the
//! two steps as independent writers.

use std::borrow::Cow;

use crate::context::Context;
use crate::errors::Result;
use crate::frame::{FrameParams, TechniqueMode};
use crate::pass::types::{technique_mode_bit, PassContract, PassIoDescriptor, PassRole, ResourceKind, ResourceRef};
use crate::pass::{builtin::shared, IRenderPass};
use crate::registry::RtRegistry;
use crate::scene::Scene;

#[derive(Default)]
pub struct ClusterBuildPass;

impl IRenderPass for ClusterBuildPass {
    fn id(&self) -> &str {
        "cluster_build"
    }

    fn describe_contract(&self) -> PassContract {
        PassContract {
            role: PassRole::LightCulling,
            supported_modes_mask: technique_mode_bit(TechniqueMode::ClusteredForward),
            requires_depth_prepass: true,
            requires_light_culling: false,
            prefer_async_compute: true,
            semantics: vec![Cow::Borrowed("cluster_grid")],
        }
    }

    fn describe_io(&self) -> PassIoDescriptor {
        PassIoDescriptor::new(vec![ResourceRef::new(shared::RT_DEPTH_MOTION, ResourceKind::ColorDepthMotion)], vec![])
    }

    fn execute(&mut self, ctx: &mut Context, _scene: &Scene, frame: &FrameParams, _rt_registry: &mut RtRegistry) -> Result<()> {
        if !ctx.forward_plus.depth_prepass_valid {
            return Ok(());
        }
        let tile_size = frame.technique.tile_size.max(1);
        let tile_count_x = frame.width.max(1).div_ceil(tile_size).max(1);
        let tile_count_y = frame.height.max(1).div_ceil(tile_size).max(1);
        ctx.forward_plus.tile_size = tile_size;
        ctx.forward_plus.tile_count_x = tile_count_x;
        ctx.forward_plus.tile_count_y = tile_count_y;
        ctx.forward_plus.per_tile_light_counts = vec![0; (tile_count_x * tile_count_y) as usize];
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::InlineJobSystem;
    use std::sync::Arc;

    #[test]
    fn sizes_the_tile_grid_once_depth_is_valid() {
        let mut ctx = Context::new(Arc::new(InlineJobSystem));
        ctx.forward_plus.depth_prepass_valid = true;
        let scene = Scene::new();
        let frame = FrameParams::new(100, 50);
        let mut rt_registry = RtRegistry::new();
        let mut pass = ClusterBuildPass;
        pass.execute(&mut ctx, &scene, &frame, &mut rt_registry).unwrap();
        assert_eq!(ctx.forward_plus.tile_count_x, 100u32.div_ceil(frame.technique.tile_size));
        assert_eq!(ctx.forward_plus.per_tile_light_counts.len(), (ctx.forward_plus.tile_count_x * ctx.forward_plus.tile_count_y) as usize);
    }
}
