//! Per-renderer runtime context: job system handle, debug counters, and the
//! forward-plus tile/cluster state shared across a frame's passes.

use std::sync::Arc;

use crate::geometry::TileViewDepthRange;
use crate::job::JobSystem;
use crate::lighting::LightBinCullingData;

/// Triangle-count counters the rasterizer accumulates each frame. Reset at
/// the start of every `execute_plan` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderDebugStats {
    pub tri_input: u64,
    pub tri_after_clip: u64,
    pub tri_raster: u64,
    pub pass_count: u64,
    pub draw_calls: u64,
    pub culled_objects: u64,
}

impl RenderDebugStats {
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Forward-plus / tiled / clustered technique runtime state: tile or cluster
/// geometry plus the validity flags that gate dependent passes (spec §4.4,
/// §4.7 — a lighting pass that reads stale or absent culling output must be
/// skipped, not fed garbage).
#[derive(Debug, Clone, Default)]
pub struct ForwardPlusState {
    pub tile_size: u32,
    pub tile_count_x: u32,
    pub tile_count_y: u32,
    pub max_lights_per_tile: u32,
    pub visible_light_count: u32,
    pub per_tile_light_counts: Vec<u32>,
    pub depth_prepass_valid: bool,
    pub light_culling_valid: bool,
}

impl ForwardPlusState {
    pub fn reset(&mut self) {
        self.visible_light_count = 0;
        self.per_tile_light_counts.clear();
        self.depth_prepass_valid = false;
        self.light_culling_valid = false;
    }
}

/// The renderer's per-instance runtime state: concurrency handle plus the
/// counters and technique state every pass reads and writes through.
pub struct Context {
    pub job_system: Arc<dyn JobSystem>,
    pub debug: RenderDebugStats,
    pub forward_plus: ForwardPlusState,
    /// Per-tile/cluster light index lists built by `light_culling` or
    /// `cluster_light_assign`, consumed by whichever lighting pass runs
    /// later in the same plan. Not part of the spec'd data model directly —
    /// `ForwardPlusState` holds only the summary counts — but a later pass
    /// needs the actual bin contents, not just their sizes, so this is where
    /// they live for the remainder of the frame.
    pub light_bins: Option<LightBinCullingData>,
    /// Per-tile view-space depth range accumulated by `depth_prepass` from
    /// visible elements' world AABBs (spec §4.2), consumed by `light_culling`
    /// when its mode is `TiledDepthRange`.
    pub tile_depth_range: Option<TileViewDepthRange>,
}

impl Context {
    #[must_use]
    pub fn new(job_system: Arc<dyn JobSystem>) -> Self {
        Self {
            job_system,
            debug: RenderDebugStats::default(),
            forward_plus: ForwardPlusState::default(),
            light_bins: None,
            tile_depth_range: None,
        }
    }

    /// Resets per-frame counters and technique validity flags. Called by the
    /// executor at the start of every `execute_plan`.
    pub fn begin_frame(&mut self) {
        self.debug.reset();
        self.forward_plus.depth_prepass_valid = false;
        self.forward_plus.light_culling_valid = false;
        self.light_bins = None;
        self.tile_depth_range = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::InlineJobSystem;

    #[test]
    fn begin_frame_resets_counters_and_validity_flags() {
        let mut ctx = Context::new(Arc::new(InlineJobSystem));
        ctx.debug.tri_input = 100;
        ctx.forward_plus.depth_prepass_valid = true;
        ctx.begin_frame();
        assert_eq!(ctx.debug.tri_input, 0);
        assert!(!ctx.forward_plus.depth_prepass_valid);
    }
}
