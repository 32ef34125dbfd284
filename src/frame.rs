//! Per-frame parameter surface (§3 supplement, §6 External Interfaces).
//!
//! `FrameParams` is the full knob set a pass may read; `FrameInfo` is the
//! minimal frame/size surface a backend exchanges with the executor at
//! `begin_frame`/`end_frame`.

use serde::{Deserialize, Serialize};

/// Shading model + pass-list technique a recipe targets. Orthogonal to the
/// *render-path* preset (spec §4.7): the same technique mode can back
/// different pass orderings, and the executor cycles `(path, technique)`
/// pairs together as one composition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TechniqueMode {
    Forward,
    ForwardPlus,
    Deferred,
    TiledDeferred,
    ClusteredForward,
}

impl TechniqueMode {
    /// The next mode in the fixed cycle order used by
    /// [`crate::path::executor::RenderPathExecutor::cycle`] (spec §8 S4):
    /// `Forward -> ForwardPlus -> Deferred -> TiledDeferred -> ClusteredForward -> Forward`.
    #[must_use]
    pub fn next(self) -> Self {
        match self {
            Self::Forward => Self::ForwardPlus,
            Self::ForwardPlus => Self::Deferred,
            Self::Deferred => Self::TiledDeferred,
            Self::TiledDeferred => Self::ClusteredForward,
            Self::ClusteredForward => Self::Forward,
        }
    }
}

/// Technique-scoped settings a generic light-culling/depth-prepass pass reads
/// regardless of which concrete pass ids a recipe lists.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameTechnique {
    pub mode: TechniqueMode,
    pub depth_prepass: bool,
    pub light_culling: bool,
    pub tile_size: u32,
    pub max_lights_per_tile: u32,
}

impl Default for FrameTechnique {
    fn default() -> Self {
        Self {
            mode: TechniqueMode::Forward,
            depth_prepass: false,
            light_culling: false,
            tile_size: 16,
            max_lights_per_tile: 64,
        }
    }
}

/// Full per-frame parameter bundle every pass may read a slice of.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameParams {
    pub width: u32,
    pub height: u32,
    pub dt: f32,
    pub time: f32,

    pub exposure: f32,
    pub gamma: f32,

    pub enable_shadows: bool,
    pub enable_skybox: bool,
    pub enable_light_shafts: bool,
    pub enable_motion_vectors: bool,

    pub light_shafts_steps: u32,
    pub light_shafts_density: f32,
    pub light_shafts_weight: f32,
    pub light_shafts_decay: f32,

    pub enable_dof: bool,
    pub enable_bloom: bool,

    pub technique: FrameTechnique,
}

impl Default for FrameParams {
    fn default() -> Self {
        Self {
            width: 0,
            height: 0,
            dt: 0.0,
            time: 0.0,
            exposure: 1.0,
            gamma: 2.2,
            enable_shadows: true,
            enable_skybox: true,
            enable_light_shafts: true,
            enable_motion_vectors: true,
            light_shafts_steps: 48,
            light_shafts_density: 0.8,
            light_shafts_weight: 0.9,
            light_shafts_decay: 0.95,
            enable_dof: false,
            enable_bloom: false,
            technique: FrameTechnique::default(),
        }
    }
}

impl FrameParams {
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height, ..Default::default() }
    }
}

/// Minimal frame/size surface a backend exchanges with the executor
/// (spec §6). `frame_index` is strictly monotonic across a backend's
/// lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameInfo {
    pub frame_index: u64,
    pub width: u32,
    pub height: u32,
}
