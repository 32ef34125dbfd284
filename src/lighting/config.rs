//! Light-binning configuration (C4, spec §4.4).

/// How local lights are partitioned into bins before per-object gathering.
/// Selecting a mode other than one of these four at load time is rejected by
/// the path layer (C7) rather than silently substituted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum LightCullingMode {
    /// No binning: every object considers every light directly.
    None,
    /// Screen-space tiles, unbounded in depth (the full camera frustum).
    Tiled,
    /// Screen-space tiles, depth-clipped per tile to the geometry actually
    /// occupying it (via [`crate::geometry::TileViewDepthRange`]).
    TiledDepthRange,
    /// Screen-space tiles subdivided further into depth slices.
    Clustered,
}

/// Tunables for [`crate::lighting::build_light_bin_culling`].
#[derive(Debug, Clone, Copy)]
pub struct LightBinCullingConfig {
    pub mode: LightCullingMode,
    pub tile_size: u32,
    pub cluster_depth_slices: u32,
    pub z_near: f32,
    pub z_far: f32,
    pub max_lights_per_tile: u32,
}

impl Default for LightBinCullingConfig {
    fn default() -> Self {
        Self {
            mode: LightCullingMode::Clustered,
            tile_size: 32,
            cluster_depth_slices: 16,
            z_near: 0.1,
            z_far: 200.0,
            max_lights_per_tile: 64,
        }
    }
}

/// Maximum number of lights a single object's draw can carry, per spec §4.4
/// ("cap per-object light lists at 8").
pub const MAX_LIGHTS_PER_OBJECT: usize = 8;
