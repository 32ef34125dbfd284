//! Light Culling & Binning (C4, spec §4.4).
//!
//! Classifies every local light into the screen-space tiles (optionally
//! depth-sliced into clusters) it geometrically overlaps, then lets each
//! drawn object gather a capped, distance-ordered light list from the bins
//! its own footprint touches.

pub mod binning;
pub mod cells;
pub mod config;

pub use binning::{build_light_bin_culling, gather_lights_for_object, LightBinCullingData};
pub use config::{LightBinCullingConfig, LightCullingMode, MAX_LIGHTS_PER_OBJECT};
