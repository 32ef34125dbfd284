//! Scene Culling Engine (C3, spec §4).
//!
//! Frustum culling against [`crate::geometry::Frustum`], optional software
//! occlusion culling via a low-resolution rasterized depth buffer, and a
//! debounced visibility history that keeps occlusion flicker at silhouette
//! edges from toggling an element's visible state every frame.

pub mod engine;
pub mod history;
pub mod occlusion;

pub use engine::{CullStats, CullingConfig, OccluderInstance, SceneCullingEngine};
pub use history::{VisibilityHistory, VisibilityPolicy};
pub use occlusion::OcclusionBuffer;
