//! Scene data model (C0, spec §3) plus the supporting scene-graph layer
//! described in `SPEC_FULL.md` §2.1/§4.0: a transform hierarchy for
//! applications that want one, a flat name-addressable object set for those
//! that don't, and the logic/render system processors that drive both from
//! frame to frame.

pub mod camera;
pub mod element;
pub mod light;
pub mod manager;
pub mod node;
pub mod object_set;
pub mod scene;
pub mod systems;
pub mod transform;
pub mod transform_system;

pub use camera::{Camera, ProjectionType, RenderCamera};
pub use element::{SceneElement, SceneElementSet};
pub use light::{AttenuationModel, DirectionalLight, Light, LightCommon, LightKind, PackedLight};
pub use manager::{SceneHandle, SceneManager};
pub use node::Node;
pub use object_set::{stable_object_id, SceneObject, SceneObjectSet};
pub use scene::{GradientSky, Scene, SkyModel};
pub use systems::{
    LogicSystem, LogicSystemContext, LogicSystemProcessor, RenderSystem, RenderSystemContext,
    RenderSystemProcessor,
};
pub use transform::Transform;
pub use transform_system::{build_level_order_batches, update_hierarchy, LevelOrderBatches};

use slotmap::new_key_type;

new_key_type! {
    /// Strongly-typed handle for scene-graph nodes (the optional hierarchy
    /// layer; most scenes use the flat [`SceneObjectSet`] instead).
    pub struct NodeHandle;
}
