//! Scene Culling Engine (C3): frustum culling, optional software occlusion,
//! visibility-history debouncing, and the all-occluded fallback, tied
//! together over a [`SceneElementSet`] each frame.

use glam::Affine3A;

use crate::culling::history::{VisibilityHistory, VisibilityPolicy};
use crate::culling::occlusion::OcclusionBuffer;
use crate::registry::{MeshHandle, ResourceRegistry};
use crate::scene::camera::RenderCamera;
use crate::scene::element::SceneElementSet;

/// One static-geometry instance rasterized into the occlusion buffer ahead of
/// the main cull. Occluders are nominated explicitly by the caller (large,
/// opaque, typically axis-aligned meshes) rather than inferred from the
/// element set — most renderable elements make poor occluders.
#[derive(Debug, Clone)]
pub struct OccluderInstance {
    pub mesh: MeshHandle,
    pub world_transform: Affine3A,
}

/// Per-frame counters from a [`SceneCullingEngine::run`] call.
///
/// Invariant: `visible_count <= frustum_visible_count <= scene_count`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CullStats {
    pub scene_count: usize,
    pub frustum_visible_count: usize,
    pub occluded_count: usize,
    pub visible_count: usize,
}

/// Configuration for a [`SceneCullingEngine`].
#[derive(Debug, Clone, Copy)]
pub struct CullingConfig {
    pub use_occlusion: bool,
    pub occlusion_buffer_width: u32,
    pub occlusion_buffer_height: u32,
    pub visibility_policy: VisibilityPolicy,
}

impl Default for CullingConfig {
    fn default() -> Self {
        Self { use_occlusion: true, occlusion_buffer_width: 256, occlusion_buffer_height: 144, visibility_policy: VisibilityPolicy::default() }
    }
}

/// Orchestrates one frame's visibility resolution over a [`SceneElementSet`].
pub struct SceneCullingEngine {
    config: CullingConfig,
    occlusion_buffer: OcclusionBuffer,
    history: VisibilityHistory,
    last_camera_position: Option<glam::Vec3A>,
}

/// Camera displacement beyond which accumulated visibility history is
/// discarded outright rather than debounced through — a cut or teleport, not
/// normal frame-to-frame motion.
const CAMERA_JUMP_DISTANCE: f32 = 50.0;

impl SceneCullingEngine {
    #[must_use]
    pub fn new(config: CullingConfig) -> Self {
        Self {
            occlusion_buffer: OcclusionBuffer::new(config.occlusion_buffer_width, config.occlusion_buffer_height),
            history: VisibilityHistory::new(config.visibility_policy),
            last_camera_position: None,
            config,
        }
    }

    #[must_use]
    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Runs frustum culling, then (if enabled and occluders were supplied)
    /// software occlusion, visibility-history debouncing, and the
    /// all-occluded safety fallback, writing `frustum_visible`/`occluded`/
    /// `visible` on every element in `elements`.
    pub fn run(&mut self, elements: &mut SceneElementSet, registry: &ResourceRegistry, camera: &RenderCamera, occluders: &[OccluderInstance]) -> CullStats {
        if self.camera_jumped(camera) {
            self.history.clear();
        }
        self.last_camera_position = Some(camera.position);

        let view_proj = camera.view_projection_matrix;

        let mut stats = CullStats { scene_count: elements.len(), ..Default::default() };

        for element in elements.iter_mut() {
            if !element.enabled {
                element.clear_visibility();
                self.history.reset(element.stable_id);
                continue;
            }
            element.frustum_visible = camera.frustum.classify(&element.bounds) != crate::geometry::Classification::Outside;
            if !element.frustum_visible {
                element.visible = false;
                element.occluded = false;
                self.history.reset(element.stable_id);
            }
        }
        stats.frustum_visible_count = elements.iter().filter(|e| e.frustum_visible).count();

        if self.config.use_occlusion && !occluders.is_empty() && stats.frustum_visible_count > 0 {
            self.occlusion_buffer.clear();
            for occ in occluders {
                if let Some(mesh) = registry.get_mesh(occ.mesh) {
                    self.occlusion_buffer.rasterize_occluder(&mesh.positions, mesh.indices.as_deref(), occ.world_transform, view_proj);
                }
            }

            for element in elements.iter_mut() {
                if !element.frustum_visible {
                    continue;
                }
                let raw_occluded = self.occlusion_buffer.test_aabb(&element.bounds.bounding_aabb(), view_proj);
                let confirmed_visible = self.history.report(element.stable_id, raw_occluded);
                element.occluded = !confirmed_visible;
                element.visible = confirmed_visible;
            }
        } else {
            for element in elements.iter_mut() {
                if element.frustum_visible {
                    element.occluded = false;
                    element.visible = true;
                    self.history.reset(element.stable_id);
                }
            }
        }

        stats.occluded_count = elements.iter().filter(|e| e.frustum_visible && e.occluded).count();
        stats.visible_count = elements.iter().filter(|e| e.visible).count();

        // Safety fallback: an occlusion buffer that (due to a degenerate
        // occluder set or floating-point edge case) reports every visible
        // element occluded would blank the frame. Fall back to raw frustum
        // visibility rather than render nothing.
        if stats.frustum_visible_count > 0 && stats.visible_count == 0 {
            for element in elements.iter_mut() {
                if element.frustum_visible {
                    element.visible = true;
                    element.occluded = false;
                }
            }
            stats.occluded_count = 0;
            stats.visible_count = stats.frustum_visible_count;
            self.history.clear();
        }

        stats
    }

    fn camera_jumped(&self, camera: &RenderCamera) -> bool {
        match self.last_camera_position {
            Some(prev) => prev.distance(camera.position) > CAMERA_JUMP_DISTANCE,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{Material, Mesh};
    use crate::scene::camera::Camera;
    use crate::scene::element::SceneElement;
    use crate::geometry::ShapeVolume;
    use glam::Vec3;

    fn camera_at(pos: Vec3) -> RenderCamera {
        let mut cam = Camera::new_perspective(60.0, 1.0, 0.1);
        cam.update_view_projection(&Affine3A::from_translation(pos));
        cam.extract_render_camera()
    }

    fn element_at(id: u64, pos: Vec3) -> SceneElement {
        SceneElement::new(id, 0, Affine3A::from_translation(pos), ShapeVolume::Sphere { center: pos, radius: 0.5 }, MeshHandle::invalid(), crate::registry::MaterialHandle::invalid())
    }

    #[test]
    fn invariant_visible_le_frustum_le_scene() {
        let mut engine = SceneCullingEngine::new(CullingConfig { use_occlusion: false, ..Default::default() });
        let registry = ResourceRegistry::new();
        let camera = camera_at(Vec3::ZERO);
        let mut set = SceneElementSet::new();
        set.push(element_at(1, Vec3::new(0.0, 0.0, -5.0)));
        set.push(element_at(2, Vec3::new(0.0, 0.0, -1000.0)));

        let stats = engine.run(&mut set, &registry, &camera, &[]);
        assert!(stats.visible_count <= stats.frustum_visible_count);
        assert!(stats.frustum_visible_count <= stats.scene_count);
        assert_eq!(stats.scene_count, 2);
    }

    #[test]
    fn disabled_elements_are_never_visible() {
        let mut engine = SceneCullingEngine::new(CullingConfig::default());
        let registry = ResourceRegistry::new();
        let camera = camera_at(Vec3::ZERO);
        let mut set = SceneElementSet::new();
        let mut e = element_at(1, Vec3::new(0.0, 0.0, -5.0));
        e.enabled = false;
        set.push(e);

        let stats = engine.run(&mut set, &registry, &camera, &[]);
        assert_eq!(stats.visible_count, 0);
        assert!(!set.elements[0].visible);
        assert!(!set.elements[0].frustum_visible);
    }

    #[test]
    fn element_behind_occluder_becomes_occluded_after_hide_confirm_frames() {
        let mut engine = SceneCullingEngine::new(CullingConfig { use_occlusion: true, visibility_policy: VisibilityPolicy { hide_confirm_frames: 2, show_confirm_frames: 1 }, ..Default::default() });
        let mut registry = ResourceRegistry::new();
        let wall_mesh = registry.add_mesh(Mesh {
            positions: vec![
                Vec3::new(-10.0, -10.0, -10.0),
                Vec3::new(10.0, -10.0, -10.0),
                Vec3::new(10.0, 10.0, -10.0),
                Vec3::new(-10.0, 10.0, -10.0),
            ],
            indices: Some(vec![0, 1, 2, 0, 2, 3]),
            ..Default::default()
        });

        let camera = camera_at(Vec3::ZERO);
        let mut set = SceneElementSet::new();
        set.push(element_at(7, Vec3::new(0.0, 0.0, -20.0)));
        let occluders = [OccluderInstance { mesh: wall_mesh, world_transform: Affine3A::IDENTITY }];

        let first = engine.run(&mut set, &registry, &camera, &occluders);
        assert!(set.elements[0].visible);
        assert_eq!(first.occluded_count, 0);

        let second = engine.run(&mut set, &registry, &camera, &occluders);
        assert!(!set.elements[0].visible);
        assert_eq!(second.occluded_count, 1);
    }

    #[test]
    fn camera_jump_clears_history() {
        let mut engine = SceneCullingEngine::new(CullingConfig::default());
        let registry = ResourceRegistry::new();
        let camera = camera_at(Vec3::ZERO);
        let mut set = SceneElementSet::new();
        set.push(element_at(1, Vec3::new(0.0, 0.0, -5.0)));
        engine.run(&mut set, &registry, &camera, &[]);

        let far_camera = camera_at(Vec3::new(1000.0, 0.0, 1000.0));
        engine.run(&mut set, &registry, &far_camera, &[]);
        assert_eq!(engine.history_len(), 0);
    }
}
