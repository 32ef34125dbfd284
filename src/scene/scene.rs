//! The renderable scene: camera, sun, render items, and lights a frame reads.

use std::sync::Arc;

use glam::Vec3;

use crate::registry::ResourceRegistry;
use crate::scene::camera::Camera;
use crate::scene::element::SceneElementSet;
use crate::scene::light::{DirectionalLight, Light};

/// Analytic or image-based sky contribution sampled by direction. Kept as a
/// trait object so a recipe's skybox/light-shafts passes stay backend- and
/// representation-agnostic (gradient sky, captured cubemap, procedural Preetham
/// model — any of them implement this the same way).
pub trait SkyModel: Send + Sync {
    fn sample(&self, direction: Vec3) -> Vec3;
}

/// A flat analytic sky: a simple horizon-to-zenith gradient. Used as the
/// crate's built-in default so a scene always has *something* to sample.
#[derive(Debug, Clone, Copy)]
pub struct GradientSky {
    pub horizon_color: Vec3,
    pub zenith_color: Vec3,
}

impl Default for GradientSky {
    fn default() -> Self {
        Self { horizon_color: Vec3::new(0.7, 0.8, 0.9), zenith_color: Vec3::new(0.2, 0.4, 0.8) }
    }
}

impl SkyModel for GradientSky {
    fn sample(&self, direction: Vec3) -> Vec3 {
        let t = (direction.normalize_or_zero().y * 0.5 + 0.5).clamp(0.0, 1.0);
        self.horizon_color.lerp(self.zenith_color, t)
    }
}

/// Everything a frame's passes read: camera, sun, the flattened set of
/// renderable elements, the set of local lights, and an optional sky model.
pub struct Scene {
    pub camera: Camera,
    pub sun: DirectionalLight,
    pub elements: SceneElementSet,
    pub lights: Vec<Light>,
    pub sky: Option<Arc<dyn SkyModel>>,
    pub resources: Option<Arc<ResourceRegistry>>,
}

impl Scene {
    #[must_use]
    pub fn new() -> Self {
        Self {
            camera: Camera::new_perspective(60.0, 16.0 / 9.0, 0.1),
            sun: DirectionalLight::default(),
            elements: SceneElementSet::new(),
            lights: Vec::new(),
            sky: None,
            resources: None,
        }
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gradient_sky_interpolates_toward_zenith_looking_up() {
        let sky = GradientSky::default();
        let up = sky.sample(Vec3::Y);
        let horizon = sky.sample(Vec3::X);
        assert_ne!(up, horizon);
    }

    #[test]
    fn new_scene_has_no_elements_or_lights() {
        let scene = Scene::new();
        assert!(scene.elements.is_empty());
        assert!(scene.lights.is_empty());
    }
}
