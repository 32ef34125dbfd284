//! Renderable scene elements: the flattened, per-frame array C3's culling
//! engine reads and writes visibility flags on.

use glam::Affine3A;

use crate::geometry::ShapeVolume;
use crate::registry::{MaterialHandle, MeshHandle};

/// A single renderable entry: world transform, culling proxy, and the
/// visibility flags C3 maintains.
///
/// Invariants (spec §4.2):
/// - `visible ⇒ frustum_visible`
/// - `occluded ⇒ ¬visible`
/// - `¬enabled ⇒ ¬visible ∧ ¬frustum_visible`
#[derive(Debug, Clone)]
pub struct SceneElement {
    pub stable_id: u64,
    pub user_index: u32,
    pub world_transform: Affine3A,
    /// `world_transform` as of the previous frame, fed to the rasterizer as
    /// `prev_model` so C5's motion-vector output (spec §4.5 step 11)
    /// captures object motion, not just camera motion. Defaults to
    /// `world_transform` itself (no motion) for an element's first frame.
    pub prev_world_transform: Affine3A,
    pub bounds: ShapeVolume,
    pub mesh: MeshHandle,
    pub material: MaterialHandle,
    pub casts_shadow: bool,

    pub enabled: bool,
    pub visible: bool,
    pub frustum_visible: bool,
    pub occluded: bool,
}

impl SceneElement {
    #[must_use]
    pub fn new(stable_id: u64, user_index: u32, world_transform: Affine3A, bounds: ShapeVolume, mesh: MeshHandle, material: MaterialHandle) -> Self {
        Self {
            stable_id,
            user_index,
            world_transform,
            prev_world_transform: world_transform,
            bounds,
            mesh,
            material,
            casts_shadow: true,
            enabled: true,
            visible: false,
            frustum_visible: false,
            occluded: false,
        }
    }

    /// World-space center of this element's culling proxy, used for
    /// distance-based light ranking in C4.
    #[must_use]
    pub fn world_center(&self) -> glam::Vec3 {
        self.bounds.bounding_aabb().center()
    }

    /// Forces every visibility-derived flag to its "not visible" state
    /// without touching `enabled`. Used when an element is disabled mid-frame.
    pub fn clear_visibility(&mut self) {
        self.visible = false;
        self.frustum_visible = false;
        self.occluded = false;
    }
}

/// A contiguous array of [`SceneElement`]s — the unit C3/C4 iterate over.
#[derive(Debug, Clone, Default)]
pub struct SceneElementSet {
    pub elements: Vec<SceneElement>,
}

impl SceneElementSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, element: SceneElement) {
        self.elements.push(element);
    }

    pub fn clear(&mut self) {
        self.elements.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SceneElement> {
        self.elements.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, SceneElement> {
        self.elements.iter_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::handles::TypedHandle;
    use glam::Vec3;

    fn dummy_element() -> SceneElement {
        SceneElement::new(
            1,
            0,
            Affine3A::IDENTITY,
            ShapeVolume::Sphere { center: Vec3::ZERO, radius: 1.0 },
            MeshHandle::invalid(),
            TypedHandle::invalid(),
        )
    }

    #[test]
    fn new_element_starts_not_visible() {
        let e = dummy_element();
        assert!(e.enabled);
        assert!(!e.visible);
        assert!(!e.frustum_visible);
        assert!(!e.occluded);
    }

    #[test]
    fn clear_visibility_resets_derived_flags_only() {
        let mut e = dummy_element();
        e.enabled = true;
        e.visible = true;
        e.frustum_visible = true;
        e.clear_visibility();
        assert!(e.enabled);
        assert!(!e.visible);
        assert!(!e.frustum_visible);
    }
}
