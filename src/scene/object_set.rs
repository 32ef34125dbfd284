//! Name-keyed scene objects with stable cross-frame identity.

use glam::{Affine3A, Vec3};

use crate::geometry::{Aabb, ShapeVolume};
use crate::registry::{MaterialHandle, MeshHandle, ResourceRegistry};
use crate::scene::element::{SceneElement, SceneElementSet};

/// Deterministic FNV-1a 64-bit hash of `name`, guaranteed non-zero (zero is
/// reserved to mean "unset" elsewhere in the crate).
#[must_use]
pub fn stable_object_id(name: &str) -> u64 {
    let mut h: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in name.as_bytes() {
        h ^= u64::from(*byte);
        h = h.wrapping_mul(0x0000_0100_0000_01b3);
    }
    if h == 0 {
        1
    } else {
        h
    }
}

/// A user-authored scene object: a name, a mesh/material pair, and a local
/// transform. `object_id` is assigned from [`stable_object_id`] on [`SceneObjectSet::add`]
/// unless the caller already set a non-zero id.
#[derive(Debug, Clone)]
pub struct SceneObject {
    pub name: String,
    pub mesh: MeshHandle,
    pub material: MaterialHandle,
    pub position: Vec3,
    pub rotation_euler: Vec3,
    pub scale: Vec3,
    pub visible: bool,
    pub casts_shadow: bool,
    pub object_id: u64,
}

impl SceneObject {
    #[must_use]
    pub fn new(name: impl Into<String>, mesh: MeshHandle, material: MaterialHandle) -> Self {
        Self {
            name: name.into(),
            mesh,
            material,
            position: Vec3::ZERO,
            rotation_euler: Vec3::ZERO,
            scale: Vec3::ONE,
            visible: true,
            casts_shadow: true,
            object_id: 0,
        }
    }

    #[must_use]
    pub fn local_transform(&self) -> Affine3A {
        Affine3A::from_scale_rotation_translation(
            self.scale,
            glam::Quat::from_euler(glam::EulerRot::XYZ, self.rotation_euler.x, self.rotation_euler.y, self.rotation_euler.z),
            self.position,
        )
    }
}

/// Flat, name-addressable store of [`SceneObject`]s, kept separate from the
/// hierarchical node graph: most scenes are a flat list of render items plus
/// a camera and a handful of lights, and this avoids paying for tree
/// traversal when there is no tree.
#[derive(Debug, Clone, Default)]
pub struct SceneObjectSet {
    objects: Vec<SceneObject>,
}

impl SceneObjectSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `obj`, assigning a stable id from its name if it doesn't
    /// already have one. Returns the index the object was stored at.
    pub fn add(&mut self, mut obj: SceneObject) -> usize {
        if obj.object_id == 0 {
            obj.object_id = stable_object_id(&obj.name);
        }
        self.objects.push(obj);
        self.objects.len() - 1
    }

    #[must_use]
    pub fn find_by_name(&self, name: &str) -> Option<&SceneObject> {
        self.objects.iter().find(|o| o.name == name)
    }

    pub fn find_by_name_mut(&mut self, name: &str) -> Option<&mut SceneObject> {
        self.objects.iter_mut().find(|o| o.name == name)
    }

    #[must_use]
    pub fn find_by_id(&self, object_id: u64) -> Option<&SceneObject> {
        self.objects.iter().find(|o| o.object_id == object_id)
    }

    #[must_use]
    pub fn objects(&self) -> &[SceneObject] {
        &self.objects
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Rebuilds `elements` from this set's current objects, one
    /// [`SceneElement`] per [`SceneObject`] in storage order. Replaces
    /// `elements`'s contents entirely; C3 is expected to run its culling pass
    /// immediately afterwards since every rebuilt element starts not-visible.
    ///
    /// Mesh bounds come from `registry`: a mesh with no positions yields a
    /// degenerate point volume at the object's world position rather than
    /// being skipped, so an empty placeholder mesh still occupies a slot.
    ///
    /// Each rebuilt element's `prev_world_transform` is the `world_transform`
    /// the same `object_id` had in `elements` *before* this rebuild (looked up
    /// by stable id, since storage order can change), so the rasterizer's
    /// motion-vector output reflects this call's actual transform delta
    /// rather than collapsing to "no motion" every frame.
    pub fn sync_to_scene(&self, elements: &mut SceneElementSet, registry: &ResourceRegistry) {
        let prev_transforms: rustc_hash::FxHashMap<u64, Affine3A> =
            elements.elements.iter().map(|e| (e.stable_id, e.world_transform)).collect();
        elements.clear();
        for (index, obj) in self.objects.iter().enumerate() {
            let world_transform = obj.local_transform();
            let local_aabb = registry
                .get_mesh(obj.mesh)
                .map_or(Aabb::new(Vec3::ZERO, Vec3::ZERO), mesh_local_aabb);
            let bounds = ShapeVolume::from_aabb(local_aabb.transformed(&world_transform));

            let mut element = SceneElement::new(
                obj.object_id,
                u32::try_from(index).unwrap_or(u32::MAX),
                world_transform,
                bounds,
                obj.mesh,
                obj.material,
            );
            element.prev_world_transform = prev_transforms.get(&obj.object_id).copied().unwrap_or(world_transform);
            element.casts_shadow = obj.casts_shadow;
            element.enabled = obj.visible;
            elements.push(element);
        }
    }
}

fn mesh_local_aabb(mesh: &crate::registry::Mesh) -> Aabb {
    let mut aabb = Aabb::empty();
    for p in &mesh.positions {
        aabb.grow(*p);
    }
    if mesh.positions.is_empty() {
        Aabb::new(Vec3::ZERO, Vec3::ZERO)
    } else {
        aabb
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stable_object_id_is_deterministic_and_nonzero() {
        assert_eq!(stable_object_id("crate"), stable_object_id("crate"));
        assert_ne!(stable_object_id("crate"), stable_object_id("box"));
        assert_ne!(stable_object_id(""), 0);
    }

    #[test]
    fn add_assigns_stable_id_from_name() {
        let mut set = SceneObjectSet::new();
        let idx = set.add(SceneObject::new("tree_01", MeshHandle::invalid(), MaterialHandle::invalid()));
        assert_eq!(set.objects()[idx].object_id, stable_object_id("tree_01"));
    }

    #[test]
    fn add_preserves_caller_assigned_id() {
        let mut set = SceneObjectSet::new();
        let mut obj = SceneObject::new("rock", MeshHandle::invalid(), MaterialHandle::invalid());
        obj.object_id = 42;
        set.add(obj);
        assert_eq!(set.find_by_name("rock").unwrap().object_id, 42);
    }

    #[test]
    fn find_by_name_and_id_agree() {
        let mut set = SceneObjectSet::new();
        set.add(SceneObject::new("a", MeshHandle::invalid(), MaterialHandle::invalid()));
        let id = set.find_by_name("a").unwrap().object_id;
        assert_eq!(set.find_by_id(id).unwrap().name, "a");
    }

    #[test]
    fn sync_to_scene_rebuilds_one_element_per_object() {
        let mut registry = ResourceRegistry::new();
        let mesh = registry.add_mesh(crate::registry::Mesh {
            positions: vec![Vec3::new(-1.0, -1.0, -1.0), Vec3::new(1.0, 1.0, 1.0)],
            ..Default::default()
        });
        let material = registry.add_material(crate::registry::Material::default());

        let mut objects = SceneObjectSet::new();
        let mut cube = SceneObject::new("cube", mesh, material);
        cube.position = Vec3::new(5.0, 0.0, 0.0);
        cube.casts_shadow = false;
        objects.add(cube);

        let mut elements = SceneElementSet::new();
        objects.sync_to_scene(&mut elements, &registry);

        assert_eq!(elements.len(), 1);
        let e = &elements.elements[0];
        assert_eq!(e.stable_id, objects.find_by_name("cube").unwrap().object_id);
        assert!(!e.casts_shadow);
        assert!(e.enabled);
        assert!(!e.visible);
        let center = e.world_center();
        assert!((center.x - 5.0).abs() < 1e-5);
    }

    #[test]
    fn sync_to_scene_clears_stale_elements_first() {
        let registry = ResourceRegistry::new();
        let objects = SceneObjectSet::new();
        let mut elements = SceneElementSet::new();
        elements.push(SceneElement::new(
            99,
            0,
            Affine3A::IDENTITY,
            ShapeVolume::Sphere { center: Vec3::ZERO, radius: 1.0 },
            MeshHandle::invalid(),
            MaterialHandle::invalid(),
        ));
        objects.sync_to_scene(&mut elements, &registry);
        assert!(elements.is_empty());
    }
}
