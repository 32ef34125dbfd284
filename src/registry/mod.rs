//! Resource & RT Registry (C1).
//!
//! Handle-based lookup of meshes, materials, and textures, plus a separate
//! handle-to-pointer registry for render targets. Registries are the only
//! place in the crate that mint handles; every handle is a plain `u32` index
//! with zero reserved for "invalid".

pub mod handles;
pub mod mesh;
pub mod render_target;
pub mod rt_handle;
pub mod rt_registry;

pub use handles::{MaterialHandle, MeshHandle, RawHandle, TextureHandle};
pub use mesh::{Material, Mesh, Texture};
pub use render_target::RenderTarget;
pub use rt_handle::{ColorKind, DepthKind, MotionKind, RtColor, RtDepth, RtHandle, RtMotion, RtShadow, ShadowKind};
pub use rt_registry::RtRegistry;

use rustc_hash::FxHashMap;

use handles::HandleAllocator;

/// Owns mesh/material/texture storage, minting a fresh handle per `add_*`
/// call. A registry reset invalidates every handle it ever issued.
#[derive(Default)]
pub struct ResourceRegistry {
    allocator: HandleAllocator,
    meshes: FxHashMap<u32, Mesh>,
    materials: FxHashMap<u32, Material>,
    textures: FxHashMap<u32, Texture>,
}

impl ResourceRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_mesh(&mut self, data: Mesh) -> MeshHandle {
        let raw = self.allocator.alloc();
        self.meshes.insert(raw.index(), data);
        MeshHandle::from_raw(raw)
    }

    #[must_use]
    pub fn get_mesh(&self, handle: MeshHandle) -> Option<&Mesh> {
        self.meshes.get(&handle.raw().index())
    }

    pub fn add_material(&mut self, data: Material) -> MaterialHandle {
        let raw = self.allocator.alloc();
        self.materials.insert(raw.index(), data);
        MaterialHandle::from_raw(raw)
    }

    #[must_use]
    pub fn get_material(&self, handle: MaterialHandle) -> Option<&Material> {
        self.materials.get(&handle.raw().index())
    }

    pub fn add_texture(&mut self, data: Texture) -> TextureHandle {
        let raw = self.allocator.alloc();
        self.textures.insert(raw.index(), data);
        TextureHandle::from_raw(raw)
    }

    #[must_use]
    pub fn get_texture(&self, handle: TextureHandle) -> Option<&Texture> {
        self.textures.get(&handle.raw().index())
    }

    /// Invalidates every previously-issued handle and frees backing storage.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_are_nonzero_and_round_trip() {
        let mut reg = ResourceRegistry::new();
        let h = reg.add_mesh(Mesh::default());
        assert!(h.is_valid());
        assert!(reg.get_mesh(h).is_some());
    }

    #[test]
    fn unknown_handle_returns_none() {
        let reg = ResourceRegistry::new();
        assert!(reg.get_mesh(MeshHandle::invalid()).is_none());
        assert!(reg.get_material(MaterialHandle::invalid()).is_none());
    }

    #[test]
    fn reset_invalidates_prior_handles() {
        let mut reg = ResourceRegistry::new();
        let h = reg.add_material(Material::default());
        reg.reset();
        assert!(reg.get_material(h).is_none());
    }
}
