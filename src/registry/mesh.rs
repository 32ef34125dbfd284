use glam::{Vec2, Vec3, Vec4};

use super::handles::TextureHandle;

/// Ordered vertex array plus an optional index array. Empty meshes are legal
/// (e.g. a placeholder mesh handle with no geometry yet uploaded) and are
/// culled upstream rather than rejected here.
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub uvs: Vec<Vec2>,
    pub colors: Vec<Vec4>,
    pub tangents: Vec<Vec4>,
    pub indices: Option<Vec<u32>>,
}

impl Mesh {
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Number of indices, or the vertex count when unindexed (one index per
    /// vertex, implied).
    #[must_use]
    pub fn index_count(&self) -> usize {
        self.indices.as_ref().map_or(self.vertex_count(), Vec::len)
    }
}

/// Base color RGB, metallic/roughness/AO scalars in `[0,1]`, emissive RGB plus
/// an intensity multiplier, and an optional base-color texture. Immutable
/// after construction — a material change means creating a new one and
/// re-pointing the handle, never mutating in place.
#[derive(Debug, Clone, Copy)]
pub struct Material {
    pub base_color: Vec3,
    pub metallic: f32,
    pub roughness: f32,
    pub ao: f32,
    pub emissive: Vec3,
    pub emissive_intensity: f32,
    pub base_color_texture: Option<TextureHandle>,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            base_color: Vec3::ONE,
            metallic: 0.0,
            roughness: 1.0,
            ao: 1.0,
            emissive: Vec3::ZERO,
            emissive_intensity: 1.0,
            base_color_texture: None,
        }
    }
}

impl Material {
    #[must_use]
    pub fn new(base_color: Vec3, metallic: f32, roughness: f32) -> Self {
        Self { base_color, metallic: metallic.clamp(0.0, 1.0), roughness: roughness.clamp(0.0, 1.0), ..Default::default() }
    }
}

/// CPU-side texture: raw RGBA8 pixels, row-major, top-left origin.
#[derive(Debug, Clone)]
pub struct Texture {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<[u8; 4]>,
}

impl Texture {
    #[must_use]
    pub fn solid(width: u32, height: u32, color: [u8; 4]) -> Self {
        Self { width, height, pixels: vec![color; (width * height) as usize] }
    }

    #[must_use]
    pub fn sample_nearest(&self, u: f32, v: f32) -> [u8; 4] {
        if self.width == 0 || self.height == 0 {
            return [255, 255, 255, 255];
        }
        let x = ((u.rem_euclid(1.0)) * self.width as f32) as u32;
        let y = ((v.rem_euclid(1.0)) * self.height as f32) as u32;
        let x = x.min(self.width - 1);
        let y = y.min(self.height - 1);
        self.pixels[(y * self.width + x) as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_mesh_reports_zero_vertices() {
        let m = Mesh::default();
        assert!(m.is_empty());
        assert_eq!(m.vertex_count(), 0);
    }

    #[test]
    fn material_clamps_scalars() {
        let mat = Material::new(Vec3::ONE, 2.0, -1.0);
        assert_eq!(mat.metallic, 1.0);
        assert_eq!(mat.roughness, 0.0);
    }
}
