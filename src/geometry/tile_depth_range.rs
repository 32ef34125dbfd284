use glam::{Mat4, Vec3};

use super::aabb::Aabb;

/// Per-tile `(min_z, max_z)` in view space, built once per frame by projecting
/// every visible element's world AABB into view space and accumulating min/max
/// over every screen tile it touches. Used by `TiledDepthRange` light binning
/// (C4) to clip a tile's convex cell to the depth range actually occupied by
/// geometry, instead of the camera's full near/far range.
#[derive(Debug, Clone)]
pub struct TileViewDepthRange {
    pub tile_count_x: u32,
    pub tile_count_y: u32,
    pub tile_size: u32,
    min_z: Vec<f32>,
    max_z: Vec<f32>,
    pub valid: bool,
}

impl TileViewDepthRange {
    #[must_use]
    pub fn new(viewport_w: u32, viewport_h: u32, tile_size: u32) -> Self {
        let tile_count_x = viewport_w.div_ceil(tile_size).max(1);
        let tile_count_y = viewport_h.div_ceil(tile_size).max(1);
        let count = (tile_count_x * tile_count_y) as usize;
        Self {
            tile_count_x,
            tile_count_y,
            tile_size,
            min_z: vec![f32::INFINITY; count],
            max_z: vec![f32::NEG_INFINITY; count],
            valid: false,
        }
    }

    pub fn reset(&mut self) {
        self.min_z.fill(f32::INFINITY);
        self.max_z.fill(f32::NEG_INFINITY);
        self.valid = false;
    }

    #[must_use]
    pub fn tile_range(&self, tx: u32, ty: u32) -> (f32, f32) {
        let idx = (ty * self.tile_count_x + tx) as usize;
        (self.min_z[idx], self.max_z[idx])
    }

    /// Projects `world_aabb` into view space (for its view-depth extent) and
    /// into NDC/pixel space (for the tile footprint it touches), and widens
    /// every touched tile's range.
    pub fn accumulate_aabb(
        &mut self,
        world_aabb: &Aabb,
        view: Mat4,
        proj: Mat4,
        viewport_w: u32,
        viewport_h: u32,
    ) {
        let corners = world_aabb.corners();

        let mut view_min_z = f32::INFINITY;
        let mut view_max_z = f32::NEG_INFINITY;
        let mut px_min = Vec3::splat(f32::INFINITY);
        let mut px_max = Vec3::splat(f32::NEG_INFINITY);
        let view_proj = proj * view;

        for c in corners {
            let view_pos = view.transform_point3(c);
            view_min_z = view_min_z.min(view_pos.z);
            view_max_z = view_max_z.max(view_pos.z);

            let clip = view_proj * c.extend(1.0);
            if clip.w.abs() < 1e-6 {
                continue;
            }
            let ndc = clip.truncate() / clip.w;
            let px_x = (ndc.x * 0.5 + 0.5) * viewport_w as f32;
            let px_y = (1.0 - (ndc.y * 0.5 + 0.5)) * viewport_h as f32;
            px_min = px_min.min(Vec3::new(px_x, px_y, 0.0));
            px_max = px_max.max(Vec3::new(px_x, px_y, 0.0));
        }

        if !view_min_z.is_finite() || !px_min.x.is_finite() {
            return;
        }

        let tx0 = (px_min.x / self.tile_size as f32).floor().max(0.0) as u32;
        let ty0 = (px_min.y / self.tile_size as f32).floor().max(0.0) as u32;
        let tx1 = ((px_max.x / self.tile_size as f32).floor() as u32).min(self.tile_count_x - 1);
        let ty1 = ((px_max.y / self.tile_size as f32).floor() as u32).min(self.tile_count_y - 1);
        if tx0 >= self.tile_count_x || ty0 >= self.tile_count_y {
            return;
        }

        for ty in ty0..=ty1 {
            for tx in tx0..=tx1 {
                let idx = (ty * self.tile_count_x + tx) as usize;
                self.min_z[idx] = self.min_z[idx].min(view_min_z);
                self.max_z[idx] = self.max_z[idx].max(view_max_z);
            }
        }
        self.valid = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tile_touching_aabb_gets_a_finite_range() {
        let mut r = TileViewDepthRange::new(320, 240, 16);
        let view = Mat4::look_at_rh(Vec3::new(0.0, 0.0, -3.0), Vec3::ZERO, Vec3::Y);
        let proj = Mat4::perspective_infinite_reverse_rh(60f32.to_radians(), 320.0 / 240.0, 0.1);
        r.accumulate_aabb(&Aabb::new(Vec3::splat(-0.5), Vec3::splat(0.5)), view, proj, 320, 240);
        assert!(r.valid);
        let (min_z, max_z) = r.tile_range(10, 7);
        assert!(min_z <= max_z);
        assert!(min_z.is_finite());
    }
}
