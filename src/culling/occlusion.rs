//! Software occlusion culling (spec §4.3 points 3-5).
//!
//! A reduced-resolution depth buffer is rasterized from a small set of
//! designated occluder meshes before per-element visibility is resolved.
//! Depth convention: `0.0` is the near plane, `1.0` is infinitely far
//! (matching `RenderTarget::ColorDepthMotion`'s cleared-to-far value),
//! smaller wins a depth test.

use glam::{Affine3A, Mat4, Vec3};

use crate::geometry::Aabb;

/// Low-resolution depth buffer an occlusion pass rasterizes into, and against
/// which element AABB footprints are later tested.
#[derive(Debug, Clone)]
pub struct OcclusionBuffer {
    width: u32,
    height: u32,
    depth: Vec<f32>,
}

impl OcclusionBuffer {
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        Self { width, height, depth: vec![1.0; (width * height) as usize] }
    }

    pub fn clear(&mut self) {
        self.depth.fill(1.0);
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Rasterizes one occluder's triangles into the buffer. `positions` are
    /// object-local; `world` places them, `view_proj` carries them to clip
    /// space. Triangles with any vertex behind the camera (`w <= 0`) are
    /// dropped rather than clipped — occluders are coarse proxies and a
    /// dropped triangle only costs a slightly less aggressive cull, never a
    /// wrong one.
    pub fn rasterize_occluder(&mut self, positions: &[Vec3], indices: Option<&[u32]>, world: Affine3A, view_proj: Mat4) {
        if positions.is_empty() {
            return;
        }
        let mvp = view_proj * Mat4::from(world);
        let owned_range: Vec<u32>;
        let idx: &[u32] = match indices {
            Some(i) => i,
            None => {
                owned_range = (0..positions.len() as u32).collect();
                &owned_range
            }
        };

        for tri in idx.chunks_exact(3) {
            let clip = [mvp * positions[tri[0] as usize].extend(1.0), mvp * positions[tri[1] as usize].extend(1.0), mvp * positions[tri[2] as usize].extend(1.0)];
            if clip.iter().any(|c| c.w <= 1e-5) {
                continue;
            }
            self.rasterize_clip_triangle(clip);
        }
    }

    fn rasterize_clip_triangle(&mut self, clip: [glam::Vec4; 3]) {
        let to_screen = |c: glam::Vec4| {
            let inv_w = 1.0 / c.w;
            let ndc_x = c.x * inv_w;
            let ndc_y = c.y * inv_w;
            let depth01 = 1.0 - (c.z * inv_w).clamp(0.0, 1.0);
            let sx = (ndc_x * 0.5 + 0.5) * self.width as f32;
            let sy = (1.0 - (ndc_y * 0.5 + 0.5)) * self.height as f32;
            (sx, sy, depth01)
        };
        let p = [to_screen(clip[0]), to_screen(clip[1]), to_screen(clip[2])];

        let min_x = p[0].0.min(p[1].0).min(p[2].0).floor().max(0.0) as i32;
        let max_x = p[0].0.max(p[1].0).max(p[2].0).ceil().min(self.width as f32) as i32;
        let min_y = p[0].1.min(p[1].1).min(p[2].1).floor().max(0.0) as i32;
        let max_y = p[0].1.max(p[1].1).max(p[2].1).ceil().min(self.height as f32) as i32;
        if min_x >= max_x || min_y >= max_y {
            return;
        }

        let area = edge(p[0], p[1], p[2]);
        if area.abs() < 1e-8 {
            return;
        }

        for y in min_y..max_y {
            for x in min_x..max_x {
                let sample = (x as f32 + 0.5, y as f32 + 0.5);
                let w0 = edge(p[1], p[2], sample);
                let w1 = edge(p[2], p[0], sample);
                let w2 = edge(p[0], p[1], sample);
                let inside = (w0 >= 0.0 && w1 >= 0.0 && w2 >= 0.0) || (w0 <= 0.0 && w1 <= 0.0 && w2 <= 0.0);
                if !inside {
                    continue;
                }
                let b0 = w0 / area;
                let b1 = w1 / area;
                let b2 = w2 / area;
                let depth = b0 * p[0].2 + b1 * p[1].2 + b2 * p[2].2;
                let offset = (y as u32 * self.width + x as u32) as usize;
                if depth < self.depth[offset] {
                    self.depth[offset] = depth;
                }
            }
        }
    }

    /// Conservatively tests whether `aabb` is fully occluded: true only when
    /// every corner projects in front of the camera and the object's nearest
    /// corner is farther than the farthest occluder depth recorded anywhere
    /// in its screen footprint. A footprint with no occluder coverage (every
    /// sampled pixel still at the cleared far value) is never reported
    /// occluded.
    #[must_use]
    pub fn test_aabb(&self, aabb: &Aabb, view_proj: Mat4) -> bool {
        let corners = aabb.corners();
        let mut min_x = f32::INFINITY;
        let mut max_x = f32::NEG_INFINITY;
        let mut min_y = f32::INFINITY;
        let mut max_y = f32::NEG_INFINITY;
        let mut min_depth = f32::INFINITY;

        for c in corners {
            let clip = view_proj * c.extend(1.0);
            if clip.w <= 1e-5 {
                return false;
            }
            let inv_w = 1.0 / clip.w;
            let ndc_x = clip.x * inv_w;
            let ndc_y = clip.y * inv_w;
            let depth01 = 1.0 - (clip.z * inv_w).clamp(0.0, 1.0);
            let sx = (ndc_x * 0.5 + 0.5) * self.width as f32;
            let sy = (1.0 - (ndc_y * 0.5 + 0.5)) * self.height as f32;
            min_x = min_x.min(sx);
            max_x = max_x.max(sx);
            min_y = min_y.min(sy);
            max_y = max_y.max(sy);
            min_depth = min_depth.min(depth01);
        }

        let x0 = min_x.floor().max(0.0) as i32;
        let x1 = max_x.ceil().min(self.width as f32) as i32;
        let y0 = min_y.floor().max(0.0) as i32;
        let y1 = max_y.ceil().min(self.height as f32) as i32;
        if x0 >= x1 || y0 >= y1 {
            return false;
        }

        let mut max_occluder_depth = f32::NEG_INFINITY;
        for y in y0..y1 {
            for x in x0..x1 {
                let d = self.depth[(y as u32 * self.width + x as u32) as usize];
                if d > max_occluder_depth {
                    max_occluder_depth = d;
                }
            }
        }

        max_occluder_depth < 1.0 && min_depth > max_occluder_depth
    }
}

fn edge(a: (f32, f32, f32), b: (f32, f32, f32), c: (f32, f32)) -> f32 {
    (c.0 - a.0) * (b.1 - a.1) - (c.1 - a.1) * (b.0 - a.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn view_proj() -> Mat4 {
        let proj = Mat4::perspective_infinite_reverse_rh(60f32.to_radians(), 1.0, 0.1);
        let view = Mat4::look_at_rh(Vec3::new(0.0, 0.0, -5.0), Vec3::ZERO, Vec3::Y);
        proj * view
    }

    #[test]
    fn empty_buffer_occludes_nothing() {
        let buf = OcclusionBuffer::new(64, 64);
        let aabb = Aabb::from_center_half_extents(Vec3::ZERO, Vec3::splat(0.5));
        assert!(!buf.test_aabb(&aabb, view_proj()));
    }

    #[test]
    fn wall_in_front_occludes_box_behind_it() {
        let mut buf = OcclusionBuffer::new(64, 64);
        let vp = view_proj();
        let wall = [Vec3::new(-5.0, -5.0, -1.0), Vec3::new(5.0, -5.0, -1.0), Vec3::new(5.0, 5.0, -1.0), Vec3::new(-5.0, 5.0, -1.0)];
        let indices = [0u32, 1, 2, 0, 2, 3];
        buf.rasterize_occluder(&wall, Some(&indices), Affine3A::IDENTITY, vp);

        let behind_wall = Aabb::from_center_half_extents(Vec3::new(0.0, 0.0, 2.0), Vec3::splat(0.3));
        assert!(buf.test_aabb(&behind_wall, vp));

        let in_front = Aabb::from_center_half_extents(Vec3::new(0.0, 0.0, -3.0), Vec3::splat(0.3));
        assert!(!buf.test_aabb(&in_front, vp));
    }

    #[test]
    fn behind_camera_corner_is_never_occluded() {
        let buf = OcclusionBuffer::new(64, 64);
        let straddling = Aabb::from_center_half_extents(Vec3::new(0.0, 0.0, -5.0), Vec3::splat(20.0));
        assert!(!buf.test_aabb(&straddling, view_proj()));
    }
}
