use glam::{Mat4, Vec3};

use super::convex_cell::{ConvexCell, ConvexCellKind};
use super::plane::Plane;
use super::shape::{Classification, ShapeVolume};

/// A camera view frustum: five inward-facing planes (left, right, bottom, top,
/// near) extracted from a view-projection matrix. The far plane is omitted —
/// the renderer uses an infinite reverse-Z projection (see
/// `scene::camera::Camera::update_projection_matrix`), so there is no finite
/// far plane to extract.
#[derive(Debug, Clone)]
pub struct Frustum {
    cell: ConvexCell,
}

impl Default for Frustum {
    fn default() -> Self {
        Self { cell: ConvexCell::new(ConvexCellKind::CameraFrustum) }
    }
}

impl Frustum {
    /// Extracts the frustum planes from a view-projection matrix by reading
    /// its rows (Gribb-Hartmann method), reverse-Z near plane convention:
    /// a point survives near-clipping when `z_clip <= w_clip`.
    #[must_use]
    pub fn from_matrix(m: Mat4) -> Self {
        let rows = [m.row(0), m.row(1), m.row(2), m.row(3)];
        let mut cell = ConvexCell::new(ConvexCellKind::CameraFrustum);

        let raw = [
            rows[3] + rows[0], // left
            rows[3] - rows[0], // right
            rows[3] + rows[1], // bottom
            rows[3] - rows[1], // top
            rows[3] - rows[2], // near (reverse-Z)
        ];
        for r in raw {
            cell.push_plane(Plane::new(Vec3::new(r.x, r.y, r.z), r.w));
        }

        Self { cell }
    }

    #[must_use]
    pub fn classify(&self, shape: &ShapeVolume) -> Classification {
        self.cell.classify(shape)
    }

    #[must_use]
    pub fn intersects_sphere(&self, center: Vec3, radius: f32) -> bool {
        self.classify(&ShapeVolume::Sphere { center, radius }) != Classification::Outside
    }

    #[must_use]
    pub fn intersects_aabb(&self, min: Vec3, max: Vec3) -> bool {
        self.classify(&ShapeVolume::Aabb { min, max }) != Classification::Outside
    }

    #[must_use]
    pub fn as_convex_cell(&self) -> &ConvexCell {
        &self.cell
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_cube_visible_from_default_perspective() {
        let proj = Mat4::perspective_infinite_reverse_rh(60f32.to_radians(), 16.0 / 9.0, 0.1);
        let view = Mat4::look_at_rh(Vec3::new(0.0, 0.0, -3.0), Vec3::ZERO, Vec3::Y);
        let frustum = Frustum::from_matrix(proj * view);
        assert!(frustum.intersects_aabb(Vec3::splat(-0.5), Vec3::splat(0.5)));
    }

    #[test]
    fn far_behind_camera_is_culled() {
        let proj = Mat4::perspective_infinite_reverse_rh(60f32.to_radians(), 16.0 / 9.0, 0.1);
        let view = Mat4::look_at_rh(Vec3::new(0.0, 0.0, -3.0), Vec3::ZERO, Vec3::Y);
        let frustum = Frustum::from_matrix(proj * view);
        assert!(!frustum.intersects_sphere(Vec3::new(0.0, 0.0, -10.0), 0.2));
    }
}
