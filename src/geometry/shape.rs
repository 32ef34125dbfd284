use glam::Vec3;

use super::aabb::Aabb;
use super::plane::Plane;

/// Result of testing a shape volume against a convex cell or single plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Inside,
    Outside,
    Intersecting,
}

/// A tagged union of the shape volumes the culling and light-binning stages
/// classify against convex cells. Every operation on this type exhaustively
/// matches all five arms.
#[derive(Debug, Clone, Copy)]
pub enum ShapeVolume {
    Sphere { center: Vec3, radius: f32 },
    Aabb { min: Vec3, max: Vec3 },
    Obb { center: Vec3, axes: [Vec3; 3], half_extents: Vec3 },
    Capsule { p0: Vec3, p1: Vec3, radius: f32 },
    ConeFrustum { apex: Vec3, axis: Vec3, near_dist: f32, far_dist: f32, near_radius: f32, far_radius: f32 },
}

impl ShapeVolume {
    #[must_use]
    pub fn from_aabb(b: Aabb) -> Self {
        ShapeVolume::Aabb { min: b.min, max: b.max }
    }

    #[must_use]
    pub fn bounding_aabb(&self) -> Aabb {
        match *self {
            ShapeVolume::Sphere { center, radius } => {
                Aabb::new(center - Vec3::splat(radius), center + Vec3::splat(radius))
            }
            ShapeVolume::Aabb { min, max } => Aabb::new(min, max),
            ShapeVolume::Obb { center, axes, half_extents } => {
                let extent = axes[0].abs() * half_extents.x
                    + axes[1].abs() * half_extents.y
                    + axes[2].abs() * half_extents.z;
                Aabb::new(center - extent, center + extent)
            }
            ShapeVolume::Capsule { p0, p1, radius } => {
                let seg_min = p0.min(p1) - Vec3::splat(radius);
                let seg_max = p0.max(p1) + Vec3::splat(radius);
                Aabb::new(seg_min, seg_max)
            }
            ShapeVolume::ConeFrustum { apex, axis, near_dist, far_dist, near_radius, far_radius } => {
                let near_c = apex + axis * near_dist;
                let far_c = apex + axis * far_dist;
                let a = Aabb::new(near_c - Vec3::splat(near_radius), near_c + Vec3::splat(near_radius));
                let b = Aabb::new(far_c - Vec3::splat(far_radius), far_c + Vec3::splat(far_radius));
                a.union(&b)
            }
        }
    }

    /// Conservative plane-test: returns `(pos, neg)`, the signed distances to
    /// `plane` of the shape's extreme points along `+plane.normal` and
    /// `-plane.normal` respectively. `pos < 0` means the whole shape is on the
    /// outside of the plane; `neg >= 0` means the whole shape is on the inside.
    #[must_use]
    pub fn plane_extent(&self, plane: &Plane) -> (f32, f32) {
        match *self {
            ShapeVolume::Sphere { center, radius } => {
                let d = plane.signed_distance(center);
                (d + radius, d - radius)
            }
            ShapeVolume::Aabb { min, max } => {
                let center = (min + max) * 0.5;
                let half = (max - min) * 0.5;
                let r = plane.normal.x.abs() * half.x
                    + plane.normal.y.abs() * half.y
                    + plane.normal.z.abs() * half.z;
                let d = plane.signed_distance(center);
                (d + r, d - r)
            }
            ShapeVolume::Obb { center, axes, half_extents } => {
                let r = (plane.normal.dot(axes[0])).abs() * half_extents.x
                    + (plane.normal.dot(axes[1])).abs() * half_extents.y
                    + (plane.normal.dot(axes[2])).abs() * half_extents.z;
                let d = plane.signed_distance(center);
                (d + r, d - r)
            }
            ShapeVolume::Capsule { p0, p1, radius } => {
                let d0 = plane.signed_distance(p0);
                let d1 = plane.signed_distance(p1);
                (d0.max(d1) + radius, d0.min(d1) - radius)
            }
            ShapeVolume::ConeFrustum { apex, axis, near_dist, far_dist, near_radius, far_radius } => {
                let near_c = apex + axis * near_dist;
                let far_c = apex + axis * far_dist;
                let d_near = plane.signed_distance(near_c);
                let d_far = plane.signed_distance(far_c);
                ((d_near + near_radius).max(d_far + far_radius), (d_near - near_radius).min(d_far - far_radius))
            }
        }
    }

    /// Classification of this shape against a single plane.
    #[must_use]
    pub fn classify_plane(&self, plane: &Plane) -> Classification {
        let (pos, neg) = self.plane_extent(plane);
        classify_from_extent(pos, neg)
    }
}

#[must_use]
pub(super) fn classify_from_extent(pos: f32, neg: f32) -> Classification {
    if pos < 0.0 {
        Classification::Outside
    } else if neg < 0.0 || pos == 0.0 || neg == 0.0 {
        Classification::Intersecting
    } else {
        Classification::Inside
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_on_plane_is_intersecting() {
        let plane = Plane::from_point_normal(Vec3::ZERO, Vec3::X);
        let point = ShapeVolume::Sphere { center: Vec3::ZERO, radius: 0.0 };
        assert_eq!(point.classify_plane(&plane), Classification::Intersecting);
    }

    #[test]
    fn point_strictly_inside() {
        let plane = Plane::from_point_normal(Vec3::ZERO, Vec3::X);
        let point = ShapeVolume::Sphere { center: Vec3::new(1.0, 0.0, 0.0), radius: 0.0 };
        assert_eq!(point.classify_plane(&plane), Classification::Inside);
    }

    #[test]
    fn reflecting_normal_inverts_classification() {
        let plane = Plane::from_point_normal(Vec3::ZERO, Vec3::X);
        let reflected = Plane::from_point_normal(Vec3::ZERO, -Vec3::X);
        let point = ShapeVolume::Sphere { center: Vec3::new(1.0, 0.0, 0.0), radius: 0.0 };
        assert_eq!(point.classify_plane(&plane), Classification::Inside);
        assert_eq!(point.classify_plane(&reflected), Classification::Outside);
    }
}
