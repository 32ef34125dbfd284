use smallvec::SmallVec;

use super::plane::Plane;
use super::shape::{Classification, ShapeVolume};

/// What a [`ConvexCell`] represents, carried for debugging/labeling only —
/// classification logic is identical for every kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvexCellKind {
    CameraFrustum,
    ScreenTile,
    ClusterCell,
}

/// An ordered list of inward-facing planes whose intersection is a convex
/// region: a camera frustum, a screen tile's frustum, or a cluster cell.
#[derive(Debug, Clone)]
pub struct ConvexCell {
    pub planes: SmallVec<[Plane; 6]>,
    pub kind: ConvexCellKind,
}

impl ConvexCell {
    #[must_use]
    pub fn new(kind: ConvexCellKind) -> Self {
        Self { planes: SmallVec::new(), kind }
    }

    pub fn push_plane(&mut self, plane: Plane) {
        if !plane.is_degenerate() {
            self.planes.push(plane);
        }
    }

    /// Classifies `shape` against every plane, short-circuiting on the first
    /// plane that excludes it entirely.
    #[must_use]
    pub fn classify(&self, shape: &ShapeVolume) -> Classification {
        let mut result = Classification::Inside;
        for plane in &self.planes {
            match shape.classify_plane(plane) {
                Classification::Outside => return Classification::Outside,
                Classification::Intersecting => result = Classification::Intersecting,
                Classification::Inside => {}
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn unit_cube_cell() -> ConvexCell {
        let mut cell = ConvexCell::new(ConvexCellKind::ScreenTile);
        cell.push_plane(Plane::from_point_normal(Vec3::new(-1.0, 0.0, 0.0), Vec3::X));
        cell.push_plane(Plane::from_point_normal(Vec3::new(1.0, 0.0, 0.0), -Vec3::X));
        cell.push_plane(Plane::from_point_normal(Vec3::new(0.0, -1.0, 0.0), Vec3::Y));
        cell.push_plane(Plane::from_point_normal(Vec3::new(0.0, 1.0, 0.0), -Vec3::Y));
        cell.push_plane(Plane::from_point_normal(Vec3::new(0.0, 0.0, -1.0), Vec3::Z));
        cell.push_plane(Plane::from_point_normal(Vec3::new(0.0, 0.0, 1.0), -Vec3::Z));
        cell
    }

    #[test]
    fn classifies_inside_outside_intersecting() {
        let cell = unit_cube_cell();
        let inside = ShapeVolume::Sphere { center: Vec3::ZERO, radius: 0.1 };
        let outside = ShapeVolume::Sphere { center: Vec3::new(5.0, 0.0, 0.0), radius: 0.1 };
        let straddling = ShapeVolume::Sphere { center: Vec3::new(1.0, 0.0, 0.0), radius: 0.5 };
        assert_eq!(cell.classify(&inside), Classification::Inside);
        assert_eq!(cell.classify(&outside), Classification::Outside);
        assert_eq!(cell.classify(&straddling), Classification::Intersecting);
    }
}
