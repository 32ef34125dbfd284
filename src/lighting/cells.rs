//! Per-tile/per-cluster [`ConvexCell`] construction (C4, spec §4.4).
//!
//! A screen tile's side planes all pass through the camera's eye point (the
//! tile is a sub-pyramid of the full view frustum), so they are built by
//! unprojecting the tile's four NDC-rect corners and taking the camera
//! position as the shared apex — the same construction a tiled-forward
//! renderer uses to build per-tile frustums, generalized here to feed the
//! same [`ConvexCell`] classifier C2/C3 already use.

use glam::{Mat4, Vec3, Vec4};

use crate::geometry::{ConvexCell, ConvexCellKind, Plane};

/// Unprojects an NDC coordinate (with an arbitrary finite `ndc_z`) to a world
/// point via the "set w=1, multiply by the inverse view-projection, divide
/// by the resulting w" trick — valid for any `ndc_z` since it only needs to
/// recover *a* point along the corresponding view ray, not a specific depth.
fn unproject(inv_view_proj: Mat4, ndc_x: f32, ndc_y: f32, ndc_z: f32) -> Vec3 {
    let clip = Vec4::new(ndc_x, ndc_y, ndc_z, 1.0);
    let world_h = inv_view_proj * clip;
    if world_h.w.abs() < 1e-8 {
        return Vec3::ZERO;
    }
    world_h.truncate() / world_h.w
}

/// NDC bounds `(x0, x1, y_top, y_bottom)` of tile `(tx, ty)` given `tile_size`
/// pixels and the viewport's extents; `y_top > y_bottom` since NDC y grows
/// upward while pixel rows grow downward.
#[must_use]
pub fn tile_ndc_rect(tx: u32, ty: u32, tile_size: u32, viewport_w: u32, viewport_h: u32) -> (f32, f32, f32, f32) {
    let px0 = (tx * tile_size) as f32;
    let px1 = ((tx + 1) * tile_size).min(viewport_w) as f32;
    let py0 = (ty * tile_size) as f32;
    let py1 = ((ty + 1) * tile_size).min(viewport_h) as f32;

    let ndc_x0 = 2.0 * px0 / viewport_w as f32 - 1.0;
    let ndc_x1 = 2.0 * px1 / viewport_w as f32 - 1.0;
    let ndc_y_top = 1.0 - 2.0 * py0 / viewport_h as f32;
    let ndc_y_bottom = 1.0 - 2.0 * py1 / viewport_h as f32;
    (ndc_x0, ndc_x1, ndc_y_top, ndc_y_bottom)
}

/// Builds the four side planes of a screen-space tile/sub-rectangle,
/// orienting each plane's normal by testing against the tile's own center
/// ray rather than assuming a fixed corner winding order.
#[must_use]
pub fn tile_side_planes(eye: Vec3, inv_view_proj: Mat4, ndc_rect: (f32, f32, f32, f32)) -> [Plane; 4] {
    let (x0, x1, y_top, y_bottom) = ndc_rect;
    let corners = [
        unproject(inv_view_proj, x0, y_top, 1.0),
        unproject(inv_view_proj, x1, y_top, 1.0),
        unproject(inv_view_proj, x1, y_bottom, 1.0),
        unproject(inv_view_proj, x0, y_bottom, 1.0),
    ];
    let center = unproject(inv_view_proj, (x0 + x1) * 0.5, (y_top + y_bottom) * 0.5, 1.0);

    let mut planes = [Plane::new(Vec3::ZERO, 0.0); 4];
    for i in 0..4 {
        let a = corners[i];
        let b = corners[(i + 1) % 4];
        let normal = (a - eye).cross(b - eye);
        let mut plane = Plane::from_point_normal(eye, normal);
        if plane.signed_distance(center) < 0.0 {
            plane = Plane::from_point_normal(eye, -normal);
        }
        planes[i] = plane;
    }
    planes
}

/// A depth-bounding plane pair from a view-space `[view_z_min, view_z_max]`
/// range, built from the view matrix's third row (the linear functional that
/// maps a world point to its view-space Z — the same row-extraction idiom
/// [`crate::geometry::Frustum::from_matrix`] uses for the camera's own near
/// plane), oriented so the interior of the pair is exactly that range.
#[must_use]
pub fn depth_range_planes(view: Mat4, view_z_min: f32, view_z_max: f32) -> [Plane; 2] {
    let row2 = view.row(2);
    let axis = Vec3::new(row2.x, row2.y, row2.z);
    let min_plane = Plane::new(axis, row2.w - view_z_min);
    let max_plane = Plane::new(-axis, view_z_max - row2.w);
    [min_plane, max_plane]
}

/// Builds a tile or cluster-cell's [`ConvexCell`] from its side planes plus
/// an optional depth-bounding plane pair (omitted for plain `Tiled` mode,
/// where depth is unbounded like the full camera frustum).
#[must_use]
pub fn build_cell(kind: ConvexCellKind, side_planes: [Plane; 4], depth_planes: Option<[Plane; 2]>) -> ConvexCell {
    let mut cell = ConvexCell::new(kind);
    for p in side_planes {
        cell.push_plane(p);
    }
    if let Some([near, far]) = depth_planes {
        cell.push_plane(near);
        cell.push_plane(far);
    }
    cell
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn tile_ndc_rect_of_whole_viewport_is_full_ndc_square() {
        let (x0, x1, y_top, y_bottom) = tile_ndc_rect(0, 0, 256, 256, 256);
        assert!((x0 + 1.0).abs() < 1e-5);
        assert!((x1 - 1.0).abs() < 1e-5);
        assert!((y_top - 1.0).abs() < 1e-5);
        assert!((y_bottom + 1.0).abs() < 1e-5);
    }

    #[test]
    fn tile_side_planes_contain_own_center_point() {
        let proj = Mat4::perspective_infinite_reverse_rh(60f32.to_radians(), 1.0, 0.1);
        let view = Mat4::look_at_rh(Vec3::new(0.0, 0.0, -3.0), Vec3::ZERO, Vec3::Y);
        let view_proj = proj * view;
        let inv_view_proj = view_proj.inverse();
        let rect = tile_ndc_rect(0, 0, 16, 32, 32);
        let planes = tile_side_planes(Vec3::new(0.0, 0.0, -3.0), inv_view_proj, rect);
        let center = unproject(inv_view_proj, (rect.0 + rect.1) * 0.5, (rect.2 + rect.3) * 0.5, 1.0);
        for p in planes {
            assert!(p.signed_distance(center) >= -1e-4);
        }
    }
}
