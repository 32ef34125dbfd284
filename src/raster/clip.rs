//! Clip-space triangle clipping (C5, spec §4.5).
//!
//! Sutherland-Hodgman against the six canonical clip-space half-spaces
//! (`-w <= x,y,z <= w`), operating on [`RasterVertex`]s so varyings stay
//! attached to clipped geometry instead of being recomputed after the fact.

use glam::Vec4;

use crate::raster::shader::{VertexOut, SHS_MAX_VARYINGS};

/// A clip-space vertex carrying every interpolant the rasterizer needs,
/// produced by lifting a [`VertexOut`] (this is the type clipping operates
/// on, since a clipped polygon introduces vertices the shader never emitted).
#[derive(Debug, Clone, Copy)]
pub struct RasterVertex {
    pub clip: Vec4,
    pub varyings: [Vec4; SHS_MAX_VARYINGS],
    pub varying_mask: u32,
    pub world_pos: glam::Vec3,
    pub normal_ws: glam::Vec3,
    pub uv: glam::Vec2,
}

impl From<&VertexOut> for RasterVertex {
    fn from(v: &VertexOut) -> Self {
        Self { clip: v.clip, varyings: v.varyings, varying_mask: v.varying_mask, world_pos: v.world_pos, normal_ws: v.normal_ws, uv: v.uv }
    }
}

/// Linearly interpolates every field of two [`RasterVertex`]s by `t`.
#[must_use]
pub fn lerp_rv(a: &RasterVertex, b: &RasterVertex, t: f32) -> RasterVertex {
    let mut varyings = [Vec4::ZERO; SHS_MAX_VARYINGS];
    for i in 0..SHS_MAX_VARYINGS {
        varyings[i] = a.varyings[i].lerp(b.varyings[i], t);
    }
    RasterVertex {
        clip: a.clip.lerp(b.clip, t),
        varyings,
        varying_mask: a.varying_mask | b.varying_mask,
        world_pos: a.world_pos.lerp(b.world_pos, t),
        normal_ws: a.normal_ws.lerp(b.normal_ws, t),
        uv: a.uv.lerp(b.uv, t),
    }
}

#[derive(Debug, Clone, Copy)]
enum ClipPlane {
    Left,
    Right,
    Bottom,
    Top,
    Near,
    Far,
}

const CLIP_PLANES: [ClipPlane; 6] = [ClipPlane::Left, ClipPlane::Right, ClipPlane::Bottom, ClipPlane::Top, ClipPlane::Near, ClipPlane::Far];

/// Signed distance of a clip-space point to `plane`'s half-space; `>= 0`
/// means inside.
fn distance(p: Vec4, plane: ClipPlane) -> f32 {
    match plane {
        ClipPlane::Left => p.w + p.x,
        ClipPlane::Right => p.w - p.x,
        ClipPlane::Bottom => p.w + p.y,
        ClipPlane::Top => p.w - p.y,
        ClipPlane::Near => p.w + p.z,
        ClipPlane::Far => p.w - p.z,
    }
}

/// Clips a single convex polygon (given as an ordered vertex list, already
/// fan-triangulated callers pass one triangle at a time) against all six
/// clip-space planes in turn, returning the surviving polygon. Empty input or
/// a fully-outside polygon yields an empty output.
#[must_use]
pub fn clip_polygon(input: &[RasterVertex]) -> Vec<RasterVertex> {
    let mut poly = input.to_vec();
    for plane in CLIP_PLANES {
        if poly.is_empty() {
            break;
        }
        let mut out = Vec::with_capacity(poly.len() + 1);
        for i in 0..poly.len() {
            let curr = &poly[i];
            let prev = &poly[(i + poly.len() - 1) % poly.len()];
            let curr_d = distance(curr.clip, plane);
            let prev_d = distance(prev.clip, plane);
            let curr_in = curr_d >= 0.0;
            let prev_in = prev_d >= 0.0;
            if curr_in != prev_in {
                let denom = prev_d - curr_d;
                let t = if denom.abs() > 1e-8 { prev_d / denom } else { 0.0 };
                out.push(lerp_rv(prev, curr, t));
            }
            if curr_in {
                out.push(*curr);
            }
        }
        poly = out;
    }
    poly
}

/// Fan-triangulates a clipped convex polygon (3+ vertices) into a flat list
/// of `RasterVertex` triples.
#[must_use]
pub fn fan_triangulate(poly: &[RasterVertex]) -> Vec<[RasterVertex; 3]> {
    if poly.len() < 3 {
        return Vec::new();
    }
    let mut tris = Vec::with_capacity(poly.len() - 2);
    for i in 1..poly.len() - 1 {
        tris.push([poly[0], poly[i], poly[i + 1]]);
    }
    tris
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rv(clip: Vec4) -> RasterVertex {
        RasterVertex { clip, varyings: [Vec4::ZERO; SHS_MAX_VARYINGS], varying_mask: 0, world_pos: glam::Vec3::ZERO, normal_ws: glam::Vec3::Y, uv: glam::Vec2::ZERO }
    }

    #[test]
    fn fully_inside_triangle_survives_unclipped() {
        let tri = [rv(Vec4::new(-0.5, -0.5, 0.0, 1.0)), rv(Vec4::new(0.5, -0.5, 0.0, 1.0)), rv(Vec4::new(0.0, 0.5, 0.0, 1.0))];
        let clipped = clip_polygon(&tri);
        assert_eq!(clipped.len(), 3);
    }

    #[test]
    fn fully_outside_triangle_is_dropped() {
        let tri = [rv(Vec4::new(-10.0, -10.0, 0.0, 1.0)), rv(Vec4::new(-9.0, -10.0, 0.0, 1.0)), rv(Vec4::new(-10.0, -9.0, 0.0, 1.0))];
        let clipped = clip_polygon(&tri);
        assert!(clipped.is_empty());
    }

    #[test]
    fn triangle_crossing_near_plane_clips_to_a_polygon() {
        let tri = [rv(Vec4::new(0.0, 0.0, -2.0, 1.0)), rv(Vec4::new(1.0, 0.0, 0.5, 1.0)), rv(Vec4::new(-1.0, 0.0, 0.5, 1.0))];
        let clipped = clip_polygon(&tri);
        assert!(clipped.len() >= 3);
        for v in &clipped {
            assert!(distance(v.clip, ClipPlane::Near) >= -1e-4);
        }
    }
}
