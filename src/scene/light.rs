//! Light data model (spec §3 supplement).
//!
//! Four local-light kinds bin against a [`ShapeVolume`] culling proxy in C4;
//! the scene's single directional "sun" light is kept separate since it is
//! never binned.

use glam::{Vec2, Vec3, Vec4};

use crate::geometry::ShapeVolume;

/// How intensity falls off with distance from a point-like light.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttenuationModel {
    /// Physically-based inverse-square falloff.
    InverseSquare,
    /// A smoothed falloff that reaches exactly zero at `range`, avoiding both
    /// the inverse-square singularity and a hard cutoff pop.
    Smooth,
}

/// Fields shared by every local light kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightCommon {
    pub position: Vec3,
    pub range: f32,
    pub color: Vec3,
    pub intensity: f32,
    pub attenuation: AttenuationModel,
    pub bias: f32,
    pub power: f32,
}

impl Default for LightCommon {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            range: 10.0,
            color: Vec3::ONE,
            intensity: 5.0,
            attenuation: AttenuationModel::InverseSquare,
            bias: 0.0,
            power: 1.0,
        }
    }
}

/// The four local-light kinds. Every consumer matches all arms exhaustively —
/// there is no catch-all, by design.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Light {
    Point { common: LightCommon },
    Spot { common: LightCommon, direction: Vec3, inner_cone: f32, outer_cone: f32 },
    RectArea { common: LightCommon, axis: Vec3, up: Vec3, half_extents: Vec2 },
    TubeArea { common: LightCommon, axis: Vec3, half_length: f32, radius: f32 },
}

/// Discriminant carried in the packed GPU representation's type-shape-flags
/// quartet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum LightKind {
    Point = 0,
    Spot = 1,
    RectArea = 2,
    TubeArea = 3,
}

/// Seven 16-byte-aligned float4s plus a type/shape/flags u32 quartet — the
/// fixed-size GPU-uploadable form of a [`Light`].
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct PackedLight {
    pub vecs: [Vec4; 7],
    /// `[kind as u32, attenuation flag, reserved, reserved]`.
    pub type_shape_flags: [u32; 4],
}

impl Light {
    #[must_use]
    pub fn common(&self) -> &LightCommon {
        match self {
            Self::Point { common }
            | Self::Spot { common, .. }
            | Self::RectArea { common, .. }
            | Self::TubeArea { common, .. } => common,
        }
    }

    #[must_use]
    pub fn kind(&self) -> LightKind {
        match self {
            Self::Point { .. } => LightKind::Point,
            Self::Spot { .. } => LightKind::Spot,
            Self::RectArea { .. } => LightKind::RectArea,
            Self::TubeArea { .. } => LightKind::TubeArea,
        }
    }

    /// The implicit bounding shape used for binning: a sphere for point
    /// lights, a cone frustum for spot lights, an OBB for rect-area lights,
    /// a capsule for tube-area lights.
    #[must_use]
    pub fn culling_volume(&self) -> ShapeVolume {
        match *self {
            Self::Point { common } => ShapeVolume::Sphere { center: common.position, radius: common.range },
            Self::Spot { common, direction, outer_cone, .. } => {
                let axis = non_zero_or(direction, Vec3::NEG_Y);
                let outer = outer_cone.clamp(0.0, 89f32.to_radians());
                ShapeVolume::ConeFrustum {
                    apex: common.position,
                    axis,
                    near_dist: 0.0,
                    far_dist: common.range,
                    near_radius: 0.0,
                    far_radius: outer.tan() * common.range,
                }
            }
            Self::RectArea { common, axis, up, half_extents } => {
                let n = non_zero_or(axis, Vec3::Z);
                let u = non_zero_or(up, Vec3::Y);
                let right = non_zero_or(n.cross(u), Vec3::X);
                let true_up = right.cross(n).normalize();
                ShapeVolume::Obb {
                    center: common.position,
                    axes: [right, true_up, n],
                    half_extents: Vec3::new(half_extents.x, half_extents.y, common.range * 0.5),
                }
            }
            Self::TubeArea { common, axis, half_length, radius } => {
                let dir = non_zero_or(axis, Vec3::X);
                ShapeVolume::Capsule {
                    p0: common.position - dir * half_length,
                    p1: common.position + dir * half_length,
                    radius: radius.max(common.range),
                }
            }
        }
    }

    /// Packs this light into its fixed-size GPU representation.
    #[must_use]
    pub fn pack(&self) -> PackedLight {
        let c = *self.common();
        let mut vecs = [Vec4::ZERO; 7];
        vecs[0] = c.position.extend(c.range);
        vecs[1] = (c.color * c.intensity).extend(c.bias);
        vecs[2] = Vec4::new(c.power, 0.0, 0.0, 0.0);

        match *self {
            Self::Point { .. } => {}
            Self::Spot { direction, inner_cone, outer_cone, .. } => {
                vecs[3] = direction.normalize_or_zero().extend(inner_cone);
                vecs[4] = Vec4::new(outer_cone, 0.0, 0.0, 0.0);
            }
            Self::RectArea { axis, up, half_extents, .. } => {
                vecs[3] = axis.normalize_or_zero().extend(half_extents.x);
                vecs[4] = up.normalize_or_zero().extend(half_extents.y);
            }
            Self::TubeArea { axis, half_length, radius, .. } => {
                vecs[3] = axis.normalize_or_zero().extend(half_length);
                vecs[4] = Vec4::new(radius, 0.0, 0.0, 0.0);
            }
        }

        let attenuation_flag = match c.attenuation {
            AttenuationModel::InverseSquare => 0u32,
            AttenuationModel::Smooth => 1u32,
        };

        PackedLight { vecs, type_shape_flags: [self.kind() as u32, attenuation_flag, 0, 0] }
    }

    #[must_use]
    pub fn new_point(position: Vec3, range: f32, color: Vec3, intensity: f32) -> Self {
        Self::Point { common: LightCommon { position, range, color, intensity, ..Default::default() } }
    }

    #[must_use]
    pub fn new_spot(
        position: Vec3,
        range: f32,
        color: Vec3,
        intensity: f32,
        direction: Vec3,
        inner_cone: f32,
        outer_cone: f32,
    ) -> Self {
        Self::Spot {
            common: LightCommon { position, range, color, intensity, ..Default::default() },
            direction,
            inner_cone,
            outer_cone,
        }
    }
}

fn non_zero_or(v: Vec3, fallback: Vec3) -> Vec3 {
    let n = v.normalize_or_zero();
    if n == Vec3::ZERO {
        fallback
    } else {
        n
    }
}

/// The scene's single directional light: illuminates the whole frame
/// uniformly and is never binned per tile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionalLight {
    pub direction: Vec3,
    pub color: Vec3,
    pub intensity: f32,
    pub cast_shadows: bool,
    pub light_view_proj: glam::Mat4,
}

impl Default for DirectionalLight {
    fn default() -> Self {
        Self {
            direction: Vec3::new(-0.4, -1.0, -0.2).normalize(),
            color: Vec3::ONE,
            intensity: 5.0,
            cast_shadows: true,
            light_view_proj: glam::Mat4::IDENTITY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_light_culling_volume_is_a_sphere_at_its_position() {
        let light = Light::new_point(Vec3::new(1.0, 2.0, 3.0), 5.0, Vec3::ONE, 10.0);
        match light.culling_volume() {
            ShapeVolume::Sphere { center, radius } => {
                assert_eq!(center, Vec3::new(1.0, 2.0, 3.0));
                assert_eq!(radius, 5.0);
            }
            other => panic!("expected sphere, got {other:?}"),
        }
    }

    #[test]
    fn pack_roundtrips_position_and_range() {
        let light = Light::new_point(Vec3::new(1.0, 2.0, 3.0), 5.0, Vec3::ONE, 10.0);
        let packed = light.pack();
        assert_eq!(packed.vecs[0], Vec4::new(1.0, 2.0, 3.0, 5.0));
        assert_eq!(packed.type_shape_flags[0], LightKind::Point as u32);
    }

    #[test]
    fn spot_light_culling_volume_is_a_cone_frustum() {
        let light = Light::new_spot(Vec3::ZERO, 8.0, Vec3::ONE, 3.0, Vec3::NEG_Y, 0.2, 0.5);
        match light.culling_volume() {
            ShapeVolume::ConeFrustum { far_dist, .. } => assert_eq!(far_dist, 8.0),
            other => panic!("expected cone frustum, got {other:?}"),
        }
    }

    #[test]
    fn rect_area_light_culling_volume_is_an_obb() {
        let light = Light::RectArea {
            common: LightCommon { position: Vec3::Y, ..Default::default() },
            axis: Vec3::Z,
            up: Vec3::Y,
            half_extents: Vec2::new(2.0, 1.0),
        };
        match light.culling_volume() {
            ShapeVolume::Obb { center, .. } => assert_eq!(center, Vec3::Y),
            other => panic!("expected obb, got {other:?}"),
        }
    }
}
