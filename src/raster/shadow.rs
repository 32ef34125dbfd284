//! Shadow-map sampling (C5, spec §4.5 supplement).
//!
//! Projects a world-space position into a directional light's shadow map,
//! applies a grazing-angle-scaled bias, and resolves visibility with a PCF
//! box filter.

use glam::{Mat4, Vec2, Vec3};

use crate::raster::shader::ShadowMapView;

/// Parameters controlling a shadow lookup, mirrored 1:1 off
/// [`crate::raster::shader::ShaderUniforms`]'s `shadow_*` fields so a caller
/// can build one from the other.
#[derive(Debug, Clone, Copy)]
pub struct ShadowParams {
    pub bias_const: f32,
    pub bias_slope: f32,
    pub pcf_radius: i32,
    pub pcf_step: f32,
    pub strength: f32,
}

impl Default for ShadowParams {
    fn default() -> Self {
        Self { bias_const: 0.0008, bias_slope: 0.0015, pcf_radius: 2, pcf_step: 1.0, strength: 1.0 }
    }
}

/// Projects `world_pos` through `light_viewproj` into shadow-map UV space
/// plus a `[0,1]` depth, or `None` if the point falls outside the light's
/// frustum (`w <= 0` or UV/Z out of `[0,1]`).
#[must_use]
pub fn shadow_project_uvz(world_pos: Vec3, light_viewproj: Mat4) -> Option<(Vec2, f32)> {
    let clip = light_viewproj * world_pos.extend(1.0);
    if clip.w <= 1e-8 {
        return None;
    }
    let ndc = clip.truncate() / clip.w;
    let uv = Vec2::new(ndc.x * 0.5 + 0.5, 1.0 - (ndc.y * 0.5 + 0.5));
    let z01 = ndc.z * 0.5 + 0.5;
    if !(0.0..=1.0).contains(&uv.x) || !(0.0..=1.0).contains(&uv.y) || !(0.0..=1.0).contains(&z01) {
        return None;
    }
    Some((uv, z01))
}

/// Grazing-angle-scaled depth bias: steeper `NdotL` (more oblique) gets more
/// bias, since shadow acne grows with the angle between the surface and the
/// light.
#[must_use]
pub fn shadow_bias(params: &ShadowParams, n_dot_l: f32) -> f32 {
    let slope_scale = (1.0 - n_dot_l.clamp(0.0, 1.0)).max(0.0);
    params.bias_const + params.bias_slope * slope_scale
}

fn fetch_depth_clamped(map: &ShadowMapView, uv: Vec2, dx: i32, dy: i32) -> f32 {
    let x = (uv.x * map.width as f32) as i32 + dx;
    let y = (uv.y * map.height as f32) as i32 + dy;
    map.fetch_clamped(x, y)
}

/// Convenience wrapper over [`ShadowMapView::fetch_clamped`] in UV space.
#[must_use]
pub fn shadow_fetch_depth_clamped(map: &ShadowMapView, uv: Vec2) -> f32 {
    fetch_depth_clamped(map, uv, 0, 0)
}

/// Directional-light shadow visibility in `[0,1]`: `1.0` means fully lit.
/// With `pcf_radius == 0` this degenerates to a single hard depth compare;
/// otherwise it averages a `(2*radius+1)^2` box of taps spaced `pcf_step`
/// texels apart, each compared against the biased receiver depth.
#[must_use]
pub fn shadow_visibility_dir(map: &ShadowMapView, world_pos: Vec3, light_viewproj: Mat4, n_dot_l: f32, params: &ShadowParams) -> f32 {
    let Some((uv, receiver_z)) = shadow_project_uvz(world_pos, light_viewproj) else {
        return 1.0;
    };
    let bias = shadow_bias(params, n_dot_l);
    let biased_z = receiver_z - bias;

    let radius = params.pcf_radius.max(0);
    let mut lit = 0.0f32;
    let mut total = 0.0f32;
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            let offset_x = (dx as f32 * params.pcf_step) as i32;
            let offset_y = (dy as f32 * params.pcf_step) as i32;
            let occluder_z = fetch_depth_clamped(map, uv, offset_x, offset_y);
            if biased_z <= occluder_z {
                lit += 1.0;
            }
            total += 1.0;
        }
    }
    let visibility = if total > 0.0 { lit / total } else { 1.0 };
    1.0 - params.strength * (1.0 - visibility)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_outside_light_frustum_is_unshadowed() {
        let map = ShadowMapView { width: 4, height: 4, depth: &[1.0; 16] };
        let far_away = Vec3::new(1000.0, 1000.0, 1000.0);
        let v = shadow_visibility_dir(&map, far_away, Mat4::IDENTITY, 1.0, &ShadowParams::default());
        assert_eq!(v, 1.0);
    }

    #[test]
    fn bias_grows_at_grazing_angles() {
        let p = ShadowParams::default();
        assert!(shadow_bias(&p, 0.05) > shadow_bias(&p, 0.95));
    }
}
