//! Built-in shader programs (C5, spec §4.5 supplement), ported from the
//! fixed Blinn-Phong and PBR metallic-roughness materials every forward pass
//! can select between, plus a debug-view program used by the `Albedo`/
//! `Normal`/`Depth` visualization modes.

use glam::{Vec2, Vec3, Vec4};

use crate::raster::shader::{default_vertex_out, get_varying, FragmentIn, FragmentOut, ShaderProgram, ShaderUniforms, ShaderVertex, VaryingSemantic, VertexOut};
use crate::raster::shadow::{shadow_visibility_dir, ShadowParams};
use crate::registry::Texture;
use crate::scene::PackedLight;

fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

/// Bilinear, repeat-wrapped, sRGB-to-linear texture sample.
#[must_use]
pub fn sample_texture2d_bilinear_repeat_linear(tex: &Texture, uv: Vec2) -> Vec4 {
    if tex.width == 0 || tex.height == 0 {
        return Vec4::ONE;
    }
    let w = tex.width as f32;
    let h = tex.height as f32;
    let fx = uv.x.rem_euclid(1.0) * w - 0.5;
    let fy = uv.y.rem_euclid(1.0) * h - 0.5;
    let x0 = fx.floor();
    let y0 = fy.floor();
    let tx = fx - x0;
    let ty = fy - y0;

    let wrap = |v: f32, dim: u32| -> u32 { (v.rem_euclid(dim as f32)) as u32 };
    let fetch = |ix: f32, iy: f32| -> Vec4 {
        let x = wrap(ix, tex.width);
        let y = wrap(iy, tex.height);
        let p = tex.pixels[(y * tex.width + x) as usize];
        Vec4::new(
            srgb_to_linear(p[0] as f32 / 255.0),
            srgb_to_linear(p[1] as f32 / 255.0),
            srgb_to_linear(p[2] as f32 / 255.0),
            p[3] as f32 / 255.0,
        )
    };

    let c00 = fetch(x0, y0);
    let c10 = fetch(x0 + 1.0, y0);
    let c01 = fetch(x0, y0 + 1.0);
    let c11 = fetch(x0 + 1.0, y0 + 1.0);
    c00.lerp(c10, tx).lerp(c01.lerp(c11, tx), ty)
}

/// A coarse "fake IBL": a gradient-sky ambient term from a hemisphere split
/// (sky tint above, ground tint below the normal) rather than a real
/// irradiance convolution, scaled by ambient occlusion.
#[must_use]
pub fn eval_fake_ibl(normal_ws: Vec3, ao: f32) -> Vec3 {
    const SKY: Vec3 = Vec3::new(0.45, 0.55, 0.70);
    const GROUND: Vec3 = Vec3::new(0.20, 0.18, 0.15);
    let t = (normal_ws.y * 0.5 + 0.5).clamp(0.0, 1.0);
    GROUND.lerp(SKY, t) * ao
}

fn base_color_sample(uniforms: &ShaderUniforms, uv: Vec2) -> Vec3 {
    let tex_color = uniforms.base_color_tex.map_or(Vec4::ONE, |tex| sample_texture2d_bilinear_repeat_linear(tex, uv));
    (uniforms.base_color * tex_color.truncate()).max(Vec3::ZERO)
}

fn shadow_term(uniforms: &ShaderUniforms, world_pos: Vec3, n_dot_l: f32) -> f32 {
    let Some(map) = &uniforms.shadow_map else { return 1.0 };
    let params = ShadowParams {
        bias_const: uniforms.shadow_bias_const,
        bias_slope: uniforms.shadow_bias_slope,
        pcf_radius: uniforms.shadow_pcf_radius,
        pcf_step: uniforms.shadow_pcf_step,
        strength: uniforms.shadow_strength,
    };
    shadow_visibility_dir(map, world_pos, uniforms.light_viewproj, n_dot_l, &params)
}

/// Classic normalized Blinn-Phong: diffuse Lambert plus a power-scaled
/// specular lobe, `spec_pow` widening with roughness and `spec_f0` rising
/// with metalness (a crude stand-in for a real Fresnel split in a
/// non-physically-based material).
#[derive(Debug, Clone, Copy, Default)]
pub struct BlinnPhongShader;

impl ShaderProgram for BlinnPhongShader {
    fn vertex_main(&self, vin: &ShaderVertex, uniforms: &ShaderUniforms) -> VertexOut {
        default_vertex_out(vin, uniforms)
    }

    fn fragment_main(&self, fin: &FragmentIn, uniforms: &ShaderUniforms) -> FragmentOut {
        let n = fin.normal_ws.normalize_or_zero();
        let l = (-uniforms.light_dir_ws).normalize_or_zero();
        let v = (uniforms.camera_pos - fin.world_pos).normalize_or_zero();
        let h = (l + v).normalize_or_zero();

        let n_dot_l = n.dot(l).max(0.0);
        let n_dot_h = n.dot(h).max(0.0);

        let albedo = base_color_sample(uniforms, fin.uv);
        let spec_pow = (4.0f32).max(8.0 + (1.0 - uniforms.roughness) * 120.0);
        let spec_f0 = 0.04 + 0.96 * uniforms.metallic;
        let spec = spec_f0 * n_dot_h.powf(spec_pow);

        let mut visibility = 1.0;
        if n_dot_l > 0.0 {
            visibility = shadow_term(uniforms, fin.world_pos, n_dot_l);
        }

        let radiance = uniforms.light_color * uniforms.light_intensity;
        let direct = (albedo * n_dot_l + Vec3::splat(spec) * n_dot_l) * radiance * visibility;
        let ambient = eval_fake_ibl(n, uniforms.ao) * albedo;

        FragmentOut { color: (direct + ambient).extend(1.0), aux: Vec4::ZERO, discard: false }
    }
}

/// GGX/Trowbridge-Reitz normal distribution.
fn ggx_distribution(n_dot_h: f32, roughness: f32) -> f32 {
    let a = roughness * roughness;
    let a2 = a * a;
    let denom = n_dot_h * n_dot_h * (a2 - 1.0) + 1.0;
    a2 / (std::f32::consts::PI * denom * denom).max(1e-8)
}

/// Smith joint geometry term using the direct-lighting Schlick-GGX `k`.
fn smith_geometry(n_dot_v: f32, n_dot_l: f32, roughness: f32) -> f32 {
    let k = (roughness + 1.0).powi(2) / 8.0;
    let g1 = |n_dot_x: f32| n_dot_x / (n_dot_x * (1.0 - k) + k).max(1e-8);
    g1(n_dot_v) * g1(n_dot_l)
}

/// Schlick's Fresnel approximation.
fn fresnel_schlick(cos_theta: f32, f0: Vec3) -> Vec3 {
    f0 + (Vec3::ONE - f0) * (1.0 - cos_theta).clamp(0.0, 1.0).powi(5)
}

/// Cook-Torrance specular + energy-conserving diffuse BRDF response for a
/// single light direction, already multiplied by `n_dot_l` — the caller only
/// multiplies by the light's incoming radiance. Shared by the forward PBR
/// shader, the deferred-lighting resolve, and per-object local-light shading
/// so all three agree on one lighting model.
#[must_use]
pub fn pbr_brdf(n: Vec3, v: Vec3, l: Vec3, albedo: Vec3, roughness: f32, metallic: f32) -> Vec3 {
    let n_dot_l = n.dot(l).max(0.0);
    if n_dot_l <= 0.0 {
        return Vec3::ZERO;
    }
    let h = (l + v).normalize_or_zero();
    let n_dot_v = n.dot(v).max(1e-4);
    let n_dot_h = n.dot(h).max(0.0);
    let v_dot_h = v.dot(h).max(0.0);

    let roughness = roughness.clamp(0.045, 1.0);
    let metallic = metallic.clamp(0.0, 1.0);
    let f0 = Vec3::splat(0.04).lerp(albedo, metallic);

    let d = ggx_distribution(n_dot_h, roughness);
    let g = smith_geometry(n_dot_v, n_dot_l, roughness);
    let f = fresnel_schlick(v_dot_h, f0);

    let specular = (f * (d * g)) / (4.0 * n_dot_v * n_dot_l).max(1e-4);
    let kd = (Vec3::ONE - f) * (1.0 - metallic);
    let diffuse = kd * albedo / std::f32::consts::PI;
    (diffuse + specular) * n_dot_l
}

/// Every local-light kind is treated as a point source centered at
/// `light.vecs[0].xyz` with `range = light.vecs[0].w` for this fast path —
/// spot cones, rect-area extents and tube-area lengths are not shaded
/// differently, only their binning volumes use the fuller per-kind geometry.
/// Returns the unit direction toward the light and its incoming radiance at
/// `world_pos` (already combined with the light's own color/intensity/bias).
#[must_use]
pub fn eval_packed_light_point(light: &PackedLight, world_pos: Vec3) -> (Vec3, Vec3) {
    let pos_range = light.vecs[0];
    let position = pos_range.truncate();
    let range = pos_range.w.max(1e-3);
    let radiance0 = light.vecs[1].truncate();

    let to_light = position - world_pos;
    let dist = to_light.length();
    if dist < 1e-6 {
        return (Vec3::Y, Vec3::ZERO);
    }
    let dir = to_light / dist;
    if dist > range {
        return (dir, Vec3::ZERO);
    }

    let smooth = light.type_shape_flags[1] == 1;
    let atten = if smooth {
        let t = (dist / range).clamp(0.0, 1.0);
        let falloff = (1.0 - t * t).max(0.0);
        (falloff * falloff) / (dist * dist + 1e-2)
    } else {
        1.0 / (dist * dist + 1e-2)
    };
    (dir, radiance0 * atten)
}

/// Metallic-roughness Cook-Torrance PBR: GGX distribution, Smith joint
/// geometry, Schlick Fresnel, energy-conserving diffuse/specular split by
/// metalness, plus the object's gathered local lights (spec §4.4) shaded with
/// the same BRDF as the sun.
#[derive(Debug, Clone, Copy, Default)]
pub struct PbrMetallicRoughnessShader;

impl ShaderProgram for PbrMetallicRoughnessShader {
    fn vertex_main(&self, vin: &ShaderVertex, uniforms: &ShaderUniforms) -> VertexOut {
        default_vertex_out(vin, uniforms)
    }

    fn fragment_main(&self, fin: &FragmentIn, uniforms: &ShaderUniforms) -> FragmentOut {
        let n = fin.normal_ws.normalize_or_zero();
        let l = (-uniforms.light_dir_ws).normalize_or_zero();
        let v = (uniforms.camera_pos - fin.world_pos).normalize_or_zero();

        let albedo = base_color_sample(uniforms, fin.uv);
        let roughness = uniforms.roughness;
        let metallic = uniforms.metallic;

        let n_dot_l = n.dot(l).max(0.0);
        let mut visibility = 1.0;
        if n_dot_l > 0.0 {
            visibility = shadow_term(uniforms, fin.world_pos, n_dot_l);
        }
        let sun_radiance = uniforms.light_color * uniforms.light_intensity;
        let direct = pbr_brdf(n, v, l, albedo, roughness, metallic) * sun_radiance * visibility;

        let mut local = Vec3::ZERO;
        let count = (uniforms.local_light_count as usize).min(uniforms.local_lights.len());
        for light in &uniforms.local_lights[..count] {
            let (ldir, radiance) = eval_packed_light_point(light, fin.world_pos);
            if radiance == Vec3::ZERO {
                continue;
            }
            local += pbr_brdf(n, v, ldir, albedo, roughness, metallic) * radiance;
        }

        let ambient = eval_fake_ibl(n, uniforms.ao) * albedo * (1.0 - metallic * 0.5);

        FragmentOut { color: (direct + local + ambient).extend(1.0), aux: Vec4::ZERO, discard: false }
    }
}

/// Debug visualization target selected by [`make_debug_view_shader_program`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugViewMode {
    Albedo,
    Normal,
    Depth,
}

/// Shader that bypasses lighting entirely and writes the raw value a
/// debug mode wants to inspect, reading `world_pos`/`normal_ws`/`uv` straight
/// off [`FragmentIn`] rather than off varyings, since debug views need to
/// work even for shaders that don't populate the full varying set.
#[derive(Debug, Clone, Copy)]
pub struct DebugViewShader {
    pub mode: DebugViewMode,
}

#[must_use]
pub fn make_debug_view_shader_program(mode: DebugViewMode) -> DebugViewShader {
    DebugViewShader { mode }
}

impl ShaderProgram for DebugViewShader {
    fn vertex_main(&self, vin: &ShaderVertex, uniforms: &ShaderUniforms) -> VertexOut {
        default_vertex_out(vin, uniforms)
    }

    fn fragment_main(&self, fin: &FragmentIn, uniforms: &ShaderUniforms) -> FragmentOut {
        let color = match self.mode {
            DebugViewMode::Albedo => base_color_sample(uniforms, fin.uv),
            DebugViewMode::Normal => fin.normal_ws.normalize_or_zero() * 0.5 + Vec3::splat(0.5),
            DebugViewMode::Depth => Vec3::splat(fin.depth01),
        };
        let _ = get_varying(fin, VaryingSemantic::Color0);
        FragmentOut { color: color.extend(1.0), aux: Vec4::ZERO, discard: false }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bilinear_sample_of_uniform_texture_matches_its_color() {
        let tex = Texture::solid(4, 4, [128, 128, 128, 255]);
        let c = sample_texture2d_bilinear_repeat_linear(&tex, Vec2::new(0.3, 0.7));
        let expected = srgb_to_linear(128.0 / 255.0);
        assert!((c.x - expected).abs() < 1e-4);
        assert!((c.y - expected).abs() < 1e-4);
    }

    #[test]
    fn fake_ibl_is_brighter_looking_up_than_down() {
        let up = eval_fake_ibl(Vec3::Y, 1.0);
        let down = eval_fake_ibl(-Vec3::Y, 1.0);
        assert!(up.length() > down.length());
    }

    #[test]
    fn debug_depth_view_echoes_fragment_depth() {
        let shader = make_debug_view_shader_program(DebugViewMode::Depth);
        let fin = FragmentIn { depth01: 0.42, ..Default::default() };
        let out = shader.fragment_main(&fin, &ShaderUniforms::default());
        assert!((out.color.x - 0.42).abs() < 1e-6);
    }
}
