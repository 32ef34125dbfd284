//! Shader data model (C5, spec §4.5 + `SPEC_FULL.md` §3 supplement).
//!
//! A shader program is a pair of pure functions over plain data, ported per
//! the design note in spec §9 as a trait with a `vertex_main`/`fragment_main`
//! method pair rather than boxed closures: implementors are data-only structs
//! (often zero-sized), which keeps the hot loop monomorphized instead of
//! indirecting through a `dyn Fn`.

use bytemuck::Zeroable;
use glam::{Mat4, Vec2, Vec3, Vec4};

use crate::lighting::MAX_LIGHTS_PER_OBJECT;
use crate::registry::Texture;
use crate::scene::PackedLight;

/// Fixed capacity of a [`ShaderUniforms`]' free-form vec4 slots.
pub const SHS_MAX_UNIFORM_VECS: usize = 64;
/// Fixed capacity of a [`ShaderUniforms`]' free-form mat4 slots.
pub const SHS_MAX_UNIFORM_MATS: usize = 16;
/// Fixed capacity of a vertex's interpolated varyings.
pub const SHS_MAX_VARYINGS: usize = 12;

/// Well-known varying slots a vertex shader may populate; a shader may also
/// use `Custom0..Custom5` for its own interpolants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum VaryingSemantic {
    WorldPos = 0,
    NormalWs = 1,
    Uv0 = 2,
    Color0 = 3,
    TangentWs = 4,
    BitangentWs = 5,
    Custom0 = 6,
    Custom1 = 7,
    Custom2 = 8,
    Custom3 = 9,
    Custom4 = 10,
    Custom5 = 11,
}

#[must_use]
pub const fn varying_bit(slot: u32) -> u32 {
    1u32 << slot
}

/// Per-vertex mesh attributes fed to [`ShaderProgram::vertex_main`].
#[derive(Debug, Clone, Copy)]
pub struct ShaderVertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub uv: Vec2,
    pub color: Vec4,
    pub tangent: Vec4,
}

impl Default for ShaderVertex {
    fn default() -> Self {
        Self { position: Vec3::ZERO, normal: Vec3::Y, uv: Vec2::ZERO, color: Vec4::ONE, tangent: Vec4::new(1.0, 0.0, 0.0, 1.0) }
    }
}

/// Vertex-shader output: clip-space position plus up to
/// [`SHS_MAX_VARYINGS`] float4 varyings, with world-position/normal/uv
/// carried as dedicated fields for rasterizer-stage convenience even when a
/// shader also writes them as varyings (spec §4.5: "carrying
/// world_pos/normal/uv").
#[derive(Debug, Clone, Copy)]
pub struct VertexOut {
    pub clip: Vec4,
    pub varyings: [Vec4; SHS_MAX_VARYINGS],
    pub varying_mask: u32,
    pub world_pos: Vec3,
    pub normal_ws: Vec3,
    pub uv: Vec2,
}

impl Default for VertexOut {
    fn default() -> Self {
        Self {
            clip: Vec4::new(0.0, 0.0, 0.0, 1.0),
            varyings: [Vec4::ZERO; SHS_MAX_VARYINGS],
            varying_mask: 0,
            world_pos: Vec3::ZERO,
            normal_ws: Vec3::Y,
            uv: Vec2::ZERO,
        }
    }
}

pub fn set_varying(out: &mut VertexOut, semantic: VaryingSemantic, v: Vec4) {
    let i = semantic as u32;
    out.varyings[i as usize] = v;
    out.varying_mask |= varying_bit(i);
}

/// Rasterizer-interpolated input to [`ShaderProgram::fragment_main`].
#[derive(Debug, Clone, Copy)]
pub struct FragmentIn {
    pub varyings: [Vec4; SHS_MAX_VARYINGS],
    pub varying_mask: u32,
    pub world_pos: Vec3,
    pub normal_ws: Vec3,
    pub uv: Vec2,
    pub depth01: f32,
    pub px: i32,
    pub py: i32,
}

impl Default for FragmentIn {
    fn default() -> Self {
        Self { varyings: [Vec4::ZERO; SHS_MAX_VARYINGS], varying_mask: 0, world_pos: Vec3::ZERO, normal_ws: Vec3::Y, uv: Vec2::ZERO, depth01: 1.0, px: 0, py: 0 }
    }
}

#[must_use]
pub fn get_varying(fin: &FragmentIn, semantic: VaryingSemantic) -> Vec4 {
    let i = semantic as u32;
    if fin.varying_mask & varying_bit(i) == 0 {
        Vec4::ZERO
    } else {
        fin.varyings[i as usize]
    }
}

/// Fragment-shader output: linear RGBA plus a discard flag (spec §4.5).
///
/// `aux` is a second free-form output, written alongside `color` into
/// [`crate::raster::rasterizer::RasterizerTarget::aux`] when the target
/// provides one — the gbuffer pass's second MRT attachment (world normal +
/// roughness) rides on this rather than a separate rasterize call, so both
/// outputs share one depth test.
#[derive(Debug, Clone, Copy, Default)]
pub struct FragmentOut {
    pub color: Vec4,
    pub aux: Vec4,
    pub discard: bool,
}

/// Read-only view over a shadow map's depth buffer, borrowed for the
/// duration of one `fragment_main` call — `ShaderUniforms` never owns the
/// render target it samples.
#[derive(Debug, Clone, Copy)]
pub struct ShadowMapView<'a> {
    pub width: u32,
    pub height: u32,
    pub depth: &'a [f32],
}

impl ShadowMapView<'_> {
    #[must_use]
    pub fn fetch_clamped(&self, x: i32, y: i32) -> f32 {
        let x = x.clamp(0, self.width as i32 - 1) as u32;
        let y = y.clamp(0, self.height as i32 - 1) as u32;
        self.depth[(y * self.width + x) as usize]
    }
}

/// Everything a shader pair may read (spec §4.5 + `SPEC_FULL.md` §3
/// supplement): transforms, the scene's single directional light, material
/// scalars, shadow-sampling policy, and free-form per-shader slots.
#[derive(Clone, Copy)]
pub struct ShaderUniforms<'a> {
    pub vec4s: [Vec4; SHS_MAX_UNIFORM_VECS],
    pub mats: [Mat4; SHS_MAX_UNIFORM_MATS],

    pub model: Mat4,
    pub prev_model: Mat4,
    pub viewproj: Mat4,
    pub prev_viewproj: Mat4,

    pub light_dir_ws: Vec3,
    pub light_color: Vec3,
    pub light_intensity: f32,
    pub camera_pos: Vec3,

    pub base_color: Vec3,
    pub metallic: f32,
    pub roughness: f32,
    pub ao: f32,
    pub base_color_tex: Option<&'a Texture>,

    pub shadow_map: Option<ShadowMapView<'a>>,
    pub light_viewproj: Mat4,
    pub shadow_bias_const: f32,
    pub shadow_bias_slope: f32,
    pub shadow_pcf_radius: i32,
    pub shadow_pcf_step: f32,
    pub shadow_strength: f32,

    pub enable_motion_vectors: bool,

    /// Distance-ranked local lights gathered for this object by
    /// [`crate::lighting::gather_lights_for_object`] (spec §4.4), consumed by
    /// [`crate::raster::shaders::PbrMetallicRoughnessShader`] and the
    /// deferred-lighting resolve. Unused entries beyond `local_light_count`
    /// are left zeroed.
    pub local_lights: [PackedLight; MAX_LIGHTS_PER_OBJECT],
    pub local_light_count: u32,
}

impl Default for ShaderUniforms<'_> {
    fn default() -> Self {
        Self {
            vec4s: [Vec4::ZERO; SHS_MAX_UNIFORM_VECS],
            mats: [Mat4::IDENTITY; SHS_MAX_UNIFORM_MATS],
            model: Mat4::IDENTITY,
            prev_model: Mat4::IDENTITY,
            viewproj: Mat4::IDENTITY,
            prev_viewproj: Mat4::IDENTITY,
            light_dir_ws: Vec3::new(0.0, -1.0, 0.0),
            light_color: Vec3::ONE,
            light_intensity: 1.0,
            camera_pos: Vec3::ZERO,
            base_color: Vec3::ONE,
            metallic: 0.0,
            roughness: 0.6,
            ao: 1.0,
            base_color_tex: None,
            shadow_map: None,
            light_viewproj: Mat4::IDENTITY,
            shadow_bias_const: 0.0008,
            shadow_bias_slope: 0.0015,
            shadow_pcf_radius: 2,
            shadow_pcf_step: 1.0,
            shadow_strength: 1.0,
            enable_motion_vectors: true,
            local_lights: [PackedLight::zeroed(); MAX_LIGHTS_PER_OBJECT],
            local_light_count: 0,
        }
    }
}

impl<'a> ShaderUniforms<'a> {
    pub fn set_uniform_vec4(&mut self, slot: usize, v: Vec4) {
        if slot < SHS_MAX_UNIFORM_VECS {
            self.vec4s[slot] = v;
        }
    }

    #[must_use]
    pub fn uniform_vec4(&self, slot: usize) -> Vec4 {
        self.vec4s.get(slot).copied().unwrap_or(Vec4::ZERO)
    }

    pub fn set_uniform_mat4(&mut self, slot: usize, m: Mat4) {
        if slot < SHS_MAX_UNIFORM_MATS {
            self.mats[slot] = m;
        }
    }

    #[must_use]
    pub fn uniform_mat4(&self, slot: usize) -> Mat4 {
        self.mats.get(slot).copied().unwrap_or(Mat4::IDENTITY)
    }
}

/// A vertex/fragment stage pair. Implementors are data-only (often
/// zero-sized) so the rasterizer can call through a `&dyn ShaderProgram`
/// without per-call allocation.
pub trait ShaderProgram: Send + Sync {
    fn vertex_main(&self, vin: &ShaderVertex, uniforms: &ShaderUniforms) -> VertexOut;
    fn fragment_main(&self, fin: &FragmentIn, uniforms: &ShaderUniforms) -> FragmentOut;
}

/// Builds the vertex-shader output every built-in program starts from:
/// clip-space position, a normal-matrix-transformed world normal, and the
/// four standard varyings (`WorldPos`, `NormalWs`, `Uv0`, `Color0`).
#[must_use]
pub fn default_vertex_out(vin: &ShaderVertex, u: &ShaderUniforms) -> VertexOut {
    let mut o = VertexOut::default();
    let world_pos4 = u.model * vin.position.extend(1.0);
    o.world_pos = world_pos4.truncate();
    o.clip = u.viewproj * world_pos4;

    let normal_mat3 = glam::Mat3::from_mat4(u.model);
    let det = normal_mat3.determinant();
    let normal_mat3 = if det.abs() > 1e-8 { normal_mat3.inverse().transpose() } else { normal_mat3 };
    o.normal_ws = (normal_mat3 * vin.normal).normalize_or_zero();
    o.uv = vin.uv;

    set_varying(&mut o, VaryingSemantic::WorldPos, o.world_pos.extend(1.0));
    set_varying(&mut o, VaryingSemantic::NormalWs, o.normal_ws.extend(0.0));
    set_varying(&mut o, VaryingSemantic::Uv0, o.uv.extend(0.0).extend(0.0));
    set_varying(&mut o, VaryingSemantic::Color0, vin.color);
    o
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn varying_round_trips_through_set_get() {
        let mut out = VertexOut::default();
        set_varying(&mut out, VaryingSemantic::Uv0, Vec4::new(1.0, 2.0, 0.0, 0.0));
        let fin = FragmentIn { varyings: out.varyings, varying_mask: out.varying_mask, ..Default::default() };
        assert_eq!(get_varying(&fin, VaryingSemantic::Uv0), Vec4::new(1.0, 2.0, 0.0, 0.0));
        assert_eq!(get_varying(&fin, VaryingSemantic::Custom0), Vec4::ZERO);
    }

    #[test]
    fn default_vertex_out_carries_world_pos_through_model_matrix() {
        let u = ShaderUniforms { model: Mat4::from_translation(Vec3::new(1.0, 0.0, 0.0)), ..Default::default() };
        let vin = ShaderVertex::default();
        let out = default_vertex_out(&vin, &u);
        assert_eq!(out.world_pos, Vec3::new(1.0, 0.0, 0.0));
    }
}
