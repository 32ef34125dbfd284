//! Built-in `light_shafts` pass (spec §3 `FrameParams`, §6): a crepuscular-ray
//! post-process that radially blurs the HDR buffer toward the sun's
//! screen-space position, accumulating into a scratch target so the blur
//! samples a stable source rather than its own partially-written output.

use std::borrow::Cow;

use glam::{Vec2, Vec3};

use crate::context::Context;
use crate::errors::Result;
use crate::frame::FrameParams;
use crate::pass::builtin::shared;
use crate::pass::types::{PassContract, PassIoDescriptor, PassRole, ResourceKind, ResourceRef};
use crate::pass::IRenderPass;
use crate::registry::{ColorKind, RenderTarget, RtColor, RtRegistry};
use crate::scene::Scene;

/// Samples `texels` (row-major, `width x height`) at `uv`, bilinear with
/// clamp-to-edge — the radial blur walks off-screen for any pixel whose ray
/// passes near the frame edge, and clamping avoids wrapping garbage in.
fn sample_bilinear_clamp(texels: &[[f32; 4]], width: u32, height: u32, uv: Vec2) -> Vec3 {
    let w = width.max(1) as f32;
    let h = height.max(1) as f32;
    let x = (uv.x * w - 0.5).clamp(0.0, w - 1.0);
    let y = (uv.y * h - 0.5).clamp(0.0, h - 1.0);
    let x0 = x.floor() as u32;
    let y0 = y.floor() as u32;
    let x1 = (x0 + 1).min(width - 1);
    let y1 = (y0 + 1).min(height - 1);
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let at = |px: u32, py: u32| -> Vec3 {
        let t = texels[(py * width + px) as usize];
        Vec3::new(t[0], t[1], t[2])
    };
    let top = at(x0, y0).lerp(at(x1, y0), fx);
    let bottom = at(x0, y1).lerp(at(x1, y1), fx);
    top.lerp(bottom, fy)
}

#[derive(Default)]
pub struct LightShaftsPass;

impl IRenderPass for LightShaftsPass {
    fn id(&self) -> &str {
        "light_shafts"
    }

    fn describe_contract(&self) -> PassContract {
        PassContract {
            role: PassRole::PostProcess,
            supported_modes_mask: shared::ALL_TECHNIQUE_MODES_MASK,
            requires_depth_prepass: false,
            requires_light_culling: false,
            prefer_async_compute: false,
            semantics: vec![Cow::Borrowed("hdr")],
        }
    }

    fn describe_io(&self) -> PassIoDescriptor {
        PassIoDescriptor::new(
            vec![ResourceRef::new(shared::RT_HDR, ResourceKind::ColorHdr)],
            vec![ResourceRef::new(shared::RT_HDR, ResourceKind::ColorHdr), ResourceRef::new(shared::RT_SHAFTS_TMP, ResourceKind::Temp)],
        )
    }

    fn execute(&mut self, _ctx: &mut Context, scene: &Scene, frame: &FrameParams, rt_registry: &mut RtRegistry) -> Result<()> {
        if !frame.enable_light_shafts {
            return Ok(());
        }
        let dir = scene.sun.direction.normalize_or_zero();
        if dir == Vec3::ZERO {
            return Ok(());
        }
        let camera = scene.camera.extract_render_camera();
        let light_world_pos = Vec3::from(camera.position) - dir * 1000.0;
        let clip = camera.view_projection_matrix * light_world_pos.extend(1.0);
        if clip.w <= 1e-5 {
            return Ok(());
        }
        let ndc = clip.truncate() / clip.w;
        let sun_uv = Vec2::new(ndc.x * 0.5 + 0.5, 1.0 - (ndc.y * 0.5 + 0.5));

        let width = frame.width.max(1);
        let height = frame.height.max(1);
        let hdr_handle = rt_registry.ensure_transient_color_hdr(shared::RT_HDR, width, height);
        let Some(RenderTarget::ColorHdr { texels: hdr_texels, .. }) = rt_registry.get::<RenderTarget, ColorKind>(hdr_handle) else { return Ok(()) };
        let hdr_copy = hdr_texels.clone();

        let steps = frame.light_shafts_steps.max(1);
        let density = frame.light_shafts_density;
        let weight = frame.light_shafts_weight;
        let decay = frame.light_shafts_decay;

        let mut shaft = vec![[0f32; 4]; hdr_copy.len()];
        for py in 0..height {
            for px in 0..width {
                let uv = Vec2::new((px as f32 + 0.5) / width as f32, (py as f32 + 0.5) / height as f32);
                let delta = (sun_uv - uv) * (density / steps as f32);
                let mut sample_uv = uv;
                let mut illum = 1.0f32;
                let mut accum = Vec3::ZERO;
                for _ in 0..steps {
                    sample_uv += delta;
                    let c = sample_bilinear_clamp(&hdr_copy, width, height, sample_uv);
                    accum += c * illum * weight;
                    illum *= decay;
                }
                shaft[(py * width + px) as usize] = [accum.x / steps as f32, accum.y / steps as f32, accum.z / steps as f32, 0.0];
            }
        }

        let shafts_handle: RtColor = rt_registry.ensure_transient(shared::RT_SHAFTS_TMP, width, height, move |w, h| RenderTarget::temp(shared::RT_SHAFTS_TMP, w, h));
        if let Some(RenderTarget::Temp { texels, .. }) = rt_registry.get_mut::<RenderTarget, ColorKind>(shafts_handle) {
            texels.clone_from(&shaft);
        }

        if let Some(RenderTarget::ColorHdr { texels: hdr_texels, .. }) = rt_registry.get_mut::<RenderTarget, ColorKind>(hdr_handle) {
            for (dst, (src, s)) in hdr_texels.iter_mut().zip(hdr_copy.iter().zip(shaft.iter())) {
                *dst = [src[0] + s[0], src[1] + s[1], src[2] + s[2], src[3]];
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::InlineJobSystem;
    use std::sync::Arc;

    #[test]
    fn disabled_flag_leaves_hdr_untouched() {
        let mut ctx = Context::new(Arc::new(InlineJobSystem));
        let mut scene = Scene::new();
        scene.sun.direction = Vec3::new(0.0, -1.0, 0.0);
        let mut frame = FrameParams::new(4, 4);
        frame.enable_light_shafts = false;
        let mut rt_registry = RtRegistry::new();
        let hdr_handle = rt_registry.ensure_transient_color_hdr(shared::RT_HDR, 4, 4);
        if let Some(RenderTarget::ColorHdr { texels, .. }) = rt_registry.get_mut::<RenderTarget, ColorKind>(hdr_handle) {
            texels[0] = [1.0, 2.0, 3.0, 1.0];
        }
        let mut pass = LightShaftsPass;
        pass.execute(&mut ctx, &scene, &frame, &mut rt_registry).unwrap();
        if let Some(RenderTarget::ColorHdr { texels, .. }) = rt_registry.get::<RenderTarget, ColorKind>(hdr_handle) {
            assert_eq!(texels[0], [1.0, 2.0, 3.0, 1.0]);
        }
    }

    #[test]
    fn zero_sun_direction_is_a_no_op() {
        let mut ctx = Context::new(Arc::new(InlineJobSystem));
        let mut scene = Scene::new();
        scene.sun.direction = Vec3::ZERO;
        let frame = FrameParams::new(4, 4);
        let mut rt_registry = RtRegistry::new();
        let mut pass = LightShaftsPass;
        pass.execute(&mut ctx, &scene, &frame, &mut rt_registry).unwrap();
    }
}
