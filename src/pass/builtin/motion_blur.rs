//! Built-in `motion_blur` pass (spec §4.5, §6): per-pixel blur along the
//! motion vectors the rasterizer wrote into `depth_motion` (spec §4.2,
//! clamped to +/-96px there), accumulated into a scratch target the same way
//! `light_shafts` avoids sampling its own partially-written output.

use std::borrow::Cow;

use glam::{Vec2, Vec3};

use crate::context::Context;
use crate::errors::Result;
use crate::frame::FrameParams;
use crate::pass::builtin::shared;
use crate::pass::types::{PassContract, PassIoDescriptor, PassRole, ResourceKind, ResourceRef};
use crate::pass::IRenderPass;
use crate::registry::{ColorKind, DepthKind, RenderTarget, RtColor, RtRegistry};
use crate::scene::Scene;

/// Samples per pixel along its motion vector. Not exposed as a `FrameParams`
/// knob — quality/perf tradeoff the recipe author doesn't need to tune.
const MOTION_BLUR_SAMPLES: u32 = 8;

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
pub struct MotionBlurPass;

impl IRenderPass for MotionBlurPass {
    fn id(&self) -> &str {
        "motion_blur"
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
            vec![ResourceRef::new(shared::RT_HDR, ResourceKind::ColorHdr), ResourceRef::new(shared::RT_DEPTH_MOTION, ResourceKind::ColorDepthMotion)],
            vec![ResourceRef::new(shared::RT_HDR, ResourceKind::ColorHdr), ResourceRef::new(shared::RT_MOTION_BLUR_TMP, ResourceKind::Temp)],
        )
    }

    fn execute(&mut self, _ctx: &mut Context, _scene: &Scene, frame: &FrameParams, rt_registry: &mut RtRegistry) -> Result<()> {
        if !frame.enable_motion_vectors {
            return Ok(());
        }
        let width = frame.width.max(1);
        let height = frame.height.max(1);

        let hdr_handle = rt_registry.ensure_transient_color_hdr(shared::RT_HDR, width, height);
        let depth_handle = rt_registry.ensure_transient_depth_motion(shared::RT_DEPTH_MOTION, width, height, 0.1, 1000.0);

        let Some(RenderTarget::ColorHdr { texels: hdr_texels, .. }) = rt_registry.get::<RenderTarget, ColorKind>(hdr_handle) else { return Ok(()) };
        let hdr_copy = hdr_texels.clone();
        let Some(RenderTarget::ColorDepthMotion { motion, .. }) = rt_registry.get::<RenderTarget, DepthKind>(depth_handle) else { return Ok(()) };
        let motion_copy = motion.clone();

        let mut blurred = vec![[0f32; 4]; hdr_copy.len()];
        for py in 0..height {
            for px in 0..width {
                let idx = (py * width + px) as usize;
                let mv = motion_copy[idx];
                let uv = Vec2::new((px as f32 + 0.5) / width as f32, (py as f32 + 0.5) / height as f32);
                let mv_uv = Vec2::new(mv[0] / width as f32, mv[1] / height as f32);

                let mut accum = Vec3::ZERO;
                for i in 0..MOTION_BLUR_SAMPLES {
                    let t = i as f32 / (MOTION_BLUR_SAMPLES - 1).max(1) as f32 - 0.5;
                    accum += sample_bilinear_clamp(&hdr_copy, width, height, uv - mv_uv * t);
                }
                blurred[idx] = [accum.x / MOTION_BLUR_SAMPLES as f32, accum.y / MOTION_BLUR_SAMPLES as f32, accum.z / MOTION_BLUR_SAMPLES as f32, hdr_copy[idx][3]];
            }
        }

        let tmp_handle: RtColor = rt_registry.ensure_transient(shared::RT_MOTION_BLUR_TMP, width, height, move |w, h| RenderTarget::temp(shared::RT_MOTION_BLUR_TMP, w, h));
        if let Some(RenderTarget::Temp { texels, .. }) = rt_registry.get_mut::<RenderTarget, ColorKind>(tmp_handle) {
            texels.clone_from(&blurred);
        }

        if let Some(RenderTarget::ColorHdr { texels, .. }) = rt_registry.get_mut::<RenderTarget, ColorKind>(hdr_handle) {
            texels.clone_from(&blurred);
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
    fn zero_motion_leaves_colors_unchanged() {
        let mut ctx = Context::new(Arc::new(InlineJobSystem));
        let scene = Scene::new();
        let frame = FrameParams::new(4, 4);
        let mut rt_registry = RtRegistry::new();
        let hdr_handle = rt_registry.ensure_transient_color_hdr(shared::RT_HDR, 4, 4);
        if let Some(RenderTarget::ColorHdr { texels, .. }) = rt_registry.get_mut::<RenderTarget, ColorKind>(hdr_handle) {
            texels.fill([0.5, 0.25, 0.1, 1.0]);
        }
        let mut pass = MotionBlurPass;
        pass.execute(&mut ctx, &scene, &frame, &mut rt_registry).unwrap();
        if let Some(RenderTarget::ColorHdr { texels, .. }) = rt_registry.get::<RenderTarget, ColorKind>(hdr_handle) {
            for t in texels {
                assert!((t[0] - 0.5).abs() < 1e-4);
                assert!((t[1] - 0.25).abs() < 1e-4);
            }
        }
    }

    #[test]
    fn disabled_flag_is_a_no_op() {
        let mut ctx = Context::new(Arc::new(InlineJobSystem));
        let scene = Scene::new();
        let mut frame = FrameParams::new(4, 4);
        frame.enable_motion_vectors = false;
        let mut rt_registry = RtRegistry::new();
        let mut pass = MotionBlurPass;
        pass.execute(&mut ctx, &scene, &frame, &mut rt_registry).unwrap();
    }
}
