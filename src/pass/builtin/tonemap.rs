//! Built-in `tonemap` pass (spec §4.7, §6): converts the frame's HDR
//! accumulation buffer into the LDR surface a backend can present, applying
//! exposure, a filmic curve, and gamma encoding (spec §3 `FrameParams`).

use std::borrow::Cow;

use crate::context::Context;
use crate::errors::Result;
use crate::frame::FrameParams;
use crate::pass::builtin::shared;
use crate::pass::types::{PassContract, PassIoDescriptor, PassRole, ResourceKind, ResourceRef};
use crate::pass::IRenderPass;
use crate::registry::RtRegistry;
use crate::registry::{ColorKind, RenderTarget};
use crate::scene::Scene;

/// ACES-ish filmic curve (Narkowicz fit), applied post-exposure. Cheap and
/// without the `HDR -> LDR` banding a plain `clamp` produces at highlights.
fn aces_filmic(x: f32) -> f32 {
    let a = 2.51;
    let b = 0.03;
    let c = 2.43;
    let d = 0.59;
    let e = 0.14;
    ((x * (a * x + b)) / (x * (c * x + d) + e)).clamp(0.0, 1.0)
}

#[derive(Default)]
pub struct TonemapPass;

impl IRenderPass for TonemapPass {
    fn id(&self) -> &str {
        "tonemap"
    }

    fn describe_contract(&self) -> PassContract {
        PassContract {
            role: PassRole::PostProcess,
            supported_modes_mask: shared::ALL_TECHNIQUE_MODES_MASK,
            requires_depth_prepass: false,
            requires_light_culling: false,
            prefer_async_compute: false,
            semantics: vec![Cow::Borrowed("ldr")],
        }
    }

    fn describe_io(&self) -> PassIoDescriptor {
        PassIoDescriptor::new(vec![ResourceRef::new(shared::RT_HDR, ResourceKind::ColorHdr)], vec![ResourceRef::new(shared::RT_LDR, ResourceKind::ColorLdr)])
    }

    fn execute(&mut self, _ctx: &mut Context, _scene: &Scene, frame: &FrameParams, rt_registry: &mut RtRegistry) -> Result<()> {
        let hdr_handle = rt_registry.ensure_transient_color_hdr(shared::RT_HDR, frame.width, frame.height);
        let ldr_handle = rt_registry.ensure_transient_color_ldr(shared::RT_LDR, frame.width, frame.height);

        let Some(RenderTarget::ColorHdr { texels: hdr_texels, .. }) = rt_registry.get::<RenderTarget, ColorKind>(hdr_handle) else { return Ok(()) };
        let exposure = frame.exposure.max(0.0);
        let inv_gamma = 1.0 / frame.gamma.max(1e-3);

        let mut out = vec![[0u8, 0, 0, 255]; hdr_texels.len()];
        for (dst, src) in out.iter_mut().zip(hdr_texels.iter()) {
            let exposed = [src[0] * exposure, src[1] * exposure, src[2] * exposure];
            let mapped = [aces_filmic(exposed[0]), aces_filmic(exposed[1]), aces_filmic(exposed[2])];
            let encoded = [mapped[0].powf(inv_gamma), mapped[1].powf(inv_gamma), mapped[2].powf(inv_gamma)];
            *dst = [(encoded[0] * 255.0).round() as u8, (encoded[1] * 255.0).round() as u8, (encoded[2] * 255.0).round() as u8, (src[3].clamp(0.0, 1.0) * 255.0).round() as u8];
        }

        if let Some(RenderTarget::ColorLdr { texels, .. }) = rt_registry.get_mut::<RenderTarget, ColorKind>(ldr_handle) {
            *texels = out;
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
    fn zero_hdr_tonemaps_to_opaque_black() {
        let mut ctx = Context::new(Arc::new(InlineJobSystem));
        let scene = Scene::new();
        let frame = FrameParams::new(2, 2);
        let mut rt_registry = RtRegistry::new();
        rt_registry.ensure_transient_color_hdr(shared::RT_HDR, 2, 2);
        let mut pass = TonemapPass;
        pass.execute(&mut ctx, &scene, &frame, &mut rt_registry).unwrap();

        let ldr_handle = rt_registry.ensure_transient_color_ldr(shared::RT_LDR, 2, 2);
        if let Some(RenderTarget::ColorLdr { texels, .. }) = rt_registry.get::<RenderTarget, ColorKind>(ldr_handle) {
            assert!(texels.iter().all(|&t| t == [0, 0, 0, 255]));
        } else {
            panic!("ldr target missing");
        }
    }

    #[test]
    fn aces_filmic_clamps_to_unit_range() {
        assert!((0.0..=1.0).contains(&aces_filmic(0.0)));
        assert!((0.0..=1.0).contains(&aces_filmic(1000.0)));
    }
}
