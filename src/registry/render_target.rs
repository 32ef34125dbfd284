/// A CPU-backed render target. Each variant owns its pixel storage directly;
/// there is no separate "allocate then bind" step because the software
/// backend rasterizes straight into these buffers.
#[derive(Debug, Clone)]
pub enum RenderTarget {
    /// Linear float4 color, used for HDR accumulation before tonemapping.
    ColorHdr { width: u32, height: u32, texels: Vec<[f32; 4]> },
    /// 8-bit RGBA, the final presentable surface.
    ColorLdr { width: u32, height: u32, texels: Vec<[u8; 4]> },
    /// Depth in `[0,1]` plus a 2D motion vector per pixel.
    ColorDepthMotion { width: u32, height: u32, near: f32, far: f32, depth: Vec<f32>, motion: Vec<[f32; 2]> },
    /// Depth in `[0,1]`, cleared to 1.0 (reverse-Z: far).
    ShadowDepth { width: u32, height: u32, depth: Vec<f32> },
    /// Scratch storage identified only by the semantic name it was requested
    /// under; shape is whatever the requesting pass interprets it as.
    Temp { name: String, width: u32, height: u32, texels: Vec<[f32; 4]> },
}

impl RenderTarget {
    #[must_use]
    pub fn color_hdr(width: u32, height: u32) -> Self {
        Self::ColorHdr { width, height, texels: vec![[0.0; 4]; (width * height) as usize] }
    }

    #[must_use]
    pub fn color_ldr(width: u32, height: u32) -> Self {
        Self::ColorLdr { width, height, texels: vec![[0, 0, 0, 255]; (width * height) as usize] }
    }

    #[must_use]
    pub fn color_depth_motion(width: u32, height: u32, near: f32, far: f32) -> Self {
        Self::ColorDepthMotion {
            width,
            height,
            near,
            far,
            depth: vec![1.0; (width * height) as usize],
            motion: vec![[0.0, 0.0]; (width * height) as usize],
        }
    }

    #[must_use]
    pub fn shadow_depth(width: u32, height: u32) -> Self {
        Self::ShadowDepth { width, height, depth: vec![1.0; (width * height) as usize] }
    }

    #[must_use]
    pub fn temp(name: impl Into<String>, width: u32, height: u32) -> Self {
        Self::Temp { name: name.into(), width, height, texels: vec![[0.0; 4]; (width * height) as usize] }
    }

    #[must_use]
    pub fn extents(&self) -> (u32, u32) {
        match self {
            Self::ColorHdr { width, height, .. }
            | Self::ColorLdr { width, height, .. }
            | Self::ColorDepthMotion { width, height, .. }
            | Self::ShadowDepth { width, height, .. }
            | Self::Temp { width, height, .. } => (*width, *height),
        }
    }

    /// Clears the target to its per-variant default: zero HDR color, opaque
    /// black LDR color, far depth, zero motion.
    pub fn clear(&mut self) {
        match self {
            Self::ColorHdr { texels, .. } => texels.fill([0.0; 4]),
            Self::ColorLdr { texels, .. } => texels.fill([0, 0, 0, 255]),
            Self::ColorDepthMotion { depth, motion, .. } => {
                depth.fill(1.0);
                motion.fill([0.0, 0.0]);
            }
            Self::ShadowDepth { depth, .. } => depth.fill(1.0),
            Self::Temp { texels, .. } => texels.fill([0.0; 4]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shadow_depth_clears_to_far() {
        let rt = RenderTarget::shadow_depth(4, 4);
        if let RenderTarget::ShadowDepth { depth, .. } = &rt {
            assert!(depth.iter().all(|&d| d == 1.0));
        } else {
            panic!("wrong variant");
        }
    }

    #[test]
    fn clear_resets_color_depth_motion() {
        let mut rt = RenderTarget::color_depth_motion(2, 2, 0.1, 100.0);
        if let RenderTarget::ColorDepthMotion { depth, motion, .. } = &mut rt {
            depth[0] = 0.2;
            motion[0] = [3.0, 4.0];
        }
        rt.clear();
        if let RenderTarget::ColorDepthMotion { depth, motion, .. } = &rt {
            assert_eq!(depth[0], 1.0);
            assert_eq!(motion[0], [0.0, 0.0]);
        }
    }
}
