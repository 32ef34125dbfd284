//! Pass contract types (C6, spec §4.6): what a pass needs from the backend
//! and the frame, and which resources it reads/writes, all queryable without
//! running the pass.

use std::borrow::Cow;

use crate::frame::TechniqueMode;

pub use crate::backend::BackendKind;

/// Which GPU queue class a pass prefers to be scheduled on. The software
/// backend has only one worker pool and ignores this beyond bookkeeping, but
/// the field still round-trips through a plan so a future GPU backend can
/// honor it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueueClass {
    Graphics,
    Compute,
    AsyncCompute,
    Transfer,
}

/// The functional role a pass plays in a render path, used by recipe
/// validation to sanity-check a pass list (e.g. a path with `Lighting` but
/// no `GBuffer`/`ForwardOpaque` producing pass is suspect).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassRole {
    Visibility,
    LightCulling,
    GBuffer,
    ForwardOpaque,
    Lighting,
    PostProcess,
    Composite,
}

/// Static requirements a pass declares about the frame it needs to run in,
/// queried by the executor before construction/IO validation rather than
/// discovered by running the pass and failing.
#[derive(Debug, Clone)]
pub struct PassContract {
    pub role: PassRole,
    /// Bitmask of [`TechniqueMode`] values this pass supports, built with
    /// [`technique_mode_bit`].
    pub supported_modes_mask: u32,
    pub requires_depth_prepass: bool,
    pub requires_light_culling: bool,
    pub prefer_async_compute: bool,
    pub semantics: Vec<Cow<'static, str>>,
}

/// Bit for a given [`TechniqueMode`] in a [`PassContract::supported_modes_mask`].
#[must_use]
pub const fn technique_mode_bit(mode: TechniqueMode) -> u32 {
    1u32 << (mode as u32)
}

impl PassContract {
    #[must_use]
    pub fn supports_mode(&self, mode: TechniqueMode) -> bool {
        self.supported_modes_mask & technique_mode_bit(mode) != 0
    }
}

/// Which logical render-target shape a [`ResourceRef`] identifies, mirroring
/// [`crate::registry::RenderTarget`]'s variant set without owning the pixel
/// data itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    ColorHdr,
    ColorLdr,
    ColorDepthMotion,
    ShadowDepth,
    Temp,
}

/// One resource a pass reads or writes, identified by the transient name it
/// is registered under in [`crate::registry::RtRegistry`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceRef {
    pub name: Cow<'static, str>,
    pub kind: ResourceKind,
}

impl ResourceRef {
    #[must_use]
    pub fn new(name: &'static str, kind: ResourceKind) -> Self {
        Self { name: Cow::Borrowed(name), kind }
    }
}

/// A pass's declared reads and writes, consumed by the executor's IO-graph
/// validation pass before any pass actually runs.
#[derive(Debug, Clone, Default)]
pub struct PassIoDescriptor {
    pub reads: Vec<ResourceRef>,
    pub writes: Vec<ResourceRef>,
}

impl PassIoDescriptor {
    #[must_use]
    pub fn new(reads: Vec<ResourceRef>, writes: Vec<ResourceRef>) -> Self {
        Self { reads, writes }
    }
}
