use std::marker::PhantomData;

/// Opaque handle to a render target. Zero is reserved for "invalid", matching
/// the handle convention used for mesh/material/texture handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RtHandle<Kind> {
    id: u32,
    _kind: PhantomData<fn() -> Kind>,
}

impl<Kind> RtHandle<Kind> {
    pub(crate) fn new(id: u32) -> Self {
        Self { id, _kind: PhantomData }
    }

    #[must_use]
    pub fn invalid() -> Self {
        Self::new(0)
    }

    #[must_use]
    pub fn is_valid(self) -> bool {
        self.id != 0
    }

    pub(crate) fn id(self) -> u32 {
        self.id
    }
}

impl<Kind> Default for RtHandle<Kind> {
    fn default() -> Self {
        Self::invalid()
    }
}

pub struct ColorKind;
pub struct DepthKind;
pub struct MotionKind;
pub struct ShadowKind;

/// Typed wrappers over `RtHandle`, kept distinct purely so a caller cannot
/// pass a shadow-map handle where a color target is expected.
pub type RtColor = RtHandle<ColorKind>;
pub type RtDepth = RtHandle<DepthKind>;
pub type RtMotion = RtHandle<MotionKind>;
pub type RtShadow = RtHandle<ShadowKind>;
