use std::any::Any;

use rustc_hash::FxHashMap;

use super::handles::HandleAllocator;
use super::render_target::RenderTarget;
use super::rt_handle::{RtColor, RtDepth, RtHandle, RtShadow};

struct Slot {
    value: Box<dyn Any + Send + Sync>,
    width: u32,
    height: u32,
}

/// Handle-to-pointer mapping for render targets, mirroring a `reg<T>(ptr)` /
/// `get<T>(handle)` pair: registration is generic over the stored type, but
/// the registry itself stores everything behind `Any` so it stays
/// non-generic at the struct level.
#[derive(Default)]
pub struct RtRegistry {
    allocator: HandleAllocator,
    slots: FxHashMap<u32, Slot>,
    transient_names: FxHashMap<String, u32>,
}

impl RtRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an existing value (persistent allocation), returning a
    /// freshly-minted typed handle.
    pub fn register<T, Kind>(&mut self, value: T) -> RtHandle<Kind>
    where
        T: Any + Send + Sync,
    {
        self.register_with_extents(value, 0, 0)
    }

    pub(crate) fn register_with_extents<T, Kind>(&mut self, value: T, width: u32, height: u32) -> RtHandle<Kind>
    where
        T: Any + Send + Sync,
    {
        let raw = self.allocator.alloc();
        self.slots.insert(raw.index(), Slot { value: Box::new(value), width, height });
        RtHandle::new(raw.index())
    }

    #[must_use]
    pub fn get<T, Kind>(&self, handle: RtHandle<Kind>) -> Option<&T>
    where
        T: Any,
    {
        self.slots.get(&handle.id())?.value.downcast_ref::<T>()
    }

    #[must_use]
    pub fn get_mut<T, Kind>(&mut self, handle: RtHandle<Kind>) -> Option<&mut T>
    where
        T: Any,
    {
        self.slots.get_mut(&handle.id())?.value.downcast_mut::<T>()
    }

    /// Idempotent transient allocation: returns the handle already registered
    /// under `name` if its extents match, otherwise builds a fresh value via
    /// `make` and re-registers under the same name (old handle is left
    /// dangling in `slots` until the next full `reset`).
    pub fn ensure_transient<T, Kind>(&mut self, name: &str, width: u32, height: u32, make: impl FnOnce(u32, u32) -> T) -> RtHandle<Kind>
    where
        T: Any + Send + Sync,
    {
        if let Some(&id) = self.transient_names.get(name) {
            if let Some(slot) = self.slots.get(&id) {
                if slot.width == width && slot.height == height {
                    return RtHandle::new(id);
                }
            }
        }
        let handle: RtHandle<Kind> = self.register_with_extents(make(width, height), width, height);
        self.transient_names.insert(name.to_string(), handle.id());
        handle
    }

    /// Idempotent `ColorHdr` transient allocation by name (spec §4.1).
    pub fn ensure_transient_color_hdr(&mut self, name: &str, width: u32, height: u32) -> RtColor {
        self.ensure_transient(name, width, height, RenderTarget::color_hdr)
    }

    /// Idempotent `ColorLdr` transient allocation by name (spec §4.1).
    pub fn ensure_transient_color_ldr(&mut self, name: &str, width: u32, height: u32) -> RtColor {
        self.ensure_transient(name, width, height, RenderTarget::color_ldr)
    }

    /// Idempotent `ColorDepthMotion` transient allocation by name. Extent
    /// matching ignores `near`/`far`: a caller that only changes the camera's
    /// clip planes between frames keeps the same handle.
    pub fn ensure_transient_depth_motion(&mut self, name: &str, width: u32, height: u32, near: f32, far: f32) -> RtDepth {
        self.ensure_transient(name, width, height, move |w, h| RenderTarget::color_depth_motion(w, h, near, far))
    }

    /// Idempotent `ShadowDepth` transient allocation by name.
    pub fn ensure_transient_shadow(&mut self, name: &str, width: u32, height: u32) -> RtShadow {
        self.ensure_transient(name, width, height, RenderTarget::shadow_depth)
    }

    /// Looks up a transient allocation's handle by the name it was
    /// registered under this frame (spec §6 — an application presenting the
    /// final `ColorLdr` surface only has
    /// [`crate::path::RenderPathExecutor::final_ldr_target_name`]'s string,
    /// not a handle of its own).
    #[must_use]
    pub fn transient_handle<Kind>(&self, name: &str) -> Option<RtHandle<Kind>> {
        self.transient_names.get(name).map(|&id| RtHandle::new(id))
    }

    /// Clears transient name bookkeeping so the next `ensure_transient` call
    /// per name looks like first use. Persistent registrations are untouched.
    pub fn begin_frame(&mut self) {
        self.transient_names.clear();
    }

    /// Invalidates every previously-issued handle.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::rt_handle::ColorKind;

    #[test]
    fn zero_handle_never_issued_and_strictly_increasing() {
        let mut reg = RtRegistry::new();
        let a: RtHandle<ColorKind> = reg.register(42u32);
        let b: RtHandle<ColorKind> = reg.register(7u32);
        assert!(a.is_valid() && b.is_valid());
        assert!(b.id() > a.id());
    }

    #[test]
    fn get_unknown_handle_returns_none() {
        let reg = RtRegistry::new();
        let bogus: RtHandle<ColorKind> = RtHandle::new(999);
        assert!(reg.get::<u32, ColorKind>(bogus).is_none());
    }

    #[test]
    fn ensure_transient_is_idempotent_for_matching_extents() {
        let mut reg = RtRegistry::new();
        let a: RtHandle<ColorKind> = reg.ensure_transient("scratch", 64, 64, |w, h| vec![0u8; (w * h) as usize]);
        let b: RtHandle<ColorKind> = reg.ensure_transient("scratch", 64, 64, |w, h| vec![0u8; (w * h) as usize]);
        assert_eq!(a, b);
    }

    #[test]
    fn ensure_transient_reallocates_on_extent_mismatch() {
        let mut reg = RtRegistry::new();
        let a: RtHandle<ColorKind> = reg.ensure_transient("scratch", 64, 64, |w, h| vec![0u8; (w * h) as usize]);
        let b: RtHandle<ColorKind> = reg.ensure_transient("scratch", 128, 64, |w, h| vec![0u8; (w * h) as usize]);
        assert_ne!(a, b);
    }

    #[test]
    fn transient_handle_looks_up_by_name() {
        let mut reg = RtRegistry::new();
        let a: RtHandle<ColorKind> = reg.ensure_transient("scratch", 64, 64, |w, h| vec![0u8; (w * h) as usize]);
        let found: Option<RtHandle<ColorKind>> = reg.transient_handle("scratch");
        assert_eq!(found, Some(a));
        assert_eq!(reg.transient_handle::<ColorKind>("missing"), None);
    }

    #[test]
    fn reset_invalidates_prior_handles() {
        let mut reg = RtRegistry::new();
        let a: RtHandle<ColorKind> = reg.register(1u32);
        reg.reset();
        assert!(reg.get::<u32, ColorKind>(a).is_none());
    }

    #[test]
    fn typed_transient_helpers_are_idempotent_by_name_and_extent() {
        let mut reg = RtRegistry::new();
        let a = reg.ensure_transient_color_hdr("hdr", 64, 32);
        let b = reg.ensure_transient_color_hdr("hdr", 64, 32);
        assert_eq!(a, b);
        assert!(reg.get::<RenderTarget, crate::registry::rt_handle::ColorKind>(a).is_some());
    }

    #[test]
    fn typed_depth_motion_helper_ignores_near_far_for_identity() {
        let mut reg = RtRegistry::new();
        let a = reg.ensure_transient_depth_motion("depth_motion", 64, 64, 0.1, 100.0);
        let b = reg.ensure_transient_depth_motion("depth_motion", 64, 64, 1.0, 500.0);
        assert_eq!(a, b);
    }
}
