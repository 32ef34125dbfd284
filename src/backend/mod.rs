//! Backend contract (spec §6 External Interfaces).
//!
//! A backend is the thing a recipe's capability predicate is evaluated
//! against and the thing passes eventually draw through. This crate ships
//! exactly one: [`SoftwareBackend`], a CPU rasterizer-backed implementation
//! with no present surface of its own — callers read the LDR render target
//! the executor names as "final" out of the `RtRegistry` themselves.

use crate::frame::FrameInfo;

/// Which concrete backend a pass is being asked to run against. The only
/// backend this crate ships is [`SoftwareBackend`] (`Software`); the others
/// are named so a recipe's capability predicate and a pass's
/// `supports_backend` can express "GPU-only, no software fallback" without
/// this crate needing to implement one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    Software,
    Vulkan,
    D3D12,
    Metal,
    WebGpu,
}

/// Queue-count part of a [`CapabilitySet`]. The software backend reports one
/// of each it claims to support and zero for the rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QueueCounts {
    pub graphics: u32,
    pub compute: u32,
    pub transfer: u32,
    pub present: u32,
}

/// Feature-flag part of a [`CapabilitySet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FeatureFlags {
    pub validation_layers: bool,
    pub timeline_semaphore: bool,
    pub descriptor_indexing: bool,
    pub dynamic_rendering: bool,
    pub push_constants: bool,
    pub multithread_command_recording: bool,
    pub async_compute: bool,
}

/// Resource-limit part of a [`CapabilitySet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceLimits {
    pub max_frames_in_flight: u32,
    pub max_color_attachments: u32,
    pub max_descriptor_sets_per_pipeline: u32,
    pub max_push_constant_bytes: u32,
}

/// What a backend can do, queried by a recipe's capability predicate during
/// [`crate::path::RenderPathExecutor::apply_index`] (spec §6).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CapabilitySet {
    pub kind: BackendKind,
    pub queues: QueueCounts,
    pub features: FeatureFlags,
    pub limits: ResourceLimits,
    pub supports_present: bool,
    pub supports_offscreen: bool,
    pub supports_depth_attachment: bool,
}

/// A backend exposed to the executor (spec §6): frame bracketing plus a
/// capability query recipes gate on. The application owns backends and
/// lends the active one to the executor for the duration of a frame; the
/// executor never takes ownership.
pub trait Backend: Send + Sync {
    fn kind(&self) -> BackendKind;
    fn capabilities(&self) -> CapabilitySet;
    fn begin_frame(&mut self, frame_info: FrameInfo);
    fn end_frame(&mut self, frame_info: FrameInfo);

    /// Monotonic counter incremented on surface invalidation (resize, device
    /// loss). Passes that cache backend-owned state compare this against a
    /// cached value to decide whether to rebuild. The software backend has
    /// no surface to invalidate, so it never increments this.
    fn swapchain_generation(&self) -> u64 {
        0
    }
}

/// Reference backend: no device, no present surface, no swapchain. All it
/// does is bracket frames and report a capability set tuned for a pure-CPU
/// pipeline (no async compute, no descriptor indexing, but depth attachments
/// and multithreaded command recording both "supported" since there is no
/// real command buffer to serialize).
pub struct SoftwareBackend {
    last_frame_index: Option<u64>,
}

impl SoftwareBackend {
    #[must_use]
    pub fn new() -> Self {
        Self { last_frame_index: None }
    }

    /// The frame index observed by the most recent `begin_frame`, if any.
    #[must_use]
    pub fn last_frame_index(&self) -> Option<u64> {
        self.last_frame_index
    }
}

impl Default for SoftwareBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for SoftwareBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Software
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet {
            kind: BackendKind::Software,
            queues: QueueCounts { graphics: 1, compute: 1, transfer: 1, present: 0 },
            features: FeatureFlags {
                validation_layers: false,
                timeline_semaphore: false,
                descriptor_indexing: false,
                dynamic_rendering: false,
                push_constants: false,
                multithread_command_recording: true,
                async_compute: false,
            },
            limits: ResourceLimits {
                max_frames_in_flight: 1,
                max_color_attachments: 4,
                max_descriptor_sets_per_pipeline: 1,
                max_push_constant_bytes: 0,
            },
            supports_present: false,
            supports_offscreen: true,
            supports_depth_attachment: true,
        }
    }

    fn begin_frame(&mut self, frame_info: FrameInfo) {
        if let Some(prev) = self.last_frame_index {
            debug_assert!(frame_info.frame_index > prev, "frame_index must be strictly monotonic");
        }
        self.last_frame_index = Some(frame_info.frame_index);
    }

    fn end_frame(&mut self, _frame_info: FrameInfo) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn software_backend_reports_software_kind_and_no_present() {
        let backend = SoftwareBackend::new();
        assert_eq!(backend.kind(), BackendKind::Software);
        assert!(!backend.capabilities().supports_present);
        assert!(backend.capabilities().supports_offscreen);
    }

    #[test]
    fn begin_frame_records_last_frame_index() {
        let mut backend = SoftwareBackend::new();
        backend.begin_frame(FrameInfo { frame_index: 3, width: 64, height: 64 });
        assert_eq!(backend.last_frame_index(), Some(3));
    }

    #[test]
    fn swapchain_generation_defaults_to_zero() {
        let backend = SoftwareBackend::new();
        assert_eq!(backend.swapchain_generation(), 0);
    }
}
