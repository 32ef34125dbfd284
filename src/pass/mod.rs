//! Pass Framework (C6, spec §4.6).
//!
//! A pass is a self-describing unit of work: before it ever runs, the
//! executor can ask it what backend/queue it wants, what contract it
//! declares (role, supported technique modes, dependency requirements), and
//! which resources it reads and writes. [`PassFactoryRegistry`] maps a
//! recipe's pass ids to fresh instances; [`builtin`] registers the fourteen
//! ids spec'd as required for interop.

pub mod builtin;
pub mod types;

pub use types::{technique_mode_bit, BackendKind, PassContract, PassIoDescriptor, PassRole, QueueClass, ResourceKind, ResourceRef};

use rustc_hash::FxHashMap;

use crate::context::Context;
use crate::errors::Result;
use crate::frame::FrameParams;
use crate::registry::RtRegistry;
use crate::scene::Scene;

/// A unit of work in a render path. Implementors must only touch the
/// resources named in [`IRenderPass::describe_io`]; the executor's IO-graph
/// validation assumes this and does not re-check it at runtime.
pub trait IRenderPass: Send {
    /// Stable unique identifier (snake_case), used as the key in recipes and
    /// the factory registry.
    fn id(&self) -> &str;

    /// Hint for placement; defaults to software since that's the only
    /// backend this crate ships.
    fn preferred_backend(&self) -> BackendKind {
        BackendKind::Software
    }

    fn preferred_queue(&self) -> QueueClass {
        QueueClass::Graphics
    }

    /// Hard gate: a pass that returns `false` for the active backend is
    /// never constructed by [`PassFactoryRegistry::create`] into a plan
    /// targeting it.
    fn supports_backend(&self, kind: BackendKind) -> bool {
        kind == BackendKind::Software
    }

    fn describe_contract(&self) -> PassContract;
    fn describe_io(&self) -> PassIoDescriptor;

    /// Performs the pass's work. Implementations must only read/write
    /// resources declared in [`Self::describe_io`].
    fn execute(&mut self, ctx: &mut Context, scene: &Scene, frame: &FrameParams, rt_registry: &mut RtRegistry) -> Result<()>;
}

/// Constructs a fresh [`IRenderPass`] instance. Boxed as `Fn` rather than
/// `FnOnce` since a factory is invoked once per plan compile, potentially
/// many times over a registry's lifetime.
pub type PassFactory = Box<dyn Fn() -> Box<dyn IRenderPass> + Send + Sync>;

/// Maps a pass id to the factory that builds it. A plan asks the registry
/// for each id in its recipe's pass list; ids with no registered factory are
/// reported back to the caller rather than causing a construction failure.
#[derive(Default)]
pub struct PassFactoryRegistry {
    factories: FxHashMap<String, PassFactory>,
}

impl PassFactoryRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a factory under `id`, replacing any prior registration.
    pub fn register(&mut self, id: &str, factory: PassFactory) {
        self.factories.insert(id.to_string(), factory);
    }

    #[must_use]
    pub fn is_registered(&self, id: &str) -> bool {
        self.factories.contains_key(id)
    }

    /// Builds a fresh pass instance for `id`, or `None` if no factory is
    /// registered — the caller (the executor) accumulates these into a
    /// `missing_passes` list rather than treating a single miss as fatal.
    #[must_use]
    pub fn create(&self, id: &str) -> Option<Box<dyn IRenderPass>> {
        self.factories.get(id).map(|factory| factory())
    }

    /// A registry pre-populated with every built-in pass id (spec §6).
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        builtin::register_builtins(&mut registry);
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unregistered_id_returns_none() {
        let registry = PassFactoryRegistry::new();
        assert!(registry.create("no_such_pass").is_none());
    }

    #[test]
    fn with_builtins_registers_every_spec_id() {
        let registry = PassFactoryRegistry::with_builtins();
        for id in builtin::BUILTIN_PASS_IDS {
            assert!(registry.is_registered(id), "missing builtin pass factory for `{id}`");
            assert!(registry.create(id).is_some());
        }
    }
}
