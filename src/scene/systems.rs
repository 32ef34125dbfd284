//! Logic/render system processors (`SPEC_FULL.md` §4.0).
//!
//! These are the glue a real application uses to drive the culling/pass
//! pipeline frame over frame: [`LogicSystem`]s mutate scene objects before
//! culling runs (translation, enable/disable, spawn/despawn), and
//! [`RenderSystem`]s draw read-only application-level overlays after the
//! executor has finished. Neither is part of C1-C7; a named pass goes
//! through the pass registry (C6) instead.

use crate::frame::FrameParams;
use crate::registry::RtRegistry;
use crate::scene::object_set::SceneObjectSet;
use crate::scene::scene::Scene;

/// State handed to every [`LogicSystem`] tick.
pub struct LogicSystemContext<'a> {
    pub dt: f32,
    pub time: f32,
    pub objects: &'a mut SceneObjectSet,
    pub scene: &'a mut Scene,
    pub frame: &'a FrameParams,
}

type LogicTickFn = Box<dyn FnMut(&mut LogicSystemContext) + Send>;

/// A named, ordered gameplay hook run before culling each frame.
pub struct LogicSystem {
    pub name: String,
    tick: LogicTickFn,
}

impl LogicSystem {
    pub fn new(name: impl Into<String>, tick: impl FnMut(&mut LogicSystemContext) + Send + 'static) -> Self {
        Self { name: name.into(), tick: Box::new(tick) }
    }
}

/// Ordered collection of [`LogicSystem`]s, ticked in registration order.
#[derive(Default)]
pub struct LogicSystemProcessor {
    systems: Vec<LogicSystem>,
}

impl LogicSystemProcessor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, system: LogicSystem) {
        self.systems.push(system);
    }

    pub fn tick_all(&mut self, ctx: &mut LogicSystemContext) {
        for system in &mut self.systems {
            (system.tick)(ctx);
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.systems.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }
}

/// Read-only state handed to every [`RenderSystem`] after `execute_plan` returns.
pub struct RenderSystemContext<'a> {
    pub scene: &'a Scene,
    pub frame: &'a FrameParams,
    pub rt_registry: &'a RtRegistry,
}

type RenderDrawFn = Box<dyn FnMut(&RenderSystemContext) + Send>;

/// A named, read-only debug-draw hook run after a frame's passes execute
/// (AABB overlays, stat text — anything that is not resource-IO-declared and
/// so does not belong in the C6 pass registry).
pub struct RenderSystem {
    pub name: String,
    draw: RenderDrawFn,
}

impl RenderSystem {
    pub fn new(name: impl Into<String>, draw: impl FnMut(&RenderSystemContext) + Send + 'static) -> Self {
        Self { name: name.into(), draw: Box::new(draw) }
    }
}

/// Ordered collection of [`RenderSystem`]s, run in registration order.
#[derive(Default)]
pub struct RenderSystemProcessor {
    systems: Vec<RenderSystem>,
}

impl RenderSystemProcessor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, system: RenderSystem) {
        self.systems.push(system);
    }

    pub fn render(&mut self, ctx: &RenderSystemContext) {
        for system in &mut self.systems {
            (system.draw)(ctx);
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.systems.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{MaterialHandle, MeshHandle};
    use crate::scene::object_set::SceneObject;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn logic_systems_tick_in_registration_order() {
        let order = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let mut proc = LogicSystemProcessor::new();
        let o1 = Arc::clone(&order);
        proc.add(LogicSystem::new("a", move |_ctx| o1.lock().push("a")));
        let o2 = Arc::clone(&order);
        proc.add(LogicSystem::new("b", move |_ctx| o2.lock().push("b")));

        let mut objects = SceneObjectSet::new();
        let mut scene = Scene::new();
        let frame = FrameParams::default();
        let mut ctx = LogicSystemContext { dt: 0.016, time: 1.0, objects: &mut objects, scene: &mut scene, frame: &frame };
        proc.tick_all(&mut ctx);
        assert_eq!(*order.lock(), vec!["a", "b"]);
    }

    #[test]
    fn logic_system_can_mutate_objects() {
        let mut proc = LogicSystemProcessor::new();
        proc.add(LogicSystem::new("spin", |ctx| {
            if let Some(obj) = ctx.objects.find_by_name_mut("box") {
                obj.rotation_euler.y += ctx.dt;
            }
        }));

        let mut objects = SceneObjectSet::new();
        objects.add(SceneObject::new("box", MeshHandle::invalid(), MaterialHandle::invalid()));
        let mut scene = Scene::new();
        let frame = FrameParams::default();
        let mut ctx = LogicSystemContext { dt: 0.5, time: 0.0, objects: &mut objects, scene: &mut scene, frame: &frame };
        proc.tick_all(&mut ctx);
        assert!((objects.find_by_name("box").unwrap().rotation_euler.y - 0.5).abs() < 1e-6);
    }

    #[test]
    fn render_systems_run_in_registration_order() {
        let count = Arc::new(AtomicUsize::new(0));
        let mut proc = RenderSystemProcessor::new();
        let c1 = Arc::clone(&count);
        proc.add(RenderSystem::new("overlay", move |_ctx| {
            c1.fetch_add(1, Ordering::SeqCst);
        }));

        let scene = Scene::new();
        let frame = FrameParams::default();
        let rt_registry = RtRegistry::new();
        let ctx = RenderSystemContext { scene: &scene, frame: &frame, rt_registry: &rt_registry };
        proc.render(&ctx);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
