//! Render-path executor (C7, spec §4.7): activates recipes into compiled
//! plans and runs them against a scene/frame.

use crate::backend::CapabilitySet;
use crate::context::Context;
use crate::errors::{RendererError, Result};
use crate::frame::{FrameParams, TechniqueMode};
use crate::pass::PassFactoryRegistry;
use crate::registry::RtRegistry;
use crate::scene::Scene;

use super::plan::{compile_plan, CompiledPlan, ExecutionReport};
use super::recipe::{standard_recipes, Recipe};

/// Stats the executor accumulates on top of `Context::debug` once a plan has
/// finished running (spec §4.7 "the executor records stats").
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub pass_count: u64,
    pub draw_calls: u64,
    pub culled_objects: u64,
}

/// Holds recipes, the active plan, and a [`PassFactoryRegistry`]. One
/// executor instance is meant to live for an application's lifetime; recipes
/// are registered once, `apply_index`/`cycle` switch between them, and
/// `execute_plan` runs once per frame.
pub struct RenderPathExecutor {
    factories: PassFactoryRegistry,
    recipes: Vec<Recipe>,
    active_index: Option<usize>,
    plan: Option<CompiledPlan>,
    last_stats: FrameStats,
}

impl RenderPathExecutor {
    #[must_use]
    pub fn new(factories: PassFactoryRegistry, recipes: Vec<Recipe>) -> Self {
        Self { factories, recipes, active_index: None, plan: None, last_stats: FrameStats::default() }
    }

    /// An executor pre-populated with every built-in pass factory and the
    /// five standard composition recipes (spec §6 "compose a standard
    /// registry via a helper").
    #[must_use]
    pub fn with_standard_recipes() -> Self {
        Self::new(PassFactoryRegistry::with_builtins(), standard_recipes())
    }

    #[must_use]
    pub fn recipe_count(&self) -> usize {
        self.recipes.len()
    }

    pub fn register_recipe(&mut self, recipe: Recipe) {
        self.recipes.push(recipe);
    }

    pub fn register_pass_factory(&mut self, id: &str, factory: crate::pass::PassFactory) {
        self.factories.register(id, factory);
    }

    #[must_use]
    pub fn active_recipe(&self) -> Option<&Recipe> {
        self.active_index.and_then(|i| self.recipes.get(i))
    }

    /// The recipe registered at `index`, regardless of which one is active.
    #[must_use]
    pub fn recipe_at(&self, index: usize) -> Option<&Recipe> {
        self.recipes.get(index)
    }

    /// The index of the first registered recipe targeting `mode`, if any.
    #[must_use]
    pub fn find_recipe_index(&self, mode: TechniqueMode) -> Option<usize> {
        self.recipes.iter().position(|r| r.technique_mode == mode)
    }

    #[must_use]
    pub fn active_technique_mode(&self) -> TechniqueMode {
        self.active_recipe().map_or(TechniqueMode::Forward, |r| r.technique_mode)
    }

    #[must_use]
    pub fn execution_report(&self) -> Option<&ExecutionReport> {
        self.plan.as_ref().map(|p| &p.report)
    }

    #[must_use]
    pub fn last_stats(&self) -> FrameStats {
        self.last_stats
    }

    /// Activates recipe `index` (spec §4.7 steps 1-4): capability gate, pass
    /// construction, IO graph validation, fingerprinting. Returns `false`
    /// and leaves the previously active plan untouched if the index is out
    /// of range or the capability gate rejects the recipe (spec S5) —
    /// "application-visible state is unchanged" on a capability-gate
    /// rejection.
    pub fn apply_index(&mut self, index: usize, capabilities: &CapabilitySet) -> bool {
        let Some(recipe) = self.recipes.get(index) else { return false };
        if !(recipe.capability_predicate)(capabilities) {
            return false;
        }
        let plan = compile_plan(recipe, capabilities, &self.factories);
        let valid = plan.report.valid;
        self.active_index = Some(index);
        self.plan = Some(plan);
        valid
    }

    /// Same as [`Self::apply_index`], but returns a `RendererError` instead
    /// of a bare `bool` for callers that want `?`-style propagation.
    pub fn apply_index_checked(&mut self, index: usize, capabilities: &CapabilitySet) -> Result<()> {
        if index >= self.recipes.len() {
            return Err(RendererError::InvalidPathIndex(index));
        }
        let name = self.recipes[index].name.clone();
        if !self.apply_index(index, capabilities) {
            return Err(RendererError::CapabilityMismatch(name));
        }
        Ok(())
    }

    /// Activates whichever registered recipe targets `mode`, or returns
    /// `false` if none does.
    pub fn apply_technique(&mut self, mode: TechniqueMode, capabilities: &CapabilitySet) -> bool {
        let Some(index) = self.recipes.iter().position(|r| r.technique_mode == mode) else { return false };
        self.apply_index(index, capabilities)
    }

    /// Advances to the next technique mode in the fixed cycle order (spec
    /// §8 S4): `Forward -> ForwardPlus -> Deferred -> TiledDeferred ->
    /// ClusteredForward -> Forward`.
    pub fn cycle(&mut self, capabilities: &CapabilitySet) -> bool {
        let next = self.active_technique_mode().next();
        self.apply_technique(next, capabilities)
    }

    /// Falls back to the plain `Forward` technique, the one recipe with no
    /// capability requirements beyond `supports_offscreen`/`supports_present`
    /// parity every backend in this crate provides (spec §7 "caller falls
    /// back by calling `apply_fallback_technique_pipeline`").
    pub fn apply_fallback_technique_pipeline(&mut self, capabilities: &CapabilitySet) -> bool {
        self.apply_technique(TechniqueMode::Forward, capabilities)
    }

    /// Runs the active plan (spec §4.7 "Execution"). Returns `Ok(false)`
    /// without touching `ctx`/`rt_registry` if there is no active plan or
    /// the active plan is invalid; a pass gated on a dependency that never
    /// became valid this frame is silently skipped, matching the spec's
    /// "If `requires_depth_prepass` and ... is false, skip" wording (not an
    /// error).
    pub fn execute_plan(&mut self, ctx: &mut Context, scene: &Scene, frame: &FrameParams, rt_registry: &mut RtRegistry) -> Result<bool> {
        let Some(plan) = self.plan.as_mut() else { return Ok(false) };
        if !plan.report.valid {
            return Ok(false);
        }

        // `culled_objects` is populated by the scene-culling engine (C3),
        // which runs before the executor as part of the frame's data flow
        // (spec "scene + frame params -> C3 -> C4 -> C6 passes"), not by any
        // pass here. `Context::begin_frame` zeroes every debug counter, so
        // the caller-supplied count is carried across that reset instead of
        // being discarded.
        let culled_objects = ctx.debug.culled_objects;
        ctx.begin_frame();
        ctx.debug.culled_objects = culled_objects;
        rt_registry.begin_frame();

        for pass in &mut plan.passes {
            let contract = pass.describe_contract();
            if contract.requires_depth_prepass && !ctx.forward_plus.depth_prepass_valid {
                continue;
            }
            if contract.requires_light_culling && !ctx.forward_plus.light_culling_valid {
                continue;
            }
            pass.execute(ctx, scene, frame, rt_registry)?;
        }

        self.last_stats = FrameStats { pass_count: ctx.debug.pass_count, draw_calls: ctx.debug.draw_calls, culled_objects: ctx.debug.culled_objects };
        Ok(true)
    }

    /// Name of the `ColorLdr` resource the active recipe designates as the
    /// final present surface, once execution has completed.
    #[must_use]
    pub fn final_ldr_target_name(&self) -> Option<&str> {
        self.plan.as_ref().map(|p| p.ldr_target_name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Backend, SoftwareBackend};
    use crate::job::InlineJobSystem;
    use std::sync::Arc;

    fn software_caps() -> CapabilitySet {
        SoftwareBackend::new().capabilities()
    }

    #[test]
    fn apply_index_out_of_range_returns_false() {
        let mut executor = RenderPathExecutor::with_standard_recipes();
        assert!(!executor.apply_index(999, &software_caps()));
    }

    #[test]
    fn apply_index_activates_a_valid_forward_plan() {
        let mut executor = RenderPathExecutor::with_standard_recipes();
        let forward_idx = (0..executor.recipe_count()).find(|&i| executor.recipes[i].technique_mode == TechniqueMode::Forward).unwrap();
        assert!(executor.apply_index(forward_idx, &software_caps()));
        assert!(executor.execution_report().unwrap().valid);
    }

    #[test]
    fn cycle_follows_the_spec_d_technique_order() {
        let mut executor = RenderPathExecutor::with_standard_recipes();
        let caps = software_caps();
        executor.apply_technique(TechniqueMode::Forward, &caps);
        let expected = [
            TechniqueMode::ForwardPlus,
            TechniqueMode::Deferred,
            TechniqueMode::TiledDeferred,
            TechniqueMode::ClusteredForward,
            TechniqueMode::Forward,
        ];
        for mode in expected {
            assert!(executor.cycle(&caps));
            assert_eq!(executor.active_technique_mode(), mode);
        }
    }

    #[test]
    fn execute_plan_without_an_active_plan_is_a_no_op() {
        let mut executor = RenderPathExecutor::with_standard_recipes();
        let mut ctx = Context::new(Arc::new(InlineJobSystem));
        let mut scene = Scene::new();
        scene.resources = Some(Arc::new(crate::registry::ResourceRegistry::new()));
        let frame = FrameParams::new(8, 8);
        let mut rt_registry = RtRegistry::new();
        assert!(!executor.execute_plan(&mut ctx, &scene, &frame, &mut rt_registry).unwrap());
    }

    #[test]
    fn execute_plan_runs_a_forward_frame_end_to_end() {
        let mut executor = RenderPathExecutor::with_standard_recipes();
        let caps = software_caps();
        executor.apply_fallback_technique_pipeline(&caps);
        let mut ctx = Context::new(Arc::new(InlineJobSystem));
        let mut scene = Scene::new();
        scene.resources = Some(Arc::new(crate::registry::ResourceRegistry::new()));
        let frame = FrameParams::new(16, 16);
        let mut rt_registry = RtRegistry::new();
        let ran = executor.execute_plan(&mut ctx, &scene, &frame, &mut rt_registry).unwrap();
        assert!(ran);
        assert!(executor.last_stats().pass_count > 0);
        assert_eq!(executor.final_ldr_target_name(), Some("ldr"));
    }
}
