//! Render-path recipes (spec §4.7, §3 Glossary): a named, ordered pass list
//! plus the runtime defaults and capability gate that decide whether the
//! executor may activate it against a given backend.

use std::sync::Arc;

use crate::backend::CapabilitySet;
use crate::frame::{FrameTechnique, TechniqueMode};
use crate::pass::builtin;

/// One entry in a recipe's ordered pass list. A disabled entry is kept in
/// the recipe (so its position is still visible when inspecting the
/// recipe) but is never constructed by [`super::plan::compile_plan`].
#[derive(Debug, Clone)]
pub struct RecipePassEntry {
    pub pass_id: String,
    pub enabled: bool,
}

impl RecipePassEntry {
    #[must_use]
    pub fn new(pass_id: impl Into<String>) -> Self {
        Self { pass_id: pass_id.into(), enabled: true }
    }
}

/// `CapabilitySet -> bool` predicate deciding whether a recipe may run
/// against a backend. Boxed so recipes can be constructed with arbitrary
/// closures, `Arc`'d so recipes stay `Clone`.
pub type CapabilityPredicate = Arc<dyn Fn(&CapabilitySet) -> bool + Send + Sync>;

/// A render-path recipe (spec §4.7): `{ name, ordered pass ids, recommended
/// tile size, wants_shadows, strict-validation flag, primary technique mode,
/// capability predicate }`.
#[derive(Clone)]
pub struct Recipe {
    pub name: String,
    pub technique_mode: TechniqueMode,
    pub passes: Vec<RecipePassEntry>,
    pub recommended_tile_size: u32,
    pub wants_shadows: bool,
    pub strict_validation: bool,
    pub capability_predicate: CapabilityPredicate,
    /// Name of the `ColorLdr` resource that becomes the present surface once
    /// execution completes.
    pub ldr_target_name: String,
}

impl Recipe {
    /// `FrameTechnique` defaults this recipe recommends, for a caller that
    /// wants to build a matching `FrameParams` without hand-deriving which
    /// modes need a depth prepass or light culling.
    #[must_use]
    pub fn recommended_technique(&self) -> FrameTechnique {
        let needs_tiling = matches!(self.technique_mode, TechniqueMode::ForwardPlus | TechniqueMode::TiledDeferred | TechniqueMode::ClusteredForward);
        FrameTechnique {
            mode: self.technique_mode,
            depth_prepass: needs_tiling,
            light_culling: needs_tiling,
            tile_size: self.recommended_tile_size,
            max_lights_per_tile: 64,
        }
    }
}

fn always(_: &CapabilitySet) -> bool {
    true
}

fn needs_depth_attachment(caps: &CapabilitySet) -> bool {
    caps.supports_depth_attachment
}

fn needs_depth_and_mrt(caps: &CapabilitySet) -> bool {
    caps.supports_depth_attachment && caps.limits.max_color_attachments >= 2
}

/// The five built-in composition recipes (spec §4.7 "composition recipe"),
/// one per [`TechniqueMode`], each wired to [`builtin::BUILTIN_PASS_IDS`]'
/// ids in the order that mode needs them. A caller registering these still
/// needs a [`crate::pass::PassFactoryRegistry::with_builtins`] for the ids
/// to resolve against.
#[must_use]
pub fn standard_recipes() -> Vec<Recipe> {
    vec![
        Recipe {
            name: "forward".to_string(),
            technique_mode: TechniqueMode::Forward,
            passes: ["shadow_map", "pbr_forward", "tonemap", "light_shafts", "motion_blur"].into_iter().map(RecipePassEntry::new).collect(),
            recommended_tile_size: 16,
            wants_shadows: true,
            strict_validation: false,
            capability_predicate: Arc::new(always),
            ldr_target_name: "ldr".to_string(),
        },
        Recipe {
            name: "forward_plus".to_string(),
            technique_mode: TechniqueMode::ForwardPlus,
            passes: ["shadow_map", "depth_prepass", "light_culling", "pbr_forward_plus", "tonemap", "light_shafts", "motion_blur"]
                .into_iter()
                .map(RecipePassEntry::new)
                .collect(),
            recommended_tile_size: 16,
            wants_shadows: true,
            strict_validation: false,
            capability_predicate: Arc::new(needs_depth_attachment),
            ldr_target_name: "ldr".to_string(),
        },
        Recipe {
            name: "deferred".to_string(),
            technique_mode: TechniqueMode::Deferred,
            passes: ["shadow_map", "gbuffer", "deferred_lighting", "tonemap", "light_shafts", "motion_blur"].into_iter().map(RecipePassEntry::new).collect(),
            recommended_tile_size: 16,
            wants_shadows: true,
            strict_validation: false,
            capability_predicate: Arc::new(needs_depth_and_mrt),
            ldr_target_name: "ldr".to_string(),
        },
        Recipe {
            name: "tiled_deferred".to_string(),
            technique_mode: TechniqueMode::TiledDeferred,
            passes: ["shadow_map", "depth_prepass", "light_culling", "gbuffer", "deferred_lighting_tiled", "tonemap", "light_shafts", "motion_blur"]
                .into_iter()
                .map(RecipePassEntry::new)
                .collect(),
            recommended_tile_size: 16,
            wants_shadows: true,
            strict_validation: false,
            capability_predicate: Arc::new(needs_depth_and_mrt),
            ldr_target_name: "ldr".to_string(),
        },
        Recipe {
            name: "clustered_forward".to_string(),
            technique_mode: TechniqueMode::ClusteredForward,
            passes: ["shadow_map", "depth_prepass", "cluster_build", "cluster_light_assign", "pbr_forward_clustered", "tonemap", "light_shafts", "motion_blur"]
                .into_iter()
                .map(RecipePassEntry::new)
                .collect(),
            recommended_tile_size: 32,
            wants_shadows: true,
            strict_validation: false,
            capability_predicate: Arc::new(needs_depth_attachment),
            ldr_target_name: "ldr".to_string(),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_recipes_cover_every_technique_mode_once() {
        let recipes = standard_recipes();
        assert_eq!(recipes.len(), 5);
        let mut mode = TechniqueMode::Forward;
        for _ in 0..5 {
            assert!(recipes.iter().any(|r| r.technique_mode == mode), "missing recipe for {mode:?}");
            mode = mode.next();
        }
    }

    #[test]
    fn recommended_technique_enables_tiling_only_where_needed() {
        let recipes = standard_recipes();
        let forward = recipes.iter().find(|r| r.technique_mode == TechniqueMode::Forward).unwrap();
        assert!(!forward.recommended_technique().depth_prepass);
        let fplus = recipes.iter().find(|r| r.technique_mode == TechniqueMode::ForwardPlus).unwrap();
        assert!(fplus.recommended_technique().depth_prepass);
        assert!(fplus.recommended_technique().light_culling);
    }

    #[test]
    fn every_recipe_pass_id_is_a_registered_builtin() {
        let recipes = standard_recipes();
        for recipe in &recipes {
            for entry in &recipe.passes {
                assert!(builtin::BUILTIN_PASS_IDS.contains(&entry.pass_id.as_str()), "unknown pass id `{}` in recipe `{}`", entry.pass_id, recipe.name);
            }
        }
    }
}
