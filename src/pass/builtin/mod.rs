//! Built-in passes (spec §6): the fourteen pass ids every backend/recipe
//! combination is expected to interoperate with.

mod cluster_build;
mod cluster_light_assign;
mod deferred_lighting;
mod deferred_lighting_tiled;
mod depth_prepass;
mod gbuffer;
mod light_culling;
mod light_shafts;
mod motion_blur;
mod pbr_forward;
mod pbr_forward_clustered;
mod pbr_forward_plus;
mod shadow_map;
mod shared;
mod tonemap;

use super::PassFactoryRegistry;

/// Every pass id the spec requires a conforming registry to provide.
pub const BUILTIN_PASS_IDS: [&str; 14] = [
    "shadow_map",
    "depth_prepass",
    "light_culling",
    "cluster_build",
    "cluster_light_assign",
    "gbuffer",
    "deferred_lighting",
    "deferred_lighting_tiled",
    "pbr_forward",
    "pbr_forward_plus",
    "pbr_forward_clustered",
    "tonemap",
    "light_shafts",
    "motion_blur",
];

/// Registers a factory for every id in [`BUILTIN_PASS_IDS`].
pub fn register_builtins(registry: &mut PassFactoryRegistry) {
    registry.register("shadow_map", Box::new(|| Box::new(shadow_map::ShadowMapPass)));
    registry.register("depth_prepass", Box::new(|| Box::new(depth_prepass::DepthPrepassPass)));
    registry.register("light_culling", Box::new(|| Box::new(light_culling::LightCullingPass)));
    registry.register("cluster_build", Box::new(|| Box::new(cluster_build::ClusterBuildPass)));
    registry.register("cluster_light_assign", Box::new(|| Box::new(cluster_light_assign::ClusterLightAssignPass)));
    registry.register("gbuffer", Box::new(|| Box::new(gbuffer::GBufferPass)));
    registry.register("deferred_lighting", Box::new(|| Box::new(deferred_lighting::DeferredLightingPass)));
    registry.register("deferred_lighting_tiled", Box::new(|| Box::new(deferred_lighting_tiled::DeferredLightingTiledPass)));
    registry.register("pbr_forward", Box::new(|| Box::new(pbr_forward::PbrForwardPass)));
    registry.register("pbr_forward_plus", Box::new(|| Box::new(pbr_forward_plus::PbrForwardPlusPass)));
    registry.register("pbr_forward_clustered", Box::new(|| Box::new(pbr_forward_clustered::PbrForwardClusteredPass)));
    registry.register("tonemap", Box::new(|| Box::new(tonemap::TonemapPass)));
    registry.register("light_shafts", Box::new(|| Box::new(light_shafts::LightShaftsPass)));
    registry.register("motion_blur", Box::new(|| Box::new(motion_blur::MotionBlurPass)));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_builtin_id_has_a_unique_factory() {
        let registry = PassFactoryRegistry::with_builtins();
        for id in BUILTIN_PASS_IDS {
            assert!(registry.is_registered(id));
        }
        assert_eq!(BUILTIN_PASS_IDS.len(), 14);
    }
}
