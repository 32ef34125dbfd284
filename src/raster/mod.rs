//! Parallel CPU rasterizer and shader runtime (C5, spec §4.5).
//!
//! A shader program is a pair of data-only stage functions ([`shader`]); the
//! rasterizer ([`rasterizer`]) clips ([`clip`]), projects, and scans
//! triangles against them, sampling shadow maps ([`shadow`]) from inside
//! fragment shaders and selecting between the built-in material programs
//! ([`shaders`]).

pub mod clip;
pub mod rasterizer;
pub mod shader;
pub mod shadow;
pub mod shaders;

pub use rasterizer::{barycentric_2d, rasterize_mesh, RasterizerConfig, RasterizerCullMode, RasterizerStats, RasterizerTarget};
pub use shader::{FragmentIn, FragmentOut, ShaderProgram, ShaderUniforms, ShaderVertex, VaryingSemantic, VertexOut};
pub use shaders::{eval_fake_ibl, make_debug_view_shader_program, sample_texture2d_bilinear_repeat_linear, BlinnPhongShader, DebugViewMode, DebugViewShader, PbrMetallicRoughnessShader};
pub use shadow::{shadow_bias, shadow_fetch_depth_clamped, shadow_project_uvz, shadow_visibility_dir, ShadowParams};
