//! Render-Path Composition & Executor (C7, spec §4.7).
//!
//! Recipes name an ordered pass list and the runtime defaults it expects;
//! [`plan::compile_plan`] resolves that list against a [`crate::pass::PassFactoryRegistry`]
//! and a backend's [`crate::backend::CapabilitySet`], validating the resulting
//! IO graph; [`executor::RenderPathExecutor`] owns recipes plus the currently
//! active compiled plan and drives it frame to frame.

pub mod executor;
pub mod plan;
pub mod recipe;

pub use executor::{FrameStats, RenderPathExecutor};
pub use plan::{compile_plan, CompiledPlan, ExecutionReport};
pub use recipe::{standard_recipes, CapabilityPredicate, Recipe, RecipePassEntry};
