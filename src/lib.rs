#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_arguments)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::too_many_lines)]

//! A pluggable render-path 3D renderer core: culling, light binning, a
//! parallel CPU rasterizer, and a backend-agnostic pass framework composed
//! into render paths by [`path::RenderPathExecutor`].
//!
//! # Layout
//!
//! - [`geometry`] — AABBs, planes, frusta, convex cells, shape volumes.
//! - [`registry`] — mesh/material/texture and render-target handles.
//! - [`scene`] — the scene data model and the transform/logic/render system
//!   processors around it.
//! - [`culling`] — frustum + occlusion visibility with hysteresis.
//! - [`lighting`] — tiled/clustered light binning.
//! - [`raster`] — the software rasterizer and shader runtime.
//! - [`pass`] — the pass trait, contract/IO types, and built-in passes.
//! - [`path`] — recipes, plan compilation, and the executor.
//! - [`backend`], [`frame`], [`context`], [`job`] — the supporting contract
//!   every component above is written against.

pub mod backend;
pub mod context;
pub mod culling;
pub mod errors;
pub mod frame;
pub mod geometry;
pub mod job;
pub mod lighting;
pub mod pass;
pub mod path;
pub mod raster;
pub mod registry;
pub mod scene;
pub mod utils;

pub use backend::{Backend, BackendKind, CapabilitySet, SoftwareBackend};
pub use context::Context;
pub use errors::{RendererError, Result};
pub use frame::{FrameInfo, FrameParams, FrameTechnique, TechniqueMode};
pub use job::{InlineJobSystem, JobSystem, ThreadPoolJobSystem, WaitGroup};
pub use path::{RenderPathExecutor, Recipe};
pub use registry::{ResourceRegistry, RtRegistry};
pub use scene::Scene;
