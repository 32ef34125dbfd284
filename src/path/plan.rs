//! Plan compilation (spec §4.7 steps 2–4): pass construction, IO graph
//! validation, and the fingerprint exposed as `execution_report.valid`.

use rustc_hash::FxHashMap;
use xxhash_rust::xxh3::Xxh3;

use crate::backend::CapabilitySet;
use crate::errors::RendererError;
use crate::pass::{IRenderPass, PassFactoryRegistry, ResourceKind};
use crate::path::recipe::Recipe;

/// Outcome of compiling one recipe into a plan: everything an application
/// or test can inspect without re-running the pipeline.
#[derive(Debug, Clone, Default)]
pub struct ExecutionReport {
    pub recipe_name: String,
    /// Pass ids that ended up in the compiled, executable plan, in order.
    pub pass_ids: Vec<String>,
    /// Pass ids the recipe named with no registered factory, or whose
    /// `supports_backend` rejected the active backend.
    pub missing_passes: Vec<String>,
    pub io_warnings: Vec<String>,
    /// Populated only in strict mode, where a warning is promoted to an
    /// error (spec §7 "IO graph inconsistency").
    pub io_errors: Vec<String>,
    pub valid: bool,
    /// Hash of the ordered pass ids plus each pass's contract shape (spec
    /// §4.7 step 4, invariant 4 "plan determinism"): identical
    /// `(recipe, capability set)` always fingerprints identically.
    pub fingerprint: u64,
}

/// A compiled, executable plan: live pass instances plus the report that
/// decided whether they may run.
pub struct CompiledPlan {
    pub passes: Vec<Box<dyn IRenderPass>>,
    pub report: ExecutionReport,
    pub ldr_target_name: String,
}

#[derive(Default, Clone, Copy)]
struct ResourceState {
    written: bool,
    read_since_write: bool,
}

/// Compiles `recipe` against `capabilities` using `factories` to resolve
/// pass ids. Never panics: every failure mode becomes an entry in the
/// returned report instead.
#[must_use]
pub fn compile_plan(recipe: &Recipe, capabilities: &CapabilitySet, factories: &PassFactoryRegistry) -> CompiledPlan {
    let mut passes: Vec<Box<dyn IRenderPass>> = Vec::new();
    let mut pass_ids = Vec::new();
    let mut missing_passes = Vec::new();

    for entry in &recipe.passes {
        if !entry.enabled {
            continue;
        }
        let Some(pass) = factories.create(&entry.pass_id) else {
            missing_passes.push(entry.pass_id.clone());
            continue;
        };
        if !pass.supports_backend(capabilities.kind) {
            missing_passes.push(entry.pass_id.clone());
            continue;
        }
        pass_ids.push(entry.pass_id.clone());
        passes.push(pass);
    }

    let (io_warnings, io_errors) = validate_io_graph(&pass_ids, &passes, recipe.strict_validation);

    let fingerprint = fingerprint_plan(&pass_ids, &passes);

    let valid = if recipe.strict_validation { missing_passes.is_empty() && io_errors.is_empty() } else { !pass_ids.is_empty() };

    CompiledPlan {
        passes,
        report: ExecutionReport { recipe_name: recipe.name.clone(), pass_ids, missing_passes, io_warnings, io_errors, valid, fingerprint },
        ldr_target_name: recipe.ldr_target_name.clone(),
    }
}

/// Walks passes in order tracking which resources have been written.
/// Returns `(warnings, errors)` — errors are populated only when `strict`.
fn validate_io_graph(pass_ids: &[String], passes: &[Box<dyn IRenderPass>], strict: bool) -> (Vec<String>, Vec<String>) {
    let mut warnings = Vec::new();
    let mut errors = Vec::new();
    let mut resources: FxHashMap<String, ResourceState> = FxHashMap::default();

    for (pass_id, pass) in pass_ids.iter().zip(passes.iter()) {
        let io = pass.describe_io();

        for read in &io.reads {
            let state = resources.entry(read.name.to_string()).or_default();
            if !state.written {
                let message = format!("pass `{pass_id}` reads `{}` before any earlier pass writes it", read.name);
                warnings.push(message.clone());
                if strict {
                    errors.push(message);
                }
            } else {
                state.read_since_write = true;
            }
        }

        for write in &io.writes {
            let state = resources.entry(write.name.to_string()).or_default();
            if state.written && !state.read_since_write {
                let message = format!("pass `{pass_id}` writes `{}` aliasing an earlier unread write", write.name);
                warnings.push(message.clone());
                if strict {
                    errors.push(message);
                }
            }
            state.written = true;
            state.read_since_write = false;
        }
    }

    (warnings, errors)
}

/// Hashes the ordered pass ids plus each pass's contract shape (role,
/// supported-mode mask, dependency flags) so two compiles of the identical
/// recipe against the identical capability set always agree, independent of
/// any runtime state.
fn fingerprint_plan(pass_ids: &[String], passes: &[Box<dyn IRenderPass>]) -> u64 {
    let mut hasher = Xxh3::new();
    for (pass_id, pass) in pass_ids.iter().zip(passes.iter()) {
        hasher.update(pass_id.as_bytes());
        let contract = pass.describe_contract();
        hasher.update(&(contract.role as u32).to_le_bytes());
        hasher.update(&contract.supported_modes_mask.to_le_bytes());
        hasher.update(&[contract.requires_depth_prepass as u8, contract.requires_light_culling as u8, contract.prefer_async_compute as u8]);
        let io = pass.describe_io();
        for r in io.reads.iter().chain(io.writes.iter()) {
            hasher.update(r.name.as_bytes());
            hasher.update(&[resource_kind_tag(r.kind)]);
        }
    }
    hasher.digest()
}

fn resource_kind_tag(kind: ResourceKind) -> u8 {
    match kind {
        ResourceKind::ColorHdr => 0,
        ResourceKind::ColorLdr => 1,
        ResourceKind::ColorDepthMotion => 2,
        ResourceKind::ShadowDepth => 3,
        ResourceKind::Temp => 4,
    }
}

/// Converts a non-strict-mode compile failure's missing ids into a
/// `RendererError` for callers that want `?`-style propagation instead of
/// reading `report.missing_passes` themselves.
pub fn first_missing_pass_error(report: &ExecutionReport) -> Option<RendererError> {
    report.missing_passes.first().cloned().map(RendererError::UnknownPassId)
}
