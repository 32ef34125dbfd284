//! Error Types
//!
//! All public APIs return [`Result<T>`], an alias for `std::result::Result<T, RendererError>`.
//! Most of the failure taxonomy described in the pass/path contracts is represented as
//! `bool`/`Option` return values rather than errors (a pass skipping because a capability
//! is missing is not exceptional); `RendererError` covers the conditions that abort a
//! whole plan or frame.

use thiserror::Error;

/// The main error type for the renderer core.
#[derive(Error, Debug)]
pub enum RendererError {
    /// A recipe referenced a pass id with no registered factory.
    #[error("no pass factory registered for id `{0}`")]
    UnknownPassId(String),

    /// A recipe's capability predicate rejected the active backend.
    #[error("recipe `{0}` rejected by backend capability gate")]
    CapabilityMismatch(String),

    /// A recipe has no enabled passes.
    #[error("recipe `{0}` has an empty pass list")]
    EmptyRecipe(String),

    /// IO graph validation found a read with no prior write, and strict mode is active.
    #[error("pass `{pass}` reads `{resource}` before any earlier pass writes it")]
    ReadBeforeWrite { pass: String, resource: String },

    /// IO graph validation found a write aliasing an earlier write with no intervening
    /// read, and strict mode is active.
    #[error("pass `{pass}` writes `{resource}` aliasing an earlier unread write")]
    AliasedWrite { pass: String, resource: String },

    /// The backend reported a frame-level failure (e.g. out-of-memory, unmappable
    /// allocation); the executor aborts the current frame.
    #[error("backend frame failure: {0}")]
    BackendFailure(String),

    /// A render-path index passed to `apply_index` is out of range.
    #[error("render-path index {0} out of range")]
    InvalidPathIndex(usize),
}

/// Alias for `Result<T, RendererError>`.
pub type Result<T> = std::result::Result<T, RendererError>;
