//! Internal error type for engine plumbing.
//!
//! Failures that reach the caller are folded into
//! [`rulebook_types::RuleError`] by the dispatcher; this type only covers
//! the host-side setup steps before and between supervised phases.

use thiserror::Error;

/// Errors raised while preparing or supervising a hook invocation.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Guest interpreter error outside a supervised phase.
    #[error("lua error: {0}")]
    Lua(#[from] mlua::Error),

    /// A supervised worker ended without producing a result.
    #[error("script worker failed: {0}")]
    Worker(String),
}
