//! Shared types for the project rules engine.
//!
//! A project may carry a short tenant-authored Lua script that is consulted
//! before (and, for status changes, after) task-state transitions. This crate
//! holds everything both sides of that boundary agree on:
//!
//! - read-only domain snapshots handed into a hook invocation
//!   ([`UserSnapshot`], [`IssueSnapshot`], ...)
//! - the hook identifiers ([`HookKind`])
//! - the structured outcome of one invocation ([`Verdict`], [`LogMessage`])
//! - the error taxonomy ([`RuleError`], [`ClientError`])
//!
//! The interpreter-facing half lives in `rulebook-lua`; this crate has no
//! scripting dependency and can be used by persistence and API layers alike.

mod error;
mod hook;
mod snapshot;
mod verdict;

pub use error::{
    ClientError, RuleError, RuleErrorKind, ScriptDetail, GENERIC_REJECTION, TIMEOUT_MESSAGE,
};
pub use hook::HookKind;
pub use snapshot::{
    IssueSnapshot, LabelSnapshot, ProjectSnapshot, StateSnapshot, UserSnapshot, WorkspaceSnapshot,
};
pub use verdict::{DebugInfo, LogMessage, Verdict};
