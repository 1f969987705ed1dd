//! Lua-scripted project rules engine.
//!
//! Projects may carry a short tenant-authored Lua script that is consulted
//! around task-state transitions. The script defines one global function
//! per lifecycle hook; each function receives read-only records of the
//! surrounding domain objects and returns a table deciding whether the
//! transition may proceed.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                RulesEngine (Rust)                    │
//! │  per invocation:                                     │
//! │  ┌────────────────────────────────────────────────┐  │
//! │  │  fresh sandboxed Lua VM  +  LogSink            │  │
//! │  │  phase 1: load script body   (own deadline)    │  │
//! │  │  phase 2: call hook function (own deadline)    │  │
//! │  └────────────────────────────────────────────────┘  │
//! │                        │                             │
//! │                        ▼                             │
//! │  ┌────────────────────────────────────────────────┐  │
//! │  │          Tenant script (.lua)                  │  │
//! │  │  function before_status_change(ctx)            │  │
//! │  │      if ctx.new_state.group == "completed"     │  │
//! │  │         and not ctx.compare_user_email(        │  │
//! │  │                 "lead@example.com") then       │  │
//! │  │          return { status = false,              │  │
//! │  │                   error = "only the lead" }    │  │
//! │  │      end                                       │  │
//! │  │      return { status = true }                  │  │
//! │  │  end                                           │  │
//! │  └────────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! # Hook protocol
//!
//! | Script return | Outcome |
//! |---------------|---------|
//! | `{ status = true }` | allowed |
//! | `{ status = false }` | rejected, generic reason |
//! | `{ status = false, error = "why" }` | rejected, reason shown verbatim |
//! | anything else | protocol error |
//!
//! Scripts run in a capability sandbox with no filesystem, network,
//! process, module-loading, or introspection access, and each supervised
//! phase is bounded by a wall-clock deadline (10s by default). `print` is
//! redirected into per-call [`rulebook_types::LogMessage`]s.

mod dispatch;
mod error;
mod logger;
pub mod marshal;
mod sandbox;
mod supervisor;

pub use dispatch::{HookReport, RulesEngine, DEFAULT_DEADLINE};
pub use error::EngineError;
pub use logger::LogSink;
pub use sandbox::{new_sandboxed_lua, DENIED_GLOBALS};
