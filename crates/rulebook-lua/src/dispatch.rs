//! Event dispatcher: one entry point per lifecycle hook.
//!
//! Each hook invocation walks the same state machine:
//!
//! ```text
//! Init → SandboxReady → ScriptLoaded → HookInvoked
//!      → { Success | BusinessRejected | ScriptError | Timeout }
//! ```
//!
//! Every terminal state emits exactly one verdict and zero-or-one error
//! (success emits none), and always returns whatever the script printed
//! before it got there. Projects without a script short-circuit before a
//! VM is even created.

use crate::error::EngineError;
use crate::logger::LogSink;
use crate::marshal::{list_record, optional_record, LuaRecord};
use crate::sandbox::new_sandboxed_lua;
use crate::supervisor::{is_deadline_error, run_phase, Supervised};
use mlua::{Function, Lua, Table, Value};
use rulebook_types::{
    DebugInfo, HookKind, IssueSnapshot, LabelSnapshot, LogMessage, RuleError, RuleErrorKind,
    ScriptDetail, StateSnapshot, UserSnapshot, Verdict,
};
use std::time::Duration;

/// Wall-clock budget each supervised phase gets by default.
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(10);

/// Result of one hook invocation.
///
/// `verdict` is `None` only on the not-applicable fast path (no project or
/// no script): nothing ran, nothing was decided, and the caller should
/// treat the transition as implicitly allowed. Every path that actually
/// consulted the script produces a verdict.
#[derive(Debug)]
pub struct HookReport {
    /// The computed verdict, absent when no script applies.
    pub verdict: Option<Verdict>,
    /// Everything the script printed during this call, in order.
    pub messages: Vec<LogMessage>,
    /// The failure or rejection, when one occurred.
    pub error: Option<RuleError>,
}

impl HookReport {
    fn not_applicable() -> Self {
        Self {
            verdict: None,
            messages: Vec::new(),
            error: None,
        }
    }

    /// Whether a script was actually consulted.
    #[must_use]
    pub fn applies(&self) -> bool {
        self.verdict.is_some()
    }

    /// The client-visible allow flag; implicit allow when not applicable.
    #[must_use]
    pub fn client_allowed(&self) -> bool {
        self.verdict.as_ref().map_or(true, |v| v.client_allowed)
    }
}

/// Event-specific payload handed to the hook as its second concern.
enum EventPayload {
    /// The state the issue is moving to (status hooks).
    NewState(StateSnapshot),
    /// The prospective assignee or watcher set (list hooks).
    Users(Vec<UserSnapshot>),
    /// The prospective label set.
    Labels(Vec<LabelSnapshot>),
}

/// Normalized return value of the hook function, computed on the worker.
enum CallOutcome {
    /// The return value was a table with a boolean `status`.
    Decision {
        status: bool,
        veto: Option<String>,
    },
    /// The return value was not a table at all.
    NotATable(&'static str),
    /// The table had no `status` key.
    MissingStatus,
    /// `status` was present but not a boolean.
    StatusNotBool(&'static str),
}

/// Executes project rules scripts against task-state transitions.
///
/// Stateless and cheap to share: every invocation builds its own VM and
/// log sink, so concurrent calls — including for the same project — never
/// observe each other.
#[derive(Debug, Clone)]
pub struct RulesEngine {
    deadline: Duration,
}

impl Default for RulesEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl RulesEngine {
    /// Engine with the default per-phase deadline.
    #[must_use]
    pub fn new() -> Self {
        Self {
            deadline: DEFAULT_DEADLINE,
        }
    }

    /// Engine with a custom per-phase deadline.
    ///
    /// Each supervised phase (script load, hook call) gets its own full
    /// window of this duration.
    #[must_use]
    pub fn with_deadline(deadline: Duration) -> Self {
        Self { deadline }
    }

    /// Consults the script before an issue moves to `new_state`.
    pub async fn before_status_change(
        &self,
        issuer: &UserSnapshot,
        issue: &IssueSnapshot,
        new_state: &StateSnapshot,
    ) -> HookReport {
        self.run_hook(
            HookKind::BeforeStatusChange,
            issuer,
            issue,
            EventPayload::NewState(new_state.clone()),
        )
        .await
    }

    /// Consults the script after an issue moved to `new_state`.
    pub async fn after_status_change(
        &self,
        issuer: &UserSnapshot,
        issue: &IssueSnapshot,
        new_state: &StateSnapshot,
    ) -> HookReport {
        self.run_hook(
            HookKind::AfterStatusChange,
            issuer,
            issue,
            EventPayload::NewState(new_state.clone()),
        )
        .await
    }

    /// Consults the script before the assignee set becomes `assignees`.
    pub async fn before_assignees_change(
        &self,
        issuer: &UserSnapshot,
        issue: &IssueSnapshot,
        assignees: &[UserSnapshot],
    ) -> HookReport {
        self.run_hook(
            HookKind::BeforeAssigneesChange,
            issuer,
            issue,
            EventPayload::Users(assignees.to_vec()),
        )
        .await
    }

    /// Consults the script before the watcher set becomes `watchers`.
    pub async fn before_watchers_change(
        &self,
        issuer: &UserSnapshot,
        issue: &IssueSnapshot,
        watchers: &[UserSnapshot],
    ) -> HookReport {
        self.run_hook(
            HookKind::BeforeWatchersChange,
            issuer,
            issue,
            EventPayload::Users(watchers.to_vec()),
        )
        .await
    }

    /// Consults the script before the label set becomes `labels`.
    pub async fn before_labels_change(
        &self,
        issuer: &UserSnapshot,
        issue: &IssueSnapshot,
        labels: &[LabelSnapshot],
    ) -> HookReport {
        self.run_hook(
            HookKind::BeforeLabelsChange,
            issuer,
            issue,
            EventPayload::Labels(labels.to_vec()),
        )
        .await
    }

    async fn run_hook(
        &self,
        hook: HookKind,
        issuer: &UserSnapshot,
        issue: &IssueSnapshot,
        payload: EventPayload,
    ) -> HookReport {
        let Some(project) = &issue.project else {
            return HookReport::not_applicable();
        };
        let Some(script) = project.script() else {
            return HookReport::not_applicable();
        };

        let debug = DebugInfo::capture(hook, project, issuer);
        tracing::debug!(hook = %hook, project = %project.id, issue = %issue.id, "running project rules hook");

        let sink = LogSink::new();
        let lua = match setup_vm(&sink) {
            Ok(lua) => lua,
            Err(e) => {
                tracing::error!(hook = %hook, project = %project.id, "sandbox setup failed: {e}");
                return infra_failure(debug, &sink, "sandbox setup failed", e.to_string());
            }
        };

        // Phase 1: execute the script's top-level body.
        let script_text = script.to_string();
        let chunk_name = format!("{}:{hook}", project.identifier);
        let loaded = run_phase(lua, self.deadline, move |lua| {
            lua.load(&script_text).set_name(chunk_name).exec()
        })
        .await;

        let lua = match loaded {
            Supervised::Done { lua, result: Ok(()) } => lua,
            Supervised::Done {
                result: Err(e), ..
            } => {
                return script_failure(hook, debug, &sink, LoadPhase::Load, &e);
            }
            Supervised::TimedOut => {
                let project_id = debug.project_id;
                tracing::warn!(hook = %hook, project = %project_id, "script load timed out");
                return timeout_report(debug, &sink);
            }
            Supervised::Failed(reason) => {
                tracing::error!(hook = %hook, "script load worker failed: {reason}");
                return infra_failure(debug, &sink, "script worker failed", reason);
            }
        };

        // The hook is optional: a script that never defines the function is
        // a no-op for this lifecycle point.
        let defines_hook = matches!(
            lua.globals().get::<Value>(hook.function_name()),
            Ok(Value::Function(_))
        );
        if !defines_hook {
            return HookReport {
                verdict: Some(Verdict::new(true, false, debug)),
                messages: sink.drain(hook),
                error: None,
            };
        }

        // Phase 2: invoke the hook function, with its own full deadline.
        let issuer_owned = issuer.clone();
        let issue_owned = issue.clone();
        let called = run_phase(lua, self.deadline, move |lua| {
            call_hook(lua, hook, &issuer_owned, &issue_owned, &payload)
        })
        .await;

        match called {
            Supervised::Done {
                result: Ok(outcome),
                ..
            } => decide(hook, debug, &sink, outcome),
            Supervised::Done {
                result: Err(e), ..
            } => script_failure(hook, debug, &sink, LoadPhase::Call, &e),
            Supervised::TimedOut => {
                let project_id = debug.project_id;
                tracing::warn!(hook = %hook, project = %project_id, "hook call timed out");
                timeout_report(debug, &sink)
            }
            Supervised::Failed(reason) => {
                tracing::error!(hook = %hook, "hook call worker failed: {reason}");
                infra_failure(debug, &sink, "script worker failed", reason)
            }
        }
    }
}

/// Creates the sandboxed VM with the logger shim installed.
fn setup_vm(sink: &LogSink) -> Result<Lua, EngineError> {
    let lua = new_sandboxed_lua()?;
    sink.register(&lua)?;
    Ok(lua)
}

/// Builds the call-parameter record shared by every hook.
fn build_params(
    lua: &Lua,
    issuer: &UserSnapshot,
    issue: &IssueSnapshot,
    new_state: Option<&StateSnapshot>,
) -> Result<Table, mlua::Error> {
    let params = lua.create_table()?;
    params.set("issuer", issuer.to_record(lua)?)?;
    params.set("issue", issue.to_record(lua)?)?;
    params.set("state", optional_record(lua, issue.state.as_ref())?)?;
    params.set("project", optional_record(lua, issue.project.as_ref())?)?;
    params.set("workspace", optional_record(lua, issue.workspace.as_ref())?)?;
    if let Some(state) = new_state {
        params.set("new_state", state.to_record(lua)?)?;
    }

    // Comparator helpers: compare a field against a string without
    // exposing deep structure.
    let email = issuer.email.clone();
    params.set(
        "compare_user_email",
        lua.create_function(move |_, other: String| Ok(email == other))?,
    )?;
    let state_name = issue.state.as_ref().map(|s| s.name.clone());
    params.set(
        "compare_status_name",
        lua.create_function(move |_, other: String| {
            Ok(state_name.as_deref() == Some(other.as_str()))
        })?,
    )?;

    Ok(params)
}

/// Invokes the hook function and normalizes its return value.
fn call_hook(
    lua: &Lua,
    hook: HookKind,
    issuer: &UserSnapshot,
    issue: &IssueSnapshot,
    payload: &EventPayload,
) -> Result<CallOutcome, mlua::Error> {
    let func: Function = lua.globals().get(hook.function_name())?;

    let value: Value = match payload {
        EventPayload::NewState(state) => {
            let params = build_params(lua, issuer, issue, Some(state))?;
            func.call(params)?
        }
        EventPayload::Users(users) => {
            let params = build_params(lua, issuer, issue, None)?;
            let list = list_record(lua, users)?;
            func.call((params, list))?
        }
        EventPayload::Labels(labels) => {
            let params = build_params(lua, issuer, issue, None)?;
            let list = list_record(lua, labels)?;
            func.call((params, list))?
        }
    };

    let Value::Table(result) = value else {
        return Ok(CallOutcome::NotATable(value.type_name()));
    };

    let status: Value = result.get("status")?;
    let status = match status {
        Value::Boolean(b) => b,
        Value::Nil => return Ok(CallOutcome::MissingStatus),
        other => return Ok(CallOutcome::StatusNotBool(other.type_name())),
    };

    let veto: Option<String> = match result.get::<Value>("error")? {
        Value::String(s) => Some(s.to_str()?.to_string()),
        _ => None,
    };

    Ok(CallOutcome::Decision { status, veto })
}

/// Maps a normalized hook return into the final report.
fn decide(hook: HookKind, debug: DebugInfo, sink: &LogSink, outcome: CallOutcome) -> HookReport {
    let (verdict, error) = match outcome {
        // An explicit reason always wins, whatever `status` said.
        CallOutcome::Decision { veto: Some(reason), .. } => (
            Verdict::new(false, true, debug.clone()),
            Some(RuleError::rejection(Some(reason), debug)),
        ),
        CallOutcome::Decision { status: true, .. } => {
            (Verdict::new(true, true, debug), None)
        }
        CallOutcome::Decision { status: false, .. } => (
            Verdict::new(false, true, debug.clone()),
            Some(RuleError::rejection(None, debug)),
        ),
        CallOutcome::NotATable(type_name) => {
            protocol_violation(debug, format!("hook returned {type_name} instead of a table"))
        }
        CallOutcome::MissingStatus => {
            protocol_violation(debug, "result table has no 'status' key".to_string())
        }
        CallOutcome::StatusNotBool(type_name) => protocol_violation(
            debug,
            format!("'status' is {type_name}, expected boolean"),
        ),
    };

    HookReport {
        verdict: Some(verdict),
        messages: sink.drain(hook),
        error,
    }
}

fn protocol_violation(debug: DebugInfo, summary: String) -> (Verdict, Option<RuleError>) {
    (
        Verdict::new(false, false, debug.clone()),
        Some(RuleError::new(
            RuleErrorKind::Protocol,
            "script returned an invalid result",
            Some(ScriptDetail {
                summary,
                guest_text: None,
            }),
            debug,
        )),
    )
}

#[derive(Clone, Copy)]
enum LoadPhase {
    Load,
    Call,
}

/// Classifies a guest error from either supervised phase.
fn script_failure(
    hook: HookKind,
    debug: DebugInfo,
    sink: &LogSink,
    phase: LoadPhase,
    err: &mlua::Error,
) -> HookReport {
    if is_deadline_error(err) {
        // The in-VM deadline hook fired before the outer timer.
        return timeout_report(debug, sink);
    }

    let (kind, message, summary) = match (phase, err) {
        (LoadPhase::Load, mlua::Error::SyntaxError { .. }) => (
            RuleErrorKind::Parse,
            "failed to parse project rules script",
            "syntax error",
        ),
        (LoadPhase::Load, _) => (
            RuleErrorKind::Runtime,
            "project rules script failed",
            "error while executing script body",
        ),
        (LoadPhase::Call, _) => (
            RuleErrorKind::Runtime,
            "project rules script failed",
            "error inside hook function",
        ),
    };

    let project_id = debug.project_id;
    tracing::warn!(hook = %hook, project = %project_id, "script failure: {err}");

    HookReport {
        verdict: Some(Verdict::new(true, false, debug.clone())),
        messages: sink.drain(hook),
        error: Some(RuleError::new(
            kind,
            message,
            Some(ScriptDetail {
                summary: summary.to_string(),
                guest_text: Some(err.to_string()),
            }),
            debug,
        )),
    }
}

fn timeout_report(debug: DebugInfo, sink: &LogSink) -> HookReport {
    let hook = debug.hook;
    HookReport {
        verdict: Some(Verdict::new(true, false, debug.clone())),
        messages: sink.drain(hook),
        error: Some(RuleError::timeout(debug)),
    }
}

fn infra_failure(debug: DebugInfo, sink: &LogSink, summary: &str, detail: String) -> HookReport {
    let hook = debug.hook;
    HookReport {
        verdict: Some(Verdict::new(true, false, debug.clone())),
        messages: sink.drain(hook),
        error: Some(RuleError::new(
            RuleErrorKind::Runtime,
            "project rules script failed",
            Some(ScriptDetail {
                summary: summary.to_string(),
                guest_text: Some(detail),
            }),
            debug,
        )),
    }
}
