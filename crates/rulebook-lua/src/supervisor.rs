//! Supervised execution of guest work with a wall-clock deadline.
//!
//! A phase (script-body execution, hook-function call) runs on a dedicated
//! blocking worker while the caller races the join handle against
//! `tokio::time::timeout`. Whichever resolves first wins; on timeout the
//! worker is abandoned and the VM reference dropped with it, so interpreter
//! state from an abandoned run is never referenced afterward.
//!
//! # Why Rust?
//!
//! Abandoning a worker does not stop it. An instruction-count hook
//! (`mlua::Lua::set_hook`) checks the same deadline from inside the VM and
//! raises [`rulebook_types::TIMEOUT_MESSAGE`] once it passes, so an
//! abandoned infinite loop terminates its thread instead of pinning a
//! blocking worker forever. Either detection path classifies as a timeout.

use mlua::{HookTriggers, Lua, VmState};
use rulebook_types::TIMEOUT_MESSAGE;
use std::time::{Duration, Instant};

/// Instruction granularity of the in-VM deadline check.
const DEADLINE_CHECK_INSTRUCTIONS: u32 = 10_000;

/// Outcome of one supervised phase.
pub(crate) enum Supervised<T> {
    /// The phase finished before the deadline; the VM comes back with it.
    Done {
        /// The VM, returned for the next phase.
        lua: Lua,
        /// The phase's own result.
        result: Result<T, mlua::Error>,
    },
    /// The deadline elapsed first; the worker and its VM were abandoned.
    TimedOut,
    /// The worker ended without a result (panic or runtime shutdown).
    Failed(String),
}

/// Runs `work` against the VM on a blocking worker, bounded by `deadline`.
///
/// Each call gets its own full deadline window.
pub(crate) async fn run_phase<T, F>(lua: Lua, deadline: Duration, work: F) -> Supervised<T>
where
    T: Send + 'static,
    F: FnOnce(&Lua) -> Result<T, mlua::Error> + Send + 'static,
{
    let handle = tokio::task::spawn_blocking(move || {
        let started = Instant::now();
        lua.set_hook(
            HookTriggers::new().every_nth_instruction(DEADLINE_CHECK_INSTRUCTIONS),
            move |_lua, _debug| {
                if started.elapsed() >= deadline {
                    Err(mlua::Error::RuntimeError(TIMEOUT_MESSAGE.to_string()))
                } else {
                    Ok(VmState::Continue)
                }
            },
        );
        let result = work(&lua);
        lua.remove_hook();
        (lua, result)
    });

    match tokio::time::timeout(deadline, handle).await {
        Ok(Ok((lua, result))) => Supervised::Done { lua, result },
        Ok(Err(join_err)) => Supervised::Failed(join_err.to_string()),
        Err(_elapsed) => Supervised::TimedOut,
    }
}

/// Whether a guest error came from the in-VM deadline hook.
pub(crate) fn is_deadline_error(err: &mlua::Error) -> bool {
    err.to_string().contains(TIMEOUT_MESSAGE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sandbox::new_sandboxed_lua;

    #[tokio::test]
    async fn fast_phase_completes_and_returns_the_vm() {
        let lua = new_sandboxed_lua().expect("sandbox");
        let outcome = run_phase(lua, Duration::from_secs(5), |lua| {
            lua.load("answer = 42").exec()
        })
        .await;

        match outcome {
            Supervised::Done { lua, result } => {
                result.expect("phase result");
                let answer: i64 = lua.load("return answer").eval().expect("answer");
                assert_eq!(answer, 42, "state must survive into the next phase");
            }
            _ => panic!("expected Done"),
        }
    }

    #[tokio::test]
    async fn infinite_loop_hits_the_deadline() {
        let lua = new_sandboxed_lua().expect("sandbox");
        let started = Instant::now();
        let outcome = run_phase(lua, Duration::from_millis(200), |lua| {
            lua.load("while true do end").exec()
        })
        .await;

        match outcome {
            Supervised::TimedOut => {}
            Supervised::Done { result, .. } => {
                // The in-VM hook may fire a hair before the outer timer.
                let err = result.expect_err("loop cannot succeed");
                assert!(is_deadline_error(&err), "got: {err}");
            }
            Supervised::Failed(e) => panic!("worker failed: {e}"),
        }
        assert!(
            started.elapsed() < Duration::from_secs(2),
            "deadline must bound wall-clock time"
        );
    }

    #[tokio::test]
    async fn phase_error_is_reported_not_swallowed() {
        let lua = new_sandboxed_lua().expect("sandbox");
        let outcome = run_phase(lua, Duration::from_secs(5), |lua| {
            lua.load(r#"error("boom")"#).exec()
        })
        .await;

        match outcome {
            Supervised::Done { result, .. } => {
                let err = result.expect_err("script error");
                assert!(err.to_string().contains("boom"));
                assert!(!is_deadline_error(&err));
            }
            _ => panic!("expected Done with error"),
        }
    }
}
