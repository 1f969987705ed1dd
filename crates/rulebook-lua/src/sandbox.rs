//! Capability sandbox for tenant scripts.
//!
//! # Security Model
//!
//! One fresh VM per invocation, never reused across calls or concurrent
//! invocations — isolation over performance. A deny-list is applied at
//! construction time, before any tenant code runs: every global that could
//! perform I/O, process control, filesystem access, introspection, or
//! indirect code loading is set to `nil`. Safe libraries (`math`, `string`,
//! `table`) and the core language functions remain.
//!
//! The deny-list is construction-time, not per-call: any capability added
//! to the guest runtime in a future Lua version must be re-audited against
//! [`DENIED_GLOBALS`].

use crate::error::EngineError;
use mlua::{Lua, Value};

/// Globals removed from every sandboxed VM before tenant code runs.
///
/// Covers filesystem and process access (`io`, `os`), module loading
/// (`require`, `package`, `dofile`, `loadfile`), dynamic code loading
/// (`load`, `loadstring`), introspection (`debug`), and coroutines.
pub const DENIED_GLOBALS: &[&str] = &[
    "io",
    "os",
    "require",
    "package",
    "dofile",
    "loadfile",
    "load",
    "loadstring",
    "debug",
    "coroutine",
];

/// Creates a fresh sandboxed VM for one invocation.
///
/// # Errors
///
/// Returns an error if stripping a global fails.
pub fn new_sandboxed_lua() -> Result<Lua, EngineError> {
    let lua = Lua::new();
    let globals = lua.globals();
    for name in DENIED_GLOBALS {
        globals.set(*name, Value::Nil)?;
    }
    Ok(lua)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn type_of(lua: &Lua, expr: &str) -> String {
        lua.load(format!("return type({expr})"))
            .eval()
            .expect("eval type()")
    }

    #[test]
    fn denied_globals_are_nil() {
        let lua = new_sandboxed_lua().expect("sandbox");
        for name in DENIED_GLOBALS {
            assert_eq!(type_of(&lua, name), "nil", "{name} should be stripped");
        }
    }

    #[test]
    fn safe_libraries_remain() {
        let lua = new_sandboxed_lua().expect("sandbox");
        for name in ["math", "string", "table"] {
            assert_eq!(type_of(&lua, name), "table", "{name} should remain");
        }
        for name in ["pairs", "ipairs", "tostring", "pcall", "error"] {
            assert_eq!(type_of(&lua, name), "function", "{name} should remain");
        }
    }

    #[test]
    fn file_access_fails_as_nil_call() {
        let lua = new_sandboxed_lua().expect("sandbox");
        let result = lua.load(r#"io.open("/etc/passwd")"#).exec();
        assert!(result.is_err(), "io should not be reachable");
    }

    #[test]
    fn process_control_fails_as_nil_call() {
        let lua = new_sandboxed_lua().expect("sandbox");
        let result = lua.load(r#"os.execute("echo pwned")"#).exec();
        assert!(result.is_err(), "os should not be reachable");
    }

    #[test]
    fn module_loading_fails_as_nil_call() {
        let lua = new_sandboxed_lua().expect("sandbox");
        let result = lua.load(r#"require("socket")"#).exec();
        assert!(result.is_err(), "require should not be reachable");
    }

    #[test]
    fn coroutines_unavailable() {
        let lua = new_sandboxed_lua().expect("sandbox");
        let result = lua
            .load(r#"coroutine.create(function() end)"#)
            .exec();
        assert!(result.is_err(), "coroutine should not be reachable");
    }

    #[test]
    fn each_vm_is_independent() {
        let a = new_sandboxed_lua().expect("sandbox a");
        let b = new_sandboxed_lua().expect("sandbox b");

        a.load("leaked = 42").exec().expect("set global in a");
        let seen: String = b.load("return type(leaked)").eval().expect("read in b");
        assert_eq!(seen, "nil", "globals must not leak between VMs");
    }
}
