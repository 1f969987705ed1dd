//! Message logger shim.
//!
//! Tenant scripts have no stdout. The global `print` is replaced with a
//! closure that joins its arguments with a single space, stamps the current
//! wall-clock time, and appends to a host-side sink. The sink is write-only
//! from the guest's perspective: no collection table exists inside the VM,
//! so a script can neither inspect nor clear what it has logged.
//!
//! One sink per invocation, created alongside the VM and drained by the
//! dispatcher on every exit path. Because the sink lives on the host side
//! of an `Arc`, messages captured before a deadline overrun survive the
//! abandoned VM.

use chrono::{DateTime, Utc};
use mlua::{Lua, Value};
use parking_lot::Mutex;
use rulebook_types::{HookKind, LogMessage};
use std::sync::Arc;

/// Per-invocation collector for script `print` output.
#[derive(Debug, Clone, Default)]
pub struct LogSink {
    entries: Arc<Mutex<Vec<(String, DateTime<Utc>)>>>,
}

impl LogSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the VM's global `print` with a writer into this sink.
    ///
    /// An empty argument list produces an empty message rather than an
    /// error.
    ///
    /// # Errors
    ///
    /// Returns an error if the replacement function cannot be installed.
    pub fn register(&self, lua: &Lua) -> Result<(), mlua::Error> {
        let entries = Arc::clone(&self.entries);
        let print_fn = lua.create_function(move |_, args: mlua::MultiValue| {
            let parts: Vec<String> = args.iter().map(display_value).collect();
            entries.lock().push((parts.join(" "), Utc::now()));
            Ok(())
        })?;
        lua.globals().set("print", print_fn)
    }

    /// Takes all captured messages, tagged with the hook that produced them.
    #[must_use]
    pub fn drain(&self, hook: HookKind) -> Vec<LogMessage> {
        std::mem::take(&mut *self.entries.lock())
            .into_iter()
            .map(|(text, at)| LogMessage { text, at, hook })
            .collect()
    }
}

/// Renders one `print` argument the way the guest would display it.
fn display_value(value: &Value) -> String {
    match value {
        Value::Nil => "nil".to_string(),
        Value::Boolean(b) => b.to_string(),
        Value::Integer(i) => i.to_string(),
        Value::Number(n) => format!("{n}"),
        Value::String(s) => s
            .to_str()
            .map_or_else(|_| "<invalid utf8>".into(), |s| s.to_string()),
        Value::Table(_) => format!("table: {:?}", value.to_pointer()),
        Value::Function(_) => format!("function: {:?}", value.to_pointer()),
        _ => format!("{value:?}"),
    }
}
