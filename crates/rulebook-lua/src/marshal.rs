//! Domain snapshot → guest table projection.
//!
//! Every snapshot type gets an explicit, hand-written projection keyed by
//! its field serialization names. The value domain is deliberately small:
//! signed integers, floats, strings, and timestamps converted to Unix
//! seconds. Anything else (nested structs, absent options, lists) is
//! silently skipped — the projected tables are advisory data for scripts,
//! not an authoritative transfer format, so lossy is acceptable where an
//! opaque crash is not.
//!
//! Nested objects the scripts do need (state, project, workspace) are
//! passed as separately built records by the dispatcher rather than
//! recursed into here.

use mlua::{Lua, Table, Value};
use rulebook_types::{
    IssueSnapshot, LabelSnapshot, ProjectSnapshot, StateSnapshot, UserSnapshot, WorkspaceSnapshot,
};

/// A snapshot that can be projected into a guest table.
pub trait LuaRecord {
    /// Builds the guest-side record for this snapshot.
    ///
    /// Pure and side-effect-free; never calls back into caller state.
    ///
    /// # Errors
    ///
    /// Returns an error only if table allocation in the VM fails.
    fn to_record(&self, lua: &Lua) -> Result<Table, mlua::Error>;
}

/// Projects an optional snapshot, mapping `None` to `nil`.
///
/// # Errors
///
/// Returns an error only if table allocation in the VM fails.
pub fn optional_record<T: LuaRecord>(lua: &Lua, value: Option<&T>) -> Result<Value, mlua::Error> {
    match value {
        Some(v) => Ok(Value::Table(v.to_record(lua)?)),
        None => Ok(Value::Nil),
    }
}

/// Projects a slice into a 1-based array of records with a
/// `contains(field, value)` helper.
///
/// The helper compares the given field of each entry against a string,
/// so scripts can ask "is anyone with this email in the new assignee set"
/// without walking the structure themselves. Integer fields compare by
/// their decimal rendering.
///
/// # Errors
///
/// Returns an error only if table or function allocation in the VM fails.
pub fn list_record<T: LuaRecord>(lua: &Lua, items: &[T]) -> Result<Table, mlua::Error> {
    let list = lua.create_table()?;
    for (i, item) in items.iter().enumerate() {
        list.set(i + 1, item.to_record(lua)?)?;
    }

    let entries = list.clone();
    let contains = lua.create_function(move |_, (field, wanted): (String, String)| {
        for entry in entries.clone().sequence_values::<Table>() {
            let entry = entry?;
            let value: Value = entry.get(field.as_str())?;
            let found = match value {
                Value::String(s) => s.to_str().map(|s| *s == *wanted).unwrap_or(false),
                Value::Integer(i) => i.to_string() == wanted,
                Value::Number(n) => n.to_string() == wanted,
                _ => false,
            };
            if found {
                return Ok(true);
            }
        }
        Ok(false)
    })?;
    list.set("contains", contains)?;

    Ok(list)
}

impl LuaRecord for UserSnapshot {
    fn to_record(&self, lua: &Lua) -> Result<Table, mlua::Error> {
        let t = lua.create_table()?;
        t.set("id", self.id.to_string())?;
        t.set("email", self.email.as_str())?;
        t.set("username", self.username.as_str())?;
        t.set("first_name", self.first_name.as_str())?;
        t.set("last_name", self.last_name.as_str())?;
        t.set("created_at", self.created_at.timestamp())?;
        Ok(t)
    }
}

impl LuaRecord for StateSnapshot {
    fn to_record(&self, lua: &Lua) -> Result<Table, mlua::Error> {
        let t = lua.create_table()?;
        t.set("id", self.id.to_string())?;
        t.set("name", self.name.as_str())?;
        t.set("group", self.group.as_str())?;
        t.set("color", self.color.as_str())?;
        t.set("sequence", self.sequence)?;
        Ok(t)
    }
}

impl LuaRecord for LabelSnapshot {
    fn to_record(&self, lua: &Lua) -> Result<Table, mlua::Error> {
        let t = lua.create_table()?;
        t.set("id", self.id.to_string())?;
        t.set("name", self.name.as_str())?;
        t.set("color", self.color.as_str())?;
        Ok(t)
    }
}

impl LuaRecord for ProjectSnapshot {
    fn to_record(&self, lua: &Lua) -> Result<Table, mlua::Error> {
        let t = lua.create_table()?;
        t.set("id", self.id.to_string())?;
        t.set("name", self.name.as_str())?;
        t.set("identifier", self.identifier.as_str())?;
        // The script text itself is not advisory data; scripts never see it.
        Ok(t)
    }
}

impl LuaRecord for WorkspaceSnapshot {
    fn to_record(&self, lua: &Lua) -> Result<Table, mlua::Error> {
        let t = lua.create_table()?;
        t.set("id", self.id.to_string())?;
        t.set("name", self.name.as_str())?;
        t.set("slug", self.slug.as_str())?;
        Ok(t)
    }
}

impl LuaRecord for IssueSnapshot {
    fn to_record(&self, lua: &Lua) -> Result<Table, mlua::Error> {
        let t = lua.create_table()?;
        t.set("id", self.id.to_string())?;
        t.set("name", self.name.as_str())?;
        if let Some(description) = &self.description {
            t.set("description", description.as_str())?;
        }
        if let Some(priority) = &self.priority {
            t.set("priority", priority.as_str())?;
        }
        t.set("sequence_id", self.sequence_id)?;
        t.set("created_at", self.created_at.timestamp())?;
        t.set("updated_at", self.updated_at.timestamp())?;
        // state / project / workspace are built as separate records by the
        // dispatcher; no deep recursion here.
        Ok(t)
    }
}
