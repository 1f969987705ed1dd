//! Hook identifiers.

use serde::{Deserialize, Serialize};

/// Lifecycle point at which a project's rules script is consulted.
///
/// Each variant maps to one global function the script may define; a script
/// that does not define the function is a no-op for that hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookKind {
    /// Before an issue moves to a new state.
    BeforeStatusChange,
    /// After an issue moved to a new state.
    AfterStatusChange,
    /// Before the assignee set changes.
    BeforeAssigneesChange,
    /// Before the watcher set changes.
    BeforeWatchersChange,
    /// Before the label set changes.
    BeforeLabelsChange,
}

impl HookKind {
    /// Name of the global function looked up in the tenant script.
    #[must_use]
    pub fn function_name(self) -> &'static str {
        match self {
            Self::BeforeStatusChange => "before_status_change",
            Self::AfterStatusChange => "after_status_change",
            Self::BeforeAssigneesChange => "before_assignees_change",
            Self::BeforeWatchersChange => "before_watchers_change",
            Self::BeforeLabelsChange => "before_labels_change",
        }
    }
}

impl std::fmt::Display for HookKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.function_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn function_names_are_snake_case_globals() {
        assert_eq!(
            HookKind::BeforeStatusChange.function_name(),
            "before_status_change"
        );
        assert_eq!(
            HookKind::BeforeLabelsChange.function_name(),
            "before_labels_change"
        );
    }

    #[test]
    fn display_matches_function_name() {
        assert_eq!(
            HookKind::AfterStatusChange.to_string(),
            "after_status_change"
        );
    }
}
