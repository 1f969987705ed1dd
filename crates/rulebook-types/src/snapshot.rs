//! Read-only domain snapshots handed into a hook invocation.
//!
//! Snapshots are built by the caller from its persistence layer and are
//! immutable for the duration of one invocation. The rules engine never
//! writes through them and never holds them beyond a single call.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The user performing (or affected by) the transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSnapshot {
    /// User ID.
    pub id: Uuid,
    /// Login email.
    pub email: String,
    /// Display username.
    pub username: String,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Account creation time.
    pub created_at: DateTime<Utc>,
}

/// A workflow state an issue can be in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateSnapshot {
    /// State ID.
    pub id: Uuid,
    /// Human-readable state name (e.g. "In Progress").
    pub name: String,
    /// State group ("backlog", "started", "completed", ...).
    pub group: String,
    /// Display color.
    pub color: String,
    /// Ordering weight within the group.
    pub sequence: f64,
}

/// A label attachable to issues.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelSnapshot {
    /// Label ID.
    pub id: Uuid,
    /// Label name.
    pub name: String,
    /// Display color.
    pub color: String,
}

/// The project owning the issue and, possibly, a rules script.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectSnapshot {
    /// Project ID.
    pub id: Uuid,
    /// Project name.
    pub name: String,
    /// Short identifier used in issue keys (e.g. "WEB").
    pub identifier: String,
    /// Tenant-authored rules script, if any.
    ///
    /// Absent or empty means every hook is a no-op for this project.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rules_script: Option<String>,
}

impl ProjectSnapshot {
    /// Returns the script text if one is configured and non-empty.
    #[must_use]
    pub fn script(&self) -> Option<&str> {
        self.rules_script.as_deref().filter(|s| !s.trim().is_empty())
    }
}

/// The workspace containing the project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceSnapshot {
    /// Workspace ID.
    pub id: Uuid,
    /// Workspace name.
    pub name: String,
    /// URL slug.
    pub slug: String,
}

/// The issue undergoing the transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueSnapshot {
    /// Issue ID.
    pub id: Uuid,
    /// Issue title.
    pub name: String,
    /// Plain-text description, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Priority label ("urgent", "high", ...), if set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    /// Per-project sequence number.
    pub sequence_id: i64,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
    /// Current workflow state.
    pub state: Option<StateSnapshot>,
    /// Owning project. Hooks are no-ops when absent.
    pub project: Option<ProjectSnapshot>,
    /// Containing workspace.
    pub workspace: Option<WorkspaceSnapshot>,
}
