//! Structured outcomes of a hook invocation.

use crate::hook::HookKind;
use crate::snapshot::{ProjectSnapshot, UserSnapshot};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Server-side diagnostic context attached to every verdict and error.
///
/// Always populated, including on success, so audit trails can reconstruct
/// who triggered which hook on which project and when.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebugInfo {
    /// The hook that ran.
    pub hook: HookKind,
    /// Project whose script was consulted.
    pub project_id: Uuid,
    /// User who triggered the transition.
    pub issuer_id: Uuid,
    /// Email of the triggering user.
    pub issuer_email: String,
    /// When the invocation started.
    pub at: DateTime<Utc>,
}

impl DebugInfo {
    /// Captures context for one invocation, stamped with the current time.
    #[must_use]
    pub fn capture(hook: HookKind, project: &ProjectSnapshot, issuer: &UserSnapshot) -> Self {
        Self {
            hook,
            project_id: project.id,
            issuer_id: issuer.id,
            issuer_email: issuer.email.clone(),
            at: Utc::now(),
        }
    }
}

/// The allow/deny outcome of one hook invocation.
///
/// The two flags answer different questions:
///
/// - `client_allowed` — should the caller tell the end user the action was
///   permitted? Script and sandbox failures deliberately report `true` here
///   (fail-open for the outer action); only explicit rejections and protocol
///   violations report `false`.
/// - `flow_allowed` — did the script run to a successful completion? `false`
///   whenever the script did not fully decide the outcome itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Verdict {
    /// Client-visible allow flag.
    pub client_allowed: bool,
    /// Internal script-flow allow flag.
    pub flow_allowed: bool,
    /// Diagnostic context.
    pub debug: DebugInfo,
}

impl Verdict {
    /// Builds a verdict with the given flags.
    #[must_use]
    pub fn new(client_allowed: bool, flow_allowed: bool, debug: DebugInfo) -> Self {
        Self {
            client_allowed,
            flow_allowed,
            debug,
        }
    }
}

/// One message emitted by the script's `print` during a single call.
///
/// Messages are ordered, produced only during that call, and discarded once
/// returned; durable logging is the caller's concern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogMessage {
    /// The joined message text.
    pub text: String,
    /// Wall-clock time the message was emitted.
    pub at: DateTime<Utc>,
    /// Hook during which the message was produced.
    pub hook: HookKind,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project() -> ProjectSnapshot {
        ProjectSnapshot {
            id: Uuid::new_v4(),
            name: "Web".to_string(),
            identifier: "WEB".to_string(),
            rules_script: None,
        }
    }

    fn user() -> UserSnapshot {
        UserSnapshot {
            id: Uuid::new_v4(),
            email: "lead@example.com".to_string(),
            username: "lead".to_string(),
            first_name: "Team".to_string(),
            last_name: "Lead".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn capture_records_ids_and_email() {
        let project = project();
        let issuer = user();
        let debug = DebugInfo::capture(HookKind::BeforeStatusChange, &project, &issuer);

        assert_eq!(debug.project_id, project.id);
        assert_eq!(debug.issuer_id, issuer.id);
        assert_eq!(debug.issuer_email, issuer.email);
        assert_eq!(debug.hook, HookKind::BeforeStatusChange);
    }

    #[test]
    fn verdict_serializes_both_flags() {
        let debug = DebugInfo::capture(HookKind::BeforeLabelsChange, &project(), &user());
        let verdict = Verdict::new(true, false, debug);
        let json = serde_json::to_value(&verdict).expect("serialize");
        assert_eq!(json["client_allowed"], true);
        assert_eq!(json["flow_allowed"], false);
        assert_eq!(json["debug"]["hook"], "before_labels_change");
    }
}
