//! Error taxonomy for rules-engine failures and rejections.
//!
//! Five classes of failure can end a hook invocation:
//!
//! | Kind | Meaning | Client-visible allow |
//! |------|---------|----------------------|
//! | [`RuleErrorKind::Parse`] | malformed script body | `true` |
//! | [`RuleErrorKind::Runtime`] | guest error during execution | `true` |
//! | [`RuleErrorKind::Timeout`] | a phase exceeded the deadline | `true` |
//! | [`RuleErrorKind::Protocol`] | hook returned an invalid result | `false` |
//! | [`RuleErrorKind::Rejection`] | script explicitly vetoed the action | `false` |
//!
//! A rejection is the one case whose message is shown verbatim to the end
//! user; everything else maps to a generic, non-leaking client code.

use crate::hook::HookKind;
use crate::verdict::DebugInfo;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default message for a script veto that gave no reason.
pub const GENERIC_REJECTION: &str = "action rejected by project rules";

/// Message used for deadline overruns.
pub const TIMEOUT_MESSAGE: &str = "execution timed out";

/// Classification of a rules-engine failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleErrorKind {
    /// The script body failed to parse.
    Parse,
    /// The guest raised an error while executing.
    Runtime,
    /// A supervised phase exceeded its deadline.
    Timeout,
    /// The hook returned a non-table or a table without a boolean `status`.
    Protocol,
    /// The script explicitly vetoed the action.
    Rejection,
}

/// Raw script diagnostic carried alongside a [`RuleError`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptDetail {
    /// Short summary of what went wrong at the script boundary.
    pub summary: String,
    /// Raw guest-language error text, when one exists.
    pub guest_text: Option<String>,
}

/// A failed or vetoed hook invocation.
///
/// Always carries full [`DebugInfo`]; the business-rejection flag decides
/// which [`ClientError`] is surfaced to the API consumer.
#[derive(Debug, Clone)]
pub struct RuleError {
    kind: RuleErrorKind,
    message: String,
    detail: Option<ScriptDetail>,
    debug: DebugInfo,
    business_rejection: bool,
}

impl RuleError {
    /// Builds an error of the given kind.
    ///
    /// Rejections are marked business rejections automatically.
    #[must_use]
    pub fn new(
        kind: RuleErrorKind,
        message: impl Into<String>,
        detail: Option<ScriptDetail>,
        debug: DebugInfo,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            detail,
            debug,
            business_rejection: kind == RuleErrorKind::Rejection,
        }
    }

    /// A script veto, with the script's own reason or the generic text.
    #[must_use]
    pub fn rejection(reason: Option<String>, debug: DebugInfo) -> Self {
        Self::new(
            RuleErrorKind::Rejection,
            reason.unwrap_or_else(|| GENERIC_REJECTION.to_string()),
            None,
            debug,
        )
    }

    /// A deadline overrun in either supervised phase.
    #[must_use]
    pub fn timeout(debug: DebugInfo) -> Self {
        Self::new(RuleErrorKind::Timeout, TIMEOUT_MESSAGE, None, debug)
    }

    /// Classification of this error.
    #[must_use]
    pub fn kind(&self) -> RuleErrorKind {
        self.kind
    }

    /// Human-readable message. Shown verbatim only for business rejections.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// When the failing invocation started.
    #[must_use]
    pub fn time(&self) -> DateTime<Utc> {
        self.debug.at
    }

    /// Hook during which the failure occurred.
    #[must_use]
    pub fn hook(&self) -> HookKind {
        self.debug.hook
    }

    /// Full diagnostic context.
    #[must_use]
    pub fn debug_info(&self) -> &DebugInfo {
        &self.debug
    }

    /// Raw script diagnostic, when the failure came from the guest.
    #[must_use]
    pub fn script_detail(&self) -> Option<&ScriptDetail> {
        self.detail.as_ref()
    }

    /// Whether the script itself vetoed the action, as opposed to the
    /// script or sandbox failing.
    #[must_use]
    pub fn is_business_rejection(&self) -> bool {
        self.business_rejection
    }

    /// Marks this error as an explicit business rejection.
    ///
    /// Changes which [`ClientError`] is produced: the error's message will
    /// be surfaced verbatim to the end user.
    pub fn mark_business_rejection(&mut self) {
        self.business_rejection = true;
    }

    /// Maps this error to the caller-facing code.
    ///
    /// Business rejections surface the script's own message; everything
    /// else collapses to a generic failure that leaks no internals.
    #[must_use]
    pub fn to_client_error(&self) -> ClientError {
        if self.business_rejection {
            ClientError::RuleViolation {
                message: self.message.clone(),
            }
        } else {
            ClientError::RulesEngineFailure
        }
    }
}

impl std::fmt::Display for RuleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.debug.hook, self.message)
    }
}

impl std::error::Error for RuleError {}

/// Caller-facing error code surfaced through the API layer.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "code", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientError {
    /// The project's rules rejected the action; message comes from the
    /// script and is safe to display.
    #[error("{message}")]
    RuleViolation {
        /// Script-provided reason.
        message: String,
    },
    /// The rules engine failed; details stay server-side.
    #[error("project rules could not be evaluated")]
    RulesEngineFailure,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::{ProjectSnapshot, UserSnapshot};
    use uuid::Uuid;

    fn debug() -> DebugInfo {
        let project = ProjectSnapshot {
            id: Uuid::new_v4(),
            name: "Web".to_string(),
            identifier: "WEB".to_string(),
            rules_script: None,
        };
        let issuer = UserSnapshot {
            id: Uuid::new_v4(),
            email: "qa@example.com".to_string(),
            username: "qa".to_string(),
            first_name: "Q".to_string(),
            last_name: "A".to_string(),
            created_at: Utc::now(),
        };
        DebugInfo::capture(HookKind::BeforeStatusChange, &project, &issuer)
    }

    #[test]
    fn rejection_defaults_to_generic_message() {
        let err = RuleError::rejection(None, debug());
        assert_eq!(err.message(), GENERIC_REJECTION);
        assert!(err.is_business_rejection());
        assert_eq!(err.kind(), RuleErrorKind::Rejection);
    }

    #[test]
    fn rejection_keeps_custom_reason_verbatim() {
        let err = RuleError::rejection(Some("custom reason".to_string()), debug());
        assert_eq!(err.message(), "custom reason");
        assert_eq!(
            err.to_client_error(),
            ClientError::RuleViolation {
                message: "custom reason".to_string()
            }
        );
    }

    #[test]
    fn infrastructure_errors_map_to_generic_client_code() {
        let err = RuleError::new(
            RuleErrorKind::Runtime,
            "attempt to call a nil value",
            Some(ScriptDetail {
                summary: "runtime error".to_string(),
                guest_text: Some("attempt to call a nil value".to_string()),
            }),
            debug(),
        );
        assert!(!err.is_business_rejection());
        assert_eq!(err.to_client_error(), ClientError::RulesEngineFailure);
    }

    #[test]
    fn mark_business_rejection_switches_client_mapping() {
        let mut err = RuleError::new(RuleErrorKind::Runtime, "quota exceeded", None, debug());
        assert_eq!(err.to_client_error(), ClientError::RulesEngineFailure);

        err.mark_business_rejection();
        assert_eq!(
            err.to_client_error(),
            ClientError::RuleViolation {
                message: "quota exceeded".to_string()
            }
        );
    }

    #[test]
    fn timeout_uses_fixed_message() {
        let err = RuleError::timeout(debug());
        assert_eq!(err.kind(), RuleErrorKind::Timeout);
        assert_eq!(err.message(), TIMEOUT_MESSAGE);
    }

    #[test]
    fn accessors_expose_debug_context() {
        let err = RuleError::timeout(debug());
        assert_eq!(err.hook(), HookKind::BeforeStatusChange);
        assert!(err.time() <= Utc::now());
    }

    #[test]
    fn client_error_serializes_with_code_tag() {
        let json = serde_json::to_value(ClientError::RulesEngineFailure).expect("serialize");
        assert_eq!(json["code"], "RULES_ENGINE_FAILURE");

        let json = serde_json::to_value(ClientError::RuleViolation {
            message: "no".to_string(),
        })
        .expect("serialize");
        assert_eq!(json["code"], "RULE_VIOLATION");
        assert_eq!(json["message"], "no");
    }
}
