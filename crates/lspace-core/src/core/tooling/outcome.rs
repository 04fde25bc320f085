use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use lspace_domain::SpaceError;

/// How a command ended, independent of how the result gets rendered.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandStatus {
    Ok,
    UserError,
    Failure,
}

/// The result surface every command handler returns. `details` carries
/// machine-readable context for `--json` output and hints.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    pub status: CommandStatus,
    pub message: String,
    #[serde(default)]
    pub details: Value,
}

impl ExecutionOutcome {
    pub fn success(message: impl Into<String>, details: Value) -> Self {
        Self {
            status: CommandStatus::Ok,
            message: message.into(),
            details,
        }
    }

    pub fn user_error(message: impl Into<String>, details: Value) -> Self {
        Self {
            status: CommandStatus::UserError,
            message: message.into(),
            details,
        }
    }

    pub fn failure(message: impl Into<String>, details: Value) -> Self {
        Self {
            status: CommandStatus::Failure,
            message: message.into(),
            details,
        }
    }
}

/// Maps engine failures onto the outcome surface. Anything that is not a
/// known space failure stays an error for the caller to surface raw.
pub fn outcome_from_error(err: &anyhow::Error) -> Option<ExecutionOutcome> {
    let space_err = err.downcast_ref::<SpaceError>()?;
    Some(match space_err {
        SpaceError::MissingCode { package } => ExecutionOutcome::user_error(
            format!("could not find code for {package}"),
            json!({
                "package": package,
                "hint": format!(
                    "check {package} out under a search root, or point LSPACE_SEARCH_ROOT at it"
                ),
            }),
        ),
        SpaceError::UnsupportedLockfile { root } => ExecutionOutcome::user_error(
            "no recognized lockfile for the root project",
            json!({
                "root": root.display().to_string(),
                "hint": "closing a space needs yarn.lock or package-lock.json next to the root manifest",
            }),
        ),
        SpaceError::NoValidBuildOrder { remaining } => ExecutionOutcome::user_error(
            "no valid build order; the space contains a dependency cycle",
            json!({
                "remaining": remaining,
                "hint": "break the cycle between the remaining packages and try again",
            }),
        ),
        SpaceError::CommandFailure {
            command,
            dir,
            status,
        } => ExecutionOutcome::failure(
            format!("command `{command}` failed with status {status}"),
            json!({
                "command": command,
                "dir": dir.display().to_string(),
                "status": status,
            }),
        ),
    })
}

/// Serializes an outcome into the `--json` envelope. Non-object details
/// are wrapped so the envelope shape stays stable.
pub fn to_json_response(command: &str, outcome: &ExecutionOutcome) -> Value {
    let status = match outcome.status {
        CommandStatus::Ok => "ok",
        CommandStatus::UserError => "user-error",
        CommandStatus::Failure => "error",
    };
    let details = match &outcome.details {
        Value::Object(_) => outcome.details.clone(),
        Value::Null => json!({}),
        other => json!({ "value": other }),
    };
    json!({
        "status": status,
        "message": format_status_message(command, &outcome.message),
        "details": details,
    })
}

/// Prefixes `message` with the invoked command unless it already carries it.
pub fn format_status_message(command: &str, message: &str) -> String {
    let prefix = format!("lspace {command}");
    if message.is_empty() {
        prefix
    } else if message.starts_with(&prefix) {
        message.to_string()
    } else {
        format!("{prefix}: {message}")
    }
}
