//! Output formatting utilities.

use macprofile_canonical::{Identity, IdentityFormat};
use macprofile_reconcile::{Action, Applied, Outcome};
use serde_json::{json, Value};

/// Formats a value as pretty JSON.
pub fn format_json(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
}

/// JSON form of a planned action.
pub fn action_json(action: &Action, format: &dyn IdentityFormat) -> Value {
    let mut value = json!({
        "name": action.name(),
        "action": action.kind().to_string(),
    });
    match action {
        Action::Create(desired) => {
            value["identity"] = identity_json(desired.identity.as_ref(), format);
        }
        Action::Update { desired, current } => {
            value["identity"] = identity_json(desired.identity.as_ref(), format);
            value["current"] = json!(current.render(format));
        }
        Action::Reject { failure, .. } => {
            value["reason"] = json!(failure.to_string());
        }
        Action::NoOp { .. } | Action::Delete { .. } => {}
    }
    value
}

fn identity_json(identity: Option<&Identity>, format: &dyn IdentityFormat) -> Value {
    identity.map_or(Value::Null, |identity| json!(identity.render(format)))
}

/// Formats a planned action as a table row.
pub fn format_action_row(action: &Action, format: &dyn IdentityFormat) -> String {
    let detail = match action {
        Action::Create(desired) => desired
            .identity
            .as_ref()
            .map(|identity| identity.render(format))
            .unwrap_or_default(),
        Action::Update { desired, current } => format!(
            "{} -> {}",
            current.render(format),
            desired
                .identity
                .as_ref()
                .map(|identity| identity.render(format))
                .unwrap_or_default()
        ),
        Action::Reject { failure, .. } => failure.to_string(),
        Action::NoOp { .. } | Action::Delete { .. } => String::new(),
    };
    format!(
        "{:<40} {:<8} {}",
        truncate(action.name(), 40),
        action.kind().to_string(),
        detail
    )
}

/// Prints the action table header.
#[allow(clippy::print_literal)]
pub fn print_action_header() {
    println!("{:<40} {:<8} {}", "NAME", "ACTION", "DETAIL");
    println!("{}", "-".repeat(100));
}

/// JSON form of an applied action.
pub fn outcome_json(outcome: &Outcome) -> Value {
    let mut value = json!({
        "name": outcome.name,
        "action": outcome.kind.to_string(),
    });
    match &outcome.result {
        Ok(applied) => {
            value["status"] = json!("ok");
            value["result"] = json!(applied_text(applied));
        }
        Err(err) => {
            value["status"] = json!("failed");
            value["stage"] = json!(err.stage().to_string());
            value["error"] = json!(err.to_string());
        }
    }
    value
}

/// Formats an applied action as a table row.
pub fn format_outcome_row(outcome: &Outcome) -> String {
    let (status, detail) = match &outcome.result {
        Ok(applied) => ("ok", applied_text(applied)),
        Err(err) => ("failed", err.to_string()),
    };
    format!(
        "{:<40} {:<8} {:<7} {}",
        truncate(&outcome.name, 40),
        outcome.kind.to_string(),
        status,
        detail
    )
}

/// Prints the outcome table header.
#[allow(clippy::print_literal)]
pub fn print_outcome_header() {
    println!("{:<40} {:<8} {:<7} {}", "NAME", "ACTION", "STATUS", "DETAIL");
    println!("{}", "-".repeat(100));
}

fn applied_text(applied: &Applied) -> String {
    match applied {
        Applied::Unchanged => "unchanged".to_string(),
        Applied::Installed { artifact } => format!("installed {}", artifact.path.display()),
        Applied::Written { artifact } => format!("written {}", artifact.path.display()),
        Applied::Removed { artifacts } => format!("removed ({} artifacts)", artifacts.len()),
    }
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
