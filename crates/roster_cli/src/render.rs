//! Text and JSON rendering of sync state.

use clap::ValueEnum;
use roster_sync::{SyncState, SyncStatus, UserRecord};
use serde::Serialize;

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    /// Tab-separated lines.
    Text,
    /// Pretty-printed JSON.
    Json,
}

#[derive(Serialize)]
struct StateView<'a> {
    status: &'static str,
    users: &'a [UserRecord],
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
}

fn status_label(status: SyncStatus) -> &'static str {
    match status {
        SyncStatus::Idle => "idle",
        SyncStatus::Loading => "loading",
        SyncStatus::Succeeded => "succeeded",
        SyncStatus::Failed => "failed",
    }
}

fn user_line(user: &UserRecord) -> String {
    format!("{}\t{}\t{}", user.id, user.name, user.email)
}

/// Renders a state snapshot.
pub fn state(state: &SyncState, format: Format) -> Result<String, serde_json::Error> {
    match format {
        Format::Json => serde_json::to_string_pretty(&StateView {
            status: status_label(state.status),
            users: &state.items,
            error: state.error.as_deref(),
        }),
        Format::Text => {
            let mut lines = Vec::with_capacity(state.items.len() + 1);
            match state.status {
                SyncStatus::Loading => lines.push("Loading...".to_string()),
                SyncStatus::Failed => {
                    lines.push(state.error.clone().unwrap_or_default());
                }
                SyncStatus::Idle | SyncStatus::Succeeded => {}
            }
            lines.extend(state.items.iter().map(user_line));
            Ok(lines.join("\n"))
        }
    }
}

/// Renders one user.
pub fn user(user: &UserRecord, format: Format) -> Result<String, serde_json::Error> {
    match format {
        Format::Json => serde_json::to_string_pretty(user),
        Format::Text => Ok(format!("{}\t{}", user_line(user), user.created_at.to_rfc3339())),
    }
}
