//! List command implementation.

use super::{finish, CommandResult, Session};
use crate::render::Format;
use tracing::debug;

/// Runs the list command.
pub async fn run(session: &Session, format: Format) -> CommandResult {
    let outcome = session.sync.fetch_users().await;
    debug!(?outcome, "list fetched");
    finish(&session.sync.state(), format)
}
