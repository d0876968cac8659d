//! Add command implementation.

use super::{print_state, CommandResult, Session};
use crate::render::Format;
use roster_sync::{NewUser, SyncState, SyncStatus};
use tracing::{debug, warn};

/// Runs the add command.
///
/// The sync engine only logs a failed create, so the command compares the
/// failure counter to decide its exit status.
pub async fn run(session: &Session, name: String, email: String, format: Format) -> CommandResult {
    let failures = session.sync.stats().create_failures;
    let refresh = session.sync.create_user(&NewUser::new(name, email)).await;

    if session.sync.stats().create_failures > failures {
        return Err("failed to add user (run with --verbose for details)".into());
    }
    if let Some(refresh) = refresh {
        let outcome = refresh.await?;
        debug!(?outcome, "refresh after add finished");
    }

    report(&session.sync.state(), format)
}

/// Prints the list after a successful create. A failed refresh is only a
/// warning since the user is already stored.
fn report(state: &SyncState, format: Format) -> CommandResult {
    print_state(state, format)?;
    if state.status == SyncStatus::Failed {
        warn!(
            error = state.error.as_deref().unwrap_or_default(),
            "user added, but the list could not be refreshed"
        );
    }
    Ok(())
}
