//! CLI command implementations.

pub mod add;
pub mod item;
pub mod list;

use crate::render::{self, Format};
use roster_sync::{
    Credential, CredentialProvider, HttpGateway, StaticCredential, SyncConfig, SyncResult,
    SyncState, SyncStatus, UserSync,
};
use std::error::Error;
use std::sync::Arc;
use tracing::debug;

/// Result type for commands.
pub type CommandResult = Result<(), Box<dyn Error>>;

/// A connected client for one CLI invocation.
pub struct Session {
    /// User list state machine.
    pub sync: Arc<UserSync<HttpGateway, StaticCredential>>,
}

impl Session {
    /// Builds a session for the given gateway origin.
    pub fn connect(url: &str, token: Option<String>) -> SyncResult<Self> {
        let config = SyncConfig::new(url);
        debug!(url = %config.users_url(), authenticated = token.is_some(), "connecting");
        let gateway = HttpGateway::new(config)?;
        // Gateways running without auth ignore the header, so an empty token
        // is acceptable there.
        let credentials = StaticCredential::new(token.unwrap_or_default());
        Ok(Self {
            sync: Arc::new(UserSync::new(gateway, credentials)),
        })
    }

    /// Gets a token for a direct gateway call.
    pub async fn credential(&self) -> SyncResult<Credential> {
        self.sync.credentials().access_token().await
    }
}

/// Prints a snapshot.
pub fn print_state(state: &SyncState, format: Format) -> CommandResult {
    let output = render::state(state, format)?;
    if !output.is_empty() {
        println!("{output}");
    }
    Ok(())
}

/// Prints a snapshot; a failed state makes the command fail.
pub fn finish(state: &SyncState, format: Format) -> CommandResult {
    print_state(state, format)?;
    if state.status == SyncStatus::Failed {
        let message = state.error.clone().unwrap_or_default();
        return Err(message.into());
    }
    Ok(())
}
