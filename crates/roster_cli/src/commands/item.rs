//! Single-user command implementations.

use super::{CommandResult, Session};
use crate::render::{self, Format};
use roster_sync::{UserGateway, UserId, UserUpdate};
use tracing::debug;

/// Runs the show command.
pub async fn show(session: &Session, id: UserId, format: Format) -> CommandResult {
    let credential = session.credential().await?;
    let user = session.sync.gateway().get_user(&credential, id).await?;
    println!("{}", render::user(&user, format)?);
    Ok(())
}

/// Runs the update command.
pub async fn update(
    session: &Session,
    id: UserId,
    name: Option<String>,
    email: Option<String>,
    format: Format,
) -> CommandResult {
    let update = UserUpdate { name, email };
    if update.is_empty() {
        return Err("nothing to update: pass --name and/or --email".into());
    }

    debug!(id, ?update, "updating user");
    let credential = session.credential().await?;
    let user = session
        .sync
        .gateway()
        .update_user(&credential, id, &update)
        .await?;
    println!("{}", render::user(&user, format)?);
    Ok(())
}

/// Runs the delete command.
pub async fn delete(session: &Session, id: UserId) -> CommandResult {
    let credential = session.credential().await?;
    session.sync.gateway().delete_user(&credential, id).await?;
    debug!(id, "user deleted");
    println!("Deleted user {id}");
    Ok(())
}
