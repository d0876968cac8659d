//! Request handlers for the user endpoints.

use crate::auth::BearerValidator;
use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::store::UserStore;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use roster_protocol::{NewUser, UserId, UserRecord, UserUpdate};
use std::sync::Arc;
use tracing::info;

/// Context shared by all handlers.
pub struct HandlerContext {
    /// Server configuration.
    pub config: ServerConfig,
    /// Backing store.
    pub store: Arc<dyn UserStore>,
    validator: Option<BearerValidator>,
}

impl HandlerContext {
    /// Creates a new handler context.
    pub fn new(config: ServerConfig, store: Arc<dyn UserStore>) -> Self {
        let validator = config.api_token.as_deref().map(BearerValidator::new);
        Self {
            config,
            store,
            validator,
        }
    }

    /// Returns the token validator, if authentication is enabled.
    pub fn validator(&self) -> Option<&BearerValidator> {
        self.validator.as_ref()
    }

    fn check_field(&self, field: &str, value: &str, max: usize) -> ServerResult<()> {
        if value.trim().is_empty() {
            return Err(ServerError::InvalidRequest(format!("{field} must not be empty")));
        }
        if value.len() > max {
            return Err(ServerError::InvalidRequest(format!(
                "{field} too long: {} > {max}",
                value.len()
            )));
        }
        Ok(())
    }

    fn check_name(&self, name: &str) -> ServerResult<()> {
        self.check_field("name", name, self.config.max_name_len)
    }

    fn check_email(&self, email: &str) -> ServerResult<()> {
        self.check_field("email", email, self.config.max_email_len)
    }
}

type Ctx = State<Arc<HandlerContext>>;

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> ServerResult<T> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| ServerError::InvalidRequest(rejection.body_text()))
}

/// `GET /api/users`
pub async fn list_users(State(context): Ctx) -> ServerResult<Json<Vec<UserRecord>>> {
    context.store.list().await.map(Json)
}

/// `POST /api/users`
pub async fn create_user(
    State(context): Ctx,
    payload: Result<Json<NewUser>, JsonRejection>,
) -> ServerResult<(StatusCode, Json<UserRecord>)> {
    let user = body(payload)?;
    context.check_name(&user.name)?;
    context.check_email(&user.email)?;

    let record = context.store.insert(user).await?;
    info!(id = record.id, name = %record.name, "user created");
    Ok((StatusCode::CREATED, Json(record)))
}

/// `GET /api/users/{id}`
pub async fn get_user(
    State(context): Ctx,
    Path(id): Path<UserId>,
) -> ServerResult<Json<UserRecord>> {
    context.store.get(id).await.map(Json)
}

/// `PUT /api/users/{id}`
pub async fn update_user(
    State(context): Ctx,
    Path(id): Path<UserId>,
    payload: Result<Json<UserUpdate>, JsonRejection>,
) -> ServerResult<Json<UserRecord>> {
    let update = body(payload)?;
    if let Some(name) = &update.name {
        context.check_name(name)?;
    }
    if let Some(email) = &update.email {
        context.check_email(email)?;
    }

    let record = context.store.update(id, update).await?;
    info!(id, "user updated");
    Ok(Json(record))
}

/// `DELETE /api/users/{id}`
pub async fn delete_user(State(context): Ctx, Path(id): Path<UserId>) -> ServerResult<StatusCode> {
    context.store.delete(id).await?;
    info!(id, "user deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /health`
pub async fn health() -> &'static str {
    "ok"
}
