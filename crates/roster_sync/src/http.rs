//! HTTP gateway implementation.
//!
//! Talks JSON to the Roster REST API with `reqwest`. Every request carries
//! `Authorization: Bearer <token>`. Non-2xx answers become
//! [`SyncError::Server`] with a fixed per-operation message; the response
//! body is never copied into the error.

use crate::config::SyncConfig;
use crate::credential::Credential;
use crate::error::{SyncError, SyncResult};
use crate::transport::UserGateway;
use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, RequestBuilder, Response};
use roster_protocol::{NewUser, UserId, UserRecord, UserUpdate};
use serde::de::DeserializeOwned;
use tracing::debug;

/// HTTP-based user gateway.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    config: SyncConfig,
    client: Client,
}

impl HttpGateway {
    /// Creates a gateway with a client built from `config`.
    pub fn new(config: SyncConfig) -> SyncResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| SyncError::Config(e.to_string()))?;
        Ok(Self { config, client })
    }

    /// Creates a gateway around an existing client.
    ///
    /// The client's own timeout and headers apply; `config` only supplies URLs.
    pub fn with_client(config: SyncConfig, client: Client) -> Self {
        Self { config, client }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    async fn dispatch(
        &self,
        request: RequestBuilder,
        credential: &Credential,
        operation: &'static str,
    ) -> SyncResult<Response> {
        let response = request
            .header(AUTHORIZATION, credential.bearer())
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        debug!(operation, status = status.as_u16(), "gateway responded");
        if !status.is_success() {
            return Err(SyncError::server(
                status.as_u16(),
                format!("failed to {operation}"),
            ));
        }
        Ok(response)
    }

    async fn fetch_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        credential: &Credential,
        operation: &'static str,
    ) -> SyncResult<T> {
        self.dispatch(request, credential, operation)
            .await?
            .json::<T>()
            .await
            .map_err(|e| SyncError::Decode(e.to_string()))
    }
}

#[async_trait]
impl UserGateway for HttpGateway {
    async fn list_users(&self, credential: &Credential) -> SyncResult<Vec<UserRecord>> {
        let request = self.client.get(self.config.users_url());
        self.fetch_json(request, credential, "list users").await
    }

    async fn create_user(
        &self,
        credential: &Credential,
        user: &NewUser,
    ) -> SyncResult<UserRecord> {
        let request = self.client.post(self.config.users_url()).json(user);
        self.fetch_json(request, credential, "create user").await
    }

    async fn get_user(&self, credential: &Credential, id: UserId) -> SyncResult<UserRecord> {
        let request = self.client.get(self.config.user_url(id));
        self.fetch_json(request, credential, "get user").await
    }

    async fn update_user(
        &self,
        credential: &Credential,
        id: UserId,
        update: &UserUpdate,
    ) -> SyncResult<UserRecord> {
        let request = self.client.put(self.config.user_url(id)).json(update);
        self.fetch_json(request, credential, "update user").await
    }

    async fn delete_user(&self, credential: &Credential, id: UserId) -> SyncResult<()> {
        let request = self.client.delete(self.config.user_url(id));
        self.dispatch(request, credential, "delete user")
            .await
            .map(|_| ())
    }
}

fn transport_error(err: reqwest::Error) -> SyncError {
    if err.is_builder() {
        SyncError::transport_fatal(err.to_string())
    } else {
        SyncError::transport_retryable(err.to_string())
    }
}
