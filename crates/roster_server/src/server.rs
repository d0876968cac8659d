//! Main gateway server.

use crate::auth::require_bearer;
use crate::config::ServerConfig;
use crate::error::ServerResult;
use crate::handler::{self, HandlerContext};
use crate::store::{MemoryUserStore, UserStore};
use axum::middleware;
use axum::routing::get;
use axum::Router;
use roster_protocol::USERS_PATH;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

/// The Roster REST gateway.
///
/// Serves `GET|POST /api/users` and `GET|PUT|DELETE /api/users/{id}` over a
/// [`UserStore`], plus an unauthenticated `GET /health`.
///
/// # Example
///
/// ```
/// use roster_server::{RosterServer, ServerConfig};
///
/// let server = RosterServer::new(ServerConfig::default());
/// let app = server.router();
/// // axum::serve(listener, app).await
/// # drop(app);
/// ```
pub struct RosterServer {
    context: Arc<HandlerContext>,
}

impl RosterServer {
    /// Creates a server backed by an empty in-memory store.
    pub fn new(config: ServerConfig) -> Self {
        Self::with_store(config, Arc::new(MemoryUserStore::new()))
    }

    /// Creates a server backed by `store`.
    pub fn with_store(config: ServerConfig, store: Arc<dyn UserStore>) -> Self {
        Self {
            context: Arc::new(HandlerContext::new(config, store)),
        }
    }

    /// Returns the shared handler context.
    pub fn context(&self) -> &Arc<HandlerContext> {
        &self.context
    }

    /// Builds the HTTP router.
    pub fn router(&self) -> Router {
        let item_path = format!("{USERS_PATH}/{{id}}");

        let api = Router::new()
            .route(
                USERS_PATH,
                get(handler::list_users).post(handler::create_user),
            )
            .route(
                &item_path,
                get(handler::get_user)
                    .put(handler::update_user)
                    .delete(handler::delete_user),
            )
            .route_layer(middleware::from_fn_with_state(
                Arc::clone(&self.context),
                require_bearer,
            ));

        Router::new()
            .route("/health", get(handler::health))
            .merge(api)
            .layer(TraceLayer::new_for_http())
            .with_state(Arc::clone(&self.context))
    }

    /// Binds the configured address.
    pub async fn bind(&self) -> ServerResult<TcpListener> {
        let listener = TcpListener::bind(self.context.config.bind_addr).await?;
        Ok(listener)
    }

    /// Serves on `listener` until `shutdown` resolves.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> ServerResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        let auth = if self.context.validator().is_some() {
            "bearer"
        } else {
            "disabled"
        };
        info!(%addr, auth, "roster gateway listening");

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("roster gateway stopped");
        Ok(())
    }

    /// Binds the configured address and serves until Ctrl+C or SIGTERM.
    pub async fn run(self) -> ServerResult<()> {
        let listener = self.bind().await?;
        self.serve(listener, shutdown_signal()).await
    }
}

/// Resolves on Ctrl+C or, on Unix, SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                tracing::warn!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
