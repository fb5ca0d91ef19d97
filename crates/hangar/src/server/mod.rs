//! Hangar HTTP server.
//!
//! Binds one listener, serves the provider routes, and shuts down on
//! SIGINT/SIGTERM after draining in-flight requests for a bounded time.

pub mod routes;

use std::future::{Future, IntoFuture};
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::oneshot;

use crate::config::Config;
use crate::error::ServerError;

pub use routes::{AppState, create_router};

/// Hangar server.
#[derive(Debug)]
pub struct HangarServer {
    config: Config,
}

impl HangarServer {
    /// Create a new server.
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self { config }
    }

    /// Bind the configured address.
    ///
    /// # Errors
    ///
    /// Returns error if the address is in use or cannot be resolved.
    pub async fn bind(&self) -> Result<TcpListener, ServerError> {
        let addr = self.config.bind_addr();
        TcpListener::bind(addr.as_str())
            .await
            .map_err(|source| ServerError::Bind { addr, source })
    }

    /// Bind and serve until SIGINT or SIGTERM.
    ///
    /// # Errors
    ///
    /// Returns error on bind or serve failure.
    pub async fn run(self) -> Result<(), ServerError> {
        let listener = self.bind().await?;
        self.serve(listener, shutdown_signal()).await
    }

    /// Serve on `listener` until `shutdown` resolves.
    ///
    /// Once `shutdown` fires, the listener stops accepting and in-flight
    /// requests get `shutdown_timeout` to finish before this returns anyway.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built or the serve loop fails.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let drain_timeout = self.config.shutdown_timeout;
        let addr = listener.local_addr()?;

        tracing::info!(
            %addr,
            base_url = %self.config.base_url,
            providers = self.config.providers.len(),
            "Hangar server starting"
        );

        let state = Arc::new(AppState::new(self.config.providers)?);
        let router = create_router(state);

        let (tripped_tx, tripped_rx) = oneshot::channel::<()>();
        let graceful = async move {
            shutdown.await;
            tracing::info!("Hangar server shutting down");
            let _ = tripped_tx.send(());
        };

        let server = axum::serve(listener, router).with_graceful_shutdown(graceful).into_future();

        let deadline = async move {
            if tripped_rx.await.is_ok() {
                tokio::time::sleep(drain_timeout).await;
            } else {
                std::future::pending::<()>().await;
            }
        };

        tokio::select! {
            result = server => result?,
            () = deadline => {
                tracing::warn!(
                    timeout = ?drain_timeout,
                    "In-flight requests did not finish in time"
                );
            }
        }

        tracing::info!("Hangar server stopped");
        Ok(())
    }
}

/// Resolves on SIGINT (Ctrl+C) or, on Unix, SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }

    tracing::info!("Received shutdown signal");
}
