//! HTTP routes.
//!
//! Two routes per provider, dispatched by identifier:
//! - `GET /auth/{provider}` redirects to the provider's consent screen
//! - `GET /auth/{provider}/callback` exchanges the returned code and prints the token
//!
//! Callback failures are written to the body with status 200.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use tower_http::trace::TraceLayer;

use crate::error::{ProviderError, ProviderResult, ServerError};
use crate::provider::{AUTHORIZATION_STATE, ProviderConfig, ProviderRegistry};

/// Shared state for HTTP handlers.
#[derive(Debug)]
pub struct AppState {
    pub providers: ProviderRegistry,
    /// Client used for token exchange. Does not follow redirects.
    pub http_client: reqwest::Client,
}

impl AppState {
    /// Create handler state for a set of providers.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built.
    pub fn new(providers: ProviderRegistry) -> Result<Self, ServerError> {
        let http_client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(Self {
            providers,
            http_client,
        })
    }
}

/// Query parameters the provider appends to the callback URL.
///
/// Repeated parameters are tolerated; the first occurrence wins.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct CallbackQuery {
    pub code: String,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

impl CallbackQuery {
    /// Pick the callback parameters out of decoded query pairs.
    #[must_use]
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let mut code = None;
        let mut error = None;
        let mut error_description = None;

        for (key, value) in pairs {
            let slot = match key.as_str() {
                "code" => &mut code,
                "error" => &mut error,
                "error_description" => &mut error_description,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value);
            }
        }

        Self {
            code: code.unwrap_or_default(),
            error,
            error_description,
        }
    }
}

/// Create the HTTP router.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/auth/{provider}", get(handle_redirect))
        .route("/auth/{provider}/callback", get(handle_callback))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "hangar",
        "version": env!("CARGO_PKG_VERSION"),
        "providers": state.providers.names().collect::<Vec<_>>()
    }))
}

async fn handle_redirect(
    State(state): State<Arc<AppState>>,
    Path(provider): Path<String>,
) -> Response {
    match state.providers.get(&provider) {
        Some(config) => redirect_to_provider(config),
        None => unknown_provider(&provider),
    }
}

async fn handle_callback(
    State(state): State<Arc<AppState>>,
    Path(provider): Path<String>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Response {
    let query = CallbackQuery::from_pairs(pairs);
    match state.providers.get(&provider) {
        Some(config) => complete_callback(config, &state.http_client, query).await,
        None => unknown_provider(&provider),
    }
}

/// `302 Found` to the provider's authorization URL.
fn redirect_to_provider(config: &ProviderConfig) -> Response {
    match config.authorize_url(AUTHORIZATION_STATE) {
        Ok(url) => {
            tracing::debug!(provider = %config.name, "Redirecting to provider");
            (StatusCode::FOUND, [(header::LOCATION, url.to_string())]).into_response()
        }
        Err(e) => {
            tracing::error!(provider = %config.name, error = %e, "Cannot build authorization URL");
            (StatusCode::INTERNAL_SERVER_ERROR, format!("Error: {}", e.to_user_message()))
                .into_response()
        }
    }
}

/// Exchange the callback's code and print the outcome.
async fn complete_callback(
    config: &ProviderConfig,
    http_client: &reqwest::Client,
    query: CallbackQuery,
) -> Response {
    let body = match exchange(config, http_client, query).await {
        Ok(token) => format!("Token: {token}"),
        Err(e) => {
            tracing::warn!(provider = %config.name, error = %e, "Token exchange failed");
            format!("Error: {}", e.to_user_message())
        }
    };

    (StatusCode::OK, body).into_response()
}

async fn exchange(
    config: &ProviderConfig,
    http_client: &reqwest::Client,
    query: CallbackQuery,
) -> ProviderResult<String> {
    if let Some(error) = query.error {
        let reason = match query.error_description {
            Some(description) => format!("{error}: {description}"),
            None => error,
        };
        return Err(ProviderError::Denied(reason));
    }

    let token = config.exchange_code(http_client, &query.code).await?;
    tracing::info!(provider = %config.name, "Exchanged authorization code");
    Ok(serde_json::to_string(&token)?)
}

fn unknown_provider(provider: &str) -> Response {
    (StatusCode::NOT_FOUND, format!("Unknown provider: {provider}")).into_response()
}
