//! OAuth2 provider configuration and the calls made on its behalf.
//!
//! A [`ProviderConfig`] is plain data read from the environment. The `oauth2`
//! client is assembled from it per request, so a malformed URL only surfaces
//! when that provider is actually used.

use std::collections::BTreeMap;
use std::fmt;

use oauth2::basic::{BasicClient, BasicTokenResponse};
use oauth2::url::Url;
use oauth2::{
    AuthType, AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, EndpointNotSet,
    EndpointSet, RedirectUrl, RequestTokenError, Scope, TokenUrl,
};

use crate::error::{ProviderError, ProviderResult};

/// Variable-name suffixes read for each provider.
pub mod vars {
    /// Marks a provider; the prefix names it.
    pub const CLIENT_ID: &str = "_CLIENT_ID";
    /// Client secret sent to the token endpoint.
    pub const CLIENT_SECRET: &str = "_CLIENT_SECRET";
    /// Consent screen URL.
    pub const AUTH_URL: &str = "_AUTH_URL";
    /// Token endpoint URL.
    pub const TOKEN_URL: &str = "_TOKEN_URL";
    /// Comma-separated scopes requested on redirect.
    pub const DEFAULT_SCOPES: &str = "_DEFAULT_SCOPES";
}

/// `state` value sent with every authorization request.
///
/// Fixed, so it offers no CSRF protection.
pub const AUTHORIZATION_STATE: &str = "state";

/// Client that can only build authorization URLs.
type AuthorizationClient = BasicClient<EndpointSet>;

/// Client that can only exchange codes.
type TokenClient =
    BasicClient<EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

/// Split a comma-separated scope list.
///
/// No trimming is done and empty segments are kept, so `""` yields `[""]`.
#[must_use]
pub fn parse_scopes(raw: &str) -> Vec<String> {
    raw.split(',').map(str::to_owned).collect()
}

/// Derive the provider identifier from a `<PROVIDER>_CLIENT_ID` variable name.
///
/// Returns `None` for names without the suffix or with nothing in front of it.
#[must_use]
pub fn provider_name(var: &str) -> Option<String> {
    let prefix = var.strip_suffix(vars::CLIENT_ID)?;
    if prefix.is_empty() {
        return None;
    }
    Some(prefix.to_lowercase())
}

/// Configuration for one OAuth2 provider.
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    /// Lowercase identifier used in routes.
    pub name: String,
    pub client_id: String,
    pub client_secret: String,
    pub auth_url: String,
    pub token_url: String,
    /// Always `<base_url>/auth/<name>/callback`.
    pub redirect_url: String,
    pub scopes: Vec<String>,
}

impl ProviderConfig {
    /// Build a provider from its variables.
    ///
    /// `lookup` returns the value of a variable, or an empty string when unset.
    pub fn from_lookup(name: &str, base_url: &str, lookup: impl Fn(&str) -> String) -> Self {
        let prefix = name.to_uppercase();
        let var = |suffix: &str| lookup(&format!("{prefix}{suffix}"));

        Self {
            name: name.to_owned(),
            client_id: var(vars::CLIENT_ID),
            client_secret: var(vars::CLIENT_SECRET),
            auth_url: var(vars::AUTH_URL),
            token_url: var(vars::TOKEN_URL),
            redirect_url: callback_url(base_url, name),
            scopes: parse_scopes(&var(vars::DEFAULT_SCOPES)),
        }
    }

    fn base_client(&self, auth_type: AuthType) -> ProviderResult<BasicClient> {
        let redirect_url = RedirectUrl::new(self.redirect_url.clone()).map_err(|source| {
            ProviderError::InvalidRedirectUrl {
                url: self.redirect_url.clone(),
                source,
            }
        })?;

        Ok(BasicClient::new(ClientId::new(self.client_id.clone()))
            .set_client_secret(ClientSecret::new(self.client_secret.clone()))
            .set_auth_type(auth_type)
            .set_redirect_uri(redirect_url))
    }

    fn authorization_client(&self) -> ProviderResult<AuthorizationClient> {
        let auth_url = AuthUrl::new(self.auth_url.clone()).map_err(|source| {
            ProviderError::InvalidAuthUrl {
                url: self.auth_url.clone(),
                source,
            }
        })?;
        Ok(self.base_client(AuthType::BasicAuth)?.set_auth_uri(auth_url))
    }

    fn token_client(&self, auth_type: AuthType) -> ProviderResult<TokenClient> {
        let token_url = TokenUrl::new(self.token_url.clone()).map_err(|source| {
            ProviderError::InvalidTokenUrl {
                url: self.token_url.clone(),
                source,
            }
        })?;
        Ok(self.base_client(auth_type)?.set_token_uri(token_url))
    }

    /// URL of the provider's consent screen for this client.
    pub fn authorize_url(&self, state: &str) -> ProviderResult<Url> {
        let state = CsrfToken::new(state.to_owned());
        let (url, _state) = self
            .authorization_client()?
            .authorize_url(move || state)
            .add_scopes(self.scopes.iter().cloned().map(Scope::new))
            .url();
        Ok(url)
    }

    /// Trade an authorization code for a token at the provider's token endpoint.
    ///
    /// Client credentials go in an HTTP Basic header first. If the provider
    /// answers with anything but a transport failure, the exchange is retried
    /// once with the credentials in the form body.
    pub async fn exchange_code(
        &self,
        http_client: &reqwest::Client,
        code: &str,
    ) -> ProviderResult<BasicTokenResponse> {
        match self.request_token(http_client, code, AuthType::BasicAuth).await {
            Err(ProviderError::Exchange(err)) if !matches!(err, RequestTokenError::Request(_)) => {
                tracing::debug!(
                    provider = %self.name,
                    error = %err,
                    "Retrying token exchange with credentials in the request body"
                );
                self.request_token(http_client, code, AuthType::RequestBody).await
            }
            other => other,
        }
    }

    async fn request_token(
        &self,
        http_client: &reqwest::Client,
        code: &str,
        auth_type: AuthType,
    ) -> ProviderResult<BasicTokenResponse> {
        let token = self
            .token_client(auth_type)?
            .exchange_code(AuthorizationCode::new(code.to_owned()))
            .request_async(http_client)
            .await?;
        Ok(token)
    }
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("name", &self.name)
            .field("client_id", &self.client_id)
            .field("auth_url", &self.auth_url)
            .field("token_url", &self.token_url)
            .field("redirect_url", &self.redirect_url)
            .field("scopes", &self.scopes)
            .finish_non_exhaustive()
    }
}

fn callback_url(base_url: &str, name: &str) -> String {
    format!("{base_url}/auth/{name}/callback")
}

/// Providers detected at startup, keyed by identifier.
#[derive(Debug, Clone, Default)]
pub struct ProviderRegistry {
    providers: BTreeMap<String, ProviderConfig>,
}

impl ProviderRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a provider, replacing any earlier one with the same identifier.
    pub fn insert(&mut self, config: ProviderConfig) {
        self.providers.insert(config.name.clone(), config);
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ProviderConfig> {
        self.providers.get(name)
    }

    /// Provider identifiers in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.providers.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl FromIterator<ProviderConfig> for ProviderRegistry {
    fn from_iter<I: IntoIterator<Item = ProviderConfig>>(iter: I) -> Self {
        let mut registry = Self::new();
        for config in iter {
            registry.insert(config);
        }
        registry
    }
}
