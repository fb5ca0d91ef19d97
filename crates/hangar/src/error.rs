//! Error types for the Hangar server.
//!
//! Uses `thiserror` for structured error handling with automatic `From` implementations.

use std::path::PathBuf;

use oauth2::basic::BasicErrorResponse;
use oauth2::url::ParseError;
use oauth2::{HttpClientError, RequestTokenError};

/// Error returned by the `oauth2` crate when a code exchange fails.
pub type ExchangeError = RequestTokenError<HttpClientError<reqwest::Error>, BasicErrorResponse>;

/// Errors raised while assembling configuration at startup.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// The environment file exists but could not be read or parsed
    #[error("Error loading env file {}", path.display())]
    EnvFile {
        /// Path that was read
        path: PathBuf,
        /// Underlying dotenvy error
        #[source]
        source: dotenvy::Error,
    },

    /// A server setting holds a value that cannot be used
    #[error("Invalid value {value:?} for {name}")]
    Invalid {
        /// Environment variable name
        name: &'static str,
        /// Offending value
        value: String,
    },
}

impl ConfigError {
    /// Create an invalid value error.
    #[must_use]
    pub fn invalid(name: &'static str, value: impl Into<String>) -> Self {
        Self::Invalid {
            name,
            value: value.into(),
        }
    }
}

/// Errors from talking to an OAuth2 provider.
///
/// These never abort the server; handlers render them into the response body.
#[derive(thiserror::Error, Debug)]
pub enum ProviderError {
    /// The configured authorization URL does not parse
    #[error("invalid authorization URL {url:?}")]
    InvalidAuthUrl {
        /// Configured value
        url: String,
        /// Parse failure
        #[source]
        source: ParseError,
    },

    /// The configured token URL does not parse
    #[error("invalid token URL {url:?}")]
    InvalidTokenUrl {
        /// Configured value
        url: String,
        /// Parse failure
        #[source]
        source: ParseError,
    },

    /// The computed redirect URL does not parse
    #[error("invalid redirect URL {url:?}")]
    InvalidRedirectUrl {
        /// Computed value
        url: String,
        /// Parse failure
        #[source]
        source: ParseError,
    },

    /// The provider declined the authorization request
    #[error("authorization denied: {0}")]
    Denied(String),

    /// The token endpoint rejected the code or could not be reached
    #[error("token exchange failed")]
    Exchange(#[from] ExchangeError),

    /// The token response could not be rendered
    #[error("failed to render token: {0}")]
    Render(#[from] serde_json::Error),
}

impl ProviderError {
    /// Flatten the error and its sources into a single line for the response body.
    #[must_use]
    pub fn to_user_message(&self) -> String {
        let mut message = self.to_string();
        let mut source = std::error::Error::source(self);
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        message
    }
}

/// Errors that stop the server.
#[derive(thiserror::Error, Debug)]
pub enum ServerError {
    /// The listener could not bind its address
    #[error("failed to bind {addr}")]
    Bind {
        /// Address that was requested
        addr: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The accept/serve loop failed
    #[error("server error: {0}")]
    Serve(#[from] std::io::Error),

    /// The outbound HTTP client used for token exchange could not be built
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Result type alias for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_includes_source() {
        let source = oauth2::AuthUrl::new("not a url".to_string()).unwrap_err();
        let err = ProviderError::InvalidAuthUrl {
            url: "not a url".to_string(),
            source,
        };
        let message = err.to_user_message();
        assert!(message.starts_with("invalid authorization URL \"not a url\": "));
        assert!(message.len() > "invalid authorization URL \"not a url\": ".len());
    }

    #[test]
    fn test_denied_message() {
        let err = ProviderError::Denied("access_denied".to_string());
        assert_eq!(err.to_user_message(), "authorization denied: access_denied");
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::invalid("PORT", "eighty");
        assert_eq!(err.to_string(), "Invalid value \"eighty\" for PORT");
    }
}
