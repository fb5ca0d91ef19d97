//! Configuration for the Hangar server.
//!
//! Everything is read once at startup. [`Config::from_vars`] is the loader;
//! [`Config::from_env`] feeds it the process environment layered over an
//! optional env file.

use std::collections::BTreeMap;
use std::io;
use std::path::Path;
use std::time::Duration;

use crate::error::ConfigError;
use crate::provider::{self, ProviderConfig, ProviderRegistry};

/// Defaults and variable names for server settings.
pub mod defaults {
    use std::time::Duration;

    /// Env file read before the process environment.
    pub const ENV_FILE: &str = ".env";

    /// Port used when `PORT` is unset or empty.
    pub const PORT: u16 = 8080;

    /// Host used in the default base URL when `HOST` is empty.
    pub const BASE_URL_HOST: &str = "localhost";

    /// Address bound when `HOST` is empty.
    pub const BIND_ALL: &str = "0.0.0.0";

    /// How long in-flight requests may take to finish after a shutdown signal.
    pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

    pub const HOST_VAR: &str = "HOST";
    pub const PORT_VAR: &str = "PORT";
    pub const BASE_URL_VAR: &str = "BASE_URL";
    pub const SHUTDOWN_TIMEOUT_VAR: &str = "SHUTDOWN_TIMEOUT_SECS";
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Interface to bind; empty means all interfaces.
    pub host: String,

    /// Port to bind.
    pub port: u16,

    /// Public base URL that callback URLs are built from.
    pub base_url: String,

    /// Drain window after a shutdown signal.
    pub shutdown_timeout: Duration,

    /// Providers detected from `<PROVIDER>_CLIENT_ID` variables.
    pub providers: ProviderRegistry,
}

impl Config {
    /// Build configuration from `(name, value)` pairs.
    ///
    /// Later pairs win over earlier ones with the same name. Provider
    /// variables are not validated; missing ones read as empty strings.
    ///
    /// # Errors
    ///
    /// Returns error if `PORT` or `SHUTDOWN_TIMEOUT_SECS` is not a number.
    pub fn from_vars<I, K, V>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let vars: BTreeMap<String, String> =
            vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        let lookup = |name: &str| vars.get(name).cloned().unwrap_or_default();

        let host = lookup(defaults::HOST_VAR);

        let port = match lookup(defaults::PORT_VAR).as_str() {
            "" => defaults::PORT,
            raw => raw
                .parse()
                .map_err(|_| ConfigError::invalid(defaults::PORT_VAR, raw))?,
        };

        let base_url = match lookup(defaults::BASE_URL_VAR) {
            url if url.is_empty() => {
                let host = if host.is_empty() {
                    defaults::BASE_URL_HOST
                } else {
                    host.as_str()
                };
                format!("http://{host}:{port}")
            }
            url => url.trim_end_matches('/').to_owned(),
        };

        let shutdown_timeout = match lookup(defaults::SHUTDOWN_TIMEOUT_VAR).as_str() {
            "" => defaults::SHUTDOWN_TIMEOUT,
            raw => raw
                .parse()
                .map(Duration::from_secs)
                .map_err(|_| ConfigError::invalid(defaults::SHUTDOWN_TIMEOUT_VAR, raw))?,
        };

        let providers: ProviderRegistry = vars
            .keys()
            .filter_map(|key| provider::provider_name(key))
            .map(|name| {
                tracing::info!(provider = %name, "Detected provider configuration");
                ProviderConfig::from_lookup(&name, &base_url, lookup)
            })
            .collect();

        if providers.is_empty() {
            tracing::warn!("No provider configuration detected");
        }

        Ok(Self {
            host,
            port,
            base_url,
            shutdown_timeout,
            providers,
        })
    }

    /// Create configuration from the process environment and an env file.
    ///
    /// Values already in the process environment take precedence over the file.
    ///
    /// # Errors
    ///
    /// Returns error if the env file exists but cannot be read or parsed, or
    /// if a server setting is invalid.
    pub fn from_env(env_file: &Path) -> Result<Self, ConfigError> {
        let file_vars = load_env_file(env_file)?;
        let process_vars = std::env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)));

        Self::from_vars(file_vars.into_iter().chain(process_vars))
    }

    /// Address handed to the listener.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        let host = if self.host.is_empty() {
            defaults::BIND_ALL
        } else {
            self.host.as_str()
        };
        format!("{host}:{}", self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: defaults::PORT,
            base_url: format!("http://{}:{}", defaults::BASE_URL_HOST, defaults::PORT),
            shutdown_timeout: defaults::SHUTDOWN_TIMEOUT,
            providers: ProviderRegistry::new(),
        }
    }
}

/// Read `KEY=value` pairs from an env file without touching the process environment.
///
/// A missing file is not an error.
///
/// # Errors
///
/// Returns error on any other read or parse failure.
pub fn load_env_file(path: &Path) -> Result<Vec<(String, String)>, ConfigError> {
    let to_error = |source| ConfigError::EnvFile {
        path: path.to_path_buf(),
        source,
    };

    match dotenvy::from_path_iter(path) {
        Ok(iter) => iter.collect::<Result<Vec<_>, _>>().map_err(to_error),
        Err(dotenvy::Error::Io(err)) if err.kind() == io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "No env file found");
            Ok(Vec::new())
        }
        Err(err) => Err(to_error(err)),
    }
}
