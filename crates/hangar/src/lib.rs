//! Hangar
//!
//! A small HTTP server for trying out OAuth2 authorization-code flows. Every
//! provider configured through `<PROVIDER>_CLIENT_ID` and friends gets a
//! redirect route and a callback route that prints the exchanged token.
//!
//! # Example
//!
//! ```no_run
//! use hangar::{Config, HangarServer};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_vars([
//!         ("GITHUB_CLIENT_ID", "abc"),
//!         ("GITHUB_CLIENT_SECRET", "secret"),
//!         ("GITHUB_AUTH_URL", "https://github.com/login/oauth/authorize"),
//!         ("GITHUB_TOKEN_URL", "https://github.com/login/oauth/access_token"),
//!         ("GITHUB_DEFAULT_SCOPES", "repo,user"),
//!     ])?;
//!
//!     HangarServer::new(config).run().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod provider;
pub mod server;

pub use config::Config;
pub use error::{ConfigError, ProviderError, ServerError};
pub use provider::{ProviderConfig, ProviderRegistry};
pub use server::HangarServer;
