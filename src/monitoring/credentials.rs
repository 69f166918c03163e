//! Access token sources
//!
//! The token is fetched for every request, so rotated token files and
//! refreshed application-default credentials are picked up without a restart.

use gcp_auth::TokenProvider;
use secrecy::{ExposeSecret, SecretString};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::CredentialsConfig;
use crate::error::{ApiError, StartupError};

/// OAuth scope requested from application-default credentials
pub const MONITORING_READ_SCOPE: &str = "https://www.googleapis.com/auth/monitoring.read";

/// Where the bearer token for each request comes from
#[derive(Clone)]
pub enum TokenSource {
    /// A fixed token
    Static(SecretString),
    /// A file re-read on every request
    File(PathBuf),
    /// Application-default credentials via `gcp_auth`
    Provider(Arc<dyn TokenProvider>),
}

impl TokenSource {
    /// Pick the token source for `credentials`
    ///
    /// An inline token wins over a token file. With neither configured,
    /// application-default credentials are discovered (service account key,
    /// gcloud user credentials, metadata server). The chosen source is
    /// checked once so misconfiguration fails at startup.
    pub async fn resolve(credentials: &CredentialsConfig) -> Result<Self, StartupError> {
        if let Some(ref token) = credentials.access_token {
            if token.expose_secret().trim().is_empty() {
                return Err(StartupError::Credentials(
                    "configured access token is empty".to_string(),
                ));
            }
            debug!("Using inline access token");
            return Ok(Self::Static(token.clone()));
        }

        if let Some(ref path) = credentials.access_token_file {
            read_token_file(path)
                .await
                .map_err(StartupError::Credentials)?;
            debug!(token_path = %path.display(), "Using access token file");
            return Ok(Self::File(path.clone()));
        }

        let provider = gcp_auth::provider().await.map_err(|e| {
            warn!(error = %e, "No application default credentials found");
            StartupError::Credentials(format!(
                "no access token configured and no application default credentials: {}",
                e
            ))
        })?;
        info!("Using application default credentials");
        Ok(Self::Provider(provider))
    }

    /// Current bearer token
    pub async fn token(&self) -> Result<SecretString, ApiError> {
        match self {
            Self::Static(token) => Ok(token.clone()),
            Self::File(path) => read_token_file(path).await.map_err(ApiError::Auth),
            Self::Provider(provider) => {
                let token = provider
                    .token(&[MONITORING_READ_SCOPE])
                    .await
                    .map_err(|e| ApiError::Auth(e.to_string()))?;
                Ok(SecretString::new(token.as_str().to_string()))
            }
        }
    }
}

impl From<SecretString> for TokenSource {
    fn from(token: SecretString) -> Self {
        Self::Static(token)
    }
}

impl fmt::Debug for TokenSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(_) => f.write_str("TokenSource::Static([REDACTED])"),
            Self::File(path) => f.debug_tuple("TokenSource::File").field(path).finish(),
            Self::Provider(_) => f.write_str("TokenSource::Provider"),
        }
    }
}

async fn read_token_file(path: &Path) -> Result<SecretString, String> {
    let contents = tokio::fs::read_to_string(path).await.map_err(|e| {
        warn!(token_path = %path.display(), error = %e, "Failed to read access token file");
        format!("failed to read {}: {}", path.display(), e)
    })?;

    let token = contents.trim();
    if token.is_empty() {
        return Err(format!("access token file {} is empty", path.display()));
    }
    Ok(SecretString::new(token.to_string()))
}
