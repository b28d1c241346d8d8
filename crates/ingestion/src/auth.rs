//! OAuth2 access tokens for Google APIs.
//!
//! Inside Cloud Functions / Cloud Run the runtime service account's token
//! comes from the metadata server. Outside of GCP a fixed token can be
//! supplied instead (e.g. `gcloud auth print-access-token`).

use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{IngestionError, Result};

/// Token endpoint of the instance metadata server.
pub const METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";

/// Refresh this long before the reported expiry.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

enum TokenSource {
    Static(String),
    MetadataServer { url: String },
}

#[derive(Clone)]
struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}

/// Absolute expiry for a token valid for `expires_in` seconds.
///
/// Lifetimes too large to represent fall back to the default lifetime.
fn expiry_after(expires_in: u64) -> Instant {
    let now = Instant::now();
    now.checked_add(Duration::from_secs(expires_in))
        .unwrap_or_else(|| now + Duration::from_secs(default_expires_in()))
}

/// GCP access token provider.
pub struct GcpAuth {
    source: TokenSource,
    http: reqwest::Client,
    token: RwLock<Option<CachedToken>>,
}

impl GcpAuth {
    /// Always hand out `token`.
    pub fn from_token(token: impl Into<String>) -> Self {
        Self::with_source(TokenSource::Static(token.into()))
    }

    /// Fetch tokens for the default service account from the metadata server.
    pub fn metadata_server() -> Self {
        Self::metadata_server_at(METADATA_TOKEN_URL)
    }

    /// Same as [`GcpAuth::metadata_server`] against a custom token URL.
    pub fn metadata_server_at(url: impl Into<String>) -> Self {
        Self::with_source(TokenSource::MetadataServer { url: url.into() })
    }

    fn with_source(source: TokenSource) -> Self {
        Self {
            source,
            http: reqwest::Client::new(),
            token: RwLock::new(None),
        }
    }

    /// Get a valid access token, refreshing if needed.
    pub async fn get_token(&self) -> Result<String> {
        let url = match &self.source {
            TokenSource::Static(token) => return Ok(token.clone()),
            TokenSource::MetadataServer { url } => url,
        };

        {
            let token = self.token.read().await;
            if let Some(ref cached) = *token {
                if cached.expires_at > Instant::now() + EXPIRY_MARGIN {
                    return Ok(cached.access_token.clone());
                }
            }
        }

        let fresh = self.fetch_metadata_token(url).await?;
        let access_token = fresh.access_token.clone();
        *self.token.write().await = Some(fresh);

        Ok(access_token)
    }

    async fn fetch_metadata_token(&self, url: &str) -> Result<CachedToken> {
        debug!(url = %url, "Requesting access token from metadata server");

        let response = self
            .http
            .get(url)
            .header("Metadata-Flavor", "Google")
            .send()
            .await
            .map_err(|e| IngestionError::Auth(format!("metadata server request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(IngestionError::Auth(format!(
                "metadata server returned {}: {}",
                status, body
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| IngestionError::Auth(format!("invalid token response: {}", e)))?;

        Ok(CachedToken {
            access_token: token.access_token,
            expires_at: expiry_after(token.expires_in),
        })
    }
}
