// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Google Container Registry provider. Tokens come from the application
//! default credential chain: a service account key, gcloud credentials or
//! the metadata server.

use super::{AuthToken, TokenProvider};
use crate::constants::gcr::{
    CLOUD_PLATFORM_SCOPE, EXPIRY_DELTA_SECS, GOOGLE_APPLICATION_CREDENTIALS, METADATA_FLAVOR,
    METADATA_FLAVOR_HEADER, METADATA_TOKEN_URL,
};
use crate::error::{RegistryCredsError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tracing::{debug, info, instrument, warn};
use url::Url;

pub const NAME: &str = "gcr";

/// An OAuth2 access token as handed out by a token source
#[derive(Debug, Clone)]
pub struct OAuthToken {
    pub access_token: String,
    pub token_type: String,
    /// `None` means the token never expires
    pub expiry: Option<SystemTime>,
}

impl OAuthToken {
    /// Token type with the usual casing; an empty type means `Bearer`
    pub fn token_type(&self) -> String {
        match self.token_type.to_ascii_lowercase().as_str() {
            "" | "bearer" => "Bearer".to_string(),
            "mac" => "MAC".to_string(),
            "basic" => "Basic".to_string(),
            _ => self.token_type.clone(),
        }
    }

    pub fn is_valid(&self) -> bool {
        !self.access_token.is_empty() && !self.is_expired()
    }

    fn is_expired(&self) -> bool {
        self.expiry.is_some_and(|expiry| {
            expiry <= SystemTime::now() + Duration::from_secs(EXPIRY_DELTA_SECS)
        })
    }
}

#[async_trait]
pub trait GcrTokenSource: Send + Sync {
    async fn token(&self) -> Result<OAuthToken>;
}

#[derive(Debug, Deserialize)]
struct MetadataTokenResponse {
    access_token: String,
    #[serde(default)]
    token_type: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

/// Reads tokens for the default service account from the GCE/GKE metadata server
#[derive(Debug, Clone)]
pub struct MetadataTokenSource {
    http: reqwest::Client,
    token_url: String,
}

impl MetadataTokenSource {
    pub fn new() -> Self {
        Self::with_token_url(METADATA_TOKEN_URL)
    }

    pub fn with_token_url(token_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            token_url: token_url.to_string(),
        }
    }
}

impl Default for MetadataTokenSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GcrTokenSource for MetadataTokenSource {
    async fn token(&self) -> Result<OAuthToken> {
        let mut url = Url::parse(&self.token_url)?;
        url.query_pairs_mut()
            .append_pair("scopes", CLOUD_PLATFORM_SCOPE);

        let response: MetadataTokenResponse = self
            .http
            .get(url)
            .header(METADATA_FLAVOR_HEADER, METADATA_FLAVOR)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(OAuthToken {
            access_token: response.access_token,
            token_type: response.token_type,
            expiry: response
                .expires_in
                .map(|secs| SystemTime::now() + Duration::from_secs(secs)),
        })
    }
}

/// Token source backed by a `gcp_auth` credential, such as a service
/// account key or the gcloud user credentials
pub struct GcpAuthTokenSource {
    credential: Arc<dyn gcp_auth::TokenProvider>,
}

impl GcpAuthTokenSource {
    pub fn new(credential: Arc<dyn gcp_auth::TokenProvider>) -> Self {
        Self { credential }
    }
}

#[async_trait]
impl GcrTokenSource for GcpAuthTokenSource {
    async fn token(&self) -> Result<OAuthToken> {
        let token = self
            .credential
            .token(&[CLOUD_PLATFORM_SCOPE])
            .await
            .map_err(|e| RegistryCredsError::ProviderError {
                provider: NAME,
                message: e.to_string(),
            })?;

        Ok(OAuthToken {
            access_token: token.as_str().to_string(),
            token_type: "Bearer".to_string(),
            expiry: Some(SystemTime::from(token.expires_at())),
        })
    }
}

/// Ordered list of token sources. The first source that hands out a token
/// wins; later sources are only asked when earlier ones fail.
#[derive(Default)]
pub struct ChainTokenSource {
    sources: Vec<(&'static str, Box<dyn GcrTokenSource>)>,
}

impl ChainTokenSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_source(mut self, name: &'static str, source: impl GcrTokenSource + 'static) -> Self {
        let source: Box<dyn GcrTokenSource> = Box::new(source);
        self.sources.push((name, source));
        self
    }

    /// Names of the configured sources, in lookup order
    pub fn source_names(&self) -> Vec<&'static str> {
        self.sources.iter().map(|(name, _)| *name).collect()
    }

    /// The application default credential chain: the key file named by
    /// `GOOGLE_APPLICATION_CREDENTIALS`, then the gcloud well-known
    /// credentials file, then the metadata server.
    pub async fn ambient() -> Self {
        let mut chain = Self::new();

        match gcp_auth::CustomServiceAccount::from_env() {
            Ok(Some(account)) => {
                info!("Using GCP service account key from {}", GOOGLE_APPLICATION_CREDENTIALS);
                chain = chain.with_source(
                    "service account key",
                    GcpAuthTokenSource::new(Arc::new(account)),
                );
            }
            Ok(None) => debug!("{} is not set", GOOGLE_APPLICATION_CREDENTIALS),
            Err(e) => warn!(
                "Ignoring unreadable GCP service account key from {}: {}",
                GOOGLE_APPLICATION_CREDENTIALS, e
            ),
        }

        match gcp_auth::ConfigDefaultCredentials::new().await {
            Ok(credentials) => {
                chain = chain.with_source(
                    "gcloud credentials",
                    GcpAuthTokenSource::new(Arc::new(credentials)),
                );
            }
            Err(e) => debug!("No gcloud default credentials: {}", e),
        }

        chain.with_source("metadata server", MetadataTokenSource::new())
    }
}

#[async_trait]
impl GcrTokenSource for ChainTokenSource {
    async fn token(&self) -> Result<OAuthToken> {
        let mut last_error = None;

        for (name, source) in &self.sources {
            match source.token().await {
                Ok(token) => {
                    debug!("Obtained GCP token from {}", name);
                    return Ok(token);
                }
                Err(e) => {
                    debug!("GCP token source {} failed: {}", name, e);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| RegistryCredsError::ProviderError {
            provider: NAME,
            message: "no GCP credential source available".to_string(),
        }))
    }
}

pub struct GcrTokenProvider<S> {
    source: S,
    endpoint: String,
}

impl<S: GcrTokenSource> GcrTokenProvider<S> {
    pub fn new(source: S, endpoint: String) -> Self {
        Self { source, endpoint }
    }
}

#[async_trait]
impl<S: GcrTokenSource> TokenProvider for GcrTokenProvider<S> {
    #[instrument(skip(self), fields(provider = NAME))]
    async fn acquire(&self) -> Result<Vec<AuthToken>> {
        let token = self.source.token().await?;

        if !token.is_valid() {
            return Err(RegistryCredsError::InvalidToken(
                "token was invalid".to_string(),
            ));
        }

        let token_type = token.token_type();
        if token_type != "Bearer" {
            return Err(RegistryCredsError::InvalidToken(format!(
                "expected token type \"Bearer\" but got \"{}\"",
                token_type
            )));
        }

        debug!("Obtained GCR token for {}", self.endpoint);
        Ok(vec![AuthToken::new(token.access_token, self.endpoint.clone())])
    }
}
