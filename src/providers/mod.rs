// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Registry token providers.
//!
//! Every provider yields a list of [`AuthToken`]s in the same shape so the
//! refresh cycle can drive them through one loop.

pub mod acr;
pub mod dpr;
pub mod ecr;
pub mod gcr;

use crate::config::Config;
use crate::error::Result;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::fmt;

pub use acr::AcrTokenProvider;
pub use dpr::DprTokenProvider;
pub use ecr::{AwsEcrAuthorizer, EcrAuthorizer, EcrTokenProvider};
pub use gcr::{
    ChainTokenSource, GcpAuthTokenSource, GcrTokenProvider, GcrTokenSource, MetadataTokenSource,
    OAuthToken,
};

/// A registry credential valid for one refresh cycle
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken {
    pub access_token: String,
    pub endpoint: String,
}

impl AuthToken {
    pub fn new(access_token: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            endpoint: endpoint.into(),
        }
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthToken")
            .field("access_token", &"<redacted>")
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

/// Wire format used to serialize a provider's tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodingMode {
    /// `.dockercfg` holding exactly one registry
    SingleRegistryLegacy,
    /// `.dockerconfigjson` with an `auths` map
    MultiRegistryJson,
}

#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn acquire(&self) -> Result<Vec<AuthToken>>;
}

/// Static description of a provider and the secret it feeds
pub struct SecretGenerator {
    pub name: &'static str,
    pub secret_name: String,
    pub encoding: EncodingMode,
    pub provider: Box<dyn TokenProvider>,
}

impl fmt::Debug for SecretGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretGenerator")
            .field("name", &self.name)
            .field("secret_name", &self.secret_name)
            .field("encoding", &self.encoding)
            .finish_non_exhaustive()
    }
}

/// Base64 of `user:password`, the form registries expect in the `auth` field
pub fn basic_auth(user: &str, password: &str) -> String {
    STANDARD.encode(format!("{}:{}", user, password))
}

/// Build the generators in refresh order: GCR, ECR, DPR, ACR.
pub async fn build_generators(config: &Config) -> Vec<SecretGenerator> {
    let ecr_authorizer =
        AwsEcrAuthorizer::new(config.aws_region.as_deref(), config.aws_assume_role.as_deref()).await;

    vec![
        SecretGenerator {
            name: gcr::NAME,
            secret_name: config.gcr_secret_name.clone(),
            encoding: EncodingMode::SingleRegistryLegacy,
            provider: Box::new(GcrTokenProvider::new(
                ChainTokenSource::ambient().await,
                config.gcr_url.clone(),
            )),
        },
        SecretGenerator {
            name: ecr::NAME,
            secret_name: config.aws_secret_name.clone(),
            encoding: EncodingMode::MultiRegistryJson,
            provider: Box::new(EcrTokenProvider::new(
                ecr_authorizer,
                config.aws_account_ids.clone(),
            )),
        },
        SecretGenerator {
            name: dpr::NAME,
            secret_name: config.dpr_secret_name.clone(),
            encoding: EncodingMode::MultiRegistryJson,
            provider: Box::new(DprTokenProvider::new(config.dpr.clone())),
        },
        SecretGenerator {
            name: acr::NAME,
            secret_name: config.acr_secret_name.clone(),
            encoding: EncodingMode::MultiRegistryJson,
            provider: Box::new(AcrTokenProvider::new(config.acr.clone())),
        },
    ]
}
