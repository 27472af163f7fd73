// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! AWS Elastic Container Registry provider

use super::{AuthToken, TokenProvider};
use crate::constants::AWS_SESSION_NAME;
use crate::error::{RegistryCredsError, Result};
use async_trait::async_trait;
use aws_config::{sts::AssumeRoleProvider, BehaviorVersion, ConfigLoader, Region};
use aws_sdk_ecr::{error::DisplayErrorContext, Client as EcrClient};
use tracing::{debug, info, instrument};

pub const NAME: &str = "ecr";

/// Seam over the ECR `GetAuthorizationToken` call
#[async_trait]
pub trait EcrAuthorizer: Send + Sync {
    /// Fetch one token per registry ID in a single call. An empty list asks
    /// for the caller's default registry.
    async fn authorization_tokens(&self, registry_ids: Vec<String>) -> Result<Vec<AuthToken>>;
}

/// [`EcrAuthorizer`] backed by the AWS SDK and the default credential chain
pub struct AwsEcrAuthorizer {
    client: EcrClient,
}

/// Shared config loader; without an explicit region the SDK resolves it
/// from the environment and the AWS profile
fn config_loader(region: Option<Region>) -> ConfigLoader {
    let loader = aws_config::defaults(BehaviorVersion::latest());
    match region {
        Some(region) => loader.region(region),
        None => loader,
    }
}

impl AwsEcrAuthorizer {
    pub async fn new(region: Option<&str>, assume_role: Option<&str>) -> Self {
        let base = config_loader(region.map(|r| Region::new(r.to_string())))
            .load()
            .await;

        let sdk_config = match assume_role {
            Some(role_arn) => {
                info!("Assuming AWS role {} for ECR", role_arn);
                let provider = AssumeRoleProvider::builder(role_arn)
                    .session_name(AWS_SESSION_NAME)
                    .configure(&base)
                    .build()
                    .await;
                config_loader(base.region().cloned())
                    .credentials_provider(provider)
                    .load()
                    .await
            }
            None => base,
        };

        debug!("ECR client configured for region {:?}", sdk_config.region());
        Self {
            client: EcrClient::new(&sdk_config),
        }
    }
}

#[async_trait]
impl EcrAuthorizer for AwsEcrAuthorizer {
    #[allow(deprecated)]
    async fn authorization_tokens(&self, registry_ids: Vec<String>) -> Result<Vec<AuthToken>> {
        let mut request = self.client.get_authorization_token();
        if !registry_ids.is_empty() {
            request = request.set_registry_ids(Some(registry_ids));
        }

        let output = request
            .send()
            .await
            .map_err(|e| RegistryCredsError::ProviderError {
                provider: NAME,
                message: DisplayErrorContext(&e).to_string(),
            })?;

        output
            .authorization_data()
            .iter()
            .map(|data| {
                match (data.authorization_token(), data.proxy_endpoint()) {
                    (Some(token), Some(endpoint)) => Ok(AuthToken::new(token, endpoint)),
                    _ => Err(RegistryCredsError::ProviderError {
                        provider: NAME,
                        message: "authorization data without token or proxy endpoint".to_string(),
                    }),
                }
            })
            .collect()
    }
}

pub struct EcrTokenProvider<A> {
    authorizer: A,
    account_ids: Vec<String>,
}

impl<A: EcrAuthorizer> EcrTokenProvider<A> {
    pub fn new(authorizer: A, account_ids: Vec<String>) -> Self {
        Self {
            authorizer,
            account_ids,
        }
    }

    /// Account IDs to send, with empty entries (the "default account" sentinel) removed
    fn registry_ids(&self) -> Vec<String> {
        self.account_ids
            .iter()
            .map(|id| id.trim())
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .collect()
    }
}

#[async_trait]
impl<A: EcrAuthorizer> TokenProvider for EcrTokenProvider<A> {
    #[instrument(skip(self), fields(provider = NAME))]
    async fn acquire(&self) -> Result<Vec<AuthToken>> {
        let registry_ids = self.registry_ids();
        debug!("Requesting ECR tokens for {} registry id(s)", registry_ids.len());
        self.authorizer.authorization_tokens(registry_ids).await
    }
}
