// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::retry::{RetryConfig, RetryStrategy};
use anyhow::{anyhow, Context, Result};
use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

/// Environment variables read by [`Config::from_env`]
pub mod vars {
    pub const AWS_ACCOUNT: &str = "awsaccount";
    pub const AWS_REGION: &str = "awsregion";
    pub const AWS_ASSUME_ROLE: &str = "aws_assume_role";
    pub const GCR_URL: &str = "gcrurl";
    pub const DPR_SERVER: &str = "DOCKER_PRIVATE_REGISTRY_SERVER";
    pub const DPR_USER: &str = "DOCKER_PRIVATE_REGISTRY_USER";
    pub const DPR_PASSWORD: &str = "DOCKER_PRIVATE_REGISTRY_PASSWORD";
    pub const ACR_URL: &str = "ACR_URL";
    pub const ACR_CLIENT_ID: &str = "ACR_CLIENT_ID";
    pub const ACR_PASSWORD: &str = "ACR_PASSWORD";
    pub const AWS_SECRET_NAME: &str = "AWS_SECRET_NAME";
    pub const GCR_SECRET_NAME: &str = "GCR_SECRET_NAME";
    pub const DPR_SECRET_NAME: &str = "DPR_SECRET_NAME";
    pub const ACR_SECRET_NAME: &str = "ACR_SECRET_NAME";
    pub const REFRESH_MINS: &str = "REFRESH_MINS";
    pub const SKIP_KUBE_SYSTEM: &str = "SKIP_KUBE_SYSTEM";
    pub const EXCLUDED_NAMESPACES: &str = "EXCLUDED_NAMESPACES";
    pub const TOKEN_RETRY_TYPE: &str = "TOKEN_RETRY_TYPE";
    pub const TOKEN_RETRIES: &str = "TOKEN_RETRIES";
    pub const TOKEN_RETRY_DELAY: &str = "TOKEN_RETRY_DELAY";
}

/// Upper bound for `REFRESH_MINS`, one year
const MAX_REFRESH_MINS: u64 = 365 * 24 * 60;

/// Server, user and password of a registry with static credentials
#[derive(Clone, Default, PartialEq, Eq)]
pub struct RegistryCredentials {
    pub server: String,
    pub user: String,
    pub password: String,
}

impl fmt::Debug for RegistryCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryCredentials")
            .field("server", &self.server)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Operator configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// ECR registry IDs; an empty entry stands for the default account
    pub aws_account_ids: Vec<String>,
    /// Falls back to the AWS profile and environment when unset
    pub aws_region: Option<String>,
    pub aws_assume_role: Option<String>,
    pub gcr_url: String,
    pub dpr: RegistryCredentials,
    pub acr: RegistryCredentials,
    pub aws_secret_name: String,
    pub gcr_secret_name: String,
    pub dpr_secret_name: String,
    pub acr_secret_name: String,
    pub refresh_interval: Duration,
    pub skip_kube_system: bool,
    pub excluded_namespaces: Vec<String>,
    pub retry: RetryConfig,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Empty values count as unset
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());
        let get_or = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let aws_account_ids = match get(vars::AWS_ACCOUNT) {
            Some(ids) => ids.split(',').map(|id| id.trim().to_string()).collect(),
            None => vec![String::new()],
        };

        let gcr_url = get_or(vars::GCR_URL, "https://gcr.io");
        Url::parse(&gcr_url).with_context(|| format!("{} is not a valid URL: {}", vars::GCR_URL, gcr_url))?;

        let refresh_mins: u64 = parse_var(&get, vars::REFRESH_MINS, 60)?;
        if refresh_mins == 0 || refresh_mins > MAX_REFRESH_MINS {
            return Err(anyhow!(
                "{} must be between 1 and {}, got {}",
                vars::REFRESH_MINS,
                MAX_REFRESH_MINS,
                refresh_mins
            ));
        }
        let refresh_secs = refresh_mins
            .checked_mul(60)
            .ok_or_else(|| anyhow!("{} is too large: {}", vars::REFRESH_MINS, refresh_mins))?;

        let strategy = get_or(vars::TOKEN_RETRY_TYPE, "simple")
            .parse::<RetryStrategy>()
            .map_err(|e| anyhow!("{}: {}", vars::TOKEN_RETRY_TYPE, e))?;
        let retry = RetryConfig {
            strategy,
            max_attempts: parse_var(&get, vars::TOKEN_RETRIES, 3)?,
            base_delay: Duration::from_secs(parse_var(&get, vars::TOKEN_RETRY_DELAY, 5)?),
        };

        let excluded_namespaces = get(vars::EXCLUDED_NAMESPACES)
            .map(|list| {
                list.split(',')
                    .map(str::trim)
                    .filter(|ns| !ns.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Config {
            aws_account_ids,
            aws_region: get(vars::AWS_REGION),
            aws_assume_role: get(vars::AWS_ASSUME_ROLE),
            gcr_url,
            dpr: RegistryCredentials {
                server: get_or(vars::DPR_SERVER, ""),
                user: get_or(vars::DPR_USER, ""),
                password: get_or(vars::DPR_PASSWORD, ""),
            },
            acr: RegistryCredentials {
                server: get_or(vars::ACR_URL, ""),
                user: get_or(vars::ACR_CLIENT_ID, ""),
                password: get_or(vars::ACR_PASSWORD, ""),
            },
            aws_secret_name: get_or(vars::AWS_SECRET_NAME, "awsecr-cred"),
            gcr_secret_name: get_or(vars::GCR_SECRET_NAME, "gcr-secret"),
            dpr_secret_name: get_or(vars::DPR_SECRET_NAME, "dpr-secret"),
            acr_secret_name: get_or(vars::ACR_SECRET_NAME, "acr-secret"),
            refresh_interval: Duration::from_secs(refresh_secs),
            skip_kube_system: parse_var(&get, vars::SKIP_KUBE_SYSTEM, true)?,
            excluded_namespaces,
            retry,
        })
    }
}

fn parse_var<T, G>(get: &G, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(value) => value
            .trim()
            .parse()
            .with_context(|| format!("invalid value for {}: {}", key, value)),
        None => Ok(default),
    }
}
