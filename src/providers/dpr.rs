// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Generic Docker private registry provider. No network call, the token is
//! derived from the configured user and password.

use super::{basic_auth, AuthToken, TokenProvider};
use crate::config::{vars, RegistryCredentials};
use crate::error::{RegistryCredsError, Result};
use async_trait::async_trait;

pub const NAME: &str = "dpr";

/// Environment variables naming each credential field, used in error messages
pub(crate) struct CredentialVars {
    pub registry: &'static str,
    pub server: &'static str,
    pub user: &'static str,
    pub password: &'static str,
}

/// Validate static credentials and turn them into a single token
pub(crate) fn static_token(
    credentials: &RegistryCredentials,
    vars: &CredentialVars,
) -> Result<AuthToken> {
    for (value, var) in [
        (&credentials.server, vars.server),
        (&credentials.user, vars.user),
        (&credentials.password, vars.password),
    ] {
        if value.is_empty() {
            return Err(RegistryCredsError::InvalidCredentials(format!(
                "failed to get auth token for {}: empty value for {}",
                vars.registry, var
            )));
        }
    }

    Ok(AuthToken::new(
        basic_auth(&credentials.user, &credentials.password),
        credentials.server.clone(),
    ))
}

#[derive(Debug, Clone)]
pub struct DprTokenProvider {
    credentials: RegistryCredentials,
}

impl DprTokenProvider {
    pub fn new(credentials: RegistryCredentials) -> Self {
        Self { credentials }
    }
}

#[async_trait]
impl TokenProvider for DprTokenProvider {
    async fn acquire(&self) -> Result<Vec<AuthToken>> {
        let token = static_token(
            &self.credentials,
            &CredentialVars {
                registry: "docker private registry",
                server: vars::DPR_SERVER,
                user: vars::DPR_USER,
                password: vars::DPR_PASSWORD,
            },
        )?;
        Ok(vec![token])
    }
}
