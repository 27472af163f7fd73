// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Azure Container Registry provider, authenticating with a service principal
//! client ID and password against a fixed login server.

use super::dpr::{static_token, CredentialVars};
use super::{AuthToken, TokenProvider};
use crate::config::{vars, RegistryCredentials};
use crate::error::Result;
use async_trait::async_trait;

pub const NAME: &str = "acr";

#[derive(Debug, Clone)]
pub struct AcrTokenProvider {
    credentials: RegistryCredentials,
}

impl AcrTokenProvider {
    pub fn new(credentials: RegistryCredentials) -> Self {
        Self { credentials }
    }
}

#[async_trait]
impl TokenProvider for AcrTokenProvider {
    async fn acquire(&self) -> Result<Vec<AuthToken>> {
        let token = static_token(
            &self.credentials,
            &CredentialVars {
                registry: "azure container registry",
                server: vars::ACR_URL,
                user: vars::ACR_CLIENT_ID,
                password: vars::ACR_PASSWORD,
            },
        )?;
        Ok(vec![token])
    }
}
