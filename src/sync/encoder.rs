// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Encoding of registry tokens into pull-secret payloads

use crate::constants::secret::{
    DOCKER_CFG_KEY, DOCKER_CFG_TYPE, DOCKER_CONFIG_JSON_KEY, DOCKER_CONFIG_JSON_TYPE,
    EMAIL_PLACEHOLDER, OAUTH2_USERNAME, OPAQUE_TYPE,
};
use crate::error::Result;
use crate::providers::{AuthToken, EncodingMode};
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::ByteString;
use kube::api::ObjectMeta;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretType {
    DockerCfg,
    DockerConfigJson,
    Opaque,
}

impl SecretType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SecretType::DockerCfg => DOCKER_CFG_TYPE,
            SecretType::DockerConfigJson => DOCKER_CONFIG_JSON_TYPE,
            SecretType::Opaque => OPAQUE_TYPE,
        }
    }

    /// Key the payload is stored under, if the type has one
    pub fn data_key(&self) -> Option<&'static str> {
        match self {
            SecretType::DockerCfg => Some(DOCKER_CFG_KEY),
            SecretType::DockerConfigJson => Some(DOCKER_CONFIG_JSON_KEY),
            SecretType::Opaque => None,
        }
    }
}

/// A generated pull secret, rebuilt from scratch every cycle
#[derive(Clone, PartialEq, Eq)]
pub struct RegistryCredentialSecret {
    pub name: String,
    pub secret_type: SecretType,
    pub payload: Vec<u8>,
}

impl std::fmt::Debug for RegistryCredentialSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryCredentialSecret")
            .field("name", &self.name)
            .field("secret_type", &self.secret_type)
            .field("payload_len", &self.payload.len())
            .finish()
    }
}

impl RegistryCredentialSecret {
    pub fn has_payload(&self) -> bool {
        !self.payload.is_empty()
    }

    /// The Kubernetes object written to each namespace
    pub fn to_secret(&self) -> Secret {
        let data = match (self.secret_type.data_key(), self.has_payload()) {
            (Some(key), true) => Some(BTreeMap::from([(
                key.to_string(),
                ByteString(self.payload.clone()),
            )])),
            _ => None,
        };

        Secret {
            metadata: ObjectMeta {
                name: Some(self.name.clone()),
                ..Default::default()
            },
            data,
            type_: Some(self.secret_type.as_str().to_string()),
            ..Default::default()
        }
    }
}

#[derive(Serialize)]
struct DockerConfigJson<'a> {
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    auths: BTreeMap<&'a str, RegistryAuth<'a>>,
}

#[derive(Serialize)]
struct RegistryAuth<'a> {
    auth: &'a str,
    email: &'a str,
}

/// Encode tokens into a pull secret named `secret_name`.
///
/// The legacy format holds a single registry. Given any other number of
/// tokens it yields an `Opaque` secret without payload instead of an error.
pub fn encode(
    tokens: &[AuthToken],
    mode: EncodingMode,
    secret_name: &str,
) -> Result<RegistryCredentialSecret> {
    match mode {
        EncodingMode::MultiRegistryJson => {
            // Later tokens for the same endpoint win
            let auths = tokens
                .iter()
                .map(|token| {
                    (
                        token.endpoint.as_str(),
                        RegistryAuth {
                            auth: &token.access_token,
                            email: EMAIL_PLACEHOLDER,
                        },
                    )
                })
                .collect();

            Ok(RegistryCredentialSecret {
                name: secret_name.to_string(),
                secret_type: SecretType::DockerConfigJson,
                payload: serde_json::to_vec(&DockerConfigJson { auths })?,
            })
        }
        EncodingMode::SingleRegistryLegacy => match tokens {
            [token] => Ok(RegistryCredentialSecret {
                name: secret_name.to_string(),
                secret_type: SecretType::DockerCfg,
                payload: format!(
                    r#"{{"{}":{{"username":"{}","password":"{}","email":"{}"}}}}"#,
                    token.endpoint, OAUTH2_USERNAME, token.access_token, EMAIL_PLACEHOLDER
                )
                .into_bytes(),
            }),
            _ => {
                warn!(
                    "Secret {} uses the single registry format but got {} tokens, leaving it empty",
                    secret_name,
                    tokens.len()
                );
                Ok(RegistryCredentialSecret {
                    name: secret_name.to_string(),
                    secret_type: SecretType::Opaque,
                    payload: Vec::new(),
                })
            }
        },
    }
}
