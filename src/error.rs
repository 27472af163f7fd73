// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RegistryCredsError {
    #[error("Kubernetes API error: {0}")]
    KubeError(#[from] kube::Error),

    #[error("{kind} {namespace}/{name} not found")]
    NotFound {
        kind: &'static str,
        namespace: String,
        name: String,
    },

    #[error("{kind} {namespace}/{name} already exists")]
    AlreadyExists {
        kind: &'static str,
        namespace: String,
        name: String,
    },

    #[error("Token provider {provider} failed: {message}")]
    ProviderError {
        provider: &'static str,
        message: String,
    },

    #[error("Invalid registry credentials: {0}")]
    InvalidCredentials(String),

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("Failed to serialize registry config: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl RegistryCredsError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, RegistryCredsError::NotFound { .. })
    }
}

pub type Result<T> = std::result::Result<T, RegistryCredsError>;
