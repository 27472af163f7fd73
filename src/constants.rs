// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

/// Secret types and data keys for registry credentials
pub mod secret {
    /// Type of a legacy single-registry secret
    pub const DOCKER_CFG_TYPE: &str = "kubernetes.io/dockercfg";
    /// Data key of a legacy single-registry secret
    pub const DOCKER_CFG_KEY: &str = ".dockercfg";
    /// Type of a multi-registry secret
    pub const DOCKER_CONFIG_JSON_TYPE: &str = "kubernetes.io/dockerconfigjson";
    /// Data key of a multi-registry secret
    pub const DOCKER_CONFIG_JSON_KEY: &str = ".dockerconfigjson";
    pub const OPAQUE_TYPE: &str = "Opaque";
    /// Username GCR expects when authenticating with an OAuth2 access token
    pub const OAUTH2_USERNAME: &str = "oauth2accesstoken";
    pub const EMAIL_PLACEHOLDER: &str = "none";
}

/// Name of the service account whose image pull secrets are managed
pub const DEFAULT_SERVICE_ACCOUNT: &str = "default";

/// Namespace skipped when `SKIP_KUBE_SYSTEM` is enabled
pub const KUBE_SYSTEM_NAMESPACE: &str = "kube-system";

/// Google credential lookup settings
pub mod gcr {
    pub const METADATA_TOKEN_URL: &str =
        "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";
    pub const METADATA_FLAVOR_HEADER: &str = "Metadata-Flavor";
    pub const METADATA_FLAVOR: &str = "Google";
    /// Path of a service account key file, checked before any other GCP credential
    pub const GOOGLE_APPLICATION_CREDENTIALS: &str = "GOOGLE_APPLICATION_CREDENTIALS";
    pub const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";
    /// Tokens expiring within this many seconds are treated as expired
    pub const EXPIRY_DELTA_SECS: u64 = 10;
}

/// Session name used when assuming an AWS role
pub const AWS_SESSION_NAME: &str = "registry-creds";

/// Capacity of the refresh event channel
pub const EVENT_CHANNEL_CAPACITY: usize = 256;
