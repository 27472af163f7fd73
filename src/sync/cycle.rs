// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! One refresh cycle: acquire tokens from every provider, encode them and
//! apply the resulting secrets to the namespaces in scope.
//!
//! A cycle never stops early. A failing provider contributes no secret and
//! a failing namespace does not affect the others; failures are collected in
//! the [`CycleReport`].

use crate::error::{RegistryCredsError, Result};
use crate::kubernetes::{target_namespaces, ClusterStore, NamespaceFilter};
use crate::providers::SecretGenerator;
use crate::retry::{RetryConfig, RetryError};
use crate::sync::encoder::{encode, RegistryCredentialSecret};
use crate::sync::reconcile::reconcile_namespace;
use thiserror::Error;
use tracing::{debug, error, info, instrument};

/// Namespaces a cycle applies secrets to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleScope {
    /// The namespace delivered by a watch event
    Namespace(String),
    /// Every namespace in the cluster
    AllNamespaces,
}

#[derive(Error, Debug)]
pub enum ProviderFailure {
    #[error("failed to acquire tokens from {provider}: {source}")]
    Acquire {
        provider: &'static str,
        #[source]
        source: RetryError<RegistryCredsError>,
    },

    #[error("failed to encode secret for {provider}: {source}")]
    Encode {
        provider: &'static str,
        #[source]
        source: RegistryCredsError,
    },
}

impl ProviderFailure {
    pub fn provider(&self) -> &'static str {
        match self {
            ProviderFailure::Acquire { provider, .. } | ProviderFailure::Encode { provider, .. } => {
                *provider
            }
        }
    }
}

/// Result of applying one secret to one namespace
#[derive(Debug)]
pub struct NamespaceOutcome {
    pub namespace: String,
    pub secret_name: String,
    pub result: Result<()>,
}

#[derive(Debug, Default)]
pub struct CycleReport {
    /// Namespaces the cycle targeted
    pub namespaces: Vec<String>,
    pub provider_failures: Vec<ProviderFailure>,
    pub outcomes: Vec<NamespaceOutcome>,
    /// Set when the namespace list could not be read
    pub list_error: Option<RegistryCredsError>,
}

impl CycleReport {
    pub fn failed_outcomes(&self) -> impl Iterator<Item = &NamespaceOutcome> {
        self.outcomes.iter().filter(|o| o.result.is_err())
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    pub fn is_success(&self) -> bool {
        self.list_error.is_none()
            && self.provider_failures.is_empty()
            && self.failed_outcomes().next().is_none()
    }
}

/// Acquire and encode the secret of every generator, in order.
pub async fn generate_secrets(
    generators: &[SecretGenerator],
    retry: &RetryConfig,
) -> (Vec<RegistryCredentialSecret>, Vec<ProviderFailure>) {
    let mut secrets = Vec::with_capacity(generators.len());
    let mut failures = Vec::new();

    for generator in generators {
        debug!(
            "Generating secret {} from provider {}",
            generator.secret_name, generator.name
        );

        let tokens = match retry
            .run(generator.name, || generator.provider.acquire())
            .await
        {
            Ok(tokens) => tokens,
            Err(e) => {
                error!(
                    "Error getting secret for provider {}. Skipping secret provider! [Err: {}]",
                    generator.name, e
                );
                failures.push(ProviderFailure::Acquire {
                    provider: generator.name,
                    source: e,
                });
                continue;
            }
        };

        match encode(&tokens, generator.encoding, &generator.secret_name) {
            Ok(secret) => secrets.push(secret),
            Err(e) => {
                error!(
                    "Error generating secret for provider {}. Skipping secret provider! [Err: {}]",
                    generator.name, e
                );
                failures.push(ProviderFailure::Encode {
                    provider: generator.name,
                    source: e,
                });
            }
        }
    }

    (secrets, failures)
}

async fn resolve_namespaces(
    store: &dyn ClusterStore,
    filter: &NamespaceFilter,
    scope: &CycleScope,
) -> Result<Vec<String>> {
    match scope {
        CycleScope::Namespace(name) if filter.is_excluded(name) => {
            debug!("Namespace {} is excluded, nothing to refresh", name);
            Ok(Vec::new())
        }
        CycleScope::Namespace(name) => Ok(vec![name.clone()]),
        CycleScope::AllNamespaces => target_namespaces(store, filter).await,
    }
}

/// Run one refresh cycle for `scope`. Every (namespace, secret) pair is
/// attempted exactly once.
#[instrument(skip(store, generators, retry, filter))]
pub async fn run_cycle(
    store: &dyn ClusterStore,
    generators: &[SecretGenerator],
    retry: &RetryConfig,
    filter: &NamespaceFilter,
    scope: &CycleScope,
) -> CycleReport {
    let mut report = CycleReport::default();

    report.namespaces = match resolve_namespaces(store, filter, scope).await {
        Ok(namespaces) => namespaces,
        Err(e) => {
            error!("Failed to list namespaces: {}", e);
            report.list_error = Some(e);
            return report;
        }
    };
    if report.namespaces.is_empty() {
        return report;
    }

    info!("Refreshing credentials...");
    let (secrets, failures) = generate_secrets(generators, retry).await;
    report.provider_failures = failures;

    for namespace in &report.namespaces {
        for secret in &secrets {
            let result = reconcile_namespace(store, namespace, secret).await;
            if let Err(e) = &result {
                error!(
                    "Failed to apply secret {} to namespace {}: {}",
                    secret.name, namespace, e
                );
            }
            report.outcomes.push(NamespaceOutcome {
                namespace: namespace.clone(),
                secret_name: secret.name.clone(),
                result,
            });
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{AuthToken, EncodingMode};
    use crate::retry::RetryStrategy;
    use crate::test_utils::{pull_secret_names, FakeProvider, InMemoryStore};
    use std::time::Duration;

    fn generator(
        name: &'static str,
        secret_name: &str,
        encoding: EncodingMode,
        provider: FakeProvider,
    ) -> SecretGenerator {
        SecretGenerator {
            name,
            secret_name: secret_name.to_string(),
            encoding,
            provider: Box::new(provider),
        }
    }

    fn fake_token() -> Vec<AuthToken> {
        vec![AuthToken::new("fakeToken", "fakeEndpoint")]
    }

    /// GCR, ECR, DPR and ACR fakes, with the given ones failing
    fn generators(failing: &[&str]) -> (Vec<SecretGenerator>, Vec<FakeProvider>) {
        let entries = [
            ("gcr", "gcr-secret", EncodingMode::SingleRegistryLegacy),
            ("ecr", "awsecr-cred", EncodingMode::MultiRegistryJson),
            ("dpr", "dpr-secret", EncodingMode::MultiRegistryJson),
            ("acr", "acr-secret", EncodingMode::MultiRegistryJson),
        ];
        let mut providers = Vec::new();
        let generators = entries
            .iter()
            .map(|(name, secret_name, encoding)| {
                let provider = if failing.contains(name) {
                    FakeProvider::failing()
                } else {
                    FakeProvider::returning(fake_token())
                };
                providers.push(provider.clone());
                generator(*name, secret_name, *encoding, provider)
            })
            .collect();
        (generators, providers)
    }

    fn fast_retry(max_attempts: u32) -> RetryConfig {
        RetryConfig {
            strategy: RetryStrategy::Fixed,
            max_attempts,
            base_delay: Duration::from_millis(1),
        }
    }

    fn kube_system_filter() -> NamespaceFilter {
        NamespaceFilter::new(["kube-system"])
    }

    fn store() -> InMemoryStore {
        InMemoryStore::with_namespaces(&["namespace1", "namespace2", "kube-system"])
    }

    #[tokio::test]
    async fn test_full_cycle_creates_all_secrets() {
        let store = store();
        let (generators, _) = generators(&[]);

        let report = run_cycle(
            &store,
            &generators,
            &fast_retry(2),
            &kube_system_filter(),
            &CycleScope::AllNamespaces,
        )
        .await;

        assert!(report.is_success());
        assert_eq!(report.succeeded(), 8);
        for ns in ["namespace1", "namespace2"] {
            let gcr = store.secret(ns, "gcr-secret").unwrap();
            assert_eq!(gcr.type_.as_deref(), Some("kubernetes.io/dockercfg"));
            let ecr = store.secret(ns, "awsecr-cred").unwrap();
            assert_eq!(ecr.type_.as_deref(), Some("kubernetes.io/dockerconfigjson"));
            assert_eq!(
                pull_secret_names(&store, ns),
                vec!["gcr-secret", "awsecr-cred", "dpr-secret", "acr-secret"]
            );
        }
        assert!(store.secret("kube-system", "gcr-secret").is_none());
    }

    #[tokio::test]
    async fn test_running_twice_does_not_duplicate() {
        let store = store();
        let (generators, _) = generators(&[]);

        for _ in 0..2 {
            run_cycle(
                &store,
                &generators,
                &fast_retry(2),
                &kube_system_filter(),
                &CycleScope::AllNamespaces,
            )
            .await;
        }

        assert_eq!(pull_secret_names(&store, "namespace1").len(), 4);
        assert_eq!(store.created_secrets(), 8);
    }

    #[tokio::test]
    async fn test_failing_gcr_does_not_block_ecr() {
        let store = store();
        let (generators, _) = generators(&["gcr"]);

        let report = run_cycle(
            &store,
            &generators,
            &fast_retry(2),
            &kube_system_filter(),
            &CycleScope::Namespace("namespace1".to_string()),
        )
        .await;

        assert_eq!(report.provider_failures.len(), 1);
        assert_eq!(report.provider_failures[0].provider(), "gcr");
        assert!(store.secret("namespace1", "gcr-secret").is_none());
        assert!(store.secret("namespace1", "awsecr-cred").is_some());
        assert_eq!(
            pull_secret_names(&store, "namespace1"),
            vec!["awsecr-cred", "dpr-secret", "acr-secret"]
        );
    }

    #[tokio::test]
    async fn test_failing_provider_is_called_max_attempts_times() {
        let store = store();
        let (generators, providers) = generators(&["gcr", "ecr", "dpr", "acr"]);

        let report = run_cycle(
            &store,
            &generators,
            &fast_retry(2),
            &kube_system_filter(),
            &CycleScope::Namespace("namespace1".to_string()),
        )
        .await;

        assert_eq!(report.provider_failures.len(), 4);
        assert!(report.outcomes.is_empty());
        for provider in providers {
            assert_eq!(provider.calls(), 2);
        }
        assert_eq!(store.mutations(), 0);
    }

    #[tokio::test]
    async fn test_excluded_namespace_is_untouched() {
        let store = store();
        let (generators, providers) = generators(&[]);

        let report = run_cycle(
            &store,
            &generators,
            &fast_retry(2),
            &kube_system_filter(),
            &CycleScope::Namespace("kube-system".to_string()),
        )
        .await;

        assert!(report.outcomes.is_empty());
        assert_eq!(store.mutations(), 0);
        assert!(providers.iter().all(|p| p.calls() == 0));
    }

    #[tokio::test]
    async fn test_failing_namespace_does_not_stop_others() {
        let store = store();
        store.fail_namespace("namespace1");
        let (generators, _) = generators(&[]);

        let report = run_cycle(
            &store,
            &generators,
            &fast_retry(2),
            &kube_system_filter(),
            &CycleScope::AllNamespaces,
        )
        .await;

        assert_eq!(report.outcomes.len(), 8);
        assert_eq!(report.failed_outcomes().count(), 4);
        assert!(report
            .failed_outcomes()
            .all(|o| o.namespace == "namespace1"));
        assert_eq!(pull_secret_names(&store, "namespace2").len(), 4);
    }

    #[tokio::test]
    async fn test_existing_unrelated_pull_secret_survives() {
        let store = store();
        store.add_pull_secret("namespace1", "someOtherSecret");
        let (generators, _) = generators(&[]);

        for _ in 0..3 {
            run_cycle(
                &store,
                &generators,
                &fast_retry(2),
                &kube_system_filter(),
                &CycleScope::Namespace("namespace1".to_string()),
            )
            .await;
        }

        let names = pull_secret_names(&store, "namespace1");
        assert_eq!(names[0], "someOtherSecret");
        assert_eq!(names.len(), 5);
    }

    #[tokio::test]
    async fn test_legacy_provider_with_two_tokens_yields_empty_secret() {
        let store = store();
        let generators = vec![generator(
            "gcr",
            "gcr-secret",
            EncodingMode::SingleRegistryLegacy,
            FakeProvider::returning(vec![
                AuthToken::new("t1", "e1"),
                AuthToken::new("t2", "e2"),
            ]),
        )];

        let report = run_cycle(
            &store,
            &generators,
            &fast_retry(1),
            &kube_system_filter(),
            &CycleScope::Namespace("namespace1".to_string()),
        )
        .await;

        assert!(report.is_success());
        let secret = store.secret("namespace1", "gcr-secret").unwrap();
        assert_eq!(secret.type_.as_deref(), Some("Opaque"));
        assert_eq!(secret.data, None);
    }

    #[tokio::test]
    async fn test_generate_secrets_keeps_provider_order() {
        let (generators, _) = generators(&["dpr"]);

        let (secrets, failures) = generate_secrets(&generators, &fast_retry(1)).await;

        let names: Vec<&str> = secrets.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["gcr-secret", "awsecr-cred", "acr-secret"]);
        assert_eq!(failures.len(), 1);
        assert!(matches!(
            &failures[0],
            ProviderFailure::Acquire { provider: "dpr", source } if source.attempts == 1
        ));
    }
}
