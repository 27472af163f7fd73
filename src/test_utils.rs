// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Test utilities for mocking Kubernetes API responses and the cluster store.

use crate::config::Config;
use crate::error::{RegistryCredsError, Result};
use crate::kubernetes::ClusterStore;
use crate::providers::{AuthToken, TokenProvider};
use crate::retry::{RetryConfig, RetryStrategy};
use crate::sync::reconcile::ensure_image_pull_secret;
use async_trait::async_trait;
use bytes::Bytes;
use http::{Request, Response};
use http_body_util::BodyExt;
use k8s_openapi::api::core::v1::{Namespace, Secret, ServiceAccount};
use kube::api::ObjectMeta;
use kube::client::Body;
use kube::{Client, ResourceExt};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;
use tower::Service;

/// A request seen by [`MockService`]
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub body: Bytes,
}

/// A mock HTTP service that returns predefined responses based on request paths.
#[derive(Clone, Default)]
pub struct MockService {
    responses: Arc<Mutex<HashMap<(String, String), (u16, String)>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockService {
    pub fn new() -> Self {
        Self::default()
    }

    fn on(self, method: &str, path: &str, status: u16, body: &str) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert((method.to_string(), path.to_string()), (status, body.to_string()));
        self
    }

    /// Add a response for GET requests matching the exact path
    pub fn on_get(self, path: &str, status: u16, body: &str) -> Self {
        self.on("GET", path, status, body)
    }

    /// Add a response for POST requests matching the exact path
    pub fn on_post(self, path: &str, status: u16, body: &str) -> Self {
        self.on("POST", path, status, body)
    }

    /// Add a response for PUT requests matching the exact path
    pub fn on_put(self, path: &str, status: u16, body: &str) -> Self {
        self.on("PUT", path, status, body)
    }

    /// Requests received so far, in order
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Build a kube Client from this mock service
    pub fn into_client(self) -> Client {
        Client::new(self, "https://kubernetes.default.svc")
    }

    fn find_response(&self, method: &str, path: &str) -> Option<(u16, String)> {
        self.responses
            .lock()
            .unwrap()
            .get(&(method.to_string(), path.to_string()))
            .cloned()
    }
}

impl Service<Request<Body>> for MockService {
    type Response = Response<Body>;
    type Error = tower::BoxError;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = std::result::Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<std::result::Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let response = self.find_response(req.method().as_str(), req.uri().path());
        Box::pin(respond(req, response, self.requests.clone()))
    }
}

async fn respond(
    req: Request<Body>,
    response: Option<(u16, String)>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
) -> std::result::Result<Response<Body>, tower::BoxError> {
    let method = req.method().to_string();
    let path = req.uri().path().to_string();
    let body = req.into_body().collect().await?.to_bytes();
    requests
        .lock()
        .unwrap()
        .push(RecordedRequest { method, path, body });

    // Default 404 for unmatched requests
    let (status, body) = response.unwrap_or_else(|| (404, not_found_json("resource", "unknown")));
    Ok(Response::builder()
        .status(status)
        .header("content-type", "application/json")
        .body(Body::from(body.into_bytes()))
        .unwrap())
}

/// Create a 404 not found response
pub fn not_found_json(resource: &str, name: &str) -> String {
    serde_json::json!({
        "kind": "Status",
        "apiVersion": "v1",
        "status": "Failure",
        "message": format!("{} \"{}\" not found", resource, name),
        "reason": "NotFound",
        "code": 404
    })
    .to_string()
}

#[derive(Default)]
struct StoreState {
    namespaces: Vec<String>,
    secrets: BTreeMap<(String, String), Secret>,
    service_accounts: BTreeMap<(String, String), ServiceAccount>,
    failing_namespaces: BTreeSet<String>,
    created_secrets: usize,
    mutations: usize,
}

/// In-memory [`ClusterStore`] honouring the get/create/update contract
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<StoreState>>,
}

fn key(namespace: &str, name: &str) -> (String, String) {
    (namespace.to_string(), name.to_string())
}

fn not_found(kind: &'static str, namespace: &str, name: &str) -> RegistryCredsError {
    RegistryCredsError::NotFound {
        kind,
        namespace: namespace.to_string(),
        name: name.to_string(),
    }
}

impl InMemoryStore {
    /// Store with the given namespaces, each holding a `default` service account
    pub fn with_namespaces(namespaces: &[&str]) -> Self {
        let store = Self::default();
        {
            let mut state = store.state.lock().unwrap();
            for ns in namespaces {
                state.namespaces.push(ns.to_string());
                state.service_accounts.insert(
                    key(ns, "default"),
                    ServiceAccount {
                        metadata: ObjectMeta {
                            name: Some("default".to_string()),
                            namespace: Some(ns.to_string()),
                            ..Default::default()
                        },
                        ..Default::default()
                    },
                );
            }
        }
        store
    }

    /// Make every object operation in `namespace` fail
    pub fn fail_namespace(&self, namespace: &str) {
        self.state
            .lock()
            .unwrap()
            .failing_namespaces
            .insert(namespace.to_string());
    }

    pub fn insert_secret(&self, namespace: &str, secret: Secret) {
        self.state
            .lock()
            .unwrap()
            .secrets
            .insert(key(namespace, &secret.name_any()), secret);
    }

    pub fn add_pull_secret(&self, namespace: &str, secret_name: &str) {
        let mut state = self.state.lock().unwrap();
        if let Some(sa) = state.service_accounts.get_mut(&key(namespace, "default")) {
            ensure_image_pull_secret(sa, secret_name);
        }
    }

    pub fn remove_service_account(&self, namespace: &str, name: &str) {
        self.state
            .lock()
            .unwrap()
            .service_accounts
            .remove(&key(namespace, name));
    }

    pub fn secret(&self, namespace: &str, name: &str) -> Option<Secret> {
        self.state
            .lock()
            .unwrap()
            .secrets
            .get(&key(namespace, name))
            .cloned()
    }

    pub fn service_account(&self, namespace: &str, name: &str) -> Option<ServiceAccount> {
        self.state
            .lock()
            .unwrap()
            .service_accounts
            .get(&key(namespace, name))
            .cloned()
    }

    /// Number of successful secret creations
    pub fn created_secrets(&self) -> usize {
        self.state.lock().unwrap().created_secrets
    }

    /// Number of successful create or update calls of any kind
    pub fn mutations(&self) -> usize {
        self.state.lock().unwrap().mutations
    }

    fn check_namespace(&self, namespace: &str) -> Result<()> {
        if self.state.lock().unwrap().failing_namespaces.contains(namespace) {
            return Err(RegistryCredsError::ProviderError {
                provider: "store",
                message: format!("injected failure in namespace {}", namespace),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ClusterStore for InMemoryStore {
    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Secret> {
        self.check_namespace(namespace)?;
        self.secret(namespace, name)
            .ok_or_else(|| not_found("Secret", namespace, name))
    }

    async fn create_secret(&self, namespace: &str, secret: &Secret) -> Result<()> {
        self.check_namespace(namespace)?;
        let name = secret.name_any();
        let mut state = self.state.lock().unwrap();
        if state.secrets.contains_key(&key(namespace, &name)) {
            return Err(RegistryCredsError::AlreadyExists {
                kind: "Secret",
                namespace: namespace.to_string(),
                name,
            });
        }
        state.secrets.insert(key(namespace, &name), secret.clone());
        state.created_secrets += 1;
        state.mutations += 1;
        Ok(())
    }

    async fn update_secret(&self, namespace: &str, secret: &Secret) -> Result<()> {
        self.check_namespace(namespace)?;
        let name = secret.name_any();
        let mut state = self.state.lock().unwrap();
        match state.secrets.get_mut(&key(namespace, &name)) {
            Some(existing) => *existing = secret.clone(),
            None => return Err(not_found("Secret", namespace, &name)),
        }
        state.mutations += 1;
        Ok(())
    }

    async fn get_service_account(&self, namespace: &str, name: &str) -> Result<ServiceAccount> {
        self.check_namespace(namespace)?;
        self.service_account(namespace, name)
            .ok_or_else(|| not_found("ServiceAccount", namespace, name))
    }

    async fn update_service_account(
        &self,
        namespace: &str,
        service_account: &ServiceAccount,
    ) -> Result<()> {
        self.check_namespace(namespace)?;
        let name = service_account.name_any();
        let mut state = self.state.lock().unwrap();
        match state.service_accounts.get_mut(&key(namespace, &name)) {
            Some(existing) => *existing = service_account.clone(),
            None => return Err(not_found("ServiceAccount", namespace, &name)),
        }
        state.mutations += 1;
        Ok(())
    }

    async fn list_namespaces(&self) -> Result<Vec<Namespace>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .namespaces
            .iter()
            .map(|name| Namespace {
                metadata: ObjectMeta {
                    name: Some(name.clone()),
                    ..Default::default()
                },
                ..Default::default()
            })
            .collect())
    }
}

/// Names in the default service account's image pull secrets, in order
pub fn pull_secret_names(store: &InMemoryStore, namespace: &str) -> Vec<String> {
    store
        .service_account(namespace, "default")
        .and_then(|sa| sa.image_pull_secrets)
        .unwrap_or_default()
        .into_iter()
        .map(|r| r.name)
        .collect()
}

/// Default configuration with fast, bounded retries
pub fn test_config() -> Config {
    let mut config = Config::from_lookup(|_| None).unwrap();
    config.retry = RetryConfig {
        strategy: RetryStrategy::Fixed,
        max_attempts: 2,
        base_delay: Duration::from_millis(1),
    };
    config
}

/// Token provider returning fixed tokens, or always failing, and counting calls
#[derive(Clone)]
pub struct FakeProvider {
    tokens: Option<Vec<AuthToken>>,
    calls: Arc<AtomicU32>,
}

impl FakeProvider {
    pub fn returning(tokens: Vec<AuthToken>) -> Self {
        Self {
            tokens: Some(tokens),
            calls: Arc::new(AtomicU32::new(0)),
        }
    }

    pub fn failing() -> Self {
        Self {
            tokens: None,
            calls: Arc::new(AtomicU32::new(0)),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenProvider for FakeProvider {
    async fn acquire(&self) -> Result<Vec<AuthToken>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.tokens
            .clone()
            .ok_or_else(|| RegistryCredsError::ProviderError {
                provider: "fake",
                message: "token service unavailable".to_string(),
            })
    }
}
