// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Access to the cluster objects the refresh cycle reads and writes.

use crate::error::{RegistryCredsError, Result};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Namespace, Secret, ServiceAccount};
use kube::{
    api::{ListParams, PostParams},
    Api, Client, ResourceExt,
};
use tracing::{debug, instrument};

/// Cluster object store. `get` fails with `NotFound` when the object is
/// missing, `create` fails with `AlreadyExists` when it is present and
/// `update` fails with `NotFound` when it is missing.
#[async_trait]
pub trait ClusterStore: Send + Sync {
    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Secret>;
    async fn create_secret(&self, namespace: &str, secret: &Secret) -> Result<()>;
    async fn update_secret(&self, namespace: &str, secret: &Secret) -> Result<()>;
    async fn get_service_account(&self, namespace: &str, name: &str) -> Result<ServiceAccount>;
    async fn update_service_account(
        &self,
        namespace: &str,
        service_account: &ServiceAccount,
    ) -> Result<()>;
    async fn list_namespaces(&self) -> Result<Vec<Namespace>>;
}

/// [`ClusterStore`] backed by the Kubernetes API server
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
}

impl KubeStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn secrets(&self, namespace: &str) -> Api<Secret> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn service_accounts(&self, namespace: &str) -> Api<ServiceAccount> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

/// Translate API status codes into the store's typed errors
fn map_api_error(err: kube::Error, kind: &'static str, namespace: &str, name: &str) -> RegistryCredsError {
    match err {
        kube::Error::Api(ref response) if response.code == 404 => RegistryCredsError::NotFound {
            kind,
            namespace: namespace.to_string(),
            name: name.to_string(),
        },
        kube::Error::Api(ref response) if response.code == 409 => {
            RegistryCredsError::AlreadyExists {
                kind,
                namespace: namespace.to_string(),
                name: name.to_string(),
            }
        }
        other => RegistryCredsError::KubeError(other),
    }
}

#[async_trait]
impl ClusterStore for KubeStore {
    #[instrument(skip(self))]
    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Secret> {
        self.secrets(namespace)
            .get(name)
            .await
            .map_err(|e| map_api_error(e, "Secret", namespace, name))
    }

    #[instrument(skip(self, secret), fields(secret = %secret.name_any()))]
    async fn create_secret(&self, namespace: &str, secret: &Secret) -> Result<()> {
        self.secrets(namespace)
            .create(&PostParams::default(), secret)
            .await
            .map_err(|e| map_api_error(e, "Secret", namespace, &secret.name_any()))?;
        debug!("Created secret {}/{}", namespace, secret.name_any());
        Ok(())
    }

    #[instrument(skip(self, secret), fields(secret = %secret.name_any()))]
    async fn update_secret(&self, namespace: &str, secret: &Secret) -> Result<()> {
        let name = secret.name_any();
        self.secrets(namespace)
            .replace(&name, &PostParams::default(), secret)
            .await
            .map_err(|e| map_api_error(e, "Secret", namespace, &name))?;
        debug!("Updated secret {}/{}", namespace, name);
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_service_account(&self, namespace: &str, name: &str) -> Result<ServiceAccount> {
        self.service_accounts(namespace)
            .get(name)
            .await
            .map_err(|e| map_api_error(e, "ServiceAccount", namespace, name))
    }

    #[instrument(skip(self, service_account), fields(service_account = %service_account.name_any()))]
    async fn update_service_account(
        &self,
        namespace: &str,
        service_account: &ServiceAccount,
    ) -> Result<()> {
        let name = service_account.name_any();
        self.service_accounts(namespace)
            .replace(&name, &PostParams::default(), service_account)
            .await
            .map_err(|e| map_api_error(e, "ServiceAccount", namespace, &name))?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_namespaces(&self) -> Result<Vec<Namespace>> {
        let namespaces: Api<Namespace> = Api::all(self.client.clone());
        Ok(namespaces.list(&ListParams::default()).await?.items)
    }
}
