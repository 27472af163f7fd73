// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Idempotent application of a pull secret to one namespace

use crate::constants::DEFAULT_SERVICE_ACCOUNT;
use crate::error::Result;
use crate::kubernetes::ClusterStore;
use crate::sync::encoder::RegistryCredentialSecret;
use k8s_openapi::api::core::v1::{LocalObjectReference, ServiceAccount};
use tracing::{debug, info, instrument};

fn secret_reference(name: &str) -> LocalObjectReference {
    LocalObjectReference {
        name: name.to_string(),
    }
}

/// Point the service account at `secret_name`, replacing an entry with the
/// same name in place or appending one. Other entries are left untouched.
pub fn ensure_image_pull_secret(service_account: &mut ServiceAccount, secret_name: &str) {
    let pull_secrets = service_account
        .image_pull_secrets
        .get_or_insert_with(Vec::new);

    match pull_secrets
        .iter()
        .position(|r| r.name == secret_name)
    {
        Some(index) => pull_secrets[index] = secret_reference(secret_name),
        None => pull_secrets.push(secret_reference(secret_name)),
    }
}

/// Write `secret` into `namespace` and reference it from the default service account.
///
/// The secret is created when missing and fully overwritten otherwise. The
/// service account must already exist.
#[instrument(skip(store, secret), fields(secret = %secret.name))]
pub async fn reconcile_namespace(
    store: &dyn ClusterStore,
    namespace: &str,
    secret: &RegistryCredentialSecret,
) -> Result<()> {
    let desired = secret.to_secret();

    match store.get_secret(namespace, &secret.name).await {
        Ok(_) => {
            debug!("Secret {}/{} exists, overwriting", namespace, secret.name);
            store.update_secret(namespace, &desired).await?;
        }
        Err(e) if e.is_not_found() => {
            debug!("Secret {}/{} not found, creating", namespace, secret.name);
            store.create_secret(namespace, &desired).await?;
        }
        Err(e) => return Err(e),
    }

    let mut service_account = store
        .get_service_account(namespace, DEFAULT_SERVICE_ACCOUNT)
        .await?;
    ensure_image_pull_secret(&mut service_account, &secret.name);
    store
        .update_service_account(namespace, &service_account)
        .await?;

    info!(
        "Finished processing secret {} for namespace {}",
        secret.name, namespace
    );
    Ok(())
}
