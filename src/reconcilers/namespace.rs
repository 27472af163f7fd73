// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Namespace reconciler - watches Namespaces and asks the refresh manager to
//! provision them.

use crate::error::{RegistryCredsError, Result};
use crate::sync::{RefreshEvent, RefreshHandle};
use futures::StreamExt;
use k8s_openapi::api::core::v1::Namespace;
use kube::{
    runtime::{controller::Action, Controller},
    Api, Client, ResourceExt,
};
use kube_runtime::watcher::Config as WatcherConfig;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

pub struct NamespaceReconciler {
    client: Client,
    refresh_handle: RefreshHandle,
}

impl NamespaceReconciler {
    pub fn new(client: Client, refresh_handle: RefreshHandle) -> Self {
        Self {
            client,
            refresh_handle,
        }
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let namespaces: Api<Namespace> = Api::all(self.client.clone());
        let context = Arc::new(self);

        Controller::new(namespaces, WatcherConfig::default())
            .run(reconcile, error_policy, context)
            .for_each(|res| async move {
                match res {
                    Ok(o) => debug!("Reconciled namespace: {:?}", o),
                    Err(e) => warn!("Reconciliation error: {:?}", e),
                }
            })
            .await;

        Ok(())
    }
}

async fn reconcile(namespace: Arc<Namespace>, ctx: Arc<NamespaceReconciler>) -> Result<Action> {
    let name = namespace.name_any();

    if namespace.metadata.deletion_timestamp.is_some() {
        debug!("Namespace {} is terminating, skipping", name);
        return Ok(Action::await_change());
    }

    debug!("Reconciling namespace: {}", name);
    ctx.refresh_handle
        .send(RefreshEvent::NamespaceChanged { name })
        .await;

    Ok(Action::await_change())
}

fn error_policy(
    _namespace: Arc<Namespace>,
    error: &RegistryCredsError,
    _ctx: Arc<NamespaceReconciler>,
) -> Action {
    error!("Reconciliation error: {}", error);
    Action::requeue(Duration::from_secs(60))
}
