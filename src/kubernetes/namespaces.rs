// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Namespace selection utilities

use crate::config::Config;
use crate::constants::KUBE_SYSTEM_NAMESPACE;
use crate::error::Result;
use crate::kubernetes::ClusterStore;
use kube::ResourceExt;
use std::collections::BTreeSet;
use tracing::debug;

/// Namespaces that never receive registry credentials
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamespaceFilter {
    excluded: BTreeSet<String>,
}

impl NamespaceFilter {
    pub fn new<I, S>(excluded: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            excluded: excluded.into_iter().map(Into::into).collect(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let mut filter = Self::new(config.excluded_namespaces.iter().cloned());
        if config.skip_kube_system {
            filter.excluded.insert(KUBE_SYSTEM_NAMESPACE.to_string());
        }
        filter
    }

    pub fn is_excluded(&self, namespace: &str) -> bool {
        self.excluded.contains(namespace)
    }
}

/// Names of all namespaces that are not excluded
pub async fn target_namespaces(
    store: &dyn ClusterStore,
    filter: &NamespaceFilter,
) -> Result<Vec<String>> {
    let namespaces = store.list_namespaces().await?;

    Ok(namespaces
        .iter()
        .map(|ns| ns.name_any())
        .filter(|name| {
            let excluded = filter.is_excluded(name);
            if excluded {
                debug!("Skipping excluded namespace {}", name);
            }
            !excluded
        })
        .collect())
}
