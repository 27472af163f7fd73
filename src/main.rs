// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use anyhow::Result;
use kube::Client;
use std::sync::Arc;
use tracing::{info, warn};

use registry_creds::config::Config;
use registry_creds::kubernetes::KubeStore;
use registry_creds::providers::build_generators;
use registry_creds::reconcilers::NamespaceReconciler;
use registry_creds::sync::RefreshManager;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    info!("Starting registry-creds controller");

    // Load configuration
    let config = Config::from_env()?;
    info!(
        "Configuration loaded: refresh_interval={}s, aws_region={:?}, excluded_namespaces={:?}",
        config.refresh_interval.as_secs(),
        config.aws_region,
        config.excluded_namespaces
    );

    // Create Kubernetes client
    let client = Client::try_default().await?;
    info!("Connected to Kubernetes cluster");

    let generators = build_generators(&config).await;
    let store = Arc::new(KubeStore::new(client.clone()));

    // Create the refresh manager and get a handle for the reconciler
    let (refresh_manager, refresh_handle) = RefreshManager::new(store, generators, &config);
    let namespace_reconciler = NamespaceReconciler::new(client, refresh_handle);

    info!("Starting namespace reconciler...");

    // Run the refresh manager and the reconciler concurrently
    tokio::try_join!(refresh_manager.run(), namespace_reconciler.run())?;

    warn!("Namespace reconciler stopped unexpectedly");
    Ok(())
}
