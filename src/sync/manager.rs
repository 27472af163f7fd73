// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Central coordinator for refreshing registry credentials.

use crate::config::Config;
use crate::constants::EVENT_CHANNEL_CAPACITY;
use crate::kubernetes::{ClusterStore, NamespaceFilter};
use crate::providers::SecretGenerator;
use crate::retry::RetryConfig;
use crate::sync::cycle::{run_cycle, CycleReport, CycleScope};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, instrument, warn};

/// Events that reconcilers send to the RefreshManager
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshEvent {
    /// A namespace was created or changed
    NamespaceChanged { name: String },
    /// Refresh every namespace right away
    RefreshAll,
}

/// Runs refresh cycles, one at a time.
/// Cycles are triggered by the refresh timer and by events from reconcilers.
pub struct RefreshManager {
    store: Arc<dyn ClusterStore>,
    generators: Vec<SecretGenerator>,
    retry: RetryConfig,
    filter: NamespaceFilter,
    refresh_interval: Duration,
    event_rx: mpsc::Receiver<RefreshEvent>,
}

/// Handle to send events to the RefreshManager
#[derive(Clone)]
pub struct RefreshHandle {
    event_tx: mpsc::Sender<RefreshEvent>,
}

impl RefreshHandle {
    pub async fn send(&self, event: RefreshEvent) {
        if let Err(e) = self.event_tx.send(event).await {
            error!("Failed to send event to RefreshManager: {}", e);
        }
    }
}

impl RefreshManager {
    pub fn new(
        store: Arc<dyn ClusterStore>,
        generators: Vec<SecretGenerator>,
        config: &Config,
    ) -> (Self, RefreshHandle) {
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        let manager = Self {
            store,
            generators,
            retry: config.retry,
            filter: NamespaceFilter::from_config(config),
            refresh_interval: config.refresh_interval,
            event_rx,
        };

        let handle = RefreshHandle { event_tx };
        (manager, handle)
    }

    /// Run until every [`RefreshHandle`] is dropped. A full refresh runs
    /// first, then on every tick of the refresh interval.
    pub async fn run(mut self) -> anyhow::Result<()> {
        info!("RefreshManager started, performing initial refresh...");
        self.refresh(CycleScope::AllNamespaces).await;
        info!(
            "Initial refresh complete, refreshing every {}s and listening for events...",
            self.refresh_interval.as_secs()
        );

        let mut ticker = interval_at(
            Instant::now() + self.refresh_interval,
            self.refresh_interval,
        );
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.refresh(CycleScope::AllNamespaces).await;
                }
                event = self.event_rx.recv() => match event {
                    Some(event) => self.handle_event(event).await,
                    None => break,
                },
            }
        }

        info!("All event senders closed, RefreshManager stopping");
        Ok(())
    }

    async fn handle_event(&self, event: RefreshEvent) {
        debug!("Handling event: {:?}", event);

        match event {
            RefreshEvent::NamespaceChanged { name } => {
                self.refresh(CycleScope::Namespace(name)).await;
            }
            RefreshEvent::RefreshAll => {
                self.refresh(CycleScope::AllNamespaces).await;
            }
        }
    }

    /// Run one cycle for `scope` and log its outcome
    #[instrument(skip(self))]
    pub async fn refresh(&self, scope: CycleScope) -> CycleReport {
        let report = run_cycle(
            self.store.as_ref(),
            &self.generators,
            &self.retry,
            &self.filter,
            &scope,
        )
        .await;

        if report.namespaces.is_empty() && report.list_error.is_none() {
            return report;
        }

        let failed = report.failed_outcomes().count();
        if report.is_success() {
            info!(
                "Refreshed {} secret(s) across {} namespace(s)",
                report.succeeded(),
                report.namespaces.len()
            );
        } else {
            warn!(
                "Refresh finished with errors: {} applied, {} failed, {} provider(s) skipped",
                report.succeeded(),
                failed,
                report.provider_failures.len()
            );
        }
        report
    }
}
