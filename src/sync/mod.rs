// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Secret generation and per-namespace reconciliation logic.

pub mod cycle;
pub mod encoder;
pub mod manager;
pub mod reconcile;

pub use cycle::{generate_secrets, run_cycle, CycleReport, CycleScope, ProviderFailure};
pub use encoder::{encode, RegistryCredentialSecret, SecretType};
pub use manager::{RefreshEvent, RefreshHandle, RefreshManager};
pub use reconcile::{ensure_image_pull_secret, reconcile_namespace};
