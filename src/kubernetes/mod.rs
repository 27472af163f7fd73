// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Kubernetes utilities for object access and namespace selection.

pub mod namespaces;
pub mod store;

pub use namespaces::{target_namespaces, NamespaceFilter};
pub use store::{ClusterStore, KubeStore};
