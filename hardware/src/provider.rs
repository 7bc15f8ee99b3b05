// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Topology discovery backends and their composition.
//!
//! A discovery backend is anything that can produce a [`Topology`]
//! snapshot: an OS-level probe, a fabric-library enumerator, a canned
//! fixture in tests. Backends are opaque beyond that one capability.
//!
//! [`TopologyFactory`] composes backends: it queries each in registration
//! order and merges the snapshots into one topology. Discovery is
//! fail-fast. Topology is foundational input to placement decisions, so
//! a backend-incomplete topology is worse than an explicit failure.

use async_trait::async_trait;
use tracing::{debug, error};

use crate::topology::Topology;

/// Error produced when topology discovery fails.
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    /// Failure surfaced by a discovery backend, propagated untouched.
    #[error(transparent)]
    Backend(Box<dyn std::error::Error + Send + Sync>),
}

impl DiscoveryError {
    /// Wraps a backend's own failure.
    pub fn backend(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Backend(source.into())
    }
}

/// A source of topology snapshots.
///
/// Cancellation is carried by the future: dropping it abandons the
/// probe. Implementations should not mutate system state.
#[async_trait]
pub trait TopologyProvider: Send + Sync {
    /// Produce a topology snapshot, or fail.
    async fn topology(&self) -> Result<Topology, DiscoveryError>;
}

/// A [`TopologyProvider`] that merges the results of other providers.
///
/// Providers are queried sequentially in registration order; order
/// matters because merge conflicts on device soft fields resolve in
/// favor of whichever provider established a value first.
#[derive(Default)]
pub struct TopologyFactory {
    providers: Vec<Box<dyn TopologyProvider>>,
}

impl TopologyFactory {
    /// Creates a factory with no providers. Discovery on it yields an
    /// empty topology.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a provider behind any already-registered ones.
    #[must_use]
    pub fn with_provider(mut self, provider: impl TopologyProvider + 'static) -> Self {
        self.providers.push(Box::new(provider));
        self
    }

    /// Queries every provider and merges the snapshots in registration
    /// order.
    ///
    /// # Errors
    ///
    /// The first provider failure aborts discovery; its error is
    /// propagated untouched and no partial topology is returned.
    pub async fn topology(&self) -> Result<Topology, DiscoveryError> {
        let mut merged = Topology::default();
        for (index, provider) in self.providers.iter().enumerate() {
            match provider.topology().await {
                Ok(snapshot) => {
                    debug!("merging topology snapshot from backend {index}");
                    merged.merge(snapshot);
                }
                Err(err) => {
                    error!("topology backend {index} failed: {err}");
                    return Err(err);
                }
            }
        }
        Ok(merged)
    }
}

#[async_trait]
impl TopologyProvider for TopologyFactory {
    async fn topology(&self) -> Result<Topology, DiscoveryError> {
        TopologyFactory::topology(self).await
    }
}
