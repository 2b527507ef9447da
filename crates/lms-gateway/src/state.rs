//! Gateway application state.
//!
//! This module defines the shared state that is available to all request handlers.

use std::sync::Arc;

use lms_catalog::Catalog;

use crate::config::GatewayConfig;

/// Shared application state for the gateway.
pub struct GatewayState<C>
where
    C: Catalog,
{
    /// Catalog operations behind every route.
    pub catalog: Arc<C>,
    /// Gateway configuration.
    pub config: GatewayConfig,
}

impl<C> GatewayState<C>
where
    C: Catalog,
{
    /// Create a new gateway state.
    #[must_use]
    pub fn new(catalog: Arc<C>, config: GatewayConfig) -> Self {
        Self { catalog, config }
    }
}

impl<C> Clone for GatewayState<C>
where
    C: Catalog,
{
    fn clone(&self) -> Self {
        Self {
            catalog: Arc::clone(&self.catalog),
            config: self.config.clone(),
        }
    }
}
