//! Gateway candidate providers.
//!
//! - [`StaticGatewaysProvider`]: a fixed list
//! - [`NetworkGatewaysProvider`]: live list paged from the gateway registry
//! - [`CachedGatewaysProvider`]: TTL memoization around either

pub mod cache;
pub mod network;

pub use cache::CachedGatewaysProvider;
pub use network::{GatewayPage, GatewayQuery, GatewayRegistry, NetworkGatewaysProvider};

use async_trait::async_trait;

use crate::{
    errors::GatewaysError,
    types::{gateways_from_urls, Gateway, GatewayList},
};

/// Supplies the gateway candidates used for routing.
#[async_trait]
pub trait GatewaysProvider: Send + Sync {
    /// Returns the current gateway snapshot.
    async fn get_gateways(&self) -> Result<GatewayList, GatewaysError>;
}

/// Provider over a fixed list of gateways.
#[derive(Debug, Clone)]
pub struct StaticGatewaysProvider {
    gateways: GatewayList,
}

impl StaticGatewaysProvider {
    #[must_use]
    pub fn new(gateways: Vec<Gateway>) -> Self {
        Self { gateways: gateways.into() }
    }

    /// # Errors
    ///
    /// Returns [`GatewaysError::InvalidGateway`] if any URL is invalid.
    pub fn from_urls<I, S>(urls: I) -> Result<Self, GatewaysError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Ok(Self { gateways: gateways_from_urls(urls)? })
    }
}

#[async_trait]
impl GatewaysProvider for StaticGatewaysProvider {
    async fn get_gateways(&self) -> Result<GatewayList, GatewaysError> {
        Ok(self.gateways.clone())
    }
}
