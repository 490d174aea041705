use async_trait::async_trait;
use url::Url;

use super::RoutingStrategy;
use crate::{errors::RoutingError, types::Gateway};

/// Always selects one preconfigured gateway, ignoring the candidates.
#[derive(Debug, Clone)]
pub struct FixedRoutingStrategy {
    gateway: Url,
}

impl FixedRoutingStrategy {
    #[must_use]
    pub fn new(gateway: Url) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl RoutingStrategy for FixedRoutingStrategy {
    async fn select_gateway(&self, _gateways: &[Gateway]) -> Result<Url, RoutingError> {
        Ok(self.gateway.clone())
    }

    fn name(&self) -> &'static str {
        "fixed"
    }
}
