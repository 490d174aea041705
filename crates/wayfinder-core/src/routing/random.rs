use async_trait::async_trait;
use rand::Rng;
use url::Url;

use super::{Blocklist, RoutingStrategy};
use crate::{errors::RoutingError, types::Gateway};

/// Uniform random choice among joined, non-blocklisted gateways.
#[derive(Debug, Clone, Default)]
pub struct RandomRoutingStrategy {
    blocklist: Blocklist,
}

impl RandomRoutingStrategy {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_blocklist(mut self, blocklist: Blocklist) -> Self {
        self.blocklist = blocklist;
        self
    }
}

#[async_trait]
impl RoutingStrategy for RandomRoutingStrategy {
    async fn select_gateway(&self, gateways: &[Gateway]) -> Result<Url, RoutingError> {
        let eligible = self.blocklist.eligible(gateways);
        if eligible.is_empty() {
            return Err(RoutingError::NoGatewayFound { strategy: self.name() });
        }

        let index = rand::rng().random_range(0..eligible.len());
        Ok(eligible[index].url.clone())
    }

    fn name(&self) -> &'static str {
        "random"
    }
}
