//! Gateway selection strategies.
//!
//! | Strategy | State | Empty / all-failed result |
//! |----------|-------|---------------------------|
//! | [`FixedRoutingStrategy`] | none | never fails |
//! | [`RandomRoutingStrategy`] | none | `NoGatewayFound` |
//! | [`PriorityRoutingStrategy`] | none | `NoGatewayFound` |
//! | [`RoundRobinRoutingStrategy`] | atomic cursor | `InvalidConfiguration` at construction |
//! | [`FastestPingRoutingStrategy`] | none | `NoGatewaysProvided` / `NoHealthyGateways` |
//! | [`PreferredWithFallbackRoutingStrategy`] | none | whatever the fallback returns |
//!
//! Strategies never retry. A selection error is returned to the caller as-is.

pub mod fastest_ping;
pub mod fixed;
pub mod preferred;
pub mod priority;
pub mod random;
pub mod round_robin;

pub use fastest_ping::{FastestPingConfig, FastestPingRoutingStrategy};
pub use fixed::FixedRoutingStrategy;
pub use preferred::PreferredWithFallbackRoutingStrategy;
pub use priority::PriorityRoutingStrategy;
pub use random::RandomRoutingStrategy;
pub use round_robin::RoundRobinRoutingStrategy;

use async_trait::async_trait;
use std::collections::HashSet;
use url::Url;

use crate::{errors::RoutingError, types::Gateway};

/// Picks exactly one gateway out of a candidate list.
#[async_trait]
pub trait RoutingStrategy: Send + Sync {
    /// Returns the base URL of the selected gateway.
    async fn select_gateway(&self, gateways: &[Gateway]) -> Result<Url, RoutingError>;

    /// Short strategy name used in logs, metrics and errors.
    fn name(&self) -> &'static str;
}

/// Hostname blocklist shared by the filtering strategies.
#[derive(Debug, Clone, Default)]
pub struct Blocklist(HashSet<String>);

impl Blocklist {
    #[must_use]
    pub fn new<I, S>(hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(hosts.into_iter().map(|h| h.into().to_ascii_lowercase()).collect())
    }

    #[must_use]
    pub fn contains(&self, gateway: &Gateway) -> bool {
        gateway.hostname().is_some_and(|host| self.0.contains(&host.to_ascii_lowercase()))
    }

    /// Keeps joined gateways whose hostname is not blocked.
    #[must_use]
    pub fn eligible<'a>(&self, gateways: &'a [Gateway]) -> Vec<&'a Gateway> {
        gateways.iter().filter(|g| g.is_joined() && !self.contains(g)).collect()
    }
}
