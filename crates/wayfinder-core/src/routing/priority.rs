use async_trait::async_trait;
use rand::Rng;
use url::Url;

use super::{Blocklist, RoutingStrategy};
use crate::{
    errors::RoutingError,
    types::{Gateway, SortBy, SortOrder},
};

/// Default number of top-ranked gateways to choose from.
pub const DEFAULT_PRIORITY_LIMIT: usize = 1;

/// Sorts eligible gateways by a ranking attribute and picks uniformly within the top N.
#[derive(Debug, Clone)]
pub struct PriorityRoutingStrategy {
    sort_by: SortBy,
    sort_order: SortOrder,
    limit: usize,
    blocklist: Blocklist,
}

impl Default for PriorityRoutingStrategy {
    fn default() -> Self {
        Self {
            sort_by: SortBy::default(),
            sort_order: SortOrder::default(),
            limit: DEFAULT_PRIORITY_LIMIT,
            blocklist: Blocklist::default(),
        }
    }
}

impl PriorityRoutingStrategy {
    #[must_use]
    pub fn new(sort_by: SortBy, sort_order: SortOrder, limit: usize) -> Self {
        Self { sort_by, sort_order, limit: limit.max(1), blocklist: Blocklist::default() }
    }

    #[must_use]
    pub fn with_blocklist(mut self, blocklist: Blocklist) -> Self {
        self.blocklist = blocklist;
        self
    }
}

#[async_trait]
impl RoutingStrategy for PriorityRoutingStrategy {
    async fn select_gateway(&self, gateways: &[Gateway]) -> Result<Url, RoutingError> {
        let mut ranked = self.blocklist.eligible(gateways);
        if ranked.is_empty() {
            return Err(RoutingError::NoGatewayFound { strategy: self.name() });
        }

        // Stable sort keeps provider order among equal keys.
        match self.sort_order {
            SortOrder::Asc => ranked.sort_by_key(|g| g.sort_key(self.sort_by)),
            SortOrder::Desc => ranked.sort_by_key(|g| std::cmp::Reverse(g.sort_key(self.sort_by))),
        }
        ranked.truncate(self.limit);

        let index = rand::rng().random_range(0..ranked.len());
        Ok(ranked[index].url.clone())
    }

    fn name(&self) -> &'static str {
        "priority"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::test_support::{gateway, leaving};

    fn ranked() -> Vec<Gateway> {
        vec![
            gateway("https://small.example").with_operator_stake(10).with_start_timestamp(3),
            gateway("https://big.example").with_operator_stake(1_000).with_start_timestamp(2),
            leaving("https://huge.example").with_operator_stake(1_000_000),
            gateway("https://mid.example").with_operator_stake(100).with_start_timestamp(1),
        ]
    }

    #[tokio::test]
    async fn test_limit_one_is_deterministic() {
        let strategy = PriorityRoutingStrategy::new(SortBy::OperatorStake, SortOrder::Desc, 1);
        for _ in 0..20 {
            let url = strategy.select_gateway(&ranked()).await.unwrap();
            assert_eq!(url.host_str(), Some("big.example"));
        }
    }

    #[tokio::test]
    async fn test_ascending_timestamp() {
        let strategy = PriorityRoutingStrategy::new(SortBy::StartTimestamp, SortOrder::Asc, 1);
        let url = strategy.select_gateway(&ranked()).await.unwrap();
        assert_eq!(url.host_str(), Some("mid.example"));
    }

    #[tokio::test]
    async fn test_picks_within_top_n() {
        let strategy = PriorityRoutingStrategy::new(SortBy::OperatorStake, SortOrder::Desc, 2);
        for _ in 0..50 {
            let url = strategy.select_gateway(&ranked()).await.unwrap();
            assert!(matches!(url.host_str(), Some("big.example" | "mid.example")));
        }
    }

    #[tokio::test]
    async fn test_delegated_stake_ranking() {
        let gateways = vec![
            gateway("https://solo.example").with_operator_stake(5_000),
            gateway("https://popular.example").with_delegated_stake(9_000),
            gateway("https://quiet.example").with_delegated_stake(10),
        ];

        let strategy = PriorityRoutingStrategy::new(SortBy::TotalDelegatedStake, SortOrder::Desc, 1);
        let url = strategy.select_gateway(&gateways).await.unwrap();
        assert_eq!(url.host_str(), Some("popular.example"));
    }

    #[tokio::test]
    async fn test_all_filtered_fails() {
        let strategy = PriorityRoutingStrategy::default()
            .with_blocklist(Blocklist::new(["small.example", "big.example", "mid.example"]));
        let err = strategy.select_gateway(&ranked()).await.unwrap_err();
        assert!(matches!(err, RoutingError::NoGatewayFound { strategy: "priority" }));
    }
}
