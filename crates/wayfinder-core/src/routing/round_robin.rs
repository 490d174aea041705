use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use url::Url;

use super::RoutingStrategy;
use crate::{errors::RoutingError, types::Gateway};

/// Cycles through its own gateway list, ignoring call-time candidates.
///
/// The cursor is the only mutable state and advances atomically, so concurrent callers
/// each receive a distinct position.
#[derive(Debug)]
pub struct RoundRobinRoutingStrategy {
    gateways: Vec<Url>,
    cursor: AtomicUsize,
}

impl RoundRobinRoutingStrategy {
    /// # Errors
    ///
    /// Returns [`RoutingError::InvalidConfiguration`] if `gateways` is empty.
    pub fn new(gateways: Vec<Url>) -> Result<Self, RoutingError> {
        if gateways.is_empty() {
            return Err(RoutingError::InvalidConfiguration(
                "round-robin requires at least one gateway".to_string(),
            ));
        }
        Ok(Self { gateways, cursor: AtomicUsize::new(0) })
    }
}

#[async_trait]
impl RoutingStrategy for RoundRobinRoutingStrategy {
    async fn select_gateway(&self, _gateways: &[Gateway]) -> Result<Url, RoutingError> {
        let len = self.gateways.len();
        // fetch_update returns the previous value; the closure never yields None.
        let index = self
            .cursor
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |c| Some((c + 1) % len))
            .unwrap_or_else(|current| current);

        tracing::trace!(index = index, total = len, "round-robin selection");
        Ok(self.gateways[index].clone())
    }

    fn name(&self) -> &'static str {
        "round-robin"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::test_support::gateway;
    use std::{collections::HashMap, sync::Arc};

    fn urls() -> Vec<Url> {
        ["https://a.example", "https://b.example", "https://c.example"]
            .iter()
            .map(|u| Url::parse(u).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_cycles_regardless_of_candidates() {
        let strategy = RoundRobinRoutingStrategy::new(urls()).unwrap();
        let unrelated = vec![gateway("https://z.example")];

        let mut hosts = Vec::new();
        for i in 0..4 {
            let candidates: &[Gateway] = if i % 2 == 0 { &unrelated } else { &[] };
            hosts.push(strategy.select_gateway(candidates).await.unwrap().host_str().unwrap().to_string());
        }
        assert_eq!(hosts, vec!["a.example", "b.example", "c.example", "a.example"]);
    }

    #[test]
    fn test_empty_list_rejected() {
        assert!(matches!(
            RoundRobinRoutingStrategy::new(Vec::new()),
            Err(RoutingError::InvalidConfiguration(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_selection_is_balanced() {
        let strategy = Arc::new(RoundRobinRoutingStrategy::new(urls()).unwrap());
        let handles: Vec<_> = (0..300)
            .map(|_| {
                let strategy = strategy.clone();
                tokio::spawn(async move { strategy.select_gateway(&[]).await.unwrap() })
            })
            .collect();

        let mut counts: HashMap<Url, usize> = HashMap::new();
        for handle in handles {
            *counts.entry(handle.await.unwrap()).or_default() += 1;
        }
        assert_eq!(counts.len(), 3);
        assert!(counts.values().all(|&c| c == 100));
    }
}
