use arc_swap::ArcSwapOption;
use async_trait::async_trait;
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::Mutex;

use super::GatewaysProvider;
use crate::{errors::GatewaysError, types::GatewayList};

/// Default time-to-live of a cached snapshot.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60);

struct Snapshot {
    gateways: GatewayList,
    fetched_at: Instant,
}

/// TTL memoization around another provider.
///
/// Reads of a fresh snapshot are lock-free. Refreshes are single-flight: concurrent
/// callers in an expired window wait on one inner fetch. A failed refresh keeps the
/// previous snapshot and returns the error.
pub struct CachedGatewaysProvider {
    inner: Arc<dyn GatewaysProvider>,
    ttl: Duration,
    snapshot: ArcSwapOption<Snapshot>,
    refresh: Mutex<()>,
}

impl CachedGatewaysProvider {
    #[must_use]
    pub fn new(inner: Arc<dyn GatewaysProvider>, ttl: Duration) -> Self {
        Self { inner, ttl, snapshot: ArcSwapOption::empty(), refresh: Mutex::new(()) }
    }

    fn fresh(&self) -> Option<GatewayList> {
        self.snapshot
            .load()
            .as_ref()
            .filter(|s| s.fetched_at.elapsed() < self.ttl)
            .map(|s| s.gateways.clone())
    }

    /// Drops the cached snapshot so the next call refetches.
    pub fn invalidate(&self) {
        self.snapshot.store(None);
    }
}

#[async_trait]
impl GatewaysProvider for CachedGatewaysProvider {
    async fn get_gateways(&self) -> Result<GatewayList, GatewaysError> {
        if let Some(gateways) = self.fresh() {
            return Ok(gateways);
        }

        let _refresh = self.refresh.lock().await;

        // Another caller may have refreshed while we waited.
        if let Some(gateways) = self.fresh() {
            return Ok(gateways);
        }

        let gateways = self.inner.get_gateways().await.inspect_err(|e| {
            tracing::warn!(error = %e, "gateway refresh failed, keeping previous snapshot");
        })?;

        tracing::debug!(
            gateways = gateways.len(),
            ttl_secs = self.ttl.as_secs(),
            "refreshed gateway snapshot"
        );

        self.snapshot.store(Some(Arc::new(Snapshot {
            gateways: gateways.clone(),
            fetched_at: Instant::now(),
        })));

        Ok(gateways)
    }
}
