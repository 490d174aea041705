use async_trait::async_trait;
use futures::future::try_join_all;
use std::{sync::Arc, time::Duration};

use super::{
    fanout::{FanOut, DEFAULT_FANOUT_CAPACITY},
    VerificationData, VerificationStrategy,
};
use crate::errors::VerificationError;

/// Default time a member may leave its channel full before it is cut off.
pub const DEFAULT_LAG_TIMEOUT: Duration = Duration::from_secs(30);

/// Runs several strategies concurrently over the same data.
///
/// Buffers are shared by reference count. Streams are duplicated by a [`FanOut`] so the
/// body is read once and never held in memory as a whole. The first member error wins;
/// the other members are dropped.
/// On success the first member's value is returned.
pub struct CompositeVerificationStrategy {
    strategies: Vec<Arc<dyn VerificationStrategy>>,
    capacity: usize,
    lag_timeout: Duration,
}

impl CompositeVerificationStrategy {
    /// # Errors
    ///
    /// Returns [`VerificationError::EmptyComposite`] if `strategies` is empty.
    pub fn new(strategies: Vec<Arc<dyn VerificationStrategy>>) -> Result<Self, VerificationError> {
        if strategies.is_empty() {
            return Err(VerificationError::EmptyComposite);
        }
        Ok(Self { strategies, capacity: DEFAULT_FANOUT_CAPACITY, lag_timeout: DEFAULT_LAG_TIMEOUT })
    }

    #[must_use]
    pub fn with_lag_timeout(mut self, lag_timeout: Duration) -> Self {
        self.lag_timeout = lag_timeout;
        self
    }

    #[must_use]
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }
}

#[async_trait]
impl VerificationStrategy for CompositeVerificationStrategy {
    async fn verify_data(&self, data: VerificationData, tx_id: &str) -> Result<String, VerificationError> {
        let (inputs, pump) = match data {
            VerificationData::Buffer(bytes) => (
                self.strategies
                    .iter()
                    .map(|_| VerificationData::Buffer(bytes.clone()))
                    .collect::<Vec<_>>(),
                None,
            ),
            VerificationData::Stream(stream) => {
                let mut fanout = FanOut::new(stream, self.capacity);
                let inputs: Vec<_> = self
                    .strategies
                    .iter()
                    .map(|_| VerificationData::Stream(fanout.consumer(Some(self.lag_timeout))))
                    .collect();
                (inputs, Some(fanout.start()))
            }
        };

        let runs = self.strategies.iter().zip(inputs).enumerate().map(
            |(index, (strategy, input))| async move {
                strategy.verify_data(input, tx_id).await.map_err(|e| VerificationError::Composite {
                    strategy: strategy.name().to_string(),
                    position: index + 1,
                    source: Box::new(e),
                })
            },
        );

        let result =
            try_join_all(runs).await.map(|values| values.into_iter().next().unwrap_or_default());

        if let Some(pump) = pump {
            pump.abort();
        }

        if let Err(e) = &result {
            tracing::debug!(tx_id = tx_id, error = %e, "composite verification failed");
        }
        result
    }

    fn name(&self) -> &'static str {
        "composite"
    }
}
