//! Single-producer, multi-consumer byte stream duplication.
//!
//! One pump task reads the source and copies every chunk (a cheap `Bytes` clone) into
//! one bounded channel per consumer.
//!
//! Consumers without a lag timeout apply plain backpressure to the pump. Consumers with
//! a lag timeout never hold the pump back while a backpressure consumer is attached:
//! chunks that do not fit their channel go to a bounded backlog, and a consumer whose
//! backlog overflows, or whose channel stays full past the lag timeout, is cut off with
//! [`TransportError::ConsumerLagged`]. When only lag-tolerant consumers remain the pump
//! waits for an overflowing consumer until its lag deadline instead.
//!
//! Memory stays bounded by `capacity * (1 + BACKLOG_FACTOR)` chunks per consumer.

use bytes::Bytes;
use futures::{future::join_all, stream, StreamExt};
use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::{
    sync::mpsc::{self, error::TrySendError},
    task::JoinHandle,
    time::Instant,
};

use crate::{errors::TransportError, http::ByteStream};

/// Default channel depth per consumer, in chunks.
pub const DEFAULT_FANOUT_CAPACITY: usize = 16;

/// Backlog allowed to a lag-tolerant consumer, as a multiple of the channel capacity.
pub const BACKLOG_FACTOR: usize = 4;

type Item = Result<Bytes, TransportError>;

struct Consumer {
    sender: mpsc::Sender<Item>,
    lag_timeout: Option<Duration>,
    lagged: Arc<AtomicBool>,
    backlog: VecDeque<Item>,
    max_backlog: usize,
    stalled_since: Option<Instant>,
}

impl Consumer {
    /// Hands one chunk to this consumer. Only waits when `may_wait` is set or the
    /// consumer applies backpressure.
    async fn offer(&mut self, item: Item, may_wait: bool) -> SendOutcome {
        let Some(lag) = self.lag_timeout else {
            return match self.sender.send(item).await {
                Ok(()) => SendOutcome::Delivered,
                Err(_) => SendOutcome::Closed,
            };
        };

        self.backlog.push_back(item);
        if let SendOutcome::Closed = self.flush() {
            return SendOutcome::Closed;
        }
        if self.stalled_since.is_some_and(|since| since.elapsed() >= lag) {
            return SendOutcome::Lagged;
        }
        if self.backlog.len() > self.max_backlog {
            return if may_wait { self.drain().await } else { SendOutcome::Lagged };
        }
        SendOutcome::Delivered
    }

    /// Moves as much of the backlog as fits into the channel without waiting.
    fn flush(&mut self) -> SendOutcome {
        while let Some(item) = self.backlog.pop_front() {
            match self.sender.try_send(item) {
                Ok(()) => {}
                Err(TrySendError::Full(item)) => {
                    self.backlog.push_front(item);
                    self.stalled_since.get_or_insert_with(Instant::now);
                    return SendOutcome::Delivered;
                }
                Err(TrySendError::Closed(_)) => return SendOutcome::Closed,
            }
        }
        self.stalled_since = None;
        SendOutcome::Delivered
    }

    /// Waits until the backlog is delivered or the lag deadline passes.
    async fn drain(&mut self) -> SendOutcome {
        let Some(lag) = self.lag_timeout else {
            return SendOutcome::Delivered;
        };
        let deadline = self.stalled_since.unwrap_or_else(Instant::now) + lag;

        while let Some(item) = self.backlog.pop_front() {
            match tokio::time::timeout_at(deadline, self.sender.send(item)).await {
                Ok(Ok(())) => {}
                Ok(Err(_)) => return SendOutcome::Closed,
                Err(_) => return SendOutcome::Lagged,
            }
        }
        self.stalled_since = None;
        SendOutcome::Delivered
    }
}

/// Builder for a fanned-out stream.
pub struct FanOut {
    source: ByteStream,
    capacity: usize,
    consumers: Vec<Consumer>,
}

impl FanOut {
    #[must_use]
    pub fn new(source: ByteStream, capacity: usize) -> Self {
        Self { source, capacity: capacity.max(1), consumers: Vec::new() }
    }

    /// Registers a consumer and returns its stream.
    pub fn consumer(&mut self, lag_timeout: Option<Duration>) -> ByteStream {
        let (sender, receiver) = mpsc::channel(self.capacity);
        let lagged = Arc::new(AtomicBool::new(false));
        self.consumers.push(Consumer {
            sender,
            lag_timeout,
            lagged: lagged.clone(),
            backlog: VecDeque::new(),
            max_backlog: self.capacity * BACKLOG_FACTOR,
            stalled_since: None,
        });

        Box::pin(stream::unfold((receiver, lagged, false), |(mut receiver, lagged, done)| async move {
            if done {
                return None;
            }
            match receiver.recv().await {
                Some(item) => Some((item, (receiver, lagged, false))),
                None if lagged.load(Ordering::Acquire) => {
                    Some((Err(TransportError::ConsumerLagged), (receiver, lagged, true)))
                }
                None => None,
            }
        }))
    }

    /// Spawns the pump task. Consumers registered afterwards would never receive data,
    /// so this consumes the builder.
    #[must_use]
    pub fn start(self) -> JoinHandle<()> {
        tokio::spawn(pump(self.source, self.consumers))
    }
}

async fn pump(mut source: ByteStream, mut consumers: Vec<Consumer>) {
    let mut chunks = 0_u64;

    while let Some(item) = source.next().await {
        let is_err = item.is_err();
        let may_wait = consumers.iter().all(|c| c.lag_timeout.is_some());

        let outcomes =
            join_all(consumers.iter_mut().map(|consumer| consumer.offer(item.clone(), may_wait))).await;
        settle(&mut consumers, &outcomes, chunks);

        chunks += 1;
        if is_err || consumers.is_empty() {
            break;
        }
    }

    // Close finished consumers first so their streams end while lagging ones drain.
    consumers.retain(|consumer| !consumer.backlog.is_empty());
    let outcomes = join_all(consumers.iter_mut().map(|consumer| consumer.drain())).await;
    settle(&mut consumers, &outcomes, chunks);

    tracing::trace!(chunks = chunks, "fan-out pump finished");
}

fn settle(consumers: &mut Vec<Consumer>, outcomes: &[SendOutcome], chunks: u64) {
    let mut index = 0;
    consumers.retain(|consumer| {
        let outcome = outcomes[index];
        index += 1;
        match outcome {
            SendOutcome::Delivered => true,
            SendOutcome::Closed => false,
            SendOutcome::Lagged => {
                tracing::warn!(
                    chunks = chunks,
                    backlog = consumer.backlog.len(),
                    "stream consumer lagged, disconnecting"
                );
                consumer.lagged.store(true, Ordering::Release);
                false
            }
        }
    });
}

#[derive(Debug, Clone, Copy)]
enum SendOutcome {
    Delivered,
    Closed,
    Lagged,
}
