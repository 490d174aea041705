//! Arweave data root computation.
//!
//! Data is split into chunks of at most 256 KiB. A full-size chunk is never followed by
//! a remainder shorter than 32 KiB: when that would happen, the last two chunks split
//! the tail evenly (`ceil(n / 2)` first). The final remainder is always a leaf, even if
//! empty.
//!
//! ```text
//! leaf   = sha256(sha256(chunk_hash) || sha256(be32(max_byte_range)))
//! branch = sha256(sha256(left) || sha256(right) || sha256(be32(left.max_byte_range)))
//! ```
//!
//! An unpaired node is promoted to the next layer unchanged.

use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use bytes::{Buf, BytesMut};
use sha2::{Digest, Sha256};
use std::sync::Arc;

use super::{DataRootProvider, VerificationData, VerificationStrategy};
use crate::errors::VerificationError;

pub const MAX_CHUNK_SIZE: usize = 256 * 1024;
pub const MIN_CHUNK_SIZE: usize = 32 * 1024;

const NOTE_SIZE: usize = 32;

type Hash = [u8; 32];

#[derive(Debug, Clone, Copy)]
struct Node {
    id: Hash,
    max_byte_range: u64,
}

fn sha256(parts: &[&[u8]]) -> Hash {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

fn note(value: u64) -> [u8; NOTE_SIZE] {
    let mut buf = [0_u8; NOTE_SIZE];
    buf[NOTE_SIZE - 8..].copy_from_slice(&value.to_be_bytes());
    buf
}

fn branch(left: Node, right: Node) -> Node {
    Node {
        id: sha256(&[
            &sha256(&[&left.id]),
            &sha256(&[&right.id]),
            &sha256(&[&note(left.max_byte_range)]),
        ]),
        max_byte_range: right.max_byte_range,
    }
}

/// Incremental data root calculator.
///
/// Buffers at most `MAX_CHUNK_SIZE + MIN_CHUNK_SIZE` bytes plus one 40-byte node per
/// chunk, never the whole input.
#[derive(Debug, Default)]
pub struct DataRootHasher {
    buffer: BytesMut,
    leaves: Vec<Node>,
    offset: u64,
}

impl DataRootHasher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
        // A full chunk is final only once enough follows it to rule out a short tail.
        while self.buffer.len() >= MAX_CHUNK_SIZE + MIN_CHUNK_SIZE {
            self.push_chunk(MAX_CHUNK_SIZE);
        }
    }

    fn push_chunk(&mut self, size: usize) {
        let chunk_hash = sha256(&[&self.buffer[..size]]);
        self.buffer.advance(size);
        self.offset += size as u64;
        self.leaves.push(Node {
            id: sha256(&[&sha256(&[&chunk_hash]), &sha256(&[&note(self.offset)])]),
            max_byte_range: self.offset,
        });
    }

    /// Chunks whatever is left using the short-tail rule.
    fn flush_tail(&mut self) {
        while self.buffer.len() >= MAX_CHUNK_SIZE {
            let next = self.buffer.len() - MAX_CHUNK_SIZE;
            let size = if next > 0 && next < MIN_CHUNK_SIZE {
                self.buffer.len().div_ceil(2)
            } else {
                MAX_CHUNK_SIZE
            };
            self.push_chunk(size);
        }
        let rest = self.buffer.len();
        self.push_chunk(rest);
    }

    /// Finishes chunking and returns the base64url data root.
    #[must_use]
    pub fn finalize(mut self) -> String {
        self.flush_tail();

        let mut layer = self.leaves;
        while layer.len() > 1 {
            let mut nodes = layer.into_iter();
            let mut next = Vec::with_capacity(nodes.len().div_ceil(2));
            while let Some(left) = nodes.next() {
                next.push(match nodes.next() {
                    Some(right) => branch(left, right),
                    None => left,
                });
            }
            layer = next;
        }

        // flush_tail always pushes a leaf, so the layer is never empty.
        layer.first().map(|root| URL_SAFE_NO_PAD.encode(root.id)).unwrap_or_default()
    }

    #[cfg(test)]
    fn chunk_sizes(&self) -> Vec<u64> {
        let mut previous = 0;
        self.leaves
            .iter()
            .map(|leaf| {
                let size = leaf.max_byte_range - previous;
                previous = leaf.max_byte_range;
                size
            })
            .collect()
    }
}

/// Computes the data root of `data`.
///
/// # Errors
///
/// Returns [`VerificationError::Data`] if the stream fails.
pub async fn compute_data_root(data: VerificationData) -> Result<String, VerificationError> {
    let mut hasher = DataRootHasher::new();
    data.for_each_chunk(|chunk| hasher.update(chunk)).await?;
    Ok(hasher.finalize())
}

/// Compares the Arweave data root of the body with the trusted data root.
pub struct DataRootVerificationStrategy {
    provider: Arc<dyn DataRootProvider>,
}

impl DataRootVerificationStrategy {
    #[must_use]
    pub fn new(provider: Arc<dyn DataRootProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl VerificationStrategy for DataRootVerificationStrategy {
    async fn verify_data(&self, data: VerificationData, tx_id: &str) -> Result<String, VerificationError> {
        let (trusted, computed) =
            tokio::join!(self.provider.get_data_root(tx_id), compute_data_root(data));
        let trusted = trusted?;
        let computed = computed?;

        if computed != trusted {
            return Err(VerificationError::Mismatch {
                strategy: self.name().to_string(),
                tx_id: tx_id.to_string(),
                trusted,
                computed,
            });
        }

        tracing::debug!(tx_id = tx_id, data_root = %computed, "data root verified");
        Ok(computed)
    }

    fn name(&self) -> &'static str {
        "data-root"
    }
}
