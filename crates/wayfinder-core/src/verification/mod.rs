//! Data verification.
//!
//! A [`VerificationStrategy`] recomputes a value from response bytes and compares it
//! with a value attested by trusted gateways:
//!
//! - [`HashVerificationStrategy`]: SHA-256 digest vs. the `x-ar-io-digest` quorum
//! - [`DataRootVerificationStrategy`]: Arweave data root vs. the `/tx/<id>/data_root` quorum
//! - [`CompositeVerificationStrategy`]: several strategies over one stream
//!
//! Trusted values are fetched per verification and never cached across ids.

pub mod composite;
pub mod data_root;
pub mod digest;
pub mod fanout;
pub mod trusted;

pub use composite::CompositeVerificationStrategy;
pub use data_root::{DataRootHasher, DataRootVerificationStrategy};
pub use digest::HashVerificationStrategy;
pub use fanout::FanOut;
pub use trusted::{
    DataHashProvider, DataRootProvider, DigestAlgorithm, TrustedDigest, TrustedGatewaysConfig,
    TrustedGatewaysDataRootProvider, TrustedGatewaysHashProvider,
};

use async_trait::async_trait;
use bytes::Bytes;
use std::fmt;

use crate::{errors::VerificationError, http::ByteStream};

/// Bytes to verify, either already in memory or still streaming.
pub enum VerificationData {
    Buffer(Bytes),
    Stream(ByteStream),
}

impl VerificationData {
    /// Feeds every chunk to `sink` in order.
    ///
    /// # Errors
    ///
    /// Returns [`VerificationError::Data`] if the stream fails.
    pub async fn for_each_chunk<F>(self, mut sink: F) -> Result<(), VerificationError>
    where
        F: FnMut(&[u8]) + Send,
    {
        use futures::StreamExt;

        match self {
            Self::Buffer(bytes) => sink(&bytes),
            Self::Stream(mut stream) => {
                while let Some(chunk) = stream.next().await {
                    sink(&chunk?);
                }
            }
        }
        Ok(())
    }
}

impl fmt::Debug for VerificationData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buffer(bytes) => write!(f, "Buffer({} bytes)", bytes.len()),
            Self::Stream(_) => write!(f, "Stream"),
        }
    }
}

impl From<Bytes> for VerificationData {
    fn from(bytes: Bytes) -> Self {
        Self::Buffer(bytes)
    }
}

/// Verifies response bytes for a transaction id.
#[async_trait]
pub trait VerificationStrategy: Send + Sync {
    /// Resolves with the agreed value (digest or data root) when the data matches the
    /// trusted value.
    async fn verify_data(
        &self,
        data: VerificationData,
        tx_id: &str,
    ) -> Result<String, VerificationError>;

    fn name(&self) -> &'static str;
}
