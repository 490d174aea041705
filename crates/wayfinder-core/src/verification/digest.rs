use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use sha2::{Digest, Sha256};
use std::sync::Arc;

use super::{DataHashProvider, DigestAlgorithm, VerificationData, VerificationStrategy};
use crate::errors::VerificationError;

/// Compares the SHA-256 digest of the body with the trusted `x-ar-io-digest` value.
pub struct HashVerificationStrategy {
    provider: Arc<dyn DataHashProvider>,
}

impl HashVerificationStrategy {
    #[must_use]
    pub fn new(provider: Arc<dyn DataHashProvider>) -> Self {
        Self { provider }
    }
}

/// Hashes all of `data` with `algorithm` and returns the base64url digest.
///
/// # Errors
///
/// Returns [`VerificationError::Data`] if the stream fails.
pub async fn compute_digest(
    data: VerificationData,
    algorithm: DigestAlgorithm,
) -> Result<String, VerificationError> {
    match algorithm {
        DigestAlgorithm::Sha256 => {
            let mut hasher = Sha256::new();
            data.for_each_chunk(|chunk| hasher.update(chunk)).await?;
            Ok(URL_SAFE_NO_PAD.encode(hasher.finalize()))
        }
    }
}

#[async_trait]
impl VerificationStrategy for HashVerificationStrategy {
    async fn verify_data(&self, data: VerificationData, tx_id: &str) -> Result<String, VerificationError> {
        // Start consuming the body while the trusted lookup is in flight.
        let (trusted, computed) = tokio::join!(
            self.provider.get_digest(tx_id),
            compute_digest(data, DigestAlgorithm::Sha256)
        );
        let trusted = trusted?;
        let computed = match trusted.algorithm {
            DigestAlgorithm::Sha256 => computed?,
        };

        if computed != trusted.hash {
            return Err(VerificationError::Mismatch {
                strategy: self.name().to_string(),
                tx_id: tx_id.to_string(),
                trusted: trusted.hash,
                computed,
            });
        }

        tracing::debug!(tx_id = tx_id, digest = %computed, "digest verified");
        Ok(computed)
    }

    fn name(&self) -> &'static str {
        "hash"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verification::{test_support::chunked, TrustedDigest};
    use bytes::Bytes;

    struct FixedDigest(String);

    #[async_trait]
    impl DataHashProvider for FixedDigest {
        async fn get_digest(&self, _tx_id: &str) -> Result<TrustedDigest, VerificationError> {
            Ok(TrustedDigest { hash: self.0.clone(), algorithm: DigestAlgorithm::Sha256 })
        }
    }

    fn digest_of(data: &[u8]) -> String {
        URL_SAFE_NO_PAD.encode(Sha256::digest(data))
    }

    #[tokio::test]
    async fn test_buffer_match() {
        let strategy = HashVerificationStrategy::new(Arc::new(FixedDigest(digest_of(b"hello"))));
        strategy.verify_data(Bytes::from_static(b"hello").into(), "tx").await.unwrap();
    }

    #[tokio::test]
    async fn test_stream_match() {
        let data = vec![7_u8; 100_000];
        let strategy = HashVerificationStrategy::new(Arc::new(FixedDigest(digest_of(&data))));
        strategy.verify_data(chunked(&data, 4_096), "tx").await.unwrap();
    }

    #[tokio::test]
    async fn test_mismatch_carries_both_values() {
        let trusted = digest_of(b"expected");
        let strategy = HashVerificationStrategy::new(Arc::new(FixedDigest(trusted.clone())));
        let err = strategy.verify_data(Bytes::from_static(b"tampered").into(), "tx").await.unwrap_err();

        assert_eq!(err.hashes(), Some((trusted.as_str(), digest_of(b"tampered").as_str())));
        assert!(matches!(err, VerificationError::Mismatch { ref strategy, .. } if strategy == "hash"));
    }

    #[test]
    fn test_known_vector() {
        // sha256("") in base64url
        assert_eq!(digest_of(b""), "47DEQpj8HBSa-_TImW-5JCeuQeRkm5NMpJWZG3hSuFU");
    }
}
