//! Mock infrastructure for testing against gateways over real HTTP.
//!
//! ## Components
//!
//! - `GatewayMock`: Wraps a mockito server with AR.IO gateway endpoints (data, digest
//!   headers, data roots, probe path)
//! - Helpers for computing the values a trusted gateway would report
//!
//! ## Usage
//!
//! ```ignore
//! use tests::mock_infrastructure::GatewayMock;
//!
//! let mut gateway = GatewayMock::new().await;
//! gateway.mock_data(TX_ID, b"hello", Some(&digest));
//!
//! // Use gateway.url() as a gateway or trusted gateway URL
//! ```

pub mod gateway_mock;

pub use gateway_mock::{digest_of, data_root_of, GatewayMock, TX_ID};
