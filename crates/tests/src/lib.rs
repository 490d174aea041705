//! Integration tests for Wayfinder Core
//!
//! Every test talks real HTTP through `ReqwestTransport` to `mockito` servers posing as
//! AR.IO gateways:
//!
//! - `transport_tests`: Buffered and streamed bodies, status passthrough, connection errors
//! - `trusted_tests`: Trusted digest and data root quorums across independent gateways
//! - `routing_tests`: Fastest-ping and preferred-with-fallback probing
//! - `wayfinder_tests`: The full pipeline from `ar://` reference to verification event
//! - `mock_infrastructure`: Reusable gateway mocks
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test --package tests
//! ```
//!
//! `ArNS` name references resolve to subdomains of the gateway host, which do not
//! resolve for `127.0.0.1`; name routing is covered by the unit tests in
//! `wayfinder-core` instead.

#[cfg(test)]
mod transport_tests;

#[cfg(test)]
mod trusted_tests;

#[cfg(test)]
mod routing_tests;

#[cfg(test)]
mod wayfinder_tests;

/// Mock infrastructure for testing
pub mod mock_infrastructure;
