//! # Wayfinder Core
//!
//! Decentralized access to Arweave data through the AR.IO gateway network.
//!
//! This crate provides:
//!
//! - **[`reference`]**: Parsing of `ar://` references (transaction ids, `ArNS` names and
//!   root-relative gateway paths) and their resolution onto a concrete gateway URL.
//!
//! - **[`gateways`]**: Gateway candidate providers: static lists, the paginated network
//!   registry, and a TTL cache with single-flight refresh.
//!
//! - **[`routing`]**: Gateway selection strategies (fixed, random, priority, round-robin,
//!   fastest-ping, preferred-with-fallback).
//!
//! - **[`verification`]**: Integrity checks of fetched bytes against trusted gateways,
//!   by content digest or Arweave data root, singly or as a composite.
//!
//! - **[`wayfinder`]**: The request pipeline tying the above together, with routing and
//!   verification events.
//!
//! - **[`http`]**: The transport seam, a `reqwest` implementation, and a drop-in client.
//!
//! ## Request Flow
//!
//! ```text
//! ar://<id|name|/path>
//!       │
//!       ▼
//! ┌─────────────┐
//! │   Parse     │ ─── Malformed ──► ReferenceError
//! └──────┬──────┘
//!        ▼
//! ┌──────────────────┐      ┌──────────────────┐
//! │ GatewaysProvider │ ───► │ RoutingStrategy  │
//! └──────────────────┘      └────────┬─────────┘
//!                                    ▼
//!                           ┌──────────────────┐
//!                           │  HttpTransport   │
//!                           └────────┬─────────┘
//!                                    ▼
//!                    ┌────────────────────────────────┐
//!                    │ VerificationStrategy           │
//!                    │  strict: before returning      │
//!                    │  otherwise: on a detached task │
//!                    └────────────────────────────────┘
//! ```

pub mod config;
pub mod errors;
pub mod events;
pub mod gateways;
pub mod http;
pub mod metrics;
pub mod reference;
pub mod routing;
pub mod types;
pub mod verification;
pub mod wayfinder;

pub use errors::WayfinderError;
pub use events::WayfinderEvent;
pub use http::WayfinderClient;
pub use reference::Reference;
pub use wayfinder::{Resolution, Wayfinder, WayfinderBuilder};
