use thiserror::Error;

/// Errors produced while obtaining gateway candidates.
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum GatewaysError {
    /// The gateway registry read interface failed.
    #[error("Gateway registry error: {0}")]
    Registry(String),

    /// A gateway URL or registry record could not be turned into an endpoint.
    #[error("Invalid gateway {gateway}: {reason}")]
    InvalidGateway { gateway: String, reason: String },
}

/// Errors produced by routing strategies.
///
/// Selection errors are always fatal to the call that produced them. The routing layer
/// never retries on its own.
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum RoutingError {
    /// Every candidate was filtered out (status, blocklist, or an empty list).
    #[error("No gateway found for {strategy} strategy: all candidates were filtered out")]
    NoGatewayFound { strategy: &'static str },

    /// The candidate list was empty before any probing started.
    #[error("No gateways provided")]
    NoGatewaysProvided,

    /// Every probed gateway failed or timed out.
    #[error("No healthy gateways found ({attempted} probed)")]
    NoHealthyGateways { attempted: usize },

    /// A strategy was configured with an unusable endpoint or list.
    #[error("Invalid routing configuration: {0}")]
    InvalidConfiguration(String),
}

/// Errors produced while parsing an `ar://` reference.
///
/// Raised synchronously, before any network call is made.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ReferenceError {
    #[error("Empty ar:// reference")]
    Empty,

    /// The first path segment is neither a transaction id nor a valid name.
    #[error("Invalid ar:// reference '{reference}': {reason}")]
    Invalid { reference: String, reason: String },

    /// The resolved URL could not be constructed.
    #[error("Failed to build URL for '{reference}': {reason}")]
    UrlConstruction { reference: String, reason: String },
}

/// Errors produced by an HTTP transport.
///
/// Network errors are flattened into sanitized strings so the error can be cloned into
/// every consumer of a fanned-out stream.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TransportError {
    #[error("Request timeout")]
    Timeout,

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Concurrency limit reached: {0}")]
    ConcurrencyLimit(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Reading the response body failed.
    #[error("Response body error: {0}")]
    Body(String),

    /// A stream consumer stopped reading for longer than the allowed lag.
    #[error("Stream consumer fell behind and was disconnected")]
    ConsumerLagged,
}

impl TransportError {
    /// Returns `true` if the same request may succeed when retried.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout | Self::ConnectionFailed(_) | Self::ConcurrencyLimit(_))
    }
}

/// Errors produced by trusted providers and verification strategies.
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum VerificationError {
    /// None of the trusted gateways returned a value.
    #[error("No trusted source available for {tx_id}")]
    NoTrustedSource { tx_id: String },

    /// Fewer trusted gateways answered than the configured minimum.
    #[error("Insufficient trusted sources for {tx_id}: {found} responded, {required} required")]
    InsufficientTrustedSources { tx_id: String, found: usize, required: usize },

    /// Trusted gateways disagreed. Lists `(gateway, value)` for every responder.
    #[error("Inconsistent trusted values for {tx_id}: {}", format_reports(.reports))]
    InconsistentTrustedValues { tx_id: String, reports: Vec<(String, String)> },

    /// The locally computed value differs from the trusted one.
    #[error("{strategy} verification failed for {tx_id}: trusted {trusted}, computed {computed}")]
    Mismatch { strategy: String, tx_id: String, trusted: String, computed: String },

    /// A member of a composite strategy failed.
    #[error("Strategy {strategy} (#{position}) failed: {source}")]
    Composite {
        strategy: String,
        position: usize,
        #[source]
        source: Box<VerificationError>,
    },

    /// A composite strategy was built without members.
    #[error("Composite verification requires at least one strategy")]
    EmptyComposite,

    /// The data to verify could not be read.
    #[error("Failed to read data for verification: {0}")]
    Data(#[from] TransportError),
}

impl VerificationError {
    /// Trusted and computed values carried by a mismatch, looking through composite
    /// wrappers.
    #[must_use]
    pub fn hashes(&self) -> Option<(&str, &str)> {
        match self {
            Self::Mismatch { trusted, computed, .. } => Some((trusted, computed)),
            Self::Composite { source, .. } => source.hashes(),
            _ => None,
        }
    }
}

fn format_reports(reports: &[(String, String)]) -> String {
    reports
        .iter()
        .map(|(gateway, value)| format!("{gateway}={value}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Top-level error returned by the wayfinder client.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum WayfinderError {
    #[error(transparent)]
    Reference(#[from] ReferenceError),

    #[error(transparent)]
    Routing(#[from] RoutingError),

    #[error(transparent)]
    Gateways(#[from] GatewaysError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Only surfaced to the caller in strict mode.
    #[error(transparent)]
    Verification(#[from] VerificationError),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl WayfinderError {
    /// Returns `true` if invoking the request again may succeed.
    ///
    /// Selection failures count as transient since a new call re-runs selection.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_transient(),
            Self::Routing(RoutingError::NoHealthyGateways { .. }) | Self::Gateways(_) => true,
            _ => false,
        }
    }
}
