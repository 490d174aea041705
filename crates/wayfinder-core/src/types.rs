//! Core type definitions for gateways and gateway snapshots.
//!
//! # Type Categories
//!
//! - [`Gateway`], [`GatewayStatus`]: endpoint identity plus ranking attributes
//! - [`GatewayList`]: immutable snapshot produced by one provider fetch
//! - [`GatewayRecord`], [`GatewaySettings`]: wire shape of the gateway registry
//! - [`SortBy`], [`SortOrder`]: ranking knobs shared by the registry query and the
//!   priority strategy

use serde::{Deserialize, Serialize};
use std::{fmt, sync::Arc};
use url::Url;

use crate::errors::GatewaysError;

/// Immutable snapshot of gateways produced by a single provider fetch.
///
/// Snapshots are shared by reference; a fresh fetch replaces the whole snapshot.
pub type GatewayList = Arc<[Gateway]>;

/// Lifecycle status of a gateway in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GatewayStatus {
    /// Gateway is an active member of the network.
    Joined,
    /// Gateway is exiting the network and must not receive traffic.
    Leaving,
}

impl fmt::Display for GatewayStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Joined => write!(f, "joined"),
            Self::Leaving => write!(f, "leaving"),
        }
    }
}

/// A gateway endpoint together with the attributes used by ranking strategies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gateway {
    /// Base URL (`<protocol>://<host>[:<port>]`).
    pub url: Url,
    pub status: GatewayStatus,
    /// Stake held by the operator.
    pub operator_stake: u64,
    /// Stake delegated to the gateway by third parties.
    pub total_delegated_stake: u64,
    /// Join timestamp in milliseconds since the epoch.
    pub start_timestamp: u64,
}

impl Gateway {
    /// Creates a joined gateway with zero ranking attributes.
    #[must_use]
    pub fn new(url: Url) -> Self {
        Self {
            url,
            status: GatewayStatus::Joined,
            operator_stake: 0,
            total_delegated_stake: 0,
            start_timestamp: 0,
        }
    }

    #[must_use]
    pub fn with_status(mut self, status: GatewayStatus) -> Self {
        self.status = status;
        self
    }

    #[must_use]
    pub fn with_operator_stake(mut self, stake: u64) -> Self {
        self.operator_stake = stake;
        self
    }

    #[must_use]
    pub fn with_delegated_stake(mut self, stake: u64) -> Self {
        self.total_delegated_stake = stake;
        self
    }

    #[must_use]
    pub fn with_start_timestamp(mut self, timestamp: u64) -> Self {
        self.start_timestamp = timestamp;
        self
    }

    /// Hostname of the gateway, used for blocklist matching.
    #[must_use]
    pub fn hostname(&self) -> Option<&str> {
        self.url.host_str()
    }

    #[must_use]
    pub fn is_joined(&self) -> bool {
        self.status == GatewayStatus::Joined
    }

    /// Returns the value of the given ranking field.
    #[must_use]
    pub fn sort_key(&self, field: SortBy) -> u64 {
        match field {
            SortBy::OperatorStake => self.operator_stake,
            SortBy::TotalDelegatedStake => self.total_delegated_stake,
            SortBy::StartTimestamp => self.start_timestamp,
        }
    }
}

/// Builds a gateway list from plain URLs.
///
/// # Errors
///
/// Returns [`GatewaysError::InvalidGateway`] if any URL fails to parse or is not http(s).
pub fn gateways_from_urls<I, S>(urls: I) -> Result<GatewayList, GatewaysError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    urls.into_iter()
        .map(|raw| parse_gateway_url(raw.as_ref()).map(Gateway::new))
        .collect::<Result<Vec<_>, _>>()
        .map(Arc::from)
}

/// Parses and validates a gateway base URL.
///
/// # Errors
///
/// Returns [`GatewaysError::InvalidGateway`] for unparseable URLs, non-http(s) schemes
/// or URLs without a host.
pub fn parse_gateway_url(raw: &str) -> Result<Url, GatewaysError> {
    let url = Url::parse(raw).map_err(|e| GatewaysError::InvalidGateway {
        gateway: raw.to_string(),
        reason: e.to_string(),
    })?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(GatewaysError::InvalidGateway {
            gateway: raw.to_string(),
            reason: format!("unsupported scheme '{}'", url.scheme()),
        });
    }
    if url.host_str().is_none() {
        return Err(GatewaysError::InvalidGateway {
            gateway: raw.to_string(),
            reason: "missing host".to_string(),
        });
    }

    Ok(url)
}

/// Numeric gateway attribute used for ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortBy {
    #[default]
    OperatorStake,
    TotalDelegatedStake,
    StartTimestamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// Network settings of a registry gateway record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewaySettings {
    pub protocol: String,
    pub fqdn: String,
    pub port: u16,
}

/// A gateway as reported by the registry read interface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayRecord {
    pub gateway_address: String,
    pub status: GatewayStatus,
    #[serde(default)]
    pub operator_stake: u64,
    #[serde(default)]
    pub total_delegated_stake: u64,
    #[serde(default)]
    pub start_timestamp: u64,
    pub settings: GatewaySettings,
}

impl TryFrom<GatewayRecord> for Gateway {
    type Error = GatewaysError;

    fn try_from(record: GatewayRecord) -> Result<Self, Self::Error> {
        let GatewaySettings { protocol, fqdn, port } = record.settings;
        let url = parse_gateway_url(&format!("{protocol}://{fqdn}:{port}"))?;

        Ok(Self {
            url,
            status: record.status,
            operator_stake: record.operator_stake,
            total_delegated_stake: record.total_delegated_stake,
            start_timestamp: record.start_timestamp,
        })
    }
}
