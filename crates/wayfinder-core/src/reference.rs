//! `ar://` reference parsing and URL resolution.
//!
//! Grammar of the path following `ar://`, checked in this order:
//!
//! 1. starts with `/`: root-relative gateway API path (`ar:///info`)
//! 2. first segment matches `[A-Za-z0-9_-]{43}`: transaction id (`ar://<id>/path`)
//! 3. first segment matches `[a-z0-9_-]{1,51}`: `ArNS` name (`ar://name/path`)
//!
//! Inputs without the `ar://` prefix are not references and are left untouched by
//! callers. Once the prefix is recognised, anything else is a [`ReferenceError`].

use url::Url;

use crate::errors::ReferenceError;

/// Scheme marker of a wayfinder reference.
pub const AR_PROTOCOL: &str = "ar://";

/// Length of a base64url-encoded transaction id.
pub const TX_ID_LENGTH: usize = 43;

/// Maximum length of an `ArNS` name.
pub const MAX_NAME_LENGTH: usize = 51;

/// A parsed `ar://` reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reference {
    /// Gateway API path, stored without its leading slash.
    RootRelative { path: String },
    /// Transaction id plus trailing path, query and fragment.
    TransactionId { id: String, rest: String },
    /// `ArNS` name plus trailing path, query and fragment.
    Name { name: String, rest: String },
}

impl Reference {
    /// Parses `input` as an `ar://` reference.
    ///
    /// Returns `Ok(None)` when the input does not use the `ar://` scheme.
    ///
    /// # Errors
    ///
    /// Returns [`ReferenceError`] for an `ar://` input whose path is empty or malformed.
    pub fn parse(input: &str) -> Result<Option<Self>, ReferenceError> {
        let Some(path) = input.strip_prefix(AR_PROTOCOL) else {
            return Ok(None);
        };

        if path.is_empty() {
            return Err(ReferenceError::Empty);
        }

        if let Some(stripped) = path.strip_prefix('/') {
            return Ok(Some(Self::RootRelative { path: stripped.to_string() }));
        }

        let split = path.find(['/', '?', '#']).unwrap_or(path.len());
        let (segment, rest) = path.split_at(split);

        if is_transaction_id(segment) {
            return Ok(Some(Self::TransactionId { id: segment.to_string(), rest: rest.to_string() }));
        }

        if is_arns_name(segment) {
            return Ok(Some(Self::Name { name: segment.to_string(), rest: rest.to_string() }));
        }

        Err(ReferenceError::Invalid {
            reference: input.to_string(),
            reason: format!(
                "'{segment}' is neither a {TX_ID_LENGTH}-character transaction id nor a name of \
                 1-{MAX_NAME_LENGTH} lowercase alphanumeric, '-' or '_' characters"
            ),
        })
    }

    /// Transaction id carried by the reference itself, if any.
    #[must_use]
    pub fn transaction_id(&self) -> Option<&str> {
        match self {
            Self::TransactionId { id, .. } => Some(id),
            _ => None,
        }
    }

    /// Builds the concrete URL for this reference on `gateway`.
    ///
    /// # Errors
    ///
    /// Returns [`ReferenceError::UrlConstruction`] if the gateway has no host or the
    /// combined URL does not parse.
    pub fn to_url(&self, gateway: &Url) -> Result<Url, ReferenceError> {
        let raw = match self {
            Self::RootRelative { path } => format!("{}/{path}", origin(gateway)?),
            Self::TransactionId { id, rest } => format!("{}/{id}{rest}", origin(gateway)?),
            Self::Name { name, rest } => {
                let host = gateway.host_str().ok_or_else(|| self.construction_error("gateway has no host"))?;
                let port = gateway.port().map(|p| format!(":{p}")).unwrap_or_default();
                let rest = if rest.starts_with('/') { rest.clone() } else { format!("/{rest}") };
                format!("{}://{name}.{host}{port}{rest}", gateway.scheme())
            }
        };

        Url::parse(&raw).map_err(|e| self.construction_error(&e.to_string()))
    }

    fn construction_error(&self, reason: &str) -> ReferenceError {
        ReferenceError::UrlConstruction { reference: self.to_string(), reason: reason.to_string() }
    }
}

impl std::fmt::Display for Reference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RootRelative { path } => write!(f, "{AR_PROTOCOL}/{path}"),
            Self::TransactionId { id, rest } => write!(f, "{AR_PROTOCOL}{id}{rest}"),
            Self::Name { name, rest } => write!(f, "{AR_PROTOCOL}{name}{rest}"),
        }
    }
}

fn origin(gateway: &Url) -> Result<String, ReferenceError> {
    let origin = gateway.origin();
    if !origin.is_tuple() {
        return Err(ReferenceError::UrlConstruction {
            reference: gateway.to_string(),
            reason: "gateway URL has no origin".to_string(),
        });
    }
    Ok(origin.ascii_serialization())
}

/// `^[A-Za-z0-9_-]{43}$`
#[must_use]
pub fn is_transaction_id(segment: &str) -> bool {
    segment.len() == TX_ID_LENGTH &&
        segment.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

/// `^[a-z0-9_-]{1,51}$`
#[must_use]
pub fn is_arns_name(segment: &str) -> bool {
    (1..=MAX_NAME_LENGTH).contains(&segment.len()) &&
        segment
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-' || b == b'_')
}
