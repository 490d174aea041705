use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::{collections::HashSet, sync::Arc};

use super::GatewaysProvider;
use crate::{
    errors::GatewaysError,
    routing::Blocklist,
    types::{Gateway, GatewayList, GatewayRecord, SortBy, SortOrder},
};

/// Default page size requested from the registry.
pub const DEFAULT_PAGE_SIZE: usize = 1_000;

/// One page request against the gateway registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayQuery {
    pub sort_by: SortBy,
    pub sort_order: SortOrder,
    pub limit: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
}

/// One page of registry results. A missing `next_cursor` marks the last page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayPage {
    pub items: Vec<GatewayRecord>,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

/// Read interface of the gateway registry.
#[async_trait]
pub trait GatewayRegistry: Send + Sync {
    async fn get_gateways(&self, query: GatewayQuery) -> Result<GatewayPage, GatewaysError>;
}

/// Provider sourcing gateways from the live registry.
///
/// Pages through the registry until it stops returning a cursor, keeps only joined
/// gateways outside the blocklist and truncates to `max_gateways`. A cursor the
/// registry already handed out is an error.
pub struct NetworkGatewaysProvider {
    registry: Arc<dyn GatewayRegistry>,
    sort_by: SortBy,
    sort_order: SortOrder,
    page_size: usize,
    max_gateways: Option<usize>,
    blocklist: Blocklist,
}

impl NetworkGatewaysProvider {
    #[must_use]
    pub fn new(registry: Arc<dyn GatewayRegistry>) -> Self {
        Self {
            registry,
            sort_by: SortBy::default(),
            sort_order: SortOrder::default(),
            page_size: DEFAULT_PAGE_SIZE,
            max_gateways: None,
            blocklist: Blocklist::default(),
        }
    }

    #[must_use]
    pub fn with_sort(mut self, sort_by: SortBy, sort_order: SortOrder) -> Self {
        self.sort_by = sort_by;
        self.sort_order = sort_order;
        self
    }

    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    #[must_use]
    pub fn with_max_gateways(mut self, max: usize) -> Self {
        self.max_gateways = Some(max);
        self
    }

    /// Hostnames that are never returned. Matching ignores ASCII case.
    #[must_use]
    pub fn with_blocklist<I, S>(mut self, hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.blocklist = Blocklist::new(hosts);
        self
    }

    fn is_eligible(&self, gateway: &Gateway) -> bool {
        gateway.is_joined() && !self.blocklist.contains(gateway)
    }
}

#[async_trait]
impl GatewaysProvider for NetworkGatewaysProvider {
    async fn get_gateways(&self) -> Result<GatewayList, GatewaysError> {
        let mut gateways = Vec::new();
        let mut cursor = None;
        let mut seen_cursors = HashSet::new();
        let mut pages = 0_usize;

        loop {
            let page = self
                .registry
                .get_gateways(GatewayQuery {
                    sort_by: self.sort_by,
                    sort_order: self.sort_order,
                    limit: self.page_size,
                    cursor: cursor.take(),
                })
                .await?;
            pages += 1;

            for record in page.items {
                let address = record.gateway_address.clone();
                match Gateway::try_from(record) {
                    Ok(gateway) if self.is_eligible(&gateway) => gateways.push(gateway),
                    Ok(_) => {}
                    Err(e) => {
                        tracing::debug!(gateway = %address, error = %e, "skipping registry record");
                    }
                }
            }

            match page.next_cursor {
                Some(next) if !next.is_empty() => {
                    if !seen_cursors.insert(next.clone()) {
                        tracing::warn!(cursor = %next, pages = pages, "registry repeated a page cursor");
                        return Err(GatewaysError::Registry("registry cursor did not advance".to_string()));
                    }
                    cursor = Some(next);
                }
                _ => break,
            }
        }

        if let Some(max) = self.max_gateways {
            gateways.truncate(max);
        }

        tracing::debug!(pages = pages, gateways = gateways.len(), "fetched gateways from registry");

        Ok(gateways.into())
    }
}
