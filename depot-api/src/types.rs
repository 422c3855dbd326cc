//! Request and response shapes shared by the HTTP surfaces.

use depot_core::ListPage;
use depot_storage::CacheStats;
use serde::{Deserialize, Serialize};

use crate::error::ErrorCode;

pub const STATUS_OK: &str = "ok";
pub const STATUS_ERROR: &str = "error";

// ============================================================================
// RESPONSE ENVELOPES
// ============================================================================

/// Success envelope: `{"status":"ok", "items"?, "nextToken"?}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_token: Option<String>,
}

impl ApiResponse {
    pub fn ok() -> Self {
        Self {
            status: STATUS_OK.to_string(),
            items: None,
            next_token: None,
        }
    }
}

impl From<ListPage> for ApiResponse {
    fn from(page: ListPage) -> Self {
        Self {
            status: STATUS_OK.to_string(),
            items: Some(page.items),
            next_token: page.next_token.filter(|t| !t.is_empty()),
        }
    }
}

/// Failure envelope: `{"status":"error", "error": "<message>"}`.
///
/// Also parsed by the remote client, so every field but `error` is optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<ErrorCode>,
}

impl ErrorEnvelope {
    pub fn new(error: impl Into<String>, code: Option<ErrorCode>) -> Self {
        Self {
            status: STATUS_ERROR.to_string(),
            error: error.into(),
            code,
        }
    }
}

/// Counters of one cache tier, as served by the health routes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TierStatsResponse {
    pub tier: String,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub entry_count: u64,
    pub hit_rate: f64,
}

impl TierStatsResponse {
    pub fn new(tier: impl Into<String>, stats: &CacheStats) -> Self {
        Self {
            tier: tier.into(),
            hits: stats.hits,
            misses: stats.misses,
            evictions: stats.evictions,
            entry_count: stats.entry_count,
            hit_rate: stats.hit_rate(),
        }
    }
}

// ============================================================================
// QUERY PARAMETERS
// ============================================================================

/// `?token=` on listing routes. An empty token means "first page".
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub token: Option<String>,
}

impl ListQuery {
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref().filter(|t| !t.is_empty())
    }
}

/// `?dev=` on fetch and pointer routes.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChannelQuery {
    #[serde(default)]
    pub dev: Option<String>,
}

impl ChannelQuery {
    pub fn dev(&self) -> bool {
        is_truthy(self.dev.as_deref())
    }
}

/// `?dev=` / `?prod=` promotion flags on publish.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PublishQuery {
    #[serde(default)]
    pub dev: Option<String>,
    #[serde(default)]
    pub prod: Option<String>,
}

impl PublishQuery {
    pub fn dev(&self) -> bool {
        is_truthy(self.dev.as_deref())
    }

    pub fn prod(&self) -> bool {
        is_truthy(self.prod.as_deref())
    }
}

/// Flags are on only for a case-insensitive `true`.
pub fn is_truthy(value: Option<&str>) -> bool {
    value.is_some_and(|v| v.trim().eq_ignore_ascii_case("true"))
}
