use chrono::{DateTime, Utc};
use rocket_db_pools::sqlx::FromRow;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ===== Geofeed Models =====

/// A named, user-owned collection of IP-range-to-location mappings.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Geofeed {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub is_draft: bool,
    pub published: bool,
    pub created_at: DateTime<Utc>,
}

/// One stored RFC 8805 record.
///
/// The optional location fields are kept as plain strings with `""`
/// meaning absent; storage never holds NULL for them, which keeps the
/// reconciliation-key uniqueness constraint on plain columns.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GeofeedRow {
    pub id: Uuid,
    pub geofeed_id: Uuid,
    pub user_id: Uuid,
    pub network: String,
    pub country_code: String,
    pub subdivision: String,
    pub city: String,
    pub postal_code: String,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for a geofeed row, already validated and normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewGeofeedRow {
    pub network: String,
    pub country_code: String,
    pub subdivision: String,
    pub city: String,
    pub postal_code: String,
}

/// Listing entry for a geofeed with its row count and, when the feed has
/// been generated, the public URL it is served from.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GeofeedSummary {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub is_draft: bool,
    pub published: bool,
    pub created_at: DateTime<Utc>,
    pub row_count: i64,
    #[sqlx(default)]
    pub published_url: Option<String>,
}

// ===== Activity Log =====

/// One audit-trail entry, written fire-and-forget by the activity sink.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub action: String,
    pub message: String,
    pub geofeed_id: Option<Uuid>,
    pub geofeed_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

// ===== Generic Response Envelopes =====

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DataResponse<T> {
    pub data: T,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct MessageResponse {
    pub message: String,
}
