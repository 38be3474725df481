//! Shared helper functions for Rocket route handlers.

use sqlx::PgPool;
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::Geofeed;
use crate::store::{GeofeedStore, RequestContext};

/// Resolve a geofeed the caller owns.
///
/// Returns [`ApiError::NotFound`] both when the geofeed does not exist and
/// when it belongs to another user, so ownership probes are
/// indistinguishable from missing ids.
pub async fn resolve_owned_geofeed(
    pool: &PgPool,
    ctx: &RequestContext,
    geofeed_id: Uuid,
) -> Result<Geofeed, ApiError> {
    GeofeedStore::new(pool)
        .get_geofeed(ctx, geofeed_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Geofeed '{geofeed_id}' not found")))
}
