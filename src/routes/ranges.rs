//! Single-range CRUD inside a geofeed.
//!
//! These are the direct edit paths: they run the same validators as the
//! import pipeline, but operate on one row at a time and bypass the
//! preview/commit workflow.

use rocket::State;
use rocket::serde::json::Json;
use rocket_okapi::openapi;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::activity::{ActivityEvent, record_activity};
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::import::alpha2::{is_valid_alpha2, normalize_alpha2};
use crate::import::cidr::is_valid_cidr;
use crate::models::{DataResponse, GeofeedRow, MessageResponse, NewGeofeedRow};
use crate::routes::helpers::resolve_owned_geofeed;
use crate::store::{GeofeedStore, RequestContext};

/// List all rows of a geofeed in insertion order.
#[openapi(tag = "Ranges")]
#[get("/geofeeds/<geofeed_id>/ranges")]
pub async fn list_ranges(
    user: AuthUser,
    pool: &State<PgPool>,
    geofeed_id: Uuid,
) -> Result<Json<DataResponse<Vec<GeofeedRow>>>, ApiError> {
    let ctx = RequestContext::from(&user);
    resolve_owned_geofeed(pool, &ctx, geofeed_id).await?;
    let ranges = GeofeedStore::new(pool).list_rows(&ctx, geofeed_id).await?;
    Ok(Json(DataResponse { data: ranges }))
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateRangeRequest {
    pub network: String,
    pub country_code: String,
    #[serde(default)]
    pub subdivision: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub postal_code: String,
}

/// Add a single range to a geofeed.
///
/// Runs the same CIDR and country checks as the import pipeline; a row
/// that matches an existing reconciliation key is rejected rather than
/// silently duplicated. As a direct edit this also finalizes a draft.
#[openapi(tag = "Ranges")]
#[post("/geofeeds/<geofeed_id>/ranges", data = "<request>")]
pub async fn create_range(
    user: AuthUser,
    pool: &State<PgPool>,
    geofeed_id: Uuid,
    request: Json<CreateRangeRequest>,
) -> Result<Json<GeofeedRow>, ApiError> {
    let ctx = RequestContext::from(&user);
    let geofeed = resolve_owned_geofeed(pool, &ctx, geofeed_id).await?;

    let network = request.network.trim().to_string();
    let country_code = normalize_alpha2(&request.country_code);

    if network.is_empty() || !is_valid_cidr(&network) {
        return Err(ApiError::BadRequest("Invalid CIDR format".to_string()));
    }
    if !is_valid_alpha2(&country_code) {
        return Err(ApiError::BadRequest(
            "Invalid alpha2code (must be a 2-letter ISO 3166-1 code)".to_string(),
        ));
    }

    let store = GeofeedStore::new(pool);
    let row = NewGeofeedRow {
        network,
        country_code,
        subdivision: request.subdivision.trim().to_string(),
        city: request.city.trim().to_string(),
        postal_code: request.postal_code.trim().to_string(),
    };

    let inserted = store
        .insert_range(&ctx, geofeed_id, &row)
        .await?
        .ok_or_else(|| {
            ApiError::BadRequest("An identical range already exists in this geofeed".to_string())
        })?;

    if geofeed.is_draft {
        store.set_draft_flag(&ctx, geofeed_id, false).await?;
    }

    record_activity(
        pool,
        &ctx,
        ActivityEvent::for_geofeed(
            "range.create",
            format!("Added range {} to \"{}\"", inserted.network, geofeed.name),
            geofeed.id,
            &geofeed.name,
        ),
    );

    Ok(Json(inserted))
}

/// Remove a single range.
#[openapi(tag = "Ranges")]
#[delete("/geofeeds/<geofeed_id>/ranges/<range_id>")]
pub async fn delete_range(
    user: AuthUser,
    pool: &State<PgPool>,
    geofeed_id: Uuid,
    range_id: Uuid,
) -> Result<Json<MessageResponse>, ApiError> {
    let ctx = RequestContext::from(&user);
    let geofeed = resolve_owned_geofeed(pool, &ctx, geofeed_id).await?;

    let deleted = GeofeedStore::new(pool)
        .delete_range(&ctx, geofeed_id, range_id)
        .await?;
    if deleted == 0 {
        return Err(ApiError::NotFound(format!("Range '{range_id}' not found")));
    }

    record_activity(
        pool,
        &ctx,
        ActivityEvent::for_geofeed(
            "range.delete",
            format!("Removed a range from \"{}\"", geofeed.name),
            geofeed.id,
            &geofeed.name,
        ),
    );

    Ok(Json(MessageResponse {
        message: "Range deleted".to_string(),
    }))
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct BulkDeleteRequest {
    pub ids: Vec<Uuid>,
}

#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BulkDeleteResponse {
    pub deleted_count: u64,
}

/// Remove a batch of ranges by id.
#[openapi(tag = "Ranges")]
#[post("/geofeeds/<geofeed_id>/ranges/bulk-delete", data = "<request>")]
pub async fn bulk_delete_ranges(
    user: AuthUser,
    pool: &State<PgPool>,
    geofeed_id: Uuid,
    request: Json<BulkDeleteRequest>,
) -> Result<Json<BulkDeleteResponse>, ApiError> {
    if request.ids.is_empty() {
        return Err(ApiError::BadRequest("No range ids provided".to_string()));
    }

    let ctx = RequestContext::from(&user);
    resolve_owned_geofeed(pool, &ctx, geofeed_id).await?;

    let deleted_count = GeofeedStore::new(pool)
        .delete_ranges(&ctx, geofeed_id, &request.ids)
        .await?;

    Ok(Json(BulkDeleteResponse { deleted_count }))
}
