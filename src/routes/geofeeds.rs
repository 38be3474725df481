//! Geofeed container CRUD.

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
use crate::export::{self, PublishConfig};
use crate::models::{DataResponse, Geofeed, GeofeedRow, GeofeedSummary};
use crate::routes::helpers::resolve_owned_geofeed;
use crate::store::{GeofeedStore, RequestContext};

/// List the caller's finalized geofeeds, newest first, with row counts and
/// public URLs where published. Drafts are excluded; see
/// [`list_draft_geofeeds`].
#[openapi(tag = "Geofeeds")]
#[get("/geofeeds")]
pub async fn list_geofeeds(
    user: AuthUser,
    pool: &State<PgPool>,
    publish: &State<PublishConfig>,
) -> Result<Json<DataResponse<Vec<GeofeedSummary>>>, ApiError> {
    let ctx = RequestContext::from(&user);
    let mut summaries = GeofeedStore::new(pool).list_geofeeds(&ctx).await?;

    for summary in &mut summaries {
        if summary.published {
            summary.published_url = Some(publish.public_url(summary.id));
        }
    }

    Ok(Json(DataResponse { data: summaries }))
}

/// List the caller's draft geofeeds awaiting an import commit or
/// abandonment. Surfaced separately so a half-finished import never shows
/// up as a completed feed.
#[openapi(tag = "Geofeeds")]
#[get("/geofeeds/drafts")]
pub async fn list_draft_geofeeds(
    user: AuthUser,
    pool: &State<PgPool>,
) -> Result<Json<DataResponse<Vec<GeofeedSummary>>>, ApiError> {
    let ctx = RequestContext::from(&user);
    let drafts = GeofeedStore::new(pool).list_drafts(&ctx).await?;
    Ok(Json(DataResponse { data: drafts }))
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateGeofeedRequest {
    pub name: String,
    #[serde(default)]
    pub is_draft: bool,
}

/// Create a geofeed.
#[openapi(tag = "Geofeeds")]
#[post("/geofeeds", data = "<request>")]
pub async fn create_geofeed(
    user: AuthUser,
    pool: &State<PgPool>,
    request: Json<CreateGeofeedRequest>,
) -> Result<Json<Geofeed>, ApiError> {
    let name = request.name.trim();
    if name.is_empty() {
        return Err(ApiError::BadRequest("Name is required".to_string()));
    }

    let ctx = RequestContext::from(&user);
    let geofeed = GeofeedStore::new(pool)
        .create_geofeed(&ctx, name, request.is_draft)
        .await?;

    record_activity(
        pool,
        &ctx,
        ActivityEvent::for_geofeed(
            "geofeed.create",
            format!("Created geofeed \"{}\"", geofeed.name),
            geofeed.id,
            &geofeed.name,
        ),
    );

    Ok(Json(geofeed))
}

/// A geofeed with its full row set.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GeofeedDetail {
    pub geofeed: Geofeed,
    pub ranges: Vec<GeofeedRow>,
}

/// Fetch one geofeed with all of its rows.
#[openapi(tag = "Geofeeds")]
#[get("/geofeeds/<geofeed_id>")]
pub async fn get_geofeed(
    user: AuthUser,
    pool: &State<PgPool>,
    geofeed_id: Uuid,
) -> Result<Json<GeofeedDetail>, ApiError> {
    let ctx = RequestContext::from(&user);
    let geofeed = resolve_owned_geofeed(pool, &ctx, geofeed_id).await?;
    let ranges = GeofeedStore::new(pool).list_rows(&ctx, geofeed_id).await?;

    Ok(Json(GeofeedDetail { geofeed, ranges }))
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct RenameGeofeedRequest {
    pub name: String,
}

/// Rename a geofeed. A rename is a direct edit, so it also finalizes a
/// draft.
#[openapi(tag = "Geofeeds")]
#[patch("/geofeeds/<geofeed_id>", data = "<request>")]
pub async fn rename_geofeed(
    user: AuthUser,
    pool: &State<PgPool>,
    geofeed_id: Uuid,
    request: Json<RenameGeofeedRequest>,
) -> Result<Json<Geofeed>, ApiError> {
    let name = request.name.trim();
    if name.is_empty() {
        return Err(ApiError::BadRequest("Name is required".to_string()));
    }

    let ctx = RequestContext::from(&user);
    let previous = resolve_owned_geofeed(pool, &ctx, geofeed_id).await?;

    let updated = GeofeedStore::new(pool)
        .rename_geofeed(&ctx, geofeed_id, name)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Geofeed '{geofeed_id}' not found")))?;

    record_activity(
        pool,
        &ctx,
        ActivityEvent::for_geofeed(
            "geofeed.rename",
            format!(
                "Renamed geofeed \"{}\" to \"{}\"",
                previous.name, updated.name
            ),
            updated.id,
            &updated.name,
        ),
    );

    Ok(Json(updated))
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeletedResponse {
    pub id: Uuid,
}

/// Delete a geofeed, its rows, and any published feed file.
#[openapi(tag = "Geofeeds")]
#[delete("/geofeeds/<geofeed_id>")]
pub async fn delete_geofeed(
    user: AuthUser,
    pool: &State<PgPool>,
    publish: &State<PublishConfig>,
    geofeed_id: Uuid,
) -> Result<Json<DeletedResponse>, ApiError> {
    let ctx = RequestContext::from(&user);
    let geofeed = resolve_owned_geofeed(pool, &ctx, geofeed_id).await?;

    record_activity(
        pool,
        &ctx,
        ActivityEvent::for_geofeed(
            "geofeed.delete",
            format!("Deleted geofeed \"{}\"", geofeed.name),
            geofeed.id,
            &geofeed.name,
        ),
    );

    let deleted = GeofeedStore::new(pool)
        .delete_geofeed(&ctx, geofeed_id)
        .await?;
    if deleted > 0 {
        export::remove_feed_best_effort(publish, geofeed_id).await;
    }

    Ok(Json(DeletedResponse { id: geofeed_id }))
}
