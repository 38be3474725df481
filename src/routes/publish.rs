//! Feed generation, download, and un-publication.

use rocket::State;
use rocket::http::{ContentType, Header};
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
use crate::models::MessageResponse;
use crate::routes::helpers::resolve_owned_geofeed;
use crate::store::{GeofeedStore, RequestContext};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub url: String,
    pub record_count: usize,
}

/// Generate the CSV for a geofeed and publish it under the public
/// directory.
#[openapi(tag = "Publication")]
#[post("/geofeeds/<geofeed_id>/generate")]
pub async fn generate_geofeed(
    user: AuthUser,
    pool: &State<PgPool>,
    publish: &State<PublishConfig>,
    geofeed_id: Uuid,
) -> Result<Json<GenerateResponse>, ApiError> {
    let ctx = RequestContext::from(&user);
    let geofeed = resolve_owned_geofeed(pool, &ctx, geofeed_id).await?;

    let store = GeofeedStore::new(pool);
    let rows = store.list_rows(&ctx, geofeed_id).await?;
    let csv = export::render_csv(&rows);

    export::write_feed(publish, geofeed_id, &csv).await?;
    store.set_published_flag(&ctx, geofeed_id, true).await?;

    record_activity(
        pool,
        &ctx,
        ActivityEvent::for_geofeed(
            "geofeed.publish",
            format!(
                "Published geofeed \"{}\" ({} ranges)",
                geofeed.name,
                rows.len()
            ),
            geofeed.id,
            &geofeed.name,
        ),
    );

    Ok(Json(GenerateResponse {
        url: publish.public_url(geofeed_id),
        record_count: rows.len(),
    }))
}

/// Remove a geofeed's published file from the public directory. A feed
/// that was never published is not an error.
#[openapi(tag = "Publication")]
#[post("/geofeeds/<geofeed_id>/unpublish")]
pub async fn unpublish_geofeed(
    user: AuthUser,
    pool: &State<PgPool>,
    publish: &State<PublishConfig>,
    geofeed_id: Uuid,
) -> Result<Json<MessageResponse>, ApiError> {
    let ctx = RequestContext::from(&user);
    let geofeed = resolve_owned_geofeed(pool, &ctx, geofeed_id).await?;

    export::remove_feed(publish, geofeed_id).await?;
    GeofeedStore::new(pool)
        .set_published_flag(&ctx, geofeed_id, false)
        .await?;

    record_activity(
        pool,
        &ctx,
        ActivityEvent::for_geofeed(
            "geofeed.unpublish",
            format!("Unpublished geofeed \"{}\"", geofeed.name),
            geofeed.id,
            &geofeed.name,
        ),
    );

    Ok(Json(MessageResponse {
        message: "Geofeed unpublished".to_string(),
    }))
}

/// A rendered CSV served as a file attachment.
#[derive(Responder)]
pub struct CsvAttachment {
    content: (ContentType, String),
    disposition: Header<'static>,
}

/// Download the geofeed as a CSV attachment, rendered on the fly.
#[openapi(skip)]
#[get("/geofeeds/<geofeed_id>/download")]
pub async fn download_geofeed(
    user: AuthUser,
    pool: &State<PgPool>,
    geofeed_id: Uuid,
) -> Result<CsvAttachment, ApiError> {
    let ctx = RequestContext::from(&user);
    let geofeed = resolve_owned_geofeed(pool, &ctx, geofeed_id).await?;

    let rows = GeofeedStore::new(pool).list_rows(&ctx, geofeed_id).await?;
    let csv = export::render_csv(&rows);

    record_activity(
        pool,
        &ctx,
        ActivityEvent::for_geofeed(
            "geofeed.download",
            format!(
                "Downloaded geofeed \"{}\" ({} ranges)",
                geofeed.name,
                rows.len()
            ),
            geofeed.id,
            &geofeed.name,
        ),
    );

    Ok(CsvAttachment {
        content: (ContentType::CSV, csv),
        disposition: Header::new(
            "Content-Disposition",
            format!(
                "attachment; filename=\"{}\"",
                export::feed_file_name(geofeed_id)
            ),
        ),
    })
}
