//! Activity log listing.

use rocket::State;
use rocket::serde::json::Json;
use rocket_okapi::openapi;
use sqlx::PgPool;

use crate::activity;
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::models::{ActivityEntry, DataResponse};
use crate::store::RequestContext;

/// The caller's recent activity entries, newest first. `limit` is clamped
/// to 1..=100 and defaults to 10.
#[openapi(tag = "Activity")]
#[get("/activity?<limit>")]
pub async fn list_activity(
    user: AuthUser,
    pool: &State<PgPool>,
    limit: Option<i64>,
) -> Result<Json<DataResponse<Vec<ActivityEntry>>>, ApiError> {
    let ctx = RequestContext::from(&user);
    let limit = activity::clamp_activity_limit(limit);
    let entries = activity::list_activity(pool, &ctx, limit).await?;
    Ok(Json(DataResponse { data: entries }))
}
