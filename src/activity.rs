//! Fire-and-forget activity audit sink.
//!
//! Activity writes are a non-blocking side channel: the insert runs on a
//! spawned task the request handler never awaits, and failures are logged
//! rather than propagated. An audit outage must never fail the operation
//! it describes.

use rocket_db_pools::sqlx::{self, PgPool};
use uuid::Uuid;

use crate::models::ActivityEntry;
use crate::store::RequestContext;

/// One event headed for the audit trail.
#[derive(Debug, Clone)]
pub struct ActivityEvent {
    pub action: &'static str,
    pub message: String,
    pub geofeed_id: Option<Uuid>,
    pub geofeed_name: Option<String>,
}

impl ActivityEvent {
    pub fn new(action: &'static str, message: String) -> Self {
        Self {
            action,
            message,
            geofeed_id: None,
            geofeed_name: None,
        }
    }

    pub fn for_geofeed(action: &'static str, message: String, id: Uuid, name: &str) -> Self {
        Self {
            action,
            message,
            geofeed_id: Some(id),
            geofeed_name: Some(name.to_string()),
        }
    }
}

/// Record `event` for the calling user without blocking the request.
pub fn record_activity(pool: &PgPool, ctx: &RequestContext, event: ActivityEvent) {
    let pool = pool.clone();
    let user_id = ctx.user_id;
    tokio::spawn(async move {
        let result = sqlx::query(
            r#"INSERT INTO activity_log (user_id, action, message, geofeed_id, geofeed_name)
               VALUES ($1, $2, $3, $4, $5)"#,
        )
        .bind(user_id)
        .bind(event.action)
        .bind(&event.message)
        .bind(event.geofeed_id)
        .bind(&event.geofeed_name)
        .execute(&pool)
        .await;

        if let Err(err) = result {
            log::warn!("failed to record activity '{}': {}", event.action, err);
        }
    });
}

/// The caller's most recent activity entries, newest first.
pub async fn list_activity(
    pool: &PgPool,
    ctx: &RequestContext,
    limit: i64,
) -> sqlx::Result<Vec<ActivityEntry>> {
    sqlx::query_as(
        r#"SELECT id, user_id, action, message, geofeed_id, geofeed_name, created_at
           FROM activity_log
           WHERE user_id = $1
           ORDER BY created_at DESC
           LIMIT $2"#,
    )
    .bind(ctx.user_id)
    .bind(limit)
    .fetch_all(pool)
    .await
}

/// Clamp a caller-supplied activity page size into 1..=100, defaulting
/// to 10 when absent.
pub fn clamp_activity_limit(raw: Option<i64>) -> i64 {
    raw.unwrap_or(10).clamp(1, 100)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn activity_limit_is_clamped() {
        assert_eq!(clamp_activity_limit(None), 10);
        assert_eq!(clamp_activity_limit(Some(0)), 1);
        assert_eq!(clamp_activity_limit(Some(-5)), 1);
        assert_eq!(clamp_activity_limit(Some(25)), 25);
        assert_eq!(clamp_activity_limit(Some(1000)), 100);
    }
}
