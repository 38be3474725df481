//! Scoped storage queries for geofeeds, rows, and drafts.
//!
//! Every query filters by both the geofeed and the owning user, so a caller
//! can never read or mutate another tenant's data. Identity arrives as an
//! explicit [`RequestContext`] threaded into each call rather than ambient
//! session state.

use rocket_db_pools::sqlx::{self, PgPool};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::models::{Geofeed, GeofeedRow, GeofeedSummary, NewGeofeedRow};

/// Per-request caller identity, passed into every storage and audit call.
#[derive(Debug, Clone, Copy)]
pub struct RequestContext {
    pub user_id: Uuid,
}

impl From<&AuthUser> for RequestContext {
    fn from(user: &AuthUser) -> Self {
        Self { user_id: user.id }
    }
}

const GEOFEED_COLUMNS: &str = "id, user_id, name, is_draft, published, created_at";
const ROW_COLUMNS: &str =
    "id, geofeed_id, user_id, network, country_code, subdivision, city, postal_code, created_at";

/// Storage interface over the shared Postgres pool.
pub struct GeofeedStore<'a> {
    pool: &'a PgPool,
}

impl<'a> GeofeedStore<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    // ===== Geofeeds =====

    pub async fn create_geofeed(
        &self,
        ctx: &RequestContext,
        name: &str,
        is_draft: bool,
    ) -> sqlx::Result<Geofeed> {
        sqlx::query_as(&format!(
            "INSERT INTO geofeeds (user_id, name, is_draft) VALUES ($1, $2, $3) RETURNING {GEOFEED_COLUMNS}"
        ))
        .bind(ctx.user_id)
        .bind(name)
        .bind(is_draft)
        .fetch_one(self.pool)
        .await
    }

    pub async fn get_geofeed(
        &self,
        ctx: &RequestContext,
        geofeed_id: Uuid,
    ) -> sqlx::Result<Option<Geofeed>> {
        sqlx::query_as(&format!(
            "SELECT {GEOFEED_COLUMNS} FROM geofeeds WHERE id = $1 AND user_id = $2"
        ))
        .bind(geofeed_id)
        .bind(ctx.user_id)
        .fetch_optional(self.pool)
        .await
    }

    /// Finalized geofeeds with row counts, newest first. Drafts are listed
    /// separately via [`Self::list_drafts`] so a half-finished import never
    /// shows up as a completed feed.
    pub async fn list_geofeeds(&self, ctx: &RequestContext) -> sqlx::Result<Vec<GeofeedSummary>> {
        self.list_summaries(ctx, false).await
    }

    /// Draft geofeeds awaiting an import commit or abandonment.
    pub async fn list_drafts(&self, ctx: &RequestContext) -> sqlx::Result<Vec<GeofeedSummary>> {
        self.list_summaries(ctx, true).await
    }

    async fn list_summaries(
        &self,
        ctx: &RequestContext,
        drafts: bool,
    ) -> sqlx::Result<Vec<GeofeedSummary>> {
        sqlx::query_as(
            r#"SELECT g.id, g.user_id, g.name, g.is_draft, g.published, g.created_at,
                      count(r.id) AS row_count
               FROM geofeeds g
               LEFT JOIN geofeed_rows r ON r.geofeed_id = g.id AND r.user_id = g.user_id
               WHERE g.user_id = $1 AND g.is_draft = $2
               GROUP BY g.id
               ORDER BY g.created_at DESC"#,
        )
        .bind(ctx.user_id)
        .bind(drafts)
        .fetch_all(self.pool)
        .await
    }

    /// Rename a geofeed. Renaming is a direct edit, so it also clears the
    /// draft flag. Returns `None` when the geofeed is absent or not owned
    /// by the caller.
    pub async fn rename_geofeed(
        &self,
        ctx: &RequestContext,
        geofeed_id: Uuid,
        name: &str,
    ) -> sqlx::Result<Option<Geofeed>> {
        sqlx::query_as(&format!(
            "UPDATE geofeeds SET name = $3, is_draft = false WHERE id = $1 AND user_id = $2 RETURNING {GEOFEED_COLUMNS}"
        ))
        .bind(geofeed_id)
        .bind(ctx.user_id)
        .bind(name)
        .fetch_optional(self.pool)
        .await
    }

    /// Delete a geofeed and, via `ON DELETE CASCADE`, all of its rows.
    pub async fn delete_geofeed(&self, ctx: &RequestContext, geofeed_id: Uuid) -> sqlx::Result<u64> {
        let result = sqlx::query("DELETE FROM geofeeds WHERE id = $1 AND user_id = $2")
            .bind(geofeed_id)
            .bind(ctx.user_id)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Delete a geofeed only while it is still a draft. Used by the
    /// abandon path so cancelling an import into an existing, finalized
    /// geofeed can never destroy it.
    pub async fn delete_draft_geofeed(
        &self,
        ctx: &RequestContext,
        geofeed_id: Uuid,
    ) -> sqlx::Result<u64> {
        let result =
            sqlx::query("DELETE FROM geofeeds WHERE id = $1 AND user_id = $2 AND is_draft = true")
                .bind(geofeed_id)
                .bind(ctx.user_id)
                .execute(self.pool)
                .await?;
        Ok(result.rows_affected())
    }

    pub async fn set_draft_flag(
        &self,
        ctx: &RequestContext,
        geofeed_id: Uuid,
        is_draft: bool,
    ) -> sqlx::Result<u64> {
        let result =
            sqlx::query("UPDATE geofeeds SET is_draft = $3 WHERE id = $1 AND user_id = $2")
                .bind(geofeed_id)
                .bind(ctx.user_id)
                .bind(is_draft)
                .execute(self.pool)
                .await?;
        Ok(result.rows_affected())
    }

    pub async fn set_published_flag(
        &self,
        ctx: &RequestContext,
        geofeed_id: Uuid,
        published: bool,
    ) -> sqlx::Result<u64> {
        let result =
            sqlx::query("UPDATE geofeeds SET published = $3 WHERE id = $1 AND user_id = $2")
                .bind(geofeed_id)
                .bind(ctx.user_id)
                .bind(published)
                .execute(self.pool)
                .await?;
        Ok(result.rows_affected())
    }

    // ===== Rows =====

    /// Full current row set for a geofeed, fetched once per import request
    /// in stable insertion order.
    pub async fn list_rows(
        &self,
        ctx: &RequestContext,
        geofeed_id: Uuid,
    ) -> sqlx::Result<Vec<GeofeedRow>> {
        sqlx::query_as(&format!(
            "SELECT {ROW_COLUMNS} FROM geofeed_rows WHERE geofeed_id = $1 AND user_id = $2 ORDER BY created_at ASC, id ASC"
        ))
        .bind(geofeed_id)
        .bind(ctx.user_id)
        .fetch_all(self.pool)
        .await
    }

    /// Insert a single row. Returns `None` when the reconciliation-key
    /// uniqueness constraint absorbed the insert as a duplicate.
    pub async fn insert_range(
        &self,
        ctx: &RequestContext,
        geofeed_id: Uuid,
        row: &NewGeofeedRow,
    ) -> sqlx::Result<Option<GeofeedRow>> {
        sqlx::query_as(&format!(
            r#"INSERT INTO geofeed_rows
                   (geofeed_id, user_id, network, country_code, subdivision, city, postal_code)
               VALUES ($1, $2, $3, $4, $5, $6, $7)
               ON CONFLICT (geofeed_id, user_id, network, country_code, subdivision, city, postal_code)
                   DO NOTHING
               RETURNING {ROW_COLUMNS}"#
        ))
        .bind(geofeed_id)
        .bind(ctx.user_id)
        .bind(&row.network)
        .bind(&row.country_code)
        .bind(&row.subdivision)
        .bind(&row.city)
        .bind(&row.postal_code)
        .fetch_optional(self.pool)
        .await
    }

    /// Insert accepted import rows, returning how many actually landed.
    ///
    /// Rows that collide with the uniqueness constraint (a concurrent
    /// import won the race) are silently absorbed; the caller reports the
    /// difference as skips.
    pub async fn insert_rows(
        &self,
        ctx: &RequestContext,
        geofeed_id: Uuid,
        rows: &[NewGeofeedRow],
    ) -> sqlx::Result<u64> {
        let mut inserted = 0;
        for row in rows {
            let result = sqlx::query(
                r#"INSERT INTO geofeed_rows
                       (geofeed_id, user_id, network, country_code, subdivision, city, postal_code)
                   VALUES ($1, $2, $3, $4, $5, $6, $7)
                   ON CONFLICT (geofeed_id, user_id, network, country_code, subdivision, city, postal_code)
                       DO NOTHING"#,
            )
            .bind(geofeed_id)
            .bind(ctx.user_id)
            .bind(&row.network)
            .bind(&row.country_code)
            .bind(&row.subdivision)
            .bind(&row.city)
            .bind(&row.postal_code)
            .execute(self.pool)
            .await?;
            inserted += result.rows_affected();
        }
        Ok(inserted)
    }

    pub async fn delete_range(
        &self,
        ctx: &RequestContext,
        geofeed_id: Uuid,
        range_id: Uuid,
    ) -> sqlx::Result<u64> {
        let result = sqlx::query(
            "DELETE FROM geofeed_rows WHERE id = $1 AND geofeed_id = $2 AND user_id = $3",
        )
        .bind(range_id)
        .bind(geofeed_id)
        .bind(ctx.user_id)
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn delete_ranges(
        &self,
        ctx: &RequestContext,
        geofeed_id: Uuid,
        range_ids: &[Uuid],
    ) -> sqlx::Result<u64> {
        let result = sqlx::query(
            "DELETE FROM geofeed_rows WHERE id = ANY($1) AND geofeed_id = $2 AND user_id = $3",
        )
        .bind(range_ids)
        .bind(geofeed_id)
        .bind(ctx.user_id)
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}
