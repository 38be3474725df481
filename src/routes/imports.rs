//! The CSV import workflow: begin, preview, commit, cancel.
//!
//! The workflow is driven by the caller: `begin` resolves (or creates) the
//! target geofeed, `preview` turns a CSV source into an annotated merge
//! plan, `commit` persists the caller's selection, and `cancel` abandons
//! the flow, cleaning up an unfinished draft.

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
use crate::import::{
    ImportCandidateRow, ImportOutcome, ImportTarget, PlanCounts, SubmittedRow, commit, draft,
    fetch, parser, reconcile,
};
use crate::models::{Geofeed, GeofeedRow, MessageResponse};
use crate::routes::helpers::resolve_owned_geofeed;
use crate::store::{GeofeedStore, RequestContext};

// ===== Begin =====

/// Import target selector: create a fresh draft or continue into an
/// existing geofeed.
#[derive(Debug, Deserialize, JsonSchema)]
#[serde(tag = "target", rename_all = "camelCase")]
pub enum BeginImportRequest {
    #[serde(rename = "new", rename_all = "camelCase")]
    New { name: String },
    #[serde(rename = "existing", rename_all = "camelCase")]
    Existing { geofeed_id: Uuid },
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImportSessionResponse {
    pub geofeed: Geofeed,
    /// Stored rows the preview will reconcile against.
    pub ranges: Vec<GeofeedRow>,
}

/// Enter the import workflow.
///
/// A `new` target creates a draft geofeed immediately so accepted rows
/// have somewhere to land; if the caller never completes the flow the
/// draft is removed by [`cancel_import`].
#[openapi(tag = "Import")]
#[post("/import/begin", data = "<request>")]
pub async fn begin_import(
    user: AuthUser,
    pool: &State<PgPool>,
    request: Json<BeginImportRequest>,
) -> Result<Json<ImportSessionResponse>, ApiError> {
    let ctx = RequestContext::from(&user);
    let store = GeofeedStore::new(pool);

    let target = match request.into_inner() {
        BeginImportRequest::New { name } => ImportTarget::New { name },
        BeginImportRequest::Existing { geofeed_id } => ImportTarget::Existing { geofeed_id },
    };

    let session = draft::begin_import(&store, &ctx, target).await?;

    Ok(Json(ImportSessionResponse {
        geofeed: session.geofeed,
        ranges: session.existing_rows,
    }))
}

// ===== Preview =====

/// Feed source for a preview: inline text (file upload) or a URL to fetch.
/// Exactly one must be provided.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct PreviewImportRequest {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

/// One candidate row of the merge plan, as surfaced to the caller.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CandidateRowResponse {
    pub line: usize,
    pub network: String,
    pub country_code: String,
    pub subdivision: String,
    pub city: String,
    pub postal_code: String,
    pub original: String,
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub duplicate: bool,
    pub conflict: bool,
    pub selected: bool,
}

impl From<ImportCandidateRow> for CandidateRowResponse {
    fn from(row: ImportCandidateRow) -> Self {
        Self {
            line: row.line,
            network: row.network,
            country_code: row.country_code,
            subdivision: row.subdivision,
            city: row.city,
            postal_code: row.postal_code,
            original: row.original,
            valid: row.valid,
            reason: row.issue.map(|issue| issue.to_string()),
            duplicate: row.duplicate,
            conflict: row.conflict,
            selected: row.selected,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct PreviewImportResponse {
    pub rows: Vec<CandidateRowResponse>,
    pub counts: PlanCounts,
}

/// Parse and reconcile a feed source against the target geofeed.
///
/// Pure preview: nothing is written. The caller edits the returned
/// selection and submits it to [`commit_import`].
#[openapi(tag = "Import")]
#[post("/geofeeds/<geofeed_id>/import/preview", data = "<request>")]
pub async fn preview_import(
    user: AuthUser,
    pool: &State<PgPool>,
    geofeed_id: Uuid,
    request: Json<PreviewImportRequest>,
) -> Result<Json<PreviewImportResponse>, ApiError> {
    let ctx = RequestContext::from(&user);
    resolve_owned_geofeed(pool, &ctx, geofeed_id).await?;

    let request = request.into_inner();
    let text = match (request.text, request.url) {
        (Some(text), None) => text,
        (None, Some(url)) => fetch::fetch_feed_text(&url).await?,
        _ => {
            return Err(ApiError::BadRequest(
                "Provide exactly one of 'text' or 'url'".to_string(),
            ));
        }
    };

    let existing = GeofeedStore::new(pool).list_rows(&ctx, geofeed_id).await?;
    let plan = reconcile::reconcile(parser::parse_feed_text(&text), &existing);

    Ok(Json(PreviewImportResponse {
        rows: plan.rows.into_iter().map(CandidateRowResponse::from).collect(),
        counts: plan.counts,
    }))
}

// ===== Commit =====

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CommitImportRequest {
    pub rows: Vec<SubmittedRow>,
    #[serde(default)]
    pub finalize: bool,
}

/// Persist the caller's selected rows into the target geofeed.
///
/// The executor re-validates and re-deduplicates server-side; rows another
/// commit landed first are reported as skips, not failures. `finalize`
/// clears the target's draft flag.
#[openapi(tag = "Import")]
#[post("/geofeeds/<geofeed_id>/import", data = "<request>")]
pub async fn commit_import(
    user: AuthUser,
    pool: &State<PgPool>,
    geofeed_id: Uuid,
    request: Json<CommitImportRequest>,
) -> Result<Json<ImportOutcome>, ApiError> {
    let ctx = RequestContext::from(&user);
    let geofeed = resolve_owned_geofeed(pool, &ctx, geofeed_id).await?;

    let store = GeofeedStore::new(pool);
    let request = request.into_inner();
    let outcome = commit::execute(&store, &ctx, geofeed_id, &request.rows, request.finalize).await?;

    let finalize_note = if request.finalize {
        " and finalized draft"
    } else {
        ""
    };
    record_activity(
        pool,
        &ctx,
        ActivityEvent::for_geofeed(
            "geofeed.import",
            format!(
                "Imported {} ranges into \"{}\"{}",
                outcome.imported_count, geofeed.name, finalize_note
            ),
            geofeed.id,
            &geofeed.name,
        ),
    );

    Ok(Json(outcome))
}

// ===== Cancel =====

/// Abandon the import workflow for a geofeed.
///
/// Deletes the target only while it is still a draft, cascading to any
/// rows a partial commit already landed. Safe to call when the draft is
/// already gone; cleanup failures never surface to the caller.
#[openapi(tag = "Import")]
#[delete("/geofeeds/<geofeed_id>/import")]
pub async fn cancel_import(
    user: AuthUser,
    pool: &State<PgPool>,
    geofeed_id: Uuid,
) -> Result<Json<MessageResponse>, ApiError> {
    let ctx = RequestContext::from(&user);
    let store = GeofeedStore::new(pool);
    draft::abandon_import(&store, &ctx, geofeed_id).await;

    Ok(Json(MessageResponse {
        message: "Import cancelled".to_string(),
    }))
}
